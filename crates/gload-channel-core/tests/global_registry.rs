use gload_channel_core::{
    ChannelError, ChannelFactory, ChannelRegistry, global_registry, install_global,
};

// Process-wide state: keep this the only test in its binary.
#[test]
fn global_registry_installs_exactly_once() {
    assert!(global_registry().is_none());
    assert!(ChannelFactory::from_global().is_err());

    install_global(ChannelRegistry::new()).unwrap();
    assert!(global_registry().is_some());
    assert!(matches!(
        install_global(ChannelRegistry::new()),
        Err(ChannelError::RegistryInstalled)
    ));
    assert!(ChannelFactory::from_global().is_ok());
}
