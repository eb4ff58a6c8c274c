use gload_channel_core::{ChannelConstructor, ChannelRegistry, ChannelResult};

use crate::providers::{anthropic, gemini, openai};

/// Built-in channel types in registration order.
pub fn builtin_constructors() -> [(&'static str, ChannelConstructor); 3] {
    [
        (gemini::CHANNEL_TYPE, gemini::new_gemini_channel as ChannelConstructor),
        (openai::CHANNEL_TYPE, openai::new_openai_channel as ChannelConstructor),
        (anthropic::CHANNEL_TYPE, anthropic::new_anthropic_channel as ChannelConstructor),
    ]
}

pub fn register_builtin_channels(registry: &mut ChannelRegistry) -> ChannelResult<()> {
    for (channel_type, constructor) in builtin_constructors() {
        registry.register(channel_type, constructor)?;
    }
    Ok(())
}

pub fn build_registry() -> ChannelResult<ChannelRegistry> {
    ChannelRegistry::from_constructors(builtin_constructors())
}
