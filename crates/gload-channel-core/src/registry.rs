use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use gload_common::Group;

use crate::factory::ChannelFactory;
use crate::proxy::ChannelProxy;
use crate::{ChannelError, ChannelResult};

pub type ChannelConstructor = fn(&ChannelFactory, &Group) -> ChannelResult<Arc<dyn ChannelProxy>>;

/// Channel type name -> constructor. Filled once at startup, read-only after.
#[derive(Default)]
pub struct ChannelRegistry {
    constructors: HashMap<String, ChannelConstructor>,
    order: Vec<String>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `items` in the given order; a repeated name is an error.
    pub fn from_constructors<I, S>(items: I) -> ChannelResult<Self>
    where
        I: IntoIterator<Item = (S, ChannelConstructor)>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for (channel_type, constructor) in items {
            registry.register(channel_type, constructor)?;
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        channel_type: impl Into<String>,
        constructor: ChannelConstructor,
    ) -> ChannelResult<()> {
        let channel_type = channel_type.into();
        if self.constructors.contains_key(&channel_type) {
            return Err(ChannelError::DuplicateChannelType(channel_type));
        }
        self.constructors.insert(channel_type.clone(), constructor);
        self.order.push(channel_type);
        Ok(())
    }

    pub fn get(&self, channel_type: &str) -> Option<ChannelConstructor> {
        self.constructors.get(channel_type).copied()
    }

    /// Registered names in registration order.
    pub fn channel_types(&self) -> &[String] {
        &self.order
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<ChannelRegistry>> = OnceLock::new();

/// Publishes the process-wide registry. Only the first call succeeds.
pub fn install_global(registry: ChannelRegistry) -> ChannelResult<Arc<ChannelRegistry>> {
    let registry = Arc::new(registry);
    GLOBAL_REGISTRY
        .set(registry.clone())
        .map_err(|_| ChannelError::RegistryInstalled)?;
    Ok(registry)
}

pub fn global_registry() -> Option<Arc<ChannelRegistry>> {
    GLOBAL_REGISTRY.get().cloned()
}
