use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use gload_common::Group;
use tracing::{info, warn};

use crate::channel::ChannelCore;
use crate::client::ClientManager;
use crate::proxy::ChannelProxy;
use crate::registry::{ChannelRegistry, global_registry};
use crate::{ChannelError, ChannelResult};

type ChannelMap = HashMap<i64, Arc<dyn ChannelProxy>>;

/// Builds channels from group snapshots and keeps one live instance per group.
///
/// The per-group map is published atomically: lookups never block, and a
/// rebuild replaces the whole map.
pub struct ChannelFactory {
    registry: Arc<ChannelRegistry>,
    clients: ClientManager,
    channels: ArcSwap<ChannelMap>,
}

impl ChannelFactory {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self {
            registry,
            clients: ClientManager::new(),
            channels: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Factory over the registry published with
    /// [`install_global`](crate::install_global).
    pub fn from_global() -> ChannelResult<Self> {
        let registry = global_registry()
            .ok_or_else(|| ChannelError::Other("channel registry not installed".to_string()))?;
        Ok(Self::new(registry))
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    /// Shared build step every constructor goes through.
    pub fn new_core(&self, group: &Group) -> ChannelResult<ChannelCore> {
        ChannelCore::build(group, &self.clients)
    }

    /// Always constructs a fresh channel; the cache is not consulted.
    pub fn build(&self, group: &Group) -> ChannelResult<Arc<dyn ChannelProxy>> {
        let Some(constructor) = self.registry.get(&group.channel_type) else {
            warn!(
                event = "channel_unsupported",
                group = %group.name,
                channel_type = %group.channel_type
            );
            return Err(ChannelError::UnsupportedChannelType(
                group.channel_type.clone(),
            ));
        };
        constructor(self, group)
    }

    /// Cached channel for `group`, rebuilt wholesale when its configuration
    /// drifted. A failed rebuild leaves the stale entry out of the cache.
    ///
    /// Concurrent callers racing on the same group may each build, but only
    /// one instance is published and every caller gets that one.
    pub fn get_channel(&self, group: &Group) -> ChannelResult<Arc<dyn ChannelProxy>> {
        let stale = match self.channels.load().get(&group.id) {
            Some(channel) if !channel.is_config_stale(group) => return Ok(channel.clone()),
            Some(_) => true,
            None => false,
        };
        if stale {
            info!(event = "channel_rebuild", group = %group.name, group_id = group.id);
        }

        let built = match self.build(group) {
            Ok(channel) => channel,
            Err(err) => {
                if stale {
                    self.evict(group.id);
                }
                return Err(err);
            }
        };

        let mut published = built.clone();
        self.channels.rcu(|current| {
            let mut next = ChannelMap::clone(current);
            match current.get(&group.id) {
                Some(existing) if !existing.is_config_stale(group) => {
                    published = existing.clone();
                }
                _ => {
                    next.insert(group.id, built.clone());
                    published = built.clone();
                }
            }
            next
        });
        Ok(published)
    }

    pub fn evict(&self, group_id: i64) -> bool {
        let mut removed = false;
        self.channels.rcu(|current| {
            let mut next = ChannelMap::clone(current);
            removed = next.remove(&group_id).is_some();
            next
        });
        removed
    }
}
