//! Persisted configuration shapes consumed by the channel layer.
//!
//! Nothing here talks to storage. The router resolves a [`Group`] and the key
//! pool hands out [`ApiKey`]s; this crate only defines what those look like and
//! how the raw upstream list is decoded.

mod config;
mod group;

pub use config::{ConfigError, EffectiveConfig, EffectiveConfigPatch};
pub use group::{ApiKey, Group, UpstreamDefinition, parse_upstreams};

/// Upstream id meaning "no explicit pin".
pub const DEFAULT_UPSTREAM_ID: &str = "Default";
