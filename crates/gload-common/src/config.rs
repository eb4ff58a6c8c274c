use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid upstreams json: {0}")]
    MalformedUpstreams(#[from] serde_json::Error),
    #[error("at least one upstream is required")]
    NoUpstreams,
    #[error("invalid upstream url {url:?}: {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },
    #[error("duplicate upstream id: {0}")]
    DuplicateUpstreamId(String),
}

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;
const DEFAULT_IDLE_CONN_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_IDLE_CONNS_PER_HOST: usize = 50;

/// Settings in force for one group after group overrides are merged onto the
/// system defaults. Compared field by field for staleness, so every field
/// must take part in `PartialEq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub idle_conn_timeout_secs: u64,
    pub max_idle_conns_per_host: usize,
    /// Optional outbound proxy (for upstream egress).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            idle_conn_timeout_secs: DEFAULT_IDLE_CONN_TIMEOUT_SECS,
            max_idle_conns_per_host: DEFAULT_MAX_IDLE_CONNS_PER_HOST,
            proxy_url: None,
        }
    }
}

/// Optional layer used for merging settings.
///
/// Merge order: group overrides > system settings > built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_conn_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_idle_conns_per_host: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

impl EffectiveConfigPatch {
    pub fn overlay(&mut self, other: EffectiveConfigPatch) {
        if other.connect_timeout_secs.is_some() {
            self.connect_timeout_secs = other.connect_timeout_secs;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.idle_conn_timeout_secs.is_some() {
            self.idle_conn_timeout_secs = other.idle_conn_timeout_secs;
        }
        if other.max_idle_conns_per_host.is_some() {
            self.max_idle_conns_per_host = other.max_idle_conns_per_host;
        }
        if other.proxy_url.is_some() {
            self.proxy_url = other.proxy_url;
        }
    }

    pub fn into_config(self) -> EffectiveConfig {
        let defaults = EffectiveConfig::default();
        EffectiveConfig {
            connect_timeout_secs: self
                .connect_timeout_secs
                .unwrap_or(defaults.connect_timeout_secs),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            idle_conn_timeout_secs: self
                .idle_conn_timeout_secs
                .unwrap_or(defaults.idle_conn_timeout_secs),
            max_idle_conns_per_host: self
                .max_idle_conns_per_host
                .unwrap_or(defaults.max_idle_conns_per_host),
            proxy_url: self
                .proxy_url
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
        }
    }
}

impl From<EffectiveConfig> for EffectiveConfigPatch {
    fn from(value: EffectiveConfig) -> Self {
        Self {
            connect_timeout_secs: Some(value.connect_timeout_secs),
            request_timeout_secs: Some(value.request_timeout_secs),
            idle_conn_timeout_secs: Some(value.idle_conn_timeout_secs),
            max_idle_conns_per_host: Some(value.max_idle_conns_per_host),
            proxy_url: value.proxy_url,
        }
    }
}
