use std::collections::HashSet;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ConfigError, EffectiveConfig};

/// Group snapshot as resolved by the router for one request.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub channel_type: String,
    pub test_model: String,
    /// Upstream list exactly as persisted (JSON array). Kept raw so staleness
    /// checks can compare bytes without re-parsing.
    pub upstreams: Bytes,
    pub effective_config: EffectiveConfig,
}

/// Credential handed out by the key pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKey {
    pub value: String,
    /// Upstream id this key is bound to. `None` or `"Default"` means any.
    pub pinned_upstream: Option<String>,
}

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            pinned_upstream: None,
        }
    }

    pub fn pinned_to(mut self, upstream_id: impl Into<String>) -> Self {
        self.pinned_upstream = Some(upstream_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamDefinition {
    pub id: String,
    pub url: Url,
    pub weight: u32,
}

#[derive(Deserialize)]
struct StoredUpstream {
    #[serde(default)]
    id: Option<String>,
    url: String,
    #[serde(default)]
    weight: u32,
}

/// Decodes the persisted upstream list, preserving order.
///
/// A missing or blank id falls back to the url as written.
pub fn parse_upstreams(raw: &[u8]) -> Result<Vec<UpstreamDefinition>, ConfigError> {
    let stored: Vec<StoredUpstream> = serde_json::from_slice(raw)?;
    if stored.is_empty() {
        return Err(ConfigError::NoUpstreams);
    }

    let mut seen = HashSet::with_capacity(stored.len());
    let mut out = Vec::with_capacity(stored.len());
    for item in stored {
        let url_text = item.url.trim();
        let url = Url::parse(url_text).map_err(|err| ConfigError::InvalidUpstreamUrl {
            url: item.url.clone(),
            reason: err.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUpstreamUrl {
                url: item.url.clone(),
                reason: "not a base url".to_string(),
            });
        }
        let id = item
            .id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| url_text.to_string());
        if !seen.insert(id.clone()) {
            return Err(ConfigError::DuplicateUpstreamId(id));
        }
        out.push(UpstreamDefinition {
            id,
            url,
            weight: item.weight,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_in_declared_order() {
        let raw = br#"[
            {"id": "primary", "url": "https://a.example.com/api/", "weight": 3},
            {"url": "https://b.example.com", "weight": 0}
        ]"#;
        let parsed = parse_upstreams(raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id, "primary");
        assert_eq!(parsed[0].weight, 3);
        assert_eq!(parsed[1].id, "https://b.example.com");
        assert_eq!(parsed[1].weight, 0);
    }

    #[test]
    fn rejects_empty_list() {
        assert!(matches!(parse_upstreams(b"[]"), Err(ConfigError::NoUpstreams)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let raw = br#"[
            {"id": "x", "url": "https://a.example.com", "weight": 1},
            {"id": "x", "url": "https://b.example.com", "weight": 1}
        ]"#;
        assert!(matches!(
            parse_upstreams(raw),
            Err(ConfigError::DuplicateUpstreamId(id)) if id == "x"
        ));
    }

    #[test]
    fn rejects_relative_and_negative_entries() {
        assert!(matches!(
            parse_upstreams(br#"[{"url": "/relative", "weight": 1}]"#),
            Err(ConfigError::InvalidUpstreamUrl { .. })
        ));
        assert!(matches!(
            parse_upstreams(br#"[{"url": "https://a.example.com", "weight": -1}]"#),
            Err(ConfigError::MalformedUpstreams(_))
        ));
    }
}
