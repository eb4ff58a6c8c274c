use std::fmt;

use bytes::Bytes;
use gload_common::{DEFAULT_UPSTREAM_ID, EffectiveConfig, Group, parse_upstreams};
use tracing::{debug, info};
use wreq::Client;

use crate::client::{ClientConfig, ClientManager};
use crate::request::InboundRequest;
use crate::upstream::{UpstreamSet, UpstreamTarget};
use crate::{ChannelError, ChannelResult};

const PROXY_ROUTE_PREFIX: &str = "/proxy/";

/// Group fields a channel was built from. Only ever compared against, never
/// read as configuration.
#[derive(Debug, Clone)]
struct BuiltFrom {
    channel_type: String,
    test_model: String,
    upstreams: Bytes,
    effective_config: EffectiveConfig,
}

/// State shared by every channel type: upstreams, outbound clients and the
/// record of what the channel was built from.
///
/// Immutable after construction apart from the upstream counters.
pub struct ChannelCore {
    group_id: i64,
    name: String,
    upstreams: UpstreamSet,
    http_client: Client,
    stream_client: Client,
    built_from: BuiltFrom,
}

impl ChannelCore {
    /// Parses the group's upstreams and resolves both outbound clients.
    pub fn build(group: &Group, clients: &ClientManager) -> ChannelResult<Self> {
        let defs = parse_upstreams(&group.upstreams)?;
        Self::with_upstreams(group, UpstreamSet::from_definitions(defs), clients)
    }

    /// Like [`build`](Self::build) with an already decoded upstream set.
    pub fn with_upstreams(
        group: &Group,
        upstreams: UpstreamSet,
        clients: &ClientManager,
    ) -> ChannelResult<Self> {
        let http_client = clients.get_client(&ClientConfig::buffered(&group.effective_config))?;
        let stream_client =
            clients.get_client(&ClientConfig::streaming(&group.effective_config))?;

        info!(
            event = "channel_built",
            group = %group.name,
            channel_type = %group.channel_type,
            upstreams = upstreams.len()
        );

        Ok(Self {
            group_id: group.id,
            name: group.name.clone(),
            upstreams,
            http_client,
            stream_client,
            built_from: BuiltFrom {
                channel_type: group.channel_type.clone(),
                test_model: group.test_model.clone(),
                upstreams: group.upstreams.clone(),
                effective_config: group.effective_config.clone(),
            },
        })
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel_type(&self) -> &str {
        &self.built_from.channel_type
    }

    pub fn test_model(&self) -> &str {
        &self.built_from.test_model
    }

    pub fn upstreams(&self) -> &UpstreamSet {
        &self.upstreams
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn stream_client(&self) -> &Client {
        &self.stream_client
    }

    pub fn client_for(&self, is_stream: bool) -> &Client {
        if is_stream {
            &self.stream_client
        } else {
            &self.http_client
        }
    }

    /// An explicit pin (anything but `"Default"`) that names a configured
    /// upstream is used as-is and leaves the counters alone; otherwise falls
    /// back to weighted selection.
    pub fn resolve_upstream(&self, pinned: Option<&str>) -> Option<UpstreamTarget> {
        let pinned = pinned
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != DEFAULT_UPSTREAM_ID)
            .and_then(|id| self.upstreams.find(id));
        if let Some(target) = pinned {
            debug!(event = "upstream_pinned", group = %self.name, upstream = %target.id);
            return Some(target);
        }

        let target = self.upstreams.select()?;
        debug!(event = "upstream_selected", group = %self.name, upstream = %target.id);
        Some(target)
    }

    /// Maps `/proxy/<group>/<rest>?<query>` onto the resolved upstream:
    /// `<upstream path without trailing slash>/<rest>?<query>`. The query is
    /// appended as received, never re-encoded; an empty one is dropped.
    pub fn build_upstream_url(
        &self,
        incoming: &InboundRequest,
        group: &Group,
        upstream_id: Option<&str>,
    ) -> ChannelResult<String> {
        let target = self
            .resolve_upstream(upstream_id)
            .ok_or_else(|| ChannelError::NoUpstream {
                channel: self.name.clone(),
            })?;

        let rest = strip_group_prefix(&incoming.path, &group.name);
        let mut url = target.url;
        let path = format!("{}{}", url.path().trim_end_matches('/'), rest);
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        let mut out = String::from(url);
        if let Some(query) = incoming.query.as_deref().filter(|q| !q.is_empty()) {
            out.push('?');
            out.push_str(query);
        }
        Ok(out)
    }

    /// Runs one weighted selection and reports its id, or `"Default"` when
    /// there is nothing to select.
    pub fn selected_upstream_id(&self) -> String {
        self.upstreams
            .select()
            .map(|target| target.id)
            .unwrap_or_else(|| DEFAULT_UPSTREAM_ID.to_string())
    }

    /// Whether `group` no longer matches what this channel was built from.
    /// Checked field by field, cheapest first.
    pub fn is_config_stale(&self, group: &Group) -> bool {
        let built = &self.built_from;
        if built.channel_type != group.channel_type {
            return true;
        }
        if built.test_model != group.test_model {
            return true;
        }
        // Raw bytes: a reorder is a change since order breaks selection ties.
        if built.upstreams != group.upstreams {
            return true;
        }
        if built.effective_config != group.effective_config {
            return true;
        }
        false
    }
}

impl fmt::Debug for ChannelCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelCore")
            .field("group_id", &self.group_id)
            .field("name", &self.name)
            .field("channel_type", &self.built_from.channel_type)
            .field("upstreams", &self.upstreams)
            .finish_non_exhaustive()
    }
}

fn strip_group_prefix<'a>(path: &'a str, group_name: &str) -> &'a str {
    let Some(rest) = path
        .strip_prefix(PROXY_ROUTE_PREFIX)
        .and_then(|rest| rest.strip_prefix(group_name))
    else {
        return path;
    };
    if rest.is_empty() || rest.starts_with('/') {
        rest
    } else {
        path
    }
}
