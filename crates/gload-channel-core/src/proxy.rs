use async_trait::async_trait;
use gload_common::{ApiKey, Group};
use wreq::Client;

use crate::channel::ChannelCore;
use crate::context::CallContext;
use crate::request::{InboundRequest, UpstreamHttpRequest};
use crate::{ChannelResult, ValidationError};

/// Everything the router needs from a channel for one group.
///
/// Implementors hold a [`ChannelCore`] and expose it through [`core`]; the
/// shared operations below forward to it and are not meant to be overridden.
/// Only the provider hooks differ between channel types.
///
/// [`core`]: ChannelProxy::core
#[async_trait]
pub trait ChannelProxy: Send + Sync {
    fn core(&self) -> &ChannelCore;

    // ---- Shared operations ----

    fn build_upstream_url(
        &self,
        incoming: &InboundRequest,
        group: &Group,
        upstream_id: Option<&str>,
    ) -> ChannelResult<String> {
        self.core().build_upstream_url(incoming, group, upstream_id)
    }

    fn selected_upstream_id(&self) -> String {
        self.core().selected_upstream_id()
    }

    /// On `true` the caller must drop this instance and ask the factory for a
    /// fresh one before routing more traffic through it.
    fn is_config_stale(&self, group: &Group) -> bool {
        self.core().is_config_stale(group)
    }

    fn http_client(&self) -> &Client {
        self.core().http_client()
    }

    fn stream_client(&self) -> &Client {
        self.core().stream_client()
    }

    // ---- Provider hooks ----

    /// Attaches `key` the way the provider expects it. Applying it twice
    /// leaves the request as if applied once.
    fn modify_request(&self, req: &mut UpstreamHttpRequest, key: &ApiKey, group: &Group);

    /// Decides from pre-forward information only whether the response must be
    /// proxied as a stream.
    fn is_stream_request(&self, req: &InboundRequest, body: &[u8]) -> bool;

    /// Client-presented credential, checked in the provider's priority order.
    /// `None` means the pool-assigned key should be used.
    fn extract_key(&self, req: &InboundRequest) -> Option<String>;

    /// One minimal real request against an upstream resolved from the key's
    /// pin. `Ok(())` means the upstream accepted the key.
    async fn validate_key(&self, ctx: &CallContext, key: &ApiKey) -> Result<(), ValidationError>;
}

/// `Accept: text/event-stream`.
pub fn accepts_event_stream(req: &InboundRequest) -> bool {
    req.header("accept")
        .is_some_and(|value| value.contains("text/event-stream"))
}

/// `?stream=true`.
pub fn query_requests_stream(req: &InboundRequest) -> bool {
    req.query_param("stream").as_deref() == Some("true")
}

/// `{"stream": true}` at the top level of a JSON body.
pub fn body_requests_stream(body: &[u8]) -> bool {
    if body.is_empty() {
        return false;
    }
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("stream").and_then(serde_json::Value::as_bool))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_stream_signals() {
        let plain = InboundRequest::new("/proxy/g/v1/chat");
        assert!(!accepts_event_stream(&plain));
        assert!(!query_requests_stream(&plain));

        let sse = plain.clone().with_header("Accept", "application/json, text/event-stream");
        assert!(accepts_event_stream(&sse));
        assert!(query_requests_stream(&InboundRequest::new("/x?stream=true")));
        assert!(!query_requests_stream(&InboundRequest::new("/x?stream=1")));

        assert!(body_requests_stream(br#"{"model":"m","stream":true}"#));
        assert!(!body_requests_stream(br#"{"stream":"true"}"#));
        assert!(!body_requests_stream(b"not json"));
        assert!(!body_requests_stream(b""));
    }
}
