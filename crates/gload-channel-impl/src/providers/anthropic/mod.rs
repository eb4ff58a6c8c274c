use std::sync::Arc;

use async_trait::async_trait;
use gload_channel_core::{
    ApiKey, CallContext, ChannelCore, ChannelFactory, ChannelProxy, ChannelResult, Group,
    HttpMethod, InboundRequest, UpstreamHttpRequest, ValidationError, accepts_event_stream,
    bearer_token, body_requests_stream, query_requests_stream,
};
use serde_json::json;

use super::{build_url, json_body, run_validation};
use crate::auth_extractor;

pub const CHANNEL_TYPE: &str = "anthropic";

const API_KEY_HEADER: &str = "x-api-key";
const VERSION_HEADER: &str = "anthropic-version";
const DEFAULT_VERSION: &str = "2023-06-01";

/// Anthropic Messages API: `x-api-key` auth plus a pinned API version.
pub struct AnthropicChannel {
    core: ChannelCore,
}

impl AnthropicChannel {
    pub fn new(core: ChannelCore) -> Self {
        Self { core }
    }
}

pub fn new_anthropic_channel(
    factory: &ChannelFactory,
    group: &Group,
) -> ChannelResult<Arc<dyn ChannelProxy>> {
    Ok(Arc::new(AnthropicChannel::new(factory.new_core(group)?)))
}

fn set_auth(req: &mut UpstreamHttpRequest, key: &ApiKey) {
    req.remove_header("authorization");
    auth_extractor::set_header(req, API_KEY_HEADER, &key.value);
    if req.header(VERSION_HEADER).is_none() {
        auth_extractor::set_header(req, VERSION_HEADER, DEFAULT_VERSION);
    }
}

#[async_trait]
impl ChannelProxy for AnthropicChannel {
    fn core(&self) -> &ChannelCore {
        &self.core
    }

    fn modify_request(&self, req: &mut UpstreamHttpRequest, key: &ApiKey, _group: &Group) {
        set_auth(req, key);
    }

    fn is_stream_request(&self, req: &InboundRequest, body: &[u8]) -> bool {
        accepts_event_stream(req) || query_requests_stream(req) || body_requests_stream(body)
    }

    fn extract_key(&self, req: &InboundRequest) -> Option<String> {
        req.header(API_KEY_HEADER)
            .map(str::to_string)
            .or_else(|| bearer_token(&req.headers).map(str::to_string))
    }

    async fn validate_key(&self, ctx: &CallContext, key: &ApiKey) -> Result<(), ValidationError> {
        let model = self.core.test_model();
        run_validation(&self.core, ctx, key, |base| {
            let mut req = UpstreamHttpRequest::new(HttpMethod::Post, build_url(base, "/v1/messages"));
            set_auth(&mut req, key);
            auth_extractor::set_content_type_json(&mut req);
            auth_extractor::set_accept_json(&mut req);
            req.body = Some(json_body(&json!({
                "model": model,
                "max_tokens": 100,
                "messages": [{ "role": "user", "content": "hi" }],
            }))?);
            Ok(req)
        })
        .await
    }
}
