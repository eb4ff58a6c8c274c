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

pub const CHANNEL_TYPE: &str = "openai";

const API_KEY_HEADER: &str = "x-api-key";

pub struct OpenAIChannel {
    core: ChannelCore,
}

impl OpenAIChannel {
    pub fn new(core: ChannelCore) -> Self {
        Self { core }
    }
}

pub fn new_openai_channel(
    factory: &ChannelFactory,
    group: &Group,
) -> ChannelResult<Arc<dyn ChannelProxy>> {
    Ok(Arc::new(OpenAIChannel::new(factory.new_core(group)?)))
}

#[async_trait]
impl ChannelProxy for OpenAIChannel {
    fn core(&self) -> &ChannelCore {
        &self.core
    }

    fn modify_request(&self, req: &mut UpstreamHttpRequest, key: &ApiKey, _group: &Group) {
        req.remove_header(API_KEY_HEADER);
        auth_extractor::set_bearer(req, &key.value);
    }

    fn is_stream_request(&self, req: &InboundRequest, body: &[u8]) -> bool {
        accepts_event_stream(req) || query_requests_stream(req) || body_requests_stream(body)
    }

    fn extract_key(&self, req: &InboundRequest) -> Option<String> {
        bearer_token(&req.headers)
            .map(str::to_string)
            .or_else(|| req.header(API_KEY_HEADER).map(str::to_string))
    }

    async fn validate_key(&self, ctx: &CallContext, key: &ApiKey) -> Result<(), ValidationError> {
        let model = self.core.test_model();
        run_validation(&self.core, ctx, key, |base| {
            let mut req =
                UpstreamHttpRequest::new(HttpMethod::Post, build_url(base, "/v1/chat/completions"));
            auth_extractor::set_bearer(&mut req, &key.value);
            auth_extractor::set_content_type_json(&mut req);
            auth_extractor::set_accept_json(&mut req);
            req.body = Some(json_body(&json!({
                "model": model,
                "messages": [{ "role": "user", "content": "hi" }],
            }))?);
            Ok(req)
        })
        .await
    }
}
