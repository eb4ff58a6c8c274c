use std::sync::Arc;

use async_trait::async_trait;
use gload_channel_core::{
    ApiKey, CallContext, ChannelCore, ChannelFactory, ChannelProxy, ChannelResult, Group,
    HttpMethod, InboundRequest, UpstreamHttpRequest, ValidationError, accepts_event_stream,
    query_requests_stream,
};
use serde_json::json;

use super::{build_url, json_body, run_validation};
use crate::auth_extractor;

pub const CHANNEL_TYPE: &str = "gemini";

const KEY_QUERY_PARAM: &str = "key";
const KEY_HEADER: &str = "x-goog-api-key";
const STREAM_METHOD_SUFFIX: &str = ":streamGenerateContent";

/// Google Generative Language API. Keys travel in the `key` query parameter.
pub struct GeminiChannel {
    core: ChannelCore,
}

impl GeminiChannel {
    pub fn new(core: ChannelCore) -> Self {
        Self { core }
    }
}

pub fn new_gemini_channel(
    factory: &ChannelFactory,
    group: &Group,
) -> ChannelResult<Arc<dyn ChannelProxy>> {
    Ok(Arc::new(GeminiChannel::new(factory.new_core(group)?)))
}

#[async_trait]
impl ChannelProxy for GeminiChannel {
    fn core(&self) -> &ChannelCore {
        &self.core
    }

    fn modify_request(&self, req: &mut UpstreamHttpRequest, key: &ApiKey, _group: &Group) {
        // A client-sent header key would compete with the pool key.
        req.remove_header(KEY_HEADER);
        req.set_query_param(KEY_QUERY_PARAM, &key.value);
    }

    fn is_stream_request(&self, req: &InboundRequest, _body: &[u8]) -> bool {
        req.path.ends_with(STREAM_METHOD_SUFFIX)
            || accepts_event_stream(req)
            || query_requests_stream(req)
    }

    fn extract_key(&self, req: &InboundRequest) -> Option<String> {
        req.header(KEY_HEADER)
            .map(str::to_string)
            .or_else(|| {
                req.query_param(KEY_QUERY_PARAM)
                    .filter(|key| !key.trim().is_empty())
            })
    }

    async fn validate_key(&self, ctx: &CallContext, key: &ApiKey) -> Result<(), ValidationError> {
        let model = self.core.test_model().trim_start_matches("models/");
        run_validation(&self.core, ctx, key, |base| {
            let url = build_url(base, &format!("/v1beta/models/{model}:generateContent"));
            let mut req = UpstreamHttpRequest::new(HttpMethod::Post, url);
            req.set_query_param(KEY_QUERY_PARAM, &key.value);
            auth_extractor::set_content_type_json(&mut req);
            auth_extractor::set_accept_json(&mut req);
            req.body = Some(json_body(&json!({
                "contents": [{ "parts": [{ "text": "hi" }] }]
            }))?);
            Ok(req)
        })
        .await
    }
}
