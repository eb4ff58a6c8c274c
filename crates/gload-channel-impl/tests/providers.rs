mod common;

use std::sync::Arc;

use common::{MockUpstream, channel, group, init_tracing, single_upstream};
use gload_channel_core::{
    ApiKey, CallContext, ChannelError, ChannelFactory, HttpMethod, InboundRequest,
    UpstreamHttpRequest, ValidationError,
};

fn outbound(url: &str) -> UpstreamHttpRequest {
    UpstreamHttpRequest::new(HttpMethod::Post, url)
}

#[test]
fn factory_builds_every_builtin_and_rejects_others() {
    let factory = ChannelFactory::new(Arc::new(gload_channel_impl::build_registry().unwrap()));
    let upstreams = single_upstream("https://api.example.com");

    for channel_type in ["gemini", "openai", "anthropic"] {
        let channel = factory.build(&group(channel_type, &upstreams)).unwrap();
        assert_eq!(channel.core().channel_type(), channel_type);
    }
    assert!(matches!(
        factory.build(&group("azure", &upstreams)).err(),
        Some(ChannelError::UnsupportedChannelType(ref t)) if t == "azure"
    ));
}

#[test]
fn openai_uses_bearer_auth() {
    let channel = channel("openai", &single_upstream("https://api.openai.com"));

    let mut req = outbound("https://api.openai.com/v1/chat/completions");
    req.set_header("Authorization", "Bearer client-key");
    req.set_header("X-Api-Key", "client-key");
    channel.modify_request(&mut req, &ApiKey::new("sk-pool"), &group("openai", "[]"));
    channel.modify_request(&mut req, &ApiKey::new("sk-pool"), &group("openai", "[]"));
    assert_eq!(req.header("authorization"), Some("Bearer sk-pool"));
    assert_eq!(req.header("x-api-key"), None);
    assert_eq!(req.headers.len(), 1);

    let bearer = InboundRequest::new("/proxy/team/v1/models")
        .with_header("Authorization", "Bearer sk-client")
        .with_header("X-Api-Key", "other");
    assert_eq!(channel.extract_key(&bearer).as_deref(), Some("sk-client"));
    let api_key = InboundRequest::new("/proxy/team/v1/models").with_header("X-Api-Key", "other");
    assert_eq!(channel.extract_key(&api_key).as_deref(), Some("other"));
    assert_eq!(channel.extract_key(&InboundRequest::new("/proxy/team/v1/models")), None);
}

#[test]
fn openai_and_anthropic_detect_streams_from_the_body() {
    for channel_type in ["openai", "anthropic"] {
        let channel = channel(channel_type, &single_upstream("https://api.example.com"));
        let req = InboundRequest::new("/proxy/team/v1/chat/completions");

        assert!(channel.is_stream_request(&req, br#"{"model":"m","stream":true}"#));
        assert!(!channel.is_stream_request(&req, br#"{"model":"m","stream":false}"#));
        assert!(!channel.is_stream_request(&req, b"not json"));
        assert!(channel.is_stream_request(
            &req.clone().with_header("Accept", "text/event-stream"),
            b""
        ));
        assert!(channel.is_stream_request(
            &InboundRequest::new("/proxy/team/v1/messages?stream=true"),
            b""
        ));
    }
}

#[test]
fn anthropic_sets_key_and_default_version() {
    let channel = channel("anthropic", &single_upstream("https://api.anthropic.com"));

    let mut req = outbound("https://api.anthropic.com/v1/messages");
    req.set_header("Authorization", "Bearer client");
    channel.modify_request(&mut req, &ApiKey::new("sk-ant"), &group("anthropic", "[]"));
    assert_eq!(req.header("x-api-key"), Some("sk-ant"));
    assert_eq!(req.header("anthropic-version"), Some("2023-06-01"));
    assert_eq!(req.header("authorization"), None);

    let mut pinned_version = outbound("https://api.anthropic.com/v1/messages");
    pinned_version.set_header("anthropic-version", "2024-01-01");
    channel.modify_request(&mut pinned_version, &ApiKey::new("sk-ant"), &group("anthropic", "[]"));
    assert_eq!(pinned_version.header("anthropic-version"), Some("2024-01-01"));

    let both = InboundRequest::new("/proxy/team/v1/messages")
        .with_header("x-api-key", "from-header")
        .with_header("Authorization", "Bearer from-bearer");
    assert_eq!(channel.extract_key(&both).as_deref(), Some("from-header"));
}

#[tokio::test]
async fn openai_validation_posts_a_chat_completion() {
    init_tracing();
    let mut upstream = MockUpstream::start(200, r#"{"choices":[]}"#).await;
    let channel = channel("openai", &single_upstream(&format!("{}/v1", upstream.base_url)));

    channel
        .validate_key(&CallContext::new(), &ApiKey::new("sk-good"))
        .await
        .unwrap();

    let seen = upstream.next_request().await;
    assert!(seen.starts_with("POST /v1/chat/completions HTTP/1.1"), "{seen}");
    assert!(seen.to_ascii_lowercase().contains("authorization: bearer sk-good"));
    assert!(seen.contains(r#""model":"test-model""#));
}

#[tokio::test]
async fn anthropic_rejection_uses_the_error_envelope() {
    init_tracing();
    let mut upstream = MockUpstream::start(
        401,
        r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
    )
    .await;
    let channel = channel("anthropic", &single_upstream(&upstream.base_url));

    let err = channel
        .validate_key(&CallContext::new(), &ApiKey::new("sk-bad"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ValidationError::Rejected { status: 401, ref message } if message == "invalid x-api-key"
    ));
    assert_eq!(err.to_string(), "[status 401] invalid x-api-key");

    let seen = upstream.next_request().await.to_ascii_lowercase();
    assert!(seen.starts_with("post /v1/messages http/1.1"), "{seen}");
    assert!(seen.contains("x-api-key: sk-bad"));
    assert!(seen.contains("anthropic-version: 2023-06-01"));
}
