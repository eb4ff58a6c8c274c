pub mod anthropic;
pub mod gemini;
pub mod openai;

use std::time::Instant;

use gload_channel_core::{
    ApiKey, CallContext, ChannelCore, ChannelError, UpstreamHttpRequest, ValidationError,
    send_buffered,
};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::envelope::parse_upstream_error;

pub use anthropic::AnthropicChannel;
pub use gemini::GeminiChannel;
pub use openai::OpenAIChannel;

/// Joins `path` under the upstream base, dropping a version segment the base
/// already ends with. Any query on the base is discarded.
pub(crate) fn build_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let base_path = url.path().trim_end_matches('/').to_string();
    let mut path = path.trim_start_matches('/');
    for version in ["v1", "v1beta"] {
        if base_path.ends_with(&format!("/{version}"))
            && (path == version || path.starts_with(&format!("{version}/")))
        {
            path = path[version.len()..].trim_start_matches('/');
        }
    }
    url.set_path(&format!("{base_path}/{path}"));
    url.set_query(None);
    url
}

pub(crate) fn json_body(payload: &Value) -> Result<bytes::Bytes, ValidationError> {
    serde_json::to_vec(payload)
        .map(bytes::Bytes::from)
        .map_err(|err| ValidationError::Request(err.to_string()))
}

/// Shared validation flow: resolve the upstream from the key's pin, let the
/// provider shape the probe, send it on the buffered client under `ctx`, and
/// classify the outcome. The key itself is never logged.
pub(crate) async fn run_validation<F>(
    core: &ChannelCore,
    ctx: &CallContext,
    key: &ApiKey,
    build_probe: F,
) -> Result<(), ValidationError>
where
    F: FnOnce(&Url) -> Result<UpstreamHttpRequest, ValidationError>,
{
    let target = core
        .resolve_upstream(key.pinned_upstream.as_deref())
        .ok_or_else(|| ChannelError::NoUpstream {
            channel: core.name().to_string(),
        })?;
    let probe = build_probe(&target.url)?;

    let started = Instant::now();
    let outcome = ctx
        .run(async {
            send_buffered(core.http_client(), probe)
                .await
                .map_err(|err| ValidationError::Transport(err.to_string()))
        })
        .await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(resp) if resp.is_success() => {
            info!(
                event = "key_validation",
                group = %core.name(),
                channel_type = %core.channel_type(),
                upstream = %target.id,
                status = resp.status,
                elapsed_ms,
                valid = true
            );
            Ok(())
        }
        Ok(resp) => {
            let message = parse_upstream_error(&resp.body);
            warn!(
                event = "key_validation",
                group = %core.name(),
                channel_type = %core.channel_type(),
                upstream = %target.id,
                status = resp.status,
                elapsed_ms,
                valid = false,
                reason = %message
            );
            Err(ValidationError::Rejected {
                status: resp.status,
                message,
            })
        }
        Err(err) => {
            warn!(
                event = "key_validation",
                group = %core.name(),
                channel_type = %core.channel_type(),
                upstream = %target.id,
                elapsed_ms,
                error = %err
            );
            Err(err)
        }
    }
}
