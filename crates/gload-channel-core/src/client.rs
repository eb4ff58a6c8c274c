use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use gload_common::EffectiveConfig;
use wreq::{Client, Method, Proxy};

use crate::request::{HttpMethod, UpstreamHttpRequest};
use crate::{ChannelError, ChannelResult};

const STREAM_MIN_IDLE_PER_HOST: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    /// Whole-request deadline. `None` for streaming, where a response may
    /// legitimately stay open for as long as the model keeps generating.
    pub request_timeout: Option<Duration>,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub proxy: Option<String>,
}

impl ClientConfig {
    /// Client for responses that are read in full before forwarding.
    pub fn buffered(config: &EffectiveConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            request_timeout: Some(config.request_timeout_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            pool_idle_timeout: Duration::from_secs(config.idle_conn_timeout_secs),
            pool_max_idle_per_host: config.max_idle_conns_per_host,
            proxy: normalize_proxy(config.proxy_url.clone()),
        }
    }

    /// Client for unbuffered responses: no request deadline, larger idle pool.
    pub fn streaming(config: &EffectiveConfig) -> Self {
        Self {
            request_timeout: None,
            pool_max_idle_per_host: config
                .max_idle_conns_per_host
                .saturating_mul(2)
                .max(STREAM_MIN_IDLE_PER_HOST),
            ..Self::buffered(config)
        }
    }
}

fn normalize_proxy(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

/// Shares built clients between channels whose settings match, so their
/// connection pools are shared too.
#[derive(Default)]
pub struct ClientManager {
    clients: Mutex<HashMap<ClientConfig, Client>>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_client(&self, config: &ClientConfig) -> ChannelResult<Client> {
        let mut guard = self
            .clients
            .lock()
            .map_err(|_| ChannelError::Client("http client cache lock failed".to_string()))?;

        if let Some(client) = guard.get(config) {
            return Ok(client.clone());
        }

        let client = build_client(config).map_err(|err| ChannelError::Client(err.to_string()))?;
        guard.insert(config.clone(), client.clone());
        Ok(client)
    }

    pub fn cached(&self) -> usize {
        self.clients.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

fn build_client(config: &ClientConfig) -> Result<Client, wreq::Error> {
    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host);

    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(proxy) = config.proxy.as_deref() {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Upstream response read in full.
#[derive(Debug)]
pub struct UpstreamHttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl UpstreamHttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends `req` and reads the whole body. Errors are transport-level only;
/// any HTTP status, success or not, comes back as a response. Response
/// headers are not kept.
pub async fn send_buffered(
    client: &Client,
    req: UpstreamHttpRequest,
) -> Result<UpstreamHttpResponse, wreq::Error> {
    let mut builder = client.request(http_method_to_wreq(req.method), req.url.as_str());
    for (k, v) in &req.headers {
        builder = builder.header(k, v);
    }
    if let Some(body) = req.body {
        builder = builder.body(body);
    }

    let resp = builder.send().await?;
    let status = resp.status().as_u16();
    let body = resp.bytes().await?;
    Ok(UpstreamHttpResponse { status, body })
}

fn http_method_to_wreq(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_drops_deadline_and_widens_pool() {
        let settings = EffectiveConfig {
            request_timeout_secs: 30,
            max_idle_conns_per_host: 40,
            proxy_url: Some(" ".to_string()),
            ..EffectiveConfig::default()
        };
        let buffered = ClientConfig::buffered(&settings);
        let streaming = ClientConfig::streaming(&settings);

        assert_eq!(buffered.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(buffered.proxy, None);
        assert_eq!(streaming.request_timeout, None);
        assert_eq!(streaming.pool_max_idle_per_host, 80);
        assert_eq!(streaming.connect_timeout, buffered.connect_timeout);
    }

    #[test]
    fn manager_reuses_clients_for_equal_configs() {
        let manager = ClientManager::new();
        let settings = EffectiveConfig::default();
        manager.get_client(&ClientConfig::buffered(&settings)).unwrap();
        manager.get_client(&ClientConfig::buffered(&settings)).unwrap();
        manager.get_client(&ClientConfig::streaming(&settings)).unwrap();
        assert_eq!(manager.cached(), 2);
    }
}
