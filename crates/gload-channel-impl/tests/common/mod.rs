#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use gload_channel_core::{ChannelFactory, ChannelProxy, EffectiveConfig, Group};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Loopback HTTP/1.1 server answering every request with one canned reply.
pub struct MockUpstream {
    pub base_url: String,
    requests: mpsc::UnboundedReceiver<String>,
}

impl MockUpstream {
    pub async fn start(status: u16, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, requests) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let raw = read_request(&mut stream).await.unwrap_or_default();
                    let _ = tx.send(raw);
                    let response = format!(
                        "HTTP/1.1 {status} MOCK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    /// Raw text (head and body) of the next request the server saw.
    pub async fn next_request(&mut self) -> String {
        self.requests.recv().await.unwrap()
    }
}

/// Accepts connections and never answers them.
pub async fn hanging_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("http://{addr}")
}

/// An address nothing listens on.
pub async fn closed_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let content_length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    Ok(String::from_utf8_lossy(&buf).to_string())
}

pub fn group(channel_type: &str, upstreams: &str) -> Group {
    Group {
        id: 42,
        name: "team".to_string(),
        channel_type: channel_type.to_string(),
        test_model: "test-model".to_string(),
        upstreams: Bytes::from(upstreams.to_string()),
        effective_config: EffectiveConfig::default(),
    }
}

pub fn single_upstream(url: &str) -> String {
    format!(r#"[{{"id":"main","url":"{url}","weight":1}}]"#)
}

pub fn channel(channel_type: &str, upstreams: &str) -> Arc<dyn ChannelProxy> {
    let registry = gload_channel_impl::build_registry().unwrap();
    ChannelFactory::new(Arc::new(registry))
        .get_channel(&group(channel_type, upstreams))
        .unwrap()
}
