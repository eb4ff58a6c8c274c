use bytes::Bytes;
use url::form_urlencoded;

use crate::headers::{Headers, header_get, header_remove, header_set, headers_from_http};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Outgoing request as shaped by a channel before the caller sends it.
///
/// The url is kept as text so a forwarded query reaches the upstream byte
/// for byte.
#[derive(Debug, Clone)]
pub struct UpstreamHttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl UpstreamHttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        let (_, query) = split_query(&self.url);
        form_urlencoded::parse(query?.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Sets `name` to exactly one value, appended last. Every other pair is
    /// kept verbatim and in order.
    pub fn set_query_param(&mut self, name: &str, value: &str) {
        let (base, query) = split_query(&self.url);
        let mut pairs: Vec<&str> = query
            .map(|query| {
                query
                    .split('&')
                    .filter(|pair| !pair.is_empty() && !pair_is_named(pair, name))
                    .collect()
            })
            .unwrap_or_default();
        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair(name, value)
            .finish();
        pairs.push(&encoded);
        let url = format!("{base}?{}", pairs.join("&"));
        self.url = url;
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        header_set(&mut self.headers, name, value);
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        header_remove(&mut self.headers, name)
    }
}

/// The parts of a downstream request a channel may inspect before forwarding.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub path: String,
    pub query: Option<String>,
    pub headers: Headers,
}

impl InboundRequest {
    pub fn new(path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (path_and_query, None),
        };
        Self {
            path: path.to_string(),
            query: query.filter(|q| !q.is_empty()),
            headers: Headers::new(),
        }
    }

    pub fn from_parts(parts: &http::request::Parts) -> Self {
        Self {
            path: parts.uri.path().to_string(),
            query: parts.uri.query().filter(|q| !q.is_empty()).map(str::to_string),
            headers: headers_from_http(&parts.headers),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        header_set(&mut self.headers, name, value);
        self
    }

    /// Trimmed header value; blank counts as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .ok()?
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

fn split_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    }
}

fn pair_is_named(pair: &str, name: &str) -> bool {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .is_some_and(|(k, _)| k == name)
}
