pub type Headers = Vec<(String, String)>;

pub fn header_set(headers: &mut Headers, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    let value = value.into();
    if let Some((_, v)) = headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
        *v = value;
        return;
    }
    headers.push((name, value));
}

pub fn header_get<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub fn header_remove(headers: &mut Headers, name: &str) -> Option<String> {
    let idx = headers.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
    Some(headers.remove(idx).1)
}

/// Non-UTF-8 values are dropped; nothing in this layer inspects binary headers.
pub fn headers_from_http(map: &http::HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

/// Returns the token of an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &Headers) -> Option<&str> {
    let value = header_get(headers, "authorization")?.trim();
    let (scheme, rest) = value.split_at_checked("Bearer ".len())?;
    if !scheme.eq_ignore_ascii_case("Bearer ") {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}
