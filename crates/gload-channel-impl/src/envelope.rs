use serde_json::Value;

const MAX_RAW_ERROR_LEN: usize = 2048;

/// Pulls a human-readable reason out of an upstream error body.
///
/// Understands the common provider envelopes; anything else is returned as
/// trimmed text, capped at 2 KiB.
pub fn parse_upstream_error(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        // Streaming endpoints wrap the envelope in an array.
        let value = match &value {
            Value::Array(items) => items.first().unwrap_or(&value),
            _ => &value,
        };
        if let Some(message) = envelope_message(value) {
            return message;
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "empty upstream response".to_string();
    }
    truncate(text, MAX_RAW_ERROR_LEN).to_string()
}

fn envelope_message(value: &Value) -> Option<String> {
    let candidates = [
        value.pointer("/error/message"),
        value.get("error_msg"),
        value.get("error"),
        value.get("message"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
