//! Sensitive-field redaction for structured log payloads.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

/// Replacement written in place of any sensitive value.
pub const REDACTED: &str = "***REDACTED***";

/// Key fragments that mark a field as sensitive (case-insensitive substring match).
pub const SENSITIVE_TERMS: &[&str] = &[
    "password",
    "secret",
    "token",
    "key",
    "credential",
    "auth",
    "private_key",
    "authorization",
];

pub fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_TERMS.iter().any(|term| lowered.contains(term))
}

/// Return a copy of `value` with every sensitive field replaced by [`REDACTED`].
///
/// Walks objects and arrays recursively; a sensitive key hides its whole
/// subtree, whatever its type.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                let redacted = if is_sensitive_key(k) {
                    Value::String(REDACTED.to_string())
                } else {
                    redact(v)
                };
                out.insert(k.clone(), redacted);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

// `name=value` pairs (query strings, form bodies) whose name looks sensitive.
static SENSITIVE_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b([A-Za-z0-9_.-]*(?:password|secret|token|key|credential|auth)[A-Za-z0-9_.-]*)=([^&\s)"',]+)"#)
        .unwrap()
});

/// Redact free text: a JSON object or array goes through [`redact`], and
/// sensitive `name=value` pairs elsewhere have their value masked.
pub fn redact_text(text: &str) -> Cow<'_, str> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            return Cow::Owned(redact(&value).to_string());
        }
    }
    SENSITIVE_PAIR.replace_all(text, format!("${{1}}={}", REDACTED))
}

/// Display adapter so payloads can be attached to `tracing` events:
/// `tracing::info!(payload = %Redacted(&body), "...")`.
pub struct Redacted<'a>(pub &'a Value);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact(self.0))
    }
}
