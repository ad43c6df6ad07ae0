//! Decoding model output into an explanation map.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::types::Explanations;
use crate::{Error, Result};

// First ```json ... ``` or bare ``` ... ``` block anywhere in the text.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Strip markdown code-fence markers around a payload. Only a fence that
/// opens the text is removed; anything else is returned trimmed and
/// otherwise unchanged, so backticks inside JSON strings survive.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn embedded_block(text: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn decode_object(payload: &str) -> Result<Map<String, Value>> {
    serde_json::from_str(payload)
        .map_err(|e| Error::MalformedOutput(format!("expected a JSON object: {}", e)))
}

/// Parse model text as a JSON object of question id → explanation string.
///
/// The whole text (minus a leading fence) is tried first; a fenced block
/// buried in prose is the fallback.
pub fn parse_explanations(text: &str) -> Result<Explanations> {
    let payload = strip_code_fences(text);
    let object = match decode_object(payload) {
        Ok(object) => object,
        Err(err) => match embedded_block(text) {
            Some(block) if block != payload => decode_object(block)?,
            _ => return Err(err),
        },
    };

    object
        .into_iter()
        .map(|(id, value)| match value {
            Value::String(text) => Ok((id, text)),
            other => Err(Error::MalformedOutput(format!(
                "explanation for '{}' is not a string (got {})",
                id,
                json_type(&other)
            ))),
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
