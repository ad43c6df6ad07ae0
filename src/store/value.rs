//! Firestore typed-value codec for [`ExplanationRecord`].
//!
//! Firestore documents wrap every field in a type tag
//! (`{"stringValue": "..."}`, `{"mapValue": {"fields": {...}}}`, ...).

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::types::{ExplanationRecord, Explanations};
use crate::{Error, Result};

pub(crate) const CREATED_AT: &str = "createdAt";

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

/// Document `fields` for a record. `createdAt` is left to the server-side transform.
pub(crate) fn encode_fields(record: &ExplanationRecord) -> Value {
    let explanations: Map<String, Value> = record
        .explanations
        .iter()
        .map(|(id, text)| (id.clone(), string_value(text)))
        .collect();

    json!({
        "examId": string_value(&record.exam_id),
        "examTitle": string_value(&record.exam_title),
        "explanations": { "mapValue": { "fields": explanations } },
    })
}

fn decode_error(message: impl Into<String>) -> Error {
    Error::provider("firestore", None, message)
}

fn field_str<'a>(fields: &'a Value, name: &str) -> Option<&'a str> {
    fields.get(name)?.get("stringValue")?.as_str()
}

/// Decode a Firestore document (`{name, fields, createTime, ...}`).
pub(crate) fn decode_document(doc: &Value) -> Result<ExplanationRecord> {
    let fields = doc
        .get("fields")
        .ok_or_else(|| decode_error("document has no fields"))?;

    let exam_id = field_str(fields, "examId")
        .ok_or_else(|| decode_error("document is missing examId"))?
        .to_string();
    let exam_title = field_str(fields, "examTitle").unwrap_or_default().to_string();

    let mut explanations = Explanations::new();
    // An empty map comes back as `{"mapValue": {}}` without `fields`.
    if let Some(map) = fields
        .pointer("/explanations/mapValue/fields")
        .and_then(|v| v.as_object())
    {
        for (id, value) in map {
            let text = value
                .get("stringValue")
                .and_then(|v| v.as_str())
                .ok_or_else(|| decode_error(format!("explanation '{}' is not a string", id)))?;
            explanations.insert(id.clone(), text.to_string());
        }
    }

    let created_at = fields
        .get(CREATED_AT)
        .and_then(|v| v.get("timestampValue"))
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(ExplanationRecord {
        exam_id,
        exam_title,
        explanations,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_then_decode_document() {
        let mut explanations = Explanations::new();
        explanations.insert("q1".into(), "Paris is the capital.".into());
        let record = ExplanationRecord::new("exam-9", "Geography", explanations);

        let mut fields = encode_fields(&record);
        assert!(fields.get(CREATED_AT).is_none());
        fields[CREATED_AT] = json!({"timestampValue": "2026-03-01T10:00:00.123456Z"});

        let decoded = decode_document(&json!({ "name": "x", "fields": fields })).unwrap();
        assert_eq!(decoded.exam_id, "exam-9");
        assert_eq!(decoded.explanations, record.explanations);
        assert_eq!(
            decoded.created_at.unwrap().to_rfc3339(),
            "2026-03-01T10:00:00.123456+00:00"
        );
    }

    #[test]
    fn test_decode_empty_map() {
        let doc = json!({"fields": {
            "examId": {"stringValue": "e"},
            "explanations": {"mapValue": {}}
        }});
        let decoded = decode_document(&doc).unwrap();
        assert!(decoded.explanations.is_empty());
        assert_eq!(decoded.exam_title, "");
    }

    #[test]
    fn test_decode_rejects_non_string_explanation() {
        let doc = json!({"fields": {
            "examId": {"stringValue": "e"},
            "explanations": {"mapValue": {"fields": {"q1": {"integerValue": "3"}}}}
        }});
        assert!(decode_document(&doc).is_err());
    }
}
