//! Exam explanation request and persisted record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Question id → explanation text.
pub type Explanations = BTreeMap<String, String>;

/// Title stored when the caller did not send one.
pub const UNTITLED_EXAM: &str = "Untitled Exam";

/// Body of `POST /api/explain-exam`. Fields are optional at the type level
/// so that missing ones become a validation error, not a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRequest {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub exam_id: Option<String>,
    #[serde(default)]
    pub exam_title: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
}

impl ExplanationRequest {
    pub fn title_or_placeholder(&self) -> &str {
        self.exam_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED_EXAM)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_index: Option<usize>,
}

impl Question {
    /// Text of the correct option, if `correct_index` points inside `options`.
    pub fn correct_option(&self) -> Option<&str> {
        self.correct_index
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }
}

/// Cached explanations for one exam, keyed by `exam_id`.
///
/// Written once on a cache miss and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRecord {
    pub exam_id: String,
    pub exam_title: String,
    pub explanations: Explanations,
    /// Assigned by the store on write; `None` on records not yet persisted.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ExplanationRecord {
    pub fn new(exam_id: impl Into<String>, exam_title: impl Into<String>, explanations: Explanations) -> Self {
        Self {
            exam_id: exam_id.into(),
            exam_title: exam_title.into(),
            explanations,
            created_at: None,
        }
    }
}

fn value_to_id(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_id(value).ok_or_else(|| serde::de::Error::custom("expected a string or number id"))
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => value_to_id(v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a string or number id")),
    }
}
