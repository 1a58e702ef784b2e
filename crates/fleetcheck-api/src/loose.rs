//! Loosely-typed optional input

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Spellings that mean "not provided", compared case-insensitively
pub const ABSENT_SENTINELS: &[&str] = &["", "none", "null", "true", "false"];

/// An optional string argument as clients actually send it
///
/// Generic tool-calling clients pass `null`, booleans, `{}` or `[]` where a
/// string was expected. Every shape is accepted and [`LooseValue::normalize`]
/// decides which ones carry a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<Value>),
    Map(Map<String, Value>),
}

impl LooseValue {
    /// The trimmed string, or `None` when the value means absent
    ///
    /// Only text carries a value; null, booleans, numbers, lists and maps are
    /// all treated as absent, as is any text in [`ABSENT_SENTINELS`].
    #[must_use]
    pub fn normalize(&self) -> Option<String> {
        let LooseValue::Text(text) = self else {
            return None;
        };
        let text = text.trim();
        let lowered = text.to_ascii_lowercase();
        if ABSENT_SENTINELS.contains(&lowered.as_str()) {
            None
        } else {
            Some(text.to_string())
        }
    }
}

impl From<&str> for LooseValue {
    fn from(value: &str) -> Self {
        LooseValue::Text(value.to_string())
    }
}

impl From<Option<String>> for LooseValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(LooseValue::Null, LooseValue::Text)
    }
}
