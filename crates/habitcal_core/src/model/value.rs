//! Record value model and its text codec.
//!
//! # Responsibility
//! - Define the typed value carried by every `TagRecord`.
//! - Encode values into the persisted text column and decode them back.
//!
//! # Invariants
//! - Decoding never fails; text matching no typed pattern becomes `Raw`.
//! - `decode(encode(v)) == v` for `Number` and `Boolean`.
//! - `StringList` round-trips only when no element contains `,` or `"`.
//!   List items are not escaped; the stored text format is kept as-is.

use crate::model::tag::TagKind;
use serde::{Deserialize, Serialize};

/// Typed value of one dated observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RecordValue {
    /// Quantitative measurement.
    Number(f64),
    /// Done / not done.
    Boolean(bool),
    /// Selected sub-tags of a complex tag.
    StringList(Vec<String>),
    /// Stored text that matched no typed pattern.
    Raw(String),
}

impl RecordValue {
    /// Returns the tag kind this value belongs to, or `None` for `Raw`.
    pub fn kind(&self) -> Option<TagKind> {
        match self {
            Self::Number(_) => Some(TagKind::Quantitative),
            Self::Boolean(_) => Some(TagKind::Binary),
            Self::StringList(_) => Some(TagKind::Complex),
            Self::Raw(_) => None,
        }
    }

    /// Returns the numeric payload for quantitative values.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Boolean(_) | Self::StringList(_) | Self::Raw(_) => None,
        }
    }

    /// Encodes this value into its persisted text form.
    pub fn encode(&self) -> String {
        encode_value(self)
    }

    /// Decodes persisted text. See [`decode_value`].
    pub fn decode(text: &str) -> Self {
        decode_value(text)
    }
}

/// Encodes a value into the persisted text form.
///
/// - `Number` uses the shortest decimal text that parses back to the same `f64`.
/// - `Boolean` is `true` / `false`.
/// - `StringList` is `["a", "b"]`, or `[]` when empty.
/// - `Raw` is written back unchanged.
pub fn encode_value(value: &RecordValue) -> String {
    match value {
        RecordValue::Number(number) => number.to_string(),
        RecordValue::Boolean(flag) => flag.to_string(),
        RecordValue::StringList(items) => {
            let quoted = items
                .iter()
                .map(|item| format!("\"{item}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!("[{quoted}]")
        }
        RecordValue::Raw(text) => text.clone(),
    }
}

/// Decodes persisted text into a value.
///
/// Tried in order: number, case-insensitive boolean, bracket list, raw text.
pub fn decode_value(text: &str) -> RecordValue {
    let trimmed = text.trim();

    if let Ok(number) = trimmed.parse::<f64>() {
        return RecordValue::Number(number);
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return RecordValue::Boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return RecordValue::Boolean(false);
    }

    if let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return RecordValue::StringList(decode_list_items(inner));
    }

    RecordValue::Raw(text.to_string())
}

fn decode_list_items(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    inner
        .split(',')
        .map(|piece| strip_quotes(piece.trim()).to_string())
        .collect()
}

fn strip_quotes(piece: &str) -> &str {
    let piece = piece.strip_prefix('"').unwrap_or(piece);
    piece.strip_suffix('"').unwrap_or(piece)
}
