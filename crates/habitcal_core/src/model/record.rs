//! Tag record domain model.
//!
//! # Responsibility
//! - Define one dated observation for a tag.
//! - Check value/kind agreement before records are written.
//!
//! # Invariants
//! - `value` variant matches the owning tag's kind on every write path.
//! - Read paths tolerate out-of-range numbers already in storage.
//! - At most one non-prediction record per `(tag_id, date)` is maintained by
//!   callers (find-then-upsert), not by a storage constraint.

use crate::model::calendar::date_key;
use crate::model::tag::{Tag, TagConfig, TagId, TagKind};
use crate::model::value::RecordValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a record.
pub type RecordId = Uuid;

/// One dated observation for a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: RecordId,
    pub tag_id: TagId,
    /// Calendar day, no time component.
    pub date: NaiveDate,
    pub value: RecordValue,
    /// Projected rather than observed.
    pub is_prediction: bool,
    /// Prediction confidence in `[0, 1]`.
    pub confidence: Option<f64>,
}

/// Record errors detected before persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValidationError {
    TagMismatch {
        expected: TagId,
        actual: TagId,
    },
    KindMismatch {
        expected: TagKind,
        actual: Option<TagKind>,
    },
    NonFiniteNumber,
    OutOfRange {
        value: f64,
        min: f64,
        max: f64,
    },
    UnknownSubTag(String),
    InvalidConfidence(f64),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TagMismatch { expected, actual } => {
                write!(f, "record belongs to tag {actual}, expected {expected}")
            }
            Self::KindMismatch { expected, actual } => match actual {
                Some(actual) => write!(
                    f,
                    "{} value does not fit {} tag",
                    actual.as_str(),
                    expected.as_str()
                ),
                None => write!(f, "untyped value does not fit {} tag", expected.as_str()),
            },
            Self::NonFiniteNumber => write!(f, "quantitative value must be finite"),
            Self::OutOfRange { value, min, max } => {
                write!(f, "value {value} is outside [{min}, {max}]")
            }
            Self::UnknownSubTag(name) => write!(f, "unknown sub-tag `{name}`"),
            Self::InvalidConfidence(value) => {
                write!(f, "confidence {value} is outside [0, 1]")
            }
        }
    }
}

impl Error for RecordValidationError {}

impl TagRecord {
    /// Creates an observed (non-prediction) record with a generated ID.
    pub fn new(tag_id: TagId, date: NaiveDate, value: RecordValue) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag_id,
            date,
            value,
            is_prediction: false,
            confidence: None,
        }
    }

    /// Creates a prediction record with the given confidence.
    pub fn prediction(tag_id: TagId, date: NaiveDate, value: RecordValue, confidence: f64) -> Self {
        Self {
            is_prediction: true,
            confidence: Some(confidence),
            ..Self::new(tag_id, date, value)
        }
    }

    /// Canonical cache key of this record's day.
    pub fn date_key(&self) -> String {
        date_key(self.date)
    }

    /// Checks this record against its owning tag before a write.
    pub fn validate_for(&self, tag: &Tag) -> Result<(), RecordValidationError> {
        if self.tag_id != tag.id {
            return Err(RecordValidationError::TagMismatch {
                expected: tag.id,
                actual: self.tag_id,
            });
        }

        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(RecordValidationError::InvalidConfidence(confidence));
            }
        }

        match (&tag.config, &self.value) {
            (TagConfig::Quantitative { min, max, .. }, RecordValue::Number(value)) => {
                if !value.is_finite() {
                    return Err(RecordValidationError::NonFiniteNumber);
                }
                if value < min || value > max {
                    return Err(RecordValidationError::OutOfRange {
                        value: *value,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
            (TagConfig::Binary { .. }, RecordValue::Boolean(_)) => Ok(()),
            (TagConfig::Complex { vocabulary }, RecordValue::StringList(items)) => {
                match items.iter().find(|item| !vocabulary.contains(item)) {
                    Some(unknown) => Err(RecordValidationError::UnknownSubTag(unknown.clone())),
                    None => Ok(()),
                }
            }
            (config, value) => Err(RecordValidationError::KindMismatch {
                expected: config.kind(),
                actual: value.kind(),
            }),
        }
    }
}
