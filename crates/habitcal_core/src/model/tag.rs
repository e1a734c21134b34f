//! Tag domain model.
//!
//! # Responsibility
//! - Define trackable categories and their kind-specific configuration.
//!
//! # Invariants
//! - A tag's kind is derived from its configuration, so the two cannot drift.
//! - Tags are immutable once read by calendar rendering.
//! - Quantitative ranges are expected to satisfy `min < max`; rendering
//!   still tolerates degenerate ranges.

use crate::model::color::Rgb;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a tag.
pub type TagId = Uuid;

/// Shape of values a tag accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    /// Numeric measurement within a declared range.
    Quantitative,
    /// Done / not done.
    Binary,
    /// Selection from a vocabulary of sub-tags.
    Complex,
}

impl TagKind {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quantitative => "quantitative",
            Self::Binary => "binary",
            Self::Complex => "complex",
        }
    }

    /// Parses a stable storage name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "quantitative" => Some(Self::Quantitative),
            "binary" => Some(Self::Binary),
            "complex" => Some(Self::Complex),
            _ => None,
        }
    }
}

/// Kind-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TagConfig {
    Quantitative {
        min: f64,
        max: f64,
        unit: Option<String>,
    },
    Binary {
        icon: Option<String>,
    },
    Complex {
        vocabulary: Vec<String>,
    },
}

impl TagConfig {
    pub fn kind(&self) -> TagKind {
        match self {
            Self::Quantitative { .. } => TagKind::Quantitative,
            Self::Binary { .. } => TagKind::Binary,
            Self::Complex { .. } => TagKind::Complex,
        }
    }
}

/// Optional cycle settings used to project prediction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionCycle {
    /// Expected number of days between two occurrences.
    pub period_days: u32,
}

/// User-defined trackable category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub config: TagConfig,
    pub color: Rgb,
    pub prediction: Option<PredictionCycle>,
}

/// Tag configuration errors detected before persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValidationError {
    EmptyName,
    InvalidRange { min: f64, max: f64 },
    EmptyVocabulary,
    InvalidPredictionPeriod,
}

impl Display for TagValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "tag name cannot be empty"),
            Self::InvalidRange { min, max } => {
                write!(f, "quantitative range must satisfy min < max, got [{min}, {max}]")
            }
            Self::EmptyVocabulary => write!(f, "complex tag vocabulary cannot be empty"),
            Self::InvalidPredictionPeriod => {
                write!(f, "prediction period must be at least one day")
            }
        }
    }
}

impl Error for TagValidationError {}

impl Tag {
    /// Creates a tag with a generated stable ID and no prediction cycle.
    pub fn new(name: impl Into<String>, config: TagConfig, color: Rgb) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            config,
            color,
            prediction: None,
        }
    }

    pub fn kind(&self) -> TagKind {
        self.config.kind()
    }

    /// Declared `(min, max)` for quantitative tags.
    pub fn range(&self) -> Option<(f64, f64)> {
        match self.config {
            TagConfig::Quantitative { min, max, .. } => Some((min, max)),
            TagConfig::Binary { .. } | TagConfig::Complex { .. } => None,
        }
    }

    /// Checks configuration before the tag is written.
    pub fn validate(&self) -> Result<(), TagValidationError> {
        if self.name.trim().is_empty() {
            return Err(TagValidationError::EmptyName);
        }

        match &self.config {
            TagConfig::Quantitative { min, max, .. } => {
                if !min.is_finite() || !max.is_finite() || min >= max {
                    return Err(TagValidationError::InvalidRange {
                        min: *min,
                        max: *max,
                    });
                }
            }
            TagConfig::Binary { .. } => {}
            TagConfig::Complex { vocabulary } => {
                if vocabulary.iter().all(|item| item.trim().is_empty()) {
                    return Err(TagValidationError::EmptyVocabulary);
                }
            }
        }

        if matches!(self.prediction, Some(cycle) if cycle.period_days == 0) {
            return Err(TagValidationError::InvalidPredictionPeriod);
        }

        Ok(())
    }
}
