//! Calendar rendering model.
//!
//! # Responsibility
//! - Map quantitative values to heatmap colors (`intensity`).
//! - Build per-day cell content from the month cache (`day_cell`).

pub mod day_cell;
pub mod intensity;
