//! Day-cell view model built from the month cache.
//!
//! # Responsibility
//! - Lay out the 42-cell month grid.
//! - Resolve one cell in focus mode (heatmap) or overview mode (indicators).
//!
//! # Invariants
//! - Cells never query storage; everything comes from `RecordCache`.
//! - Overview order: quantitative numeric records by value descending, then
//!   all other records by tag name ascending; ties fall back to tag id.
//! - At most `RenderOptions::max_indicators` indicators; the rest is counted
//!   in `overflow`.

use crate::cache::record_cache::RecordCache;
use crate::model::calendar::CalendarMonth;
use crate::model::color::Rgb;
use crate::model::record::TagRecord;
use crate::model::tag::{Tag, TagConfig, TagId};
use crate::model::value::RecordValue;
use crate::render::intensity::{heat_color, NO_DATA_COLOR};
use chrono::{Datelike, NaiveDate, Weekday};
use std::cmp::Ordering;

pub const DEFAULT_MAX_INDICATORS: usize = 6;

/// Rendering knobs supplied by the calendar view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Overview indicators shown before collapsing into `overflow`.
    pub max_indicators: usize,
    /// First column of the grid.
    pub week_start: Weekday,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_indicators: DEFAULT_MAX_INDICATORS,
            week_start: Weekday::Mon,
        }
    }
}

/// Six full weeks covering one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    month: CalendarMonth,
    days: Vec<NaiveDate>,
}

impl MonthGrid {
    pub const CELLS: usize = 42;

    /// Starts at the last `week_start` on or before the first of the month.
    pub fn new(month: CalendarMonth, week_start: Weekday) -> Self {
        let first = month.first_day();
        let lead = (first.weekday().num_days_from_monday() + 7
            - week_start.num_days_from_monday())
            % 7;
        let days = first
            .checked_sub_days(chrono::Days::new(u64::from(lead)))
            .unwrap_or(first)
            .iter_days()
            .take(Self::CELLS)
            .collect();
        Self { month, days }
    }

    pub fn month(&self) -> CalendarMonth {
        self.month
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    /// Whether `date` belongs to the displayed month (vs. padding days).
    pub fn is_current_month(&self, date: NaiveDate) -> bool {
        self.month.contains(date)
    }
}

/// One tag marker in overview mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    pub tag_id: TagId,
    pub color: Rgb,
    pub value: RecordValue,
    pub is_prediction: bool,
}

/// Resolved content of one calendar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum DayCell {
    /// No record for the focused tag, or no records at all in overview.
    Empty,
    /// Focused quantitative tag with a numeric value.
    Heat { intensity: f64, color: Rgb },
    /// Focused non-quantitative tag with a record.
    Marked { color: Rgb },
    Overview {
        indicators: Vec<Indicator>,
        overflow: usize,
    },
}

impl DayCell {
    /// Background fill; overview cells keep the default background.
    pub fn fill(&self) -> Option<Rgb> {
        match self {
            Self::Empty => Some(NO_DATA_COLOR),
            Self::Heat { color, .. } | Self::Marked { color } => Some(*color),
            Self::Overview { .. } => None,
        }
    }
}

/// Resolves one cell. `focus` selects focus mode for that tag.
pub fn render_day(
    cache: &RecordCache,
    tags: &[Tag],
    date: NaiveDate,
    focus: Option<TagId>,
    options: &RenderOptions,
) -> DayCell {
    match focus {
        Some(tag_id) => match tags.iter().find(|tag| tag.id == tag_id) {
            Some(tag) => render_focused(cache, tag, date),
            None => DayCell::Empty,
        },
        None => render_overview(cache, tags, date, options),
    }
}

/// Resolves every cell of `grid` in display order.
pub fn render_month(
    cache: &RecordCache,
    tags: &[Tag],
    grid: &MonthGrid,
    focus: Option<TagId>,
    options: &RenderOptions,
) -> Vec<(NaiveDate, DayCell)> {
    grid.days()
        .iter()
        .map(|date| (*date, render_day(cache, tags, *date, focus, options)))
        .collect()
}

fn render_focused(cache: &RecordCache, tag: &Tag, date: NaiveDate) -> DayCell {
    let Some(record) = cache.get(tag.id, date) else {
        return DayCell::Empty;
    };

    match (&tag.config, &record.value) {
        (TagConfig::Quantitative { min, max, .. }, RecordValue::Number(value)) => {
            let (intensity, color) = heat_color(*value, *min, *max);
            DayCell::Heat { intensity, color }
        }
        _ => DayCell::Marked { color: tag.color },
    }
}

fn render_overview(
    cache: &RecordCache,
    tags: &[Tag],
    date: NaiveDate,
    options: &RenderOptions,
) -> DayCell {
    let mut present = tags
        .iter()
        .filter_map(|tag| cache.get(tag.id, date).map(|record| (tag, record)))
        .collect::<Vec<_>>();

    if present.is_empty() {
        return DayCell::Empty;
    }

    present.sort_by(|left, right| overview_order(*left, *right));
    let overflow = present.len().saturating_sub(options.max_indicators);
    let indicators = present
        .into_iter()
        .take(options.max_indicators)
        .map(|(tag, record)| Indicator {
            tag_id: tag.id,
            color: tag.color,
            value: record.value.clone(),
            is_prediction: record.is_prediction,
        })
        .collect();

    DayCell::Overview {
        indicators,
        overflow,
    }
}

fn overview_order(left: (&Tag, &TagRecord), right: (&Tag, &TagRecord)) -> Ordering {
    let by_name = |a: &Tag, b: &Tag| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id));

    match (quantity(left), quantity(right)) {
        (Some(a), Some(b)) => b.total_cmp(&a).then_with(|| by_name(left.0, right.0)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => by_name(left.0, right.0),
    }
}

fn quantity((tag, record): (&Tag, &TagRecord)) -> Option<f64> {
    match tag.config {
        TagConfig::Quantitative { .. } => record.value.as_number(),
        TagConfig::Binary { .. } | TagConfig::Complex { .. } => None,
    }
}
