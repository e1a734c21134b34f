//! Core domain logic for the habit calendar.
//! Owns the record value model, the month rendering cache and heatmap colors.

pub mod cache;
pub mod db;
pub mod logging;
pub mod model;
pub mod render;
pub mod repo;
pub mod service;

pub use cache::record_cache::{
    fetch_month, LoadOutcome, MonthBatch, MonthLoadRequest, RecordCache, MAX_PARALLEL_QUERIES,
};
pub use cache::shared::SharedRecordCache;
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::calendar::{date_key, parse_date_key, CalendarMonth};
pub use model::color::Rgb;
pub use model::record::{RecordId, RecordValidationError, TagRecord};
pub use model::tag::{PredictionCycle, Tag, TagConfig, TagId, TagKind, TagValidationError};
pub use model::value::{decode_value, encode_value, RecordValue};
pub use render::day_cell::{
    render_day, render_month, DayCell, Indicator, MonthGrid, RenderOptions,
    DEFAULT_MAX_INDICATORS,
};
pub use render::intensity::{color_for, enhance_contrast, heat_color, normalize, NO_DATA_COLOR};
pub use repo::record_repo::RecordRepository;
pub use repo::store::{SqliteHabitStore, READ_CONNECTIONS};
pub use repo::tag_repo::TagRepository;
pub use repo::{RepoError, RepoResult};
pub use service::calendar_service::{CalendarService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
