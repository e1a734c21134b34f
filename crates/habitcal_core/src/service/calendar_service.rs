//! Calendar use-case service.
//!
//! # Responsibility
//! - Compose the storage port, the tag list and the month cache.
//! - Apply record writes with find-then-upsert semantics.
//! - Serve day cells for the displayed month.
//!
//! # Invariants
//! - Every successful tag/record mutation invalidates the cache.
//! - Record writes are validated against the owning tag before persistence.
//! - At most one observed record per `(tag, day)` is kept by upsert; two
//!   writers racing on different connections can still create duplicates.

use crate::cache::record_cache::{LoadOutcome, RecordCache};
use crate::model::calendar::CalendarMonth;
use crate::model::record::{RecordId, RecordValidationError, TagRecord};
use crate::model::tag::{Tag, TagId};
use crate::model::value::RecordValue;
use crate::render::day_cell::{render_day, render_month, DayCell, MonthGrid, RenderOptions};
use crate::repo::record_repo::RecordRepository;
use crate::repo::tag_repo::TagRepository;
use crate::repo::RepoError;
use chrono::NaiveDate;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for calendar use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Record does not fit its tag.
    InvalidRecord(RecordValidationError),
    /// Referenced tag is not known to this service.
    TagNotFound(TagId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRecord(err) => write!(f, "invalid record: {err}"),
            Self::TagNotFound(id) => write!(f, "tag not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRecord(err) => Some(err),
            Self::TagNotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RecordValidationError> for ServiceError {
    fn from(value: RecordValidationError) -> Self {
        Self::InvalidRecord(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Calendar view backend owning one store and one month cache.
pub struct CalendarService<S> {
    store: S,
    tags: Vec<Tag>,
    cache: RecordCache,
    options: RenderOptions,
}

impl<S> CalendarService<S>
where
    S: TagRepository + RecordRepository + Sync,
{
    /// Creates a service with default render options and loads all tags.
    pub fn new(store: S) -> ServiceResult<Self> {
        Self::with_options(store, RenderOptions::default())
    }

    pub fn with_options(store: S, options: RenderOptions) -> ServiceResult<Self> {
        let tags = store.list_tags()?;
        Ok(Self {
            store,
            tags,
            cache: RecordCache::new(),
            options,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tags ordered by name.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.id == id)
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn create_tag(&mut self, tag: Tag) -> ServiceResult<TagId> {
        let id = self.store.create_tag(&tag)?;
        self.refresh_tags()?;
        Ok(id)
    }

    /// Deletes a tag and, through storage cascade, its records.
    pub fn delete_tag(&mut self, id: TagId) -> ServiceResult<()> {
        self.store.delete_tag(id)?;
        self.refresh_tags()
    }

    /// Sets the observed value of `tag_id` on `date`.
    ///
    /// Updates the existing observed record for that day if there is one,
    /// otherwise inserts a new record.
    pub fn record_value(
        &mut self,
        tag_id: TagId,
        date: NaiveDate,
        value: RecordValue,
    ) -> ServiceResult<TagRecord> {
        let tag = self.tag(tag_id).ok_or(ServiceError::TagNotFound(tag_id))?;

        let (record, action) = match self.store.find_record_by_tag_and_date(tag_id, date)? {
            Some(mut existing) => {
                existing.value = value;
                existing.validate_for(tag)?;
                self.store.update_record(&existing)?;
                (existing, "update")
            }
            None => {
                let created = TagRecord::new(tag_id, date, value);
                created.validate_for(tag)?;
                self.store.insert_record(&created)?;
                (created, "insert")
            }
        };

        let kind = tag.kind();
        self.cache.invalidate();
        info!(
            "event=record_upsert module=service status=ok action={} kind={}",
            action,
            kind.as_str()
        );
        Ok(record)
    }

    /// Adds a projected record; predictions never replace observations.
    pub fn record_prediction(
        &mut self,
        tag_id: TagId,
        date: NaiveDate,
        value: RecordValue,
        confidence: f64,
    ) -> ServiceResult<TagRecord> {
        let tag = self.tag(tag_id).ok_or(ServiceError::TagNotFound(tag_id))?;
        let record = TagRecord::prediction(tag_id, date, value, confidence);
        record.validate_for(tag)?;
        self.store.insert_record(&record)?;

        self.cache.invalidate();
        Ok(record)
    }

    pub fn delete_record(&mut self, id: RecordId) -> ServiceResult<()> {
        self.store.delete_record(id)?;
        self.cache.invalidate();
        info!("event=record_delete module=service status=ok");
        Ok(())
    }

    /// Makes `month` the displayed month, loading it when the cache is stale.
    pub fn show_month(&mut self, month: CalendarMonth) -> LoadOutcome {
        if !self.cache.should_reload(month) {
            return LoadOutcome::Committed;
        }
        self.cache.load_month(&self.store, &self.tags, month)
    }

    /// One cell of the displayed month; `None` focus renders the overview.
    pub fn day_cell(&self, date: NaiveDate, focus: Option<TagId>) -> DayCell {
        render_day(&self.cache, &self.tags, date, focus, &self.options)
    }

    /// Loads `month` if needed and renders its full grid.
    pub fn render_month(
        &mut self,
        month: CalendarMonth,
        focus: Option<TagId>,
    ) -> Vec<(NaiveDate, DayCell)> {
        self.show_month(month);
        let grid = MonthGrid::new(month, self.options.week_start);
        render_month(&self.cache, &self.tags, &grid, focus, &self.options)
    }

    fn refresh_tags(&mut self) -> ServiceResult<()> {
        self.tags = self.store.list_tags()?;
        self.cache.invalidate();
        Ok(())
    }
}
