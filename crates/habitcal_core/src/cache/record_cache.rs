//! Month-scoped record cache for calendar rendering.
//!
//! # Responsibility
//! - Batch-load one month of records per tag so each grid cell is an O(1)
//!   lookup instead of a storage query.
//! - Keep the committed month consistent under overlapping loads.
//!
//! # Invariants
//! - State moves `{empty | stale} -> loaded(month) -> empty` (on invalidate).
//! - A load commits only if its request is still the most recent one;
//!   superseded results are dropped without touching cached state.
//! - One tag's query failure leaves that tag with an empty map and never
//!   aborts the batch.
//! - Within a day, an observed record takes the slot over a prediction.
//! - Any record insert/update/delete must be followed by `invalidate()`.

use crate::model::calendar::{date_key, CalendarMonth};
use crate::model::record::TagRecord;
use crate::model::tag::{Tag, TagId};
use crate::repo::record_repo::RecordRepository;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::thread;
use std::time::Instant;

type DayRecords = HashMap<String, TagRecord>;

/// Ticket identifying one month load; later tickets supersede earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthLoadRequest {
    month: CalendarMonth,
    sequence: u64,
}

impl MonthLoadRequest {
    pub fn month(&self) -> CalendarMonth {
        self.month
    }
}

/// Fetched but not yet committed month data.
#[derive(Debug)]
pub struct MonthBatch {
    request: MonthLoadRequest,
    records: HashMap<TagId, DayRecords>,
    failed_tags: Vec<TagId>,
}

impl MonthBatch {
    pub fn month(&self) -> CalendarMonth {
        self.request.month
    }

    /// Tags whose range query failed and were loaded as empty.
    pub fn failed_tags(&self) -> &[TagId] {
        &self.failed_tags
    }
}

/// Result of committing a month batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Committed,
    /// A newer request (or an invalidation) happened while this one was in
    /// flight; its data was discarded.
    Superseded,
}

/// Two-level `tag_id -> date_key -> record` cache for the displayed month.
#[derive(Debug, Default)]
pub struct RecordCache {
    records: HashMap<TagId, DayRecords>,
    cached_month: Option<CalendarMonth>,
    latest_request: Option<MonthLoadRequest>,
    next_sequence: u64,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Month whose data is currently committed.
    pub fn cached_month(&self) -> Option<CalendarMonth> {
        self.cached_month
    }

    /// Returns whether `month` must be (re)loaded before rendering.
    ///
    /// True when nothing is cached, a different month is cached, or the
    /// cached tag set is empty.
    pub fn should_reload(&self, month: CalendarMonth) -> bool {
        match self.cached_month {
            None => true,
            Some(cached) => cached != month || self.records.is_empty(),
        }
    }

    /// Loads `month` for every tag and commits it unless superseded.
    ///
    /// Per-tag queries run concurrently and are joined before commit.
    pub fn load_month<S>(&mut self, store: &S, tags: &[Tag], month: CalendarMonth) -> LoadOutcome
    where
        S: RecordRepository + Sync + ?Sized,
    {
        let request = self.begin_load(month);
        let batch = fetch_month(store, tags, request);
        self.commit(batch)
    }

    /// Registers a new most-recent request for `month`.
    ///
    /// Use with [`fetch_month`] and [`RecordCache::commit`] when the fetch
    /// runs away from the cache owner.
    pub fn begin_load(&mut self, month: CalendarMonth) -> MonthLoadRequest {
        self.next_sequence += 1;
        let request = MonthLoadRequest {
            month,
            sequence: self.next_sequence,
        };
        self.latest_request = Some(request);
        request
    }

    /// Replaces cached state with `batch` if it is still the latest request.
    pub fn commit(&mut self, batch: MonthBatch) -> LoadOutcome {
        if self.latest_request != Some(batch.request) {
            debug!(
                "event=cache_commit module=cache status=superseded month={} sequence={}",
                batch.request.month, batch.request.sequence
            );
            return LoadOutcome::Superseded;
        }

        self.records = batch.records;
        self.cached_month = Some(batch.request.month);
        debug!(
            "event=cache_commit module=cache status=ok month={} tags={}",
            batch.request.month,
            self.records.len()
        );
        LoadOutcome::Committed
    }

    /// O(1) lookup; `None` means "no record", not "minimum value".
    pub fn get(&self, tag_id: TagId, date: NaiveDate) -> Option<&TagRecord> {
        self.records.get(&tag_id)?.get(&date_key(date))
    }

    /// Number of records cached for `tag_id`.
    pub fn record_count(&self, tag_id: TagId) -> usize {
        self.records.get(&tag_id).map_or(0, HashMap::len)
    }

    /// Drops all cached data and supersedes any in-flight load.
    pub fn invalidate(&mut self) {
        self.records.clear();
        self.cached_month = None;
        self.latest_request = None;
        debug!("event=cache_invalidate module=cache status=ok");
    }
}

/// Upper bound on range queries in flight during one month load.
pub const MAX_PARALLEL_QUERIES: usize = 8;

/// Runs one range query per tag for `request`'s month, concurrently.
///
/// At most [`MAX_PARALLEL_QUERIES`] threads run at once. Never fails: a tag
/// whose query errors, panics or cannot get a thread is logged and loaded
/// as empty.
pub fn fetch_month<S>(store: &S, tags: &[Tag], request: MonthLoadRequest) -> MonthBatch
where
    S: RecordRepository + Sync + ?Sized,
{
    let started_at = Instant::now();
    let start = request.month.first_day();
    let end = request.month.last_day();

    let mut results = Vec::with_capacity(tags.len());
    for wave in tags.chunks(MAX_PARALLEL_QUERIES) {
        thread::scope(|scope| {
            let handles = wave
                .iter()
                .map(|tag| {
                    let tag_id = tag.id;
                    let handle = thread::Builder::new()
                        .name("cache-load".to_string())
                        .spawn_scoped(scope, move || {
                            store.find_records_by_tag_and_date_range(tag_id, start, end)
                        });
                    (tag_id, handle)
                })
                .collect::<Vec<_>>();

            for (tag_id, handle) in handles {
                let outcome = match handle {
                    Ok(handle) => match handle.join() {
                        Ok(Ok(rows)) => Ok(rows),
                        Ok(Err(err)) => Err(err.to_string()),
                        Err(_) => Err("query_panicked".to_string()),
                    },
                    Err(err) => Err(format!("spawn_failed: {err}")),
                };
                results.push((tag_id, outcome));
            }
        });
    }

    let mut records = HashMap::with_capacity(results.len());
    let mut failed_tags = Vec::new();
    for (tag_id, outcome) in results {
        let by_day = match outcome {
            Ok(rows) => index_by_day(rows),
            Err(error) => {
                warn!(
                    "event=cache_load_tag module=cache status=error month={} tag_id={} error={}",
                    request.month, tag_id, error
                );
                failed_tags.push(tag_id);
                DayRecords::new()
            }
        };
        records.insert(tag_id, by_day);
    }

    info!(
        "event=cache_load module=cache status={} month={} tags={} failed={} duration_ms={}",
        if failed_tags.is_empty() { "ok" } else { "partial" },
        request.month,
        records.len(),
        failed_tags.len(),
        started_at.elapsed().as_millis()
    );

    MonthBatch {
        request,
        records,
        failed_tags,
    }
}

fn index_by_day(rows: Vec<TagRecord>) -> DayRecords {
    let mut by_day = DayRecords::with_capacity(rows.len());
    for record in rows {
        match by_day.entry(record.date_key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if !record.is_prediction || slot.get().is_prediction {
                    slot.insert(record);
                }
            }
        }
    }
    by_day
}
