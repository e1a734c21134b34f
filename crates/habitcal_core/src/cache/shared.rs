//! Thread-safe wrapper around [`RecordCache`].
//!
//! # Invariants
//! - Storage queries run without holding the cache lock.
//! - Readers never observe a partially committed month: commit swaps all
//!   per-tag maps under one lock acquisition.

use crate::cache::record_cache::{fetch_month, LoadOutcome, RecordCache};
use crate::model::calendar::CalendarMonth;
use crate::model::record::TagRecord;
use crate::model::tag::{Tag, TagId};
use crate::repo::record_repo::RecordRepository;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to one cache shared by render and refresh threads.
#[derive(Debug, Clone, Default)]
pub struct SharedRecordCache {
    inner: Arc<Mutex<RecordCache>>,
}

impl SharedRecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_reload(&self, month: CalendarMonth) -> bool {
        self.lock().should_reload(month)
    }

    pub fn cached_month(&self) -> Option<CalendarMonth> {
        self.lock().cached_month()
    }

    /// Same contract as [`RecordCache::load_month`]; the fetch phase runs
    /// unlocked so concurrent readers are not blocked by storage latency.
    pub fn load_month<S>(&self, store: &S, tags: &[Tag], month: CalendarMonth) -> LoadOutcome
    where
        S: RecordRepository + Sync + ?Sized,
    {
        let request = self.lock().begin_load(month);
        let batch = fetch_month(store, tags, request);
        self.lock().commit(batch)
    }

    /// Cloned lookup result; see [`RecordCache::get`].
    pub fn get(&self, tag_id: TagId, date: NaiveDate) -> Option<TagRecord> {
        self.lock().get(tag_id, date).cloned()
    }

    pub fn invalidate(&self) {
        self.lock().invalidate();
    }

    /// Runs `f` against a consistent snapshot, e.g. to render a whole grid.
    pub fn read<R>(&self, f: impl FnOnce(&RecordCache) -> R) -> R {
        f(&self.lock())
    }

    // Cached data is a disposable copy of storage, so a poisoned lock is
    // still safe to read.
    fn lock(&self) -> MutexGuard<'_, RecordCache> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
