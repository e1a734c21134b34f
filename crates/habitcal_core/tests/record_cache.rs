use chrono::NaiveDate;
use habitcal_core::{
    fetch_month, CalendarMonth, LoadOutcome, RecordCache, RecordId, RecordRepository, RecordValue,
    RepoError, RepoResult, Rgb, SharedRecordCache, SqliteHabitStore, Tag, TagConfig, TagId,
    TagRecord, TagRepository, MAX_PARALLEL_QUERIES,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Barrier, Mutex};
use std::thread;

fn july() -> CalendarMonth {
    CalendarMonth::new(2024, 7).unwrap()
}

fn august() -> CalendarMonth {
    CalendarMonth::new(2024, 8).unwrap()
}

fn day(month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, d).unwrap()
}

fn binary_tag(name: &str) -> Tag {
    Tag::new(name, TagConfig::Binary { icon: None }, Rgb::new(10, 20, 30))
}

/// In-memory read-only store with per-tag failure injection.
#[derive(Default)]
struct FakeStore {
    records: Vec<TagRecord>,
    failing: HashSet<TagId>,
    range_calls: AtomicUsize,
}

impl FakeStore {
    fn with_records(records: Vec<TagRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }
}

impl RecordRepository for FakeStore {
    fn find_records_by_tag_and_date_range(
        &self,
        tag_id: TagId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<TagRecord>> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&tag_id) {
            return Err(RepoError::InvalidData("injected failure".into()));
        }
        Ok(self
            .records
            .iter()
            .filter(|record| record.tag_id == tag_id && record.date >= start && record.date <= end)
            .cloned()
            .collect())
    }

    fn find_record_by_tag_and_date(
        &self,
        tag_id: TagId,
        date: NaiveDate,
    ) -> RepoResult<Option<TagRecord>> {
        Ok(self
            .records
            .iter()
            .find(|record| record.tag_id == tag_id && record.date == date && !record.is_prediction)
            .cloned())
    }

    fn insert_record(&self, _record: &TagRecord) -> RepoResult<RecordId> {
        Err(RepoError::InvalidData("read-only fake".into()))
    }

    fn update_record(&self, _record: &TagRecord) -> RepoResult<()> {
        Err(RepoError::InvalidData("read-only fake".into()))
    }

    fn delete_record(&self, _id: RecordId) -> RepoResult<()> {
        Err(RepoError::InvalidData("read-only fake".into()))
    }
}

#[test]
fn month_load_indexes_each_record_by_day() {
    let store = SqliteHabitStore::open_in_memory().unwrap();
    let tag_a = binary_tag("a");
    let tag_b = binary_tag("b");
    store.create_tag(&tag_a).unwrap();
    store.create_tag(&tag_b).unwrap();

    let recorded_days = [day(7, 2), day(7, 15), day(7, 31)];
    for date in recorded_days {
        store
            .insert_record(&TagRecord::new(tag_a.id, date, RecordValue::Boolean(true)))
            .unwrap();
    }
    store
        .insert_record(&TagRecord::new(
            tag_a.id,
            day(8, 1),
            RecordValue::Boolean(true),
        ))
        .unwrap();

    let tags = vec![tag_a.clone(), tag_b.clone()];
    let mut cache = RecordCache::new();
    assert_eq!(cache.load_month(&store, &tags, july()), LoadOutcome::Committed);
    assert_eq!(cache.cached_month(), Some(july()));

    for date in july().days() {
        let expected = recorded_days.contains(&date);
        assert_eq!(
            cache.get(tag_a.id, date).is_some(),
            expected,
            "tag a on {date}"
        );
        assert!(cache.get(tag_b.id, date).is_none(), "tag b on {date}");
    }
    assert_eq!(cache.record_count(tag_a.id), 3);
    assert_eq!(cache.record_count(tag_b.id), 0);
    assert!(cache.get(tag_a.id, day(8, 1)).is_none());
}

#[test]
fn should_reload_tracks_month_and_invalidation() {
    let tag = binary_tag("walk");
    let store = FakeStore::with_records(vec![TagRecord::new(
        tag.id,
        day(7, 4),
        RecordValue::Boolean(true),
    )]);
    let mut cache = RecordCache::new();
    assert!(cache.should_reload(july()));

    cache.load_month(&store, std::slice::from_ref(&tag), july());
    assert!(!cache.should_reload(july()));
    assert!(cache.should_reload(august()));

    cache.invalidate();
    assert!(cache.should_reload(july()));
    assert_eq!(cache.cached_month(), None);
    assert!(cache.get(tag.id, day(7, 4)).is_none());
}

#[test]
fn empty_tag_set_never_counts_as_loaded() {
    let store = FakeStore::default();
    let mut cache = RecordCache::new();
    assert_eq!(cache.load_month(&store, &[], july()), LoadOutcome::Committed);
    assert!(cache.should_reload(july()));
    assert_eq!(store.range_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn one_failing_tag_does_not_abort_the_batch() {
    let ok_a = binary_tag("a");
    let broken = binary_tag("b");
    let ok_c = binary_tag("c");
    let mut store = FakeStore::with_records(vec![
        TagRecord::new(ok_a.id, day(7, 1), RecordValue::Boolean(true)),
        TagRecord::new(broken.id, day(7, 1), RecordValue::Boolean(true)),
        TagRecord::new(ok_c.id, day(7, 1), RecordValue::Boolean(false)),
    ]);
    store.failing.insert(broken.id);
    let tags = vec![ok_a.clone(), broken.clone(), ok_c.clone()];

    let mut cache = RecordCache::new();
    let batch = fetch_month(&store, &tags, cache.begin_load(july()));
    assert_eq!(batch.failed_tags(), &[broken.id]);
    assert_eq!(cache.commit(batch), LoadOutcome::Committed);

    assert!(cache.get(ok_a.id, day(7, 1)).is_some());
    assert!(cache.get(broken.id, day(7, 1)).is_none());
    assert!(cache.get(ok_c.id, day(7, 1)).is_some());
    assert_eq!(store.range_calls.load(Ordering::SeqCst), 3);
}

#[test]
fn observed_record_shadows_prediction_on_same_day() {
    let tag = binary_tag("period");
    let predicted = TagRecord::prediction(tag.id, day(7, 9), RecordValue::Boolean(true), 0.6);
    let observed = TagRecord::new(tag.id, day(7, 9), RecordValue::Boolean(false));
    let only_predicted =
        TagRecord::prediction(tag.id, day(7, 10), RecordValue::Boolean(true), 0.5);
    let store = FakeStore::with_records(vec![
        observed.clone(),
        predicted,
        only_predicted.clone(),
    ]);

    let mut cache = RecordCache::new();
    cache.load_month(&store, std::slice::from_ref(&tag), july());
    assert_eq!(cache.get(tag.id, day(7, 9)), Some(&observed));
    assert_eq!(cache.get(tag.id, day(7, 10)), Some(&only_predicted));
}

#[test]
fn late_load_for_superseded_month_is_discarded() {
    let tag = binary_tag("read");
    let store = FakeStore::with_records(vec![
        TagRecord::new(tag.id, day(7, 20), RecordValue::Boolean(true)),
        TagRecord::new(tag.id, day(8, 3), RecordValue::Boolean(true)),
    ]);
    let tags = vec![tag.clone()];
    let mut cache = RecordCache::new();

    let july_request = cache.begin_load(july());
    let july_batch = fetch_month(&store, &tags, july_request);

    let august_request = cache.begin_load(august());
    let august_batch = fetch_month(&store, &tags, august_request);
    assert_eq!(cache.commit(august_batch), LoadOutcome::Committed);

    assert_eq!(cache.commit(july_batch), LoadOutcome::Superseded);
    assert_eq!(cache.cached_month(), Some(august()));
    assert!(cache.get(tag.id, day(7, 20)).is_none());
    assert!(cache.get(tag.id, day(8, 3)).is_some());
}

#[test]
fn invalidation_discards_in_flight_load() {
    let tag = binary_tag("read");
    let store = FakeStore::with_records(vec![TagRecord::new(
        tag.id,
        day(7, 20),
        RecordValue::Boolean(true),
    )]);
    let mut cache = RecordCache::new();

    let request = cache.begin_load(july());
    let batch = fetch_month(&store, std::slice::from_ref(&tag), request);
    cache.invalidate();

    assert_eq!(cache.commit(batch), LoadOutcome::Superseded);
    assert!(cache.should_reload(july()));
}

#[test]
fn per_tag_queries_run_concurrently() {
    let tags = vec![binary_tag("a"), binary_tag("b"), binary_tag("c")];

    struct RendezvousStore {
        barrier: Barrier,
    }

    impl RecordRepository for RendezvousStore {
        fn find_records_by_tag_and_date_range(
            &self,
            _tag_id: TagId,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> RepoResult<Vec<TagRecord>> {
            // Only returns once every tag query is in flight at the same time.
            self.barrier.wait();
            Ok(Vec::new())
        }

        fn find_record_by_tag_and_date(
            &self,
            _tag_id: TagId,
            _date: NaiveDate,
        ) -> RepoResult<Option<TagRecord>> {
            Ok(None)
        }

        fn insert_record(&self, record: &TagRecord) -> RepoResult<RecordId> {
            Ok(record.id)
        }

        fn update_record(&self, _record: &TagRecord) -> RepoResult<()> {
            Ok(())
        }

        fn delete_record(&self, _id: RecordId) -> RepoResult<()> {
            Ok(())
        }
    }

    let store = RendezvousStore {
        barrier: Barrier::new(tags.len()),
    };
    let mut cache = RecordCache::new();
    assert_eq!(cache.load_month(&store, &tags, july()), LoadOutcome::Committed);
}

#[test]
fn large_tag_sets_load_with_bounded_parallelism() {
    #[derive(Default)]
    struct CountingStore {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl RecordRepository for CountingStore {
        fn find_records_by_tag_and_date_range(
            &self,
            tag_id: TagId,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> RepoResult<Vec<TagRecord>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(5));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![TagRecord::new(tag_id, start, RecordValue::Boolean(true))])
        }

        fn find_record_by_tag_and_date(
            &self,
            _tag_id: TagId,
            _date: NaiveDate,
        ) -> RepoResult<Option<TagRecord>> {
            Ok(None)
        }

        fn insert_record(&self, record: &TagRecord) -> RepoResult<RecordId> {
            Ok(record.id)
        }

        fn update_record(&self, _record: &TagRecord) -> RepoResult<()> {
            Ok(())
        }

        fn delete_record(&self, _id: RecordId) -> RepoResult<()> {
            Ok(())
        }
    }

    let tags = (0..MAX_PARALLEL_QUERIES * 2 + 3)
        .map(|index| binary_tag(&format!("tag-{index}")))
        .collect::<Vec<_>>();
    let store = CountingStore::default();
    let mut cache = RecordCache::new();

    assert_eq!(cache.load_month(&store, &tags, july()), LoadOutcome::Committed);
    assert!(store.peak.load(Ordering::SeqCst) <= MAX_PARALLEL_QUERIES);
    for tag in &tags {
        assert_eq!(cache.record_count(tag.id), 1);
        assert!(cache.get(tag.id, day(7, 1)).is_some());
    }
}

/// Holds July's range query until the test releases it.
struct GatedStore {
    inner: FakeStore,
    gated_start: NaiveDate,
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl RecordRepository for GatedStore {
    fn find_records_by_tag_and_date_range(
        &self,
        tag_id: TagId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<TagRecord>> {
        if start == self.gated_start {
            self.started.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        self.inner.find_records_by_tag_and_date_range(tag_id, start, end)
    }

    fn find_record_by_tag_and_date(
        &self,
        tag_id: TagId,
        date: NaiveDate,
    ) -> RepoResult<Option<TagRecord>> {
        self.inner.find_record_by_tag_and_date(tag_id, date)
    }

    fn insert_record(&self, record: &TagRecord) -> RepoResult<RecordId> {
        self.inner.insert_record(record)
    }

    fn update_record(&self, record: &TagRecord) -> RepoResult<()> {
        self.inner.update_record(record)
    }

    fn delete_record(&self, id: RecordId) -> RepoResult<()> {
        self.inner.delete_record(id)
    }
}

#[test]
fn shared_cache_keeps_newer_month_when_older_load_finishes_last() {
    let tag = binary_tag("journal");
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let store = GatedStore {
        inner: FakeStore::with_records(vec![
            TagRecord::new(tag.id, day(7, 20), RecordValue::Boolean(true)),
            TagRecord::new(tag.id, day(8, 3), RecordValue::Boolean(true)),
        ]),
        gated_start: july().first_day(),
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    };
    let tags = vec![tag.clone()];
    let shared = SharedRecordCache::new();

    thread::scope(|scope| {
        let july_load = scope.spawn(|| shared.load_month(&store, &tags, july()));
        started_rx.recv().unwrap();

        assert_eq!(
            shared.load_month(&store, &tags, august()),
            LoadOutcome::Committed
        );
        assert_eq!(shared.cached_month(), Some(august()));

        release_tx.send(()).unwrap();
        assert_eq!(july_load.join().unwrap(), LoadOutcome::Superseded);
    });

    assert_eq!(shared.cached_month(), Some(august()));
    assert!(shared.get(tag.id, day(7, 20)).is_none());
    assert!(shared.get(tag.id, day(8, 3)).is_some());
    assert_eq!(shared.read(|cache| cache.record_count(tag.id)), 1);
}
