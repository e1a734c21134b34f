use chrono::NaiveDate;
use habitcal_core::{
    CalendarMonth, LoadOutcome, PredictionCycle, RecordCache, RecordRepository, RecordValue,
    RepoError, Rgb, SqliteHabitStore, Tag, TagConfig, TagRecord, TagRepository, READ_CONNECTIONS,
};
use rusqlite::Connection;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
}

fn sleep_tag() -> Tag {
    Tag::new(
        "sleep",
        TagConfig::Quantitative {
            min: 0.0,
            max: 12.0,
            unit: Some("h".into()),
        },
        Rgb::new(0x3F, 0x51, 0xB5),
    )
}

#[test]
fn tags_round_trip_for_every_kind() {
    let store = SqliteHabitStore::open_in_memory().unwrap();

    let mut sleep = sleep_tag();
    sleep.prediction = Some(PredictionCycle { period_days: 28 });
    let gym = Tag::new(
        "gym",
        TagConfig::Binary {
            icon: Some("dumbbell".into()),
        },
        Rgb::new(1, 2, 3),
    );
    let mood = Tag::new(
        "mood",
        TagConfig::Complex {
            vocabulary: vec!["calm".into(), "tired, but ok".into()],
        },
        Rgb::new(4, 5, 6),
    );

    for tag in [&sleep, &gym, &mood] {
        store.create_tag(tag).unwrap();
    }

    assert_eq!(store.get_tag(sleep.id).unwrap(), Some(sleep.clone()));
    assert_eq!(store.get_tag(gym.id).unwrap(), Some(gym.clone()));
    assert_eq!(store.get_tag(mood.id).unwrap(), Some(mood.clone()));

    let names = store
        .list_tags()
        .unwrap()
        .into_iter()
        .map(|tag| tag.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["gym", "mood", "sleep"]);
}

#[test]
fn invalid_tag_is_rejected_before_insert() {
    let store = SqliteHabitStore::open_in_memory().unwrap();
    let broken = Tag::new(
        "inverted",
        TagConfig::Quantitative {
            min: 5.0,
            max: 1.0,
            unit: None,
        },
        Rgb::new(0, 0, 0),
    );

    let err = store.create_tag(&broken).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(store.list_tags().unwrap().is_empty());
}

#[test]
fn range_query_is_inclusive_and_scoped_to_tag() {
    let store = SqliteHabitStore::open_in_memory().unwrap();
    let sleep = sleep_tag();
    let other = sleep_tag();
    store.create_tag(&sleep).unwrap();
    store.create_tag(&other).unwrap();

    for (tag, d) in [(&sleep, 1), (&sleep, 15), (&sleep, 31), (&other, 15)] {
        store
            .insert_record(&TagRecord::new(tag.id, day(d), RecordValue::Number(7.0)))
            .unwrap();
    }
    store
        .insert_record(&TagRecord::new(
            sleep.id,
            NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            RecordValue::Number(7.0),
        ))
        .unwrap();

    let july = store
        .find_records_by_tag_and_date_range(sleep.id, day(1), day(31))
        .unwrap();
    let days = july.iter().map(|record| record.date).collect::<Vec<_>>();
    assert_eq!(days, vec![day(1), day(15), day(31)]);
}

#[test]
fn point_lookup_ignores_predictions() {
    let store = SqliteHabitStore::open_in_memory().unwrap();
    let sleep = sleep_tag();
    store.create_tag(&sleep).unwrap();

    let predicted = TagRecord::prediction(sleep.id, day(3), RecordValue::Number(6.0), 0.7);
    store.insert_record(&predicted).unwrap();
    assert_eq!(
        store.find_record_by_tag_and_date(sleep.id, day(3)).unwrap(),
        None
    );

    let observed = TagRecord::new(sleep.id, day(3), RecordValue::Number(8.0));
    store.insert_record(&observed).unwrap();
    assert_eq!(
        store.find_record_by_tag_and_date(sleep.id, day(3)).unwrap(),
        Some(observed)
    );
}

#[test]
fn update_and_delete_report_missing_records() {
    let store = SqliteHabitStore::open_in_memory().unwrap();
    let sleep = sleep_tag();
    store.create_tag(&sleep).unwrap();

    let mut record = TagRecord::new(sleep.id, day(9), RecordValue::Number(5.0));
    let err = store.update_record(&record).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "record", id } if id == record.id));

    store.insert_record(&record).unwrap();
    record.value = RecordValue::Number(6.5);
    store.update_record(&record).unwrap();
    assert_eq!(
        store.find_record_by_tag_and_date(sleep.id, day(9)).unwrap(),
        Some(record.clone())
    );

    store.delete_record(record.id).unwrap();
    let err = store.delete_record(record.id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn deleting_a_tag_cascades_to_records() {
    let store = SqliteHabitStore::open_in_memory().unwrap();
    let sleep = sleep_tag();
    store.create_tag(&sleep).unwrap();
    store
        .insert_record(&TagRecord::new(sleep.id, day(2), RecordValue::Number(7.0)))
        .unwrap();

    store.delete_tag(sleep.id).unwrap();
    assert!(store
        .find_records_by_tag_and_date_range(sleep.id, day(1), day(31))
        .unwrap()
        .is_empty());
}

#[test]
fn legacy_value_text_reads_back_as_raw_and_out_of_range_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");
    let sleep = sleep_tag();
    {
        let store = SqliteHabitStore::open(&path).unwrap();
        store.create_tag(&sleep).unwrap();
    }

    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "INSERT INTO tag_records (id, tag_id, date, value)
         VALUES ('00000000-0000-0000-0000-000000000001', ?1, '2024-07-04', 'about seven');",
        [sleep.id.to_string()],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO tag_records (id, tag_id, date, value)
         VALUES ('00000000-0000-0000-0000-000000000002', ?1, '2024-07-05', '40');",
        [sleep.id.to_string()],
    )
    .unwrap();
    drop(conn);

    let store = SqliteHabitStore::open(&path).unwrap();
    let records = store
        .find_records_by_tag_and_date_range(sleep.id, day(1), day(31))
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].value, RecordValue::Raw("about seven".into()));
    assert_eq!(records[1].value, RecordValue::Number(40.0));
}

#[test]
fn malformed_date_is_reported_as_invalid_data() {
    let conn = habitcal_core::db::open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO tags (id, name, kind, color)
         VALUES ('00000000-0000-0000-0000-0000000000aa', 'gym', 'binary', '#000000');",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO tag_records (id, tag_id, date, value)
         VALUES ('00000000-0000-0000-0000-0000000000bb',
                 '00000000-0000-0000-0000-0000000000aa', '2024-07-1x', 'true');",
        [],
    )
    .unwrap();

    let store = SqliteHabitStore::new(conn);
    let gym = store.list_tags().unwrap().remove(0);
    let err = store
        .find_records_by_tag_and_date_range(gym.id, day(1), day(31))
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn file_store_range_queries_use_read_pool_and_see_committed_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteHabitStore::open(dir.path().join("pool.db")).unwrap();
    assert_eq!(store.read_connections(), READ_CONNECTIONS);
    assert_eq!(SqliteHabitStore::open_in_memory().unwrap().read_connections(), 0);

    let tags = (0..READ_CONNECTIONS * 2 + 1)
        .map(|index| {
            Tag::new(
                format!("habit-{index}"),
                TagConfig::Binary { icon: None },
                Rgb::new(9, 9, 9),
            )
        })
        .collect::<Vec<_>>();
    for (index, tag) in tags.iter().enumerate() {
        store.create_tag(tag).unwrap();
        store
            .insert_record(&TagRecord::new(
                tag.id,
                day(index as u32 + 1),
                RecordValue::Boolean(true),
            ))
            .unwrap();
    }

    let mut cache = RecordCache::new();
    let july = CalendarMonth::new(2024, 7).unwrap();
    assert_eq!(cache.load_month(&store, &tags, july), LoadOutcome::Committed);
    for (index, tag) in tags.iter().enumerate() {
        assert!(cache.get(tag.id, day(index as u32 + 1)).is_some());
        assert_eq!(cache.record_count(tag.id), 1);
    }
}
