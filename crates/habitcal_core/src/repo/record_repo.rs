//! Record storage port and SQLite implementation.
//!
//! # Responsibility
//! - Provide the range and point queries used by the calendar cache.
//! - Persist record values through the text codec.
//!
//! # Invariants
//! - Dates are stored as canonical `YYYY-MM-DD` text, so lexical range
//!   comparison equals calendar order.
//! - Stored values that match no typed pattern are returned as
//!   `RecordValue::Raw` instead of failing the read.
//! - Callers must invalidate any `RecordCache` after insert/update/delete.

use crate::model::calendar::{date_key, parse_date_key};
use crate::model::record::{RecordId, TagRecord};
use crate::model::tag::TagId;
use crate::model::value::{decode_value, encode_value};
use crate::repo::store::SqliteHabitStore;
use crate::repo::{bool_to_int, parse_uuid, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Row};

const RECORD_SELECT_SQL: &str = "SELECT
    id,
    tag_id,
    date,
    value,
    is_prediction,
    confidence
FROM tag_records";

/// Storage port for dated tag records.
pub trait RecordRepository {
    /// Returns every record of `tag_id` with `start <= date <= end`, ordered by
    /// date, predictions before observations on the same day.
    fn find_records_by_tag_and_date_range(
        &self,
        tag_id: TagId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<TagRecord>>;

    /// Returns the observed (non-prediction) record of `tag_id` on `date`.
    fn find_record_by_tag_and_date(
        &self,
        tag_id: TagId,
        date: NaiveDate,
    ) -> RepoResult<Option<TagRecord>>;

    fn insert_record(&self, record: &TagRecord) -> RepoResult<RecordId>;

    fn update_record(&self, record: &TagRecord) -> RepoResult<()>;

    fn delete_record(&self, id: RecordId) -> RepoResult<()>;
}

impl RecordRepository for SqliteHabitStore {
    fn find_records_by_tag_and_date_range(
        &self,
        tag_id: TagId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<TagRecord>> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE tag_id = ?1
               AND date >= ?2
               AND date <= ?3
             ORDER BY date ASC, is_prediction DESC, created_at ASC, id ASC;"
        ))?;

        let mut rows = stmt.query(params![tag_id.to_string(), date_key(start), date_key(end)])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }

        Ok(records)
    }

    fn find_record_by_tag_and_date(
        &self,
        tag_id: TagId,
        date: NaiveDate,
    ) -> RepoResult<Option<TagRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE tag_id = ?1
               AND date = ?2
               AND is_prediction = 0
             ORDER BY updated_at DESC, id ASC
             LIMIT 1;"
        ))?;

        let mut rows = stmt.query(params![tag_id.to_string(), date_key(date)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row(row)?));
        }

        Ok(None)
    }

    fn insert_record(&self, record: &TagRecord) -> RepoResult<RecordId> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tag_records (
                id,
                tag_id,
                date,
                value,
                is_prediction,
                confidence
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                record.id.to_string(),
                record.tag_id.to_string(),
                record.date_key(),
                encode_value(&record.value),
                bool_to_int(record.is_prediction),
                record.confidence,
            ],
        )?;

        Ok(record.id)
    }

    fn update_record(&self, record: &TagRecord) -> RepoResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE tag_records
             SET
                tag_id = ?1,
                date = ?2,
                value = ?3,
                is_prediction = ?4,
                confidence = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?6;",
            params![
                record.tag_id.to_string(),
                record.date_key(),
                encode_value(&record.value),
                bool_to_int(record.is_prediction),
                record.confidence,
                record.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "record",
                id: record.id,
            });
        }

        Ok(())
    }

    fn delete_record(&self, id: RecordId) -> RepoResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM tag_records WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "record",
                id,
            });
        }

        Ok(())
    }
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<TagRecord> {
    let id_text: String = row.get("id")?;
    let tag_id_text: String = row.get("tag_id")?;

    let date_text: String = row.get("date")?;
    let date = parse_date_key(&date_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid date `{date_text}` in tag_records.date"))
    })?;

    let is_prediction = match row.get::<_, i64>("is_prediction")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_prediction value `{other}` in tag_records.is_prediction"
            )));
        }
    };

    let value_text: String = row.get("value")?;

    Ok(TagRecord {
        id: parse_uuid(&id_text, "tag_records.id")?,
        tag_id: parse_uuid(&tag_id_text, "tag_records.tag_id")?,
        date,
        value: decode_value(&value_text),
        is_prediction,
        confidence: row.get("confidence")?,
    })
}
