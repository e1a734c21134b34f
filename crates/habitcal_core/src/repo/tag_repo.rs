//! Tag repository contract and SQLite implementation.
//!
//! # Invariants
//! - Kind-specific columns are populated only for the matching kind.
//! - `vocabulary` is stored as a JSON array of strings.
//! - Tag lists are ordered by `name ASC, id ASC`.

use crate::model::color::Rgb;
use crate::model::tag::{PredictionCycle, Tag, TagConfig, TagId, TagKind};
use crate::repo::store::SqliteHabitStore;
use crate::repo::{parse_uuid, RepoError, RepoResult};
use log::info;
use rusqlite::{params, Row};

const TAG_SELECT_SQL: &str = "SELECT
    id,
    name,
    kind,
    min_value,
    max_value,
    unit,
    icon,
    vocabulary,
    color,
    prediction_period_days
FROM tags";

/// Repository interface for tag definitions.
pub trait TagRepository {
    fn create_tag(&self, tag: &Tag) -> RepoResult<TagId>;
    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>>;
    fn list_tags(&self) -> RepoResult<Vec<Tag>>;
    /// Deletes a tag together with all of its records.
    fn delete_tag(&self, id: TagId) -> RepoResult<()>;
}

impl TagRepository for SqliteHabitStore {
    fn create_tag(&self, tag: &Tag) -> RepoResult<TagId> {
        tag.validate()?;

        let (min_value, max_value, unit, icon, vocabulary) = match &tag.config {
            TagConfig::Quantitative { min, max, unit } => {
                (Some(*min), Some(*max), unit.clone(), None, None)
            }
            TagConfig::Binary { icon } => (None, None, None, icon.clone(), None),
            TagConfig::Complex { vocabulary } => {
                let encoded = serde_json::to_string(vocabulary).map_err(|err| {
                    RepoError::InvalidData(format!("cannot encode vocabulary: {err}"))
                })?;
                (None, None, None, None, Some(encoded))
            }
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tags (
                id,
                name,
                kind,
                min_value,
                max_value,
                unit,
                icon,
                vocabulary,
                color,
                prediction_period_days
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                tag.id.to_string(),
                tag.name.as_str(),
                tag.kind().as_str(),
                min_value,
                max_value,
                unit,
                icon,
                vocabulary,
                tag.color.to_hex(),
                tag.prediction.map(|cycle| cycle.period_days),
            ],
        )?;

        info!(
            "event=tag_create module=repo status=ok kind={}",
            tag.kind().as_str()
        );
        Ok(tag.id)
    }

    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{TAG_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_tag_row(row)?));
        }

        Ok(None)
    }

    fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{TAG_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }

        Ok(tags)
    }

    fn delete_tag(&self, id: TagId) -> RepoResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM tags WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "tag", id });
        }

        Ok(())
    }
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "tags.id")?;

    let kind_text: String = row.get("kind")?;
    let kind = TagKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid tag kind `{kind_text}` in tags.kind"))
    })?;

    let config = match kind {
        TagKind::Quantitative => {
            let min: Option<f64> = row.get("min_value")?;
            let max: Option<f64> = row.get("max_value")?;
            match (min, max) {
                (Some(min), Some(max)) => TagConfig::Quantitative {
                    min,
                    max,
                    unit: row.get("unit")?,
                },
                _ => {
                    return Err(RepoError::InvalidData(format!(
                        "quantitative tag {id} is missing min_value/max_value"
                    )));
                }
            }
        }
        TagKind::Binary => TagConfig::Binary {
            icon: row.get("icon")?,
        },
        TagKind::Complex => {
            let raw: Option<String> = row.get("vocabulary")?;
            let vocabulary = match raw {
                Some(text) => serde_json::from_str::<Vec<String>>(&text).map_err(|err| {
                    RepoError::InvalidData(format!(
                        "invalid vocabulary `{text}` in tags.vocabulary: {err}"
                    ))
                })?,
                None => Vec::new(),
            };
            TagConfig::Complex { vocabulary }
        }
    };

    let color_text: String = row.get("color")?;
    let color = Rgb::from_hex(&color_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid color `{color_text}` in tags.color"))
    })?;

    let prediction = row
        .get::<_, Option<u32>>("prediction_period_days")?
        .map(|period_days| PredictionCycle { period_days });

    Ok(Tag {
        id,
        name: row.get("name")?,
        config,
        color,
        prediction,
    })
}
