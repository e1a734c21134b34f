//! Calendar schema migrations.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per step.
//! - All pending steps run in one transaction; a failed step leaves the
//!   database at its previous `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "tags",
        sql: include_str!("0001_tags.sql"),
    },
    Migration {
        version: 2,
        name: "tag_records",
        sql: include_str!("0002_tag_records.sql"),
    },
];

/// Schema versions before and after [`apply_migrations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
}

impl MigrationReport {
    pub fn applied(&self) -> u32 {
        self.to_version - self.from_version
    }
}

/// Latest schema version this build understands.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` for databases written by a newer build.
/// - `DbError::Sqlite` when a step fails; nothing is committed in that case.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationReport> {
    let from_version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let to_version = latest_version();

    if from_version > to_version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: to_version,
        });
    }

    let report = MigrationReport {
        from_version,
        to_version,
    };
    if report.applied() == 0 {
        return Ok(report);
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > from_version) {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        from_version, to_version
    );
    Ok(report)
}
