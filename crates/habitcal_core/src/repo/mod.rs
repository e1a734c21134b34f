//! Storage ports and their SQLite implementation.
//!
//! # Responsibility
//! - Define the tag and record data access contracts consumed by the core.
//! - Isolate SQLite query details from cache and service orchestration.
//!
//! # Invariants
//! - Write paths validate tags before persistence; record/tag agreement is
//!   checked by the service, which knows the owning tag.
//! - Read paths tolerate undecodable values (`RecordValue::Raw`) but reject
//!   structurally broken rows (bad ids, bad dates).

use crate::db::DbError;
use crate::model::tag::TagValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod record_repo;
pub mod store;
pub mod tag_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for tag/record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TagValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: Uuid },
    InvalidData(String),
    /// A thread panicked while holding the connection lock.
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::LockPoisoned => write!(f, "storage connection lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) | Self::LockPoisoned => None,
        }
    }
}

impl From<TagValidationError> for RepoError {
    fn from(value: TagValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
