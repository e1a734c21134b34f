//! Shared SQLite store backing both storage ports.
//!
//! # Invariants
//! - Every write and the upsert lookup run on the single writer connection.
//! - Month range queries on a file database run on a small pool of read-only
//!   connections, so per-tag queries of one load overlap.
//! - An in-memory database has no readers; its per-tag queries take the
//!   writer lock one after another.

use crate::db::{open_db, open_db_in_memory};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Read-only connections opened next to the writer of a file database.
pub const READ_CONNECTIONS: usize = 4;

/// SQLite-backed tag and record store.
pub struct SqliteHabitStore {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl SqliteHabitStore {
    /// Wraps a migrated connection (see [`crate::db::open_db`]) without readers.
    pub fn new(conn: Connection) -> Self {
        Self {
            writer: Mutex::new(conn),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
        }
    }

    /// Opens a database file, applying migrations, plus its read pool.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let mut store = Self::new(open_db(path)?);
        store.readers = (0..READ_CONNECTIONS)
            .map(|_| open_reader(path).map(Mutex::new))
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(store)
    }

    /// Opens a fresh in-memory database, applying migrations.
    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Number of read-only connections; 0 means reads share the writer.
    pub fn read_connections(&self) -> usize {
        self.readers.len()
    }

    pub(crate) fn conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.writer.lock().map_err(|_| RepoError::LockPoisoned)
    }

    /// Connection for month range queries; round-robins over the readers.
    pub(crate) fn read_conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        if self.readers.is_empty() {
            return self.conn();
        }
        let slot = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        self.readers[slot]
            .lock()
            .map_err(|_| RepoError::LockPoisoned)
    }
}

fn open_reader(path: &Path) -> RepoResult<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}
