pub mod migrations;
pub mod repository;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rusqlite::{Connection, ErrorCode};
use thiserror::Error;

use crate::models::CompletionRecord;
use migrations::run_migrations;
use repository::ProgressRepo;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {0} does not exist")]
    UserNotFound(i64),
    #[error("concurrent update, try again")]
    Conflict,
    #[error("{0} is already registered")]
    Duplicate(&'static str),
    #[error("stored value is malformed: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => StoreError::Conflict,
            _ => StoreError::Sqlite(err),
        }
    }
}

impl StoreError {
    pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

/// Handle to the on-disk store. Every operation opens its own connection, so
/// a `Database` can be cloned freely across threads.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Self { path: path.to_path_buf() };
        let conn = db.connect()?;
        // WAL is persistent, so setting it once per file is enough
        conn.pragma_update(None, "journal_mode", "WAL")?;
        run_migrations(&conn)?;
        debug!("Database ready at {:?}", path);
        Ok(db)
    }

    pub fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.connect()?;
        f(&mut conn)
    }

    pub fn completions(&self, user_id: i64) -> Result<Vec<CompletionRecord>, StoreError> {
        self.with_conn(|conn| ProgressRepo::get_completed(conn, user_id))
    }

    /// Flip one day for one user, retrying once if another writer held the lock.
    pub fn toggle_day(
        &self,
        user_id: i64,
        day: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<CompletionRecord>, StoreError> {
        match self.with_conn(|conn| ProgressRepo::toggle_day(conn, user_id, day, now)) {
            Err(StoreError::Conflict) => {
                warn!("Toggle of day {} for user {} hit a busy store, retrying", day, user_id);
                self.with_conn(|conn| ProgressRepo::toggle_day(conn, user_id, day, now))
            }
            other => other,
        }
    }
}
