// crates/stillvo-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Digest Store
// Description: Durable digest store backed by SQLite WAL.
// Purpose: Persist acknowledgements, profiles, and send reservations.
// Dependencies: stillvo-core, rusqlite, thiserror
// ============================================================================

//! ## Overview
//! This module implements the digest store interfaces over `SQLite`. The
//! `digest_sends` primary key `(receiver_id, digest_date)` is the sole
//! de-duplication mechanism for the daily digest: `reserve` is a plain
//! insert, and a constraint violation maps to `AlreadyReserved`. The
//! acknowledgement table carries its own uniqueness constraint per
//! (post, sender, kind), enforcing the upstream invariant the digest job
//! relies on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use stillvo_core::AckKind;
use stillvo_core::AcknowledgementEvent;
use stillvo_core::AcknowledgementStore;
use stillvo_core::DayWindow;
use stillvo_core::DigestDate;
use stillvo_core::PostId;
use stillvo_core::RecipientDirectory;
use stillvo_core::RecipientProfile;
use stillvo_core::ReservationLedger;
use stillvo_core::ReserveOutcome;
use stillvo_core::StoreError;
use stillvo_core::Timestamp;
use stillvo_core::UserId;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Busy timeout applied to every connection (ms).
const BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Database or filesystem I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// Database-level error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid data read from the database.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(err: SqliteStoreError) -> Self {
        match err {
            SqliteStoreError::Io(msg) => Self::Io(msg),
            SqliteStoreError::Db(msg) => Self::Store(msg),
            SqliteStoreError::Invalid(msg) => Self::Invalid(msg),
        }
    }
}

// ============================================================================
// SECTION: Acknowledgement Outcomes
// ============================================================================

/// Outcome of recording an acknowledgement.
///
/// # Invariants
/// - Variants are stable and exhaustive for submission outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The acknowledgement was recorded.
    Recorded,
    /// The sender already acknowledged this post with this kind.
    AlreadyAcknowledged,
    /// Senders cannot acknowledge their own posts.
    OwnPost,
    /// The referenced post does not exist.
    PostNotFound,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable digest store backed by `SQLite`.
///
/// Cloning shares the underlying connection. Separate instances opened on the
/// same path (as happens with overlapping job invocations) coordinate through
/// the database's own constraints, not through in-process state.
#[derive(Debug, Clone)]
pub struct SqliteDigestStore {
    /// Connection protected by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDigestStore {
    /// Opens an `SQLite`-backed digest store at the given database path.
    ///
    /// Creates the parent directory when missing and applies the fixed WAL,
    /// full-synchronous, and busy-timeout pragmas.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SqliteStoreError> {
        let path = path.into();
        ensure_parent_dir(&path)?;
        let connection = open_connection(&path)?;
        initialize_schema(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Acquires the connection guard.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub fn readiness(&self) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        let _: i64 = guard
            .query_row("SELECT 1", [], |row| row.get(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Inserts a post row.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the insert fails.
    pub fn record_post(&self, post: &PostId, author: &UserId) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT OR REPLACE INTO posts (id, author_id) VALUES (?1, ?2)",
                params![post.as_str(), author.as_str()],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Inserts or replaces a profile row.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the upsert fails.
    pub fn upsert_profile(
        &self,
        user: &UserId,
        email: Option<&str>,
    ) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO profiles (user_id, email) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET email = excluded.email",
                params![user.as_str(), email],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Records an acknowledgement from `sender` on `post`.
    ///
    /// The (post, sender, kind) uniqueness constraint enforces the upstream
    /// invariant the digest job reads against: duplicates map to
    /// [`AckOutcome::AlreadyAcknowledged`] rather than an error. Senders
    /// cannot acknowledge their own posts.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the lookup or insert fails for a
    /// reason other than a uniqueness conflict.
    pub fn record_acknowledgement(
        &self,
        sender: &UserId,
        post: &PostId,
        kind: AckKind,
        created_at: Timestamp,
    ) -> Result<AckOutcome, SqliteStoreError> {
        let guard = self.lock()?;
        let author: Option<String> = guard
            .query_row(
                "SELECT author_id FROM posts WHERE id = ?1",
                params![post.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let Some(author) = author else {
            return Ok(AckOutcome::PostNotFound);
        };
        if author == sender.as_str() {
            return Ok(AckOutcome::OwnPost);
        }
        let result = guard.execute(
            "INSERT INTO acknowledgements (post_id, sender_id, kind, created_at_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![post.as_str(), sender.as_str(), kind.as_str(), created_at.as_unix_millis()],
        );
        match result {
            Ok(_) => Ok(AckOutcome::Recorded),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Ok(AckOutcome::AlreadyAcknowledged)
            }
            Err(err) => Err(SqliteStoreError::Db(err.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Interface Implementations
// ============================================================================

impl AcknowledgementStore for SqliteDigestStore {
    fn events_in_window(
        &self,
        window: &DayWindow,
    ) -> Result<Vec<AcknowledgementEvent>, StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        let mut stmt = guard
            .prepare_cached(
                "SELECT p.author_id, a.kind, a.created_at_ms
                 FROM acknowledgements a
                 JOIN posts p ON p.id = a.post_id
                 WHERE a.created_at_ms >= ?1 AND a.created_at_ms < ?2
                 ORDER BY a.created_at_ms, a.rowid",
            )
            .map_err(|err| StoreError::Store(err.to_string()))?;
        let rows = stmt
            .query_map(params![window.start, window.end], |row| {
                let receiver: String = row.get(0)?;
                let kind: String = row.get(1)?;
                let created_at: i64 = row.get(2)?;
                Ok((receiver, kind, created_at))
            })
            .map_err(|err| StoreError::Store(err.to_string()))?;
        let mut events = Vec::new();
        for row in rows {
            let (receiver, kind, created_at) =
                row.map_err(|err| StoreError::Store(err.to_string()))?;
            let kind = AckKind::parse(&kind).ok_or_else(|| {
                StoreError::Invalid(format!("unknown acknowledgement kind: {kind}"))
            })?;
            events.push(AcknowledgementEvent {
                receiver_id: UserId::new(receiver),
                kind,
                created_at: Timestamp::from_unix_millis(created_at),
            });
        }
        Ok(events)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        Self::readiness(self).map_err(StoreError::from)
    }
}

impl RecipientDirectory for SqliteDigestStore {
    fn emails_for(&self, user_ids: &[UserId]) -> Result<Vec<RecipientProfile>, StoreError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let guard = self.lock().map_err(StoreError::from)?;
        let placeholders =
            (1 ..= user_ids.len()).map(|n| format!("?{n}")).collect::<Vec<_>>().join(", ");
        let sql =
            format!("SELECT user_id, email FROM profiles WHERE user_id IN ({placeholders})");
        let mut stmt = guard.prepare(&sql).map_err(|err| StoreError::Store(err.to_string()))?;
        let values: Vec<&str> = user_ids.iter().map(UserId::as_str).collect();
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values), |row| {
                let user_id: String = row.get(0)?;
                let email: Option<String> = row.get(1)?;
                Ok(RecipientProfile {
                    user_id: UserId::new(user_id),
                    email,
                })
            })
            .map_err(|err| StoreError::Store(err.to_string()))?;
        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row.map_err(|err| StoreError::Store(err.to_string()))?);
        }
        Ok(profiles)
    }
}

impl ReservationLedger for SqliteDigestStore {
    fn reserve(
        &self,
        receiver: &UserId,
        date: &DigestDate,
    ) -> Result<ReserveOutcome, StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        let result = guard.execute(
            "INSERT INTO digest_sends (receiver_id, digest_date) VALUES (?1, ?2)",
            params![receiver.as_str(), date.as_str()],
        );
        match result {
            Ok(_) => Ok(ReserveOutcome::Reserved),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Ok(ReserveOutcome::AlreadyReserved)
            }
            Err(err) => Err(StoreError::Store(err.to_string())),
        }
    }

    fn release(&self, receiver: &UserId, date: &DigestDate) -> Result<(), StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        guard
            .execute(
                "DELETE FROM digest_sends WHERE receiver_id = ?1 AND digest_date = ?2",
                params![receiver.as_str(), date.as_str()],
            )
            .map_err(|err| StoreError::Store(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Creates the parent directory of the database file when missing.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
    }
    Ok(())
}

/// Opens a connection with the fixed pragmas applied.
fn open_connection(path: &Path) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(path, flags)
        .map_err(|err| SqliteStoreError::Io(err.to_string()))?;
    connection
        .execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = wal;
             PRAGMA synchronous = full;",
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(connection)
}

/// Creates the schema when missing and records the schema version.
fn initialize_schema(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);
             CREATE TABLE IF NOT EXISTS posts (
                 id TEXT PRIMARY KEY,
                 author_id TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS profiles (
                 user_id TEXT PRIMARY KEY,
                 email TEXT
             );
             CREATE TABLE IF NOT EXISTS acknowledgements (
                 post_id TEXT NOT NULL REFERENCES posts(id),
                 sender_id TEXT NOT NULL,
                 kind TEXT NOT NULL,
                 created_at_ms INTEGER NOT NULL,
                 UNIQUE (post_id, sender_id, kind)
             );
             CREATE INDEX IF NOT EXISTS idx_ack_created_at
                 ON acknowledgements (created_at_ms);
             CREATE TABLE IF NOT EXISTS digest_sends (
                 receiver_id TEXT NOT NULL,
                 digest_date TEXT NOT NULL,
                 PRIMARY KEY (receiver_id, digest_date)
             );",
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = connection
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            connection
                .execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            Ok(())
        }
        Some(found) if found == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SqliteStoreError::Invalid(format!(
            "unsupported store schema version: {found} (expected {SCHEMA_VERSION})"
        ))),
    }
}
