//! SQLite-backed ledgers.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use wt_core::{LedgerData, LedgerStore, Session, StorageIdentity, StoreError};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored session timestamp.
    #[error("invalid timestamp in ledger {identity}: {timestamp}")]
    TimestampParse {
        identity: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Stores many ledgers in one SQLite database, keyed by identity.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS ledgers (
                identity TEXT PRIMARY KEY,
                total_time INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );

            -- Sessions in insertion order; id preserves chronology
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identity TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                FOREIGN KEY (identity) REFERENCES ledgers(identity) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_identity ON sessions(identity);
            ",
        )?;
        Ok(())
    }

    /// Lists every stored ledger identity.
    pub fn list_identities(&self) -> Result<Vec<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT identity FROM ledgers ORDER BY identity ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut identities = Vec::new();
        for row in rows {
            identities.push(row?);
        }
        Ok(identities)
    }

    fn load_data(&self, key: &str) -> Result<Option<LedgerData>, DbError> {
        let total: Option<i64> = self
            .conn
            .query_row(
                "SELECT total_time FROM ledgers WHERE identity = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        let Some(total) = total else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "
            SELECT started_at, ended_at
            FROM sessions
            WHERE identity = ?
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map([key], |row| {
            let started_at: String = row.get(0)?;
            let ended_at: Option<String> = row.get(1)?;
            Ok((started_at, ended_at))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (started_at, ended_at) = row?;
            let started_at = parse_timestamp(key, &started_at)?;
            let session = match ended_at {
                Some(ended_at) => Session::closed(started_at, parse_timestamp(key, &ended_at)?),
                None => Session::open(started_at),
            };
            sessions.push(session);
        }

        Ok(Some(LedgerData {
            sessions,
            total_time: u64::try_from(total).unwrap_or(0),
        }))
    }

    fn save_data(&self, key: &str, data: &LedgerData) -> Result<(), DbError> {
        let now = format_timestamp(Utc::now());
        let total = i64::try_from(data.total_time).unwrap_or(i64::MAX);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "
            INSERT INTO ledgers (identity, total_time, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(identity) DO UPDATE SET
                total_time = excluded.total_time,
                updated_at = excluded.updated_at
            ",
            params![key, total, now],
        )?;
        tx.execute("DELETE FROM sessions WHERE identity = ?", [key])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sessions (identity, started_at, ended_at) VALUES (?, ?, ?)",
            )?;
            for session in &data.sessions {
                stmt.execute(params![
                    key,
                    format_timestamp(session.started_at()),
                    session.ended_at().map(format_timestamp),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl LedgerStore for SqliteStore {
    fn load(&self, identity: &StorageIdentity) -> Result<Option<LedgerData>, StoreError> {
        Ok(self.load_data(&identity.key())?)
    }

    fn save(&self, identity: &StorageIdentity, data: &LedgerData) -> Result<(), StoreError> {
        self.save_data(&identity.key(), data)?;
        tracing::debug!(%identity, sessions = data.sessions.len(), "ledger saved to sqlite");
        Ok(())
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(identity: &str, value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            identity: identity.to_string(),
            timestamp: value.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use chrono::TimeDelta;
    use wt_core::Ledger;

    use super::*;

    fn session(offset: i64, secs: i64) -> Session {
        let start = DateTime::parse_from_rfc3339("2025-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + TimeDelta::seconds(offset);
        Session::closed(start, start + TimeDelta::seconds(secs))
    }

    fn identity(name: &str) -> StorageIdentity {
        StorageIdentity::new(format!("/work/{name}/.timetracker")).unwrap()
    }

    #[test]
    fn load_unknown_identity_returns_none() {
        let store = SqliteStore::open_in_memory().expect("open in-memory db");
        assert!(store.load(&identity("a")).unwrap().is_none());
    }

    #[test]
    fn save_then_load_preserves_order_and_total() {
        let store = SqliteStore::open_in_memory().expect("open in-memory db");
        let data = LedgerData {
            sessions: vec![session(0, 60), session(120, 30), session(300, 1)],
            total_time: 91,
        };

        store.save(&identity("a"), &data).unwrap();
        assert_eq!(store.load(&identity("a")).unwrap(), Some(data));
    }

    #[test]
    fn save_replaces_previous_contents() {
        let store = SqliteStore::open_in_memory().expect("open in-memory db");
        let mut data = LedgerData {
            sessions: vec![session(0, 60)],
            total_time: 60,
        };
        store.save(&identity("a"), &data).unwrap();

        data.sessions.push(session(100, 40));
        data.total_time = 100;
        store.save(&identity("a"), &data).unwrap();

        let loaded = store.load(&identity("a")).unwrap().unwrap();
        assert_eq!(loaded.sessions.len(), 2);
        assert_eq!(loaded.total_time, 100);
    }

    #[test]
    fn ledgers_are_isolated_by_identity() {
        let store = SqliteStore::open_in_memory().expect("open in-memory db");
        store
            .save(
                &identity("a"),
                &LedgerData {
                    sessions: vec![session(0, 10)],
                    total_time: 10,
                },
            )
            .unwrap();
        store
            .save(&identity("b"), &LedgerData::default())
            .unwrap();

        assert_eq!(store.load(&identity("a")).unwrap().unwrap().sessions.len(), 1);
        assert!(store.load(&identity("b")).unwrap().unwrap().sessions.is_empty());
        assert_eq!(
            store.list_identities().unwrap(),
            vec![identity("a").key(), identity("b").key()]
        );
    }

    #[test]
    fn persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wt.db");
        let data = LedgerData {
            sessions: vec![session(0, 5)],
            total_time: 5,
        };

        SqliteStore::open(&path)
            .unwrap()
            .save(&identity("a"), &data)
            .unwrap();
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load(&identity("a")).unwrap(), Some(data));
    }

    #[test]
    fn sub_millisecond_timestamps_keep_total_consistent() {
        let store: Rc<dyn LedgerStore> =
            Rc::new(SqliteStore::open_in_memory().expect("open in-memory db"));
        let start = DateTime::parse_from_rfc3339("2025-01-01T09:00:10.000900Z")
            .unwrap()
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339("2025-01-01T09:00:11.000100Z")
            .unwrap()
            .with_timezone(&Utc);

        let mut ledger = Ledger::open(identity("a"), Rc::clone(&store)).unwrap();
        ledger.add_session(Session::closed(start, end)).unwrap();
        assert_eq!(ledger.total_time(), 0);

        let reloaded = store.load(&identity("a")).unwrap().unwrap();
        assert_eq!(reloaded.sessions[0].started_at(), start);
        assert_eq!(reloaded.sessions[0].ended_at(), Some(end));
        assert_eq!(reloaded.total_time, reloaded.sum_secs());
    }

    #[test]
    fn corrupt_timestamp_is_reported() {
        let store = SqliteStore::open_in_memory().expect("open in-memory db");
        store
            .save(&identity("a"), &LedgerData::default())
            .unwrap();
        store
            .conn
            .execute(
                "INSERT INTO sessions (identity, started_at, ended_at) VALUES (?, ?, NULL)",
                params![identity("a").key(), "yesterday"],
            )
            .unwrap();

        let err = store.load(&identity("a")).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(err.to_string().contains("storage backend error"));
    }
}
