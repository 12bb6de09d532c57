//! Storage backends for time tracking ledgers.
//!
//! Two [`LedgerStore`](wt_core::LedgerStore) implementations:
//!
//! - [`JsonFileStore`]: the storage identity *is* the ledger file, one
//!   `.timetracker` JSON document per workspace.
//! - [`SqliteStore`]: many ledgers in one `rusqlite` database, keyed by the
//!   identity's path string.
//!
//! # Thread Safety
//!
//! [`SqliteStore`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. The tracker drives its store from a single thread, so no pooling
//! is provided.
//!
//! # Timestamp Format
//!
//! Timestamps are stored as RFC 3339 text in UTC at full precision (e.g.
//! `2024-01-15T10:30:00.123456789Z`), so a reloaded session has exactly the
//! duration it was committed with. Sessions are ordered by row id, not by
//! timestamp text.

mod file;
mod sqlite;

pub use file::JsonFileStore;
pub use sqlite::{DbError, SqliteStore};
