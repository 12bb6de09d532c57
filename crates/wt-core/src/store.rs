//! Persistence seam for ledgers.
//!
//! The core never touches the filesystem. A [`LedgerStore`] loads and saves
//! the serializable [`LedgerData`] for a [`StorageIdentity`]; concrete stores
//! live in `wt-db`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::ledger::LedgerData;
use crate::types::StorageIdentity;

/// Errors raised by ledger stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the stored ledger failed.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing the ledger failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The stored ledger could not be parsed.
    #[error("malformed ledger at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// An error from a database or other backend.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The store refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Loads and saves ledgers by identity.
pub trait LedgerStore {
    /// Returns the stored ledger, or `None` if nothing has been stored yet.
    fn load(&self, identity: &StorageIdentity) -> Result<Option<LedgerData>, StoreError>;

    /// Replaces the stored ledger with `data`.
    fn save(&self, identity: &StorageIdentity, data: &LedgerData) -> Result<(), StoreError>;
}

/// An in-process store, with switchable write failures for testing.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledgers: RefCell<HashMap<StorageIdentity, LedgerData>>,
    fail_saves: Cell<bool>,
    saves: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing data.
    #[must_use]
    pub fn with_ledger(self, identity: StorageIdentity, data: LedgerData) -> Self {
        self.ledgers.borrow_mut().insert(identity, data);
        self
    }

    /// Returns a copy of what is currently stored for `identity`.
    pub fn get(&self, identity: &StorageIdentity) -> Option<LedgerData> {
        self.ledgers.borrow().get(identity).cloned()
    }

    /// Makes every following save fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self, identity: &StorageIdentity) -> Result<Option<LedgerData>, StoreError> {
        Ok(self.get(identity))
    }

    fn save(&self, identity: &StorageIdentity, data: &LedgerData) -> Result<(), StoreError> {
        if self.fail_saves.get() {
            return Err(StoreError::Unavailable(format!(
                "writes to {identity} are disabled"
            )));
        }
        self.ledgers
            .borrow_mut()
            .insert(identity.clone(), data.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
