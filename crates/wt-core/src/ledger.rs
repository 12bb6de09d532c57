//! Durable record of closed sessions for one storage location.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::Session;
use crate::store::{LedgerStore, StoreError};
use crate::types::StorageIdentity;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Only closed sessions can be recorded. Nothing was changed.
    #[error("cannot record a session that is still open")]
    SessionOpen,
    /// The in-memory ledger was updated but the store write failed.
    #[error("ledger updated in memory but not persisted: {0}")]
    Persist(#[source] StoreError),
}

/// The persisted form of a ledger.
///
/// `total_time` is a cache. It is kept up to date incrementally on append and
/// only equals the sum of session durations exactly after a recompute, since
/// stored data may have been edited by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerData {
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// Total tracked time in whole seconds.
    #[serde(default)]
    pub total_time: u64,
}

impl LedgerData {
    /// Sum of all closed session durations in whole seconds.
    pub fn sum_secs(&self) -> u64 {
        self.sessions
            .iter()
            .filter_map(Session::final_secs)
            .fold(0, u64::saturating_add)
    }

    fn append(&mut self, session: Session) -> Result<u64, LedgerError> {
        let secs = session.final_secs().ok_or(LedgerError::SessionOpen)?;
        self.sessions.push(session);
        self.total_time = self.total_time.saturating_add(secs);
        Ok(secs)
    }

    fn recompute(&mut self) -> u64 {
        self.total_time = self.sum_secs();
        self.total_time
    }
}

/// Closed sessions plus a cached total, bound to one storage identity.
///
/// Mutations update memory first and then write through the store. A failed
/// write is reported as [`LedgerError::Persist`] but never rolled back.
pub struct Ledger {
    identity: StorageIdentity,
    data: LedgerData,
    store: Rc<dyn LedgerStore>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("identity", &self.identity)
            .field("sessions", &self.data.sessions.len())
            .field("total_time", &self.data.total_time)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Loads the ledger stored at `identity`, or starts an empty one.
    pub fn open(identity: StorageIdentity, store: Rc<dyn LedgerStore>) -> Result<Self, StoreError> {
        let data = match store.load(&identity)? {
            Some(data) => {
                let open = data.sessions.iter().filter(|s| s.is_open()).count();
                if open > 0 {
                    tracing::warn!(%identity, open, "stored ledger contains open sessions; they count as zero");
                }
                tracing::debug!(
                    %identity,
                    sessions = data.sessions.len(),
                    total_time = data.total_time,
                    "loaded ledger"
                );
                data
            }
            None => {
                tracing::debug!(%identity, "no stored ledger, starting empty");
                LedgerData::default()
            }
        };
        Ok(Self {
            identity,
            data,
            store,
        })
    }

    pub const fn identity(&self) -> &StorageIdentity {
        &self.identity
    }

    pub fn sessions(&self) -> &[Session] {
        &self.data.sessions
    }

    /// Cached total in whole seconds.
    pub const fn total_time(&self) -> u64 {
        self.data.total_time
    }

    pub fn len(&self) -> usize {
        self.data.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.sessions.is_empty()
    }

    /// Appends a closed session, adds its duration to the total and persists.
    pub fn add_session(&mut self, session: Session) -> Result<(), LedgerError> {
        let secs = self.data.append(session)?;
        tracing::debug!(
            identity = %self.identity,
            secs,
            total_time = self.data.total_time,
            "session recorded"
        );
        self.persist()
    }

    /// Recomputes the total from every stored session and persists it.
    ///
    /// Returns the new total. On [`LedgerError::Persist`] the new total is
    /// still in effect.
    pub fn recompute_total_time(&mut self) -> Result<u64, LedgerError> {
        let previous = self.data.total_time;
        let total = self.data.recompute();
        if previous != total {
            tracing::info!(identity = %self.identity, previous, total, "corrected drifted total");
        }
        self.persist()?;
        Ok(total)
    }

    fn persist(&self) -> Result<(), LedgerError> {
        self.store
            .save(&self.identity, &self.data)
            .map_err(LedgerError::Persist)
    }
}
