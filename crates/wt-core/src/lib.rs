//! Core domain logic for the workspace time tracker.
//!
//! This crate contains:
//! - [`Session`]: one continuous span of tracked work
//! - [`Ledger`]: the closed sessions and cached total bound to one storage location
//! - [`Tracker`]: the state machine that opens, pauses and commits sessions,
//!   driven by once-per-second ticks with idle auto-pause
//!
//! Time and tick scheduling are injected capabilities ([`Clock`],
//! [`TickScheduler`]) and persistence goes through [`LedgerStore`], so the
//! whole state machine can be driven by hand in tests.

pub mod clock;
pub mod ledger;
pub mod schedule;
pub mod session;
pub mod store;
pub mod tracker;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{Ledger, LedgerData, LedgerError};
pub use schedule::{Epoch, ManualScheduler, TickScheduler};
pub use session::{Session, SessionError};
pub use store::{LedgerStore, MemoryStore, StoreError};
pub use tracker::{
    Commit, Notifier, Recomputed, TickOutcome, Tracker, TrackerError, TrackerSettings,
    TrackerStatus,
};
pub use types::{StorageIdentity, TrackerState, ValidationError};
