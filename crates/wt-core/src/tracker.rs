//! The tracking state machine.
//!
//! A [`Tracker`] owns at most one open [`Session`] and is bound to at most one
//! [`Ledger`]. Sessions are opened by `start`/`resume`, and closed and handed
//! to the ledger by `pause`/`stop`, by the idle timeout inside [`Tracker::tick`],
//! or by rebinding the storage location.
//!
//! ```text
//!            start                 pause / idle timeout
//!  Stopped ---------> Started ------------------------> Paused
//!     ^                 |  ^                               |
//!     |      stop       |  +----------- resume ------------+
//!     +-----------------+------------------------------ stop
//! ```

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::clock::Clock;
use crate::ledger::{Ledger, LedgerError};
use crate::schedule::{Epoch, TickScheduler};
use crate::session::Session;
use crate::store::{LedgerStore, StoreError};
use crate::types::{StorageIdentity, TrackerState};

/// Callback invoked with the tracker on every live tick and completed transition.
pub type Notifier = Box<dyn FnMut(&Tracker)>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Another time tracking session is already active, stop previous to start the new one")]
    AlreadyActive,
    #[error("No tracking session is active")]
    NoActiveSession,
    #[error("Time tracking is not paused")]
    NotPaused,
    #[error("A workspace folder should be opened to store time tracking data")]
    UnboundStorage,
    #[error("failed to load time tracking data from {identity}: {source}")]
    Load {
        identity: StorageIdentity,
        #[source]
        source: StoreError,
    },
}

impl TrackerError {
    /// Whether the error is a lifecycle call made in the wrong state.
    pub const fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Self::AlreadyActive | Self::NoActiveSession | Self::NotPaused
        )
    }
}

/// Settings consumed when a tracker is constructed.
#[derive(Debug, Clone, Default)]
pub struct TrackerSettings {
    /// Seconds without activity before auto-pause. `0` disables it.
    pub idle_threshold_secs: u32,
    /// Initial storage location, `None` for unbound.
    pub storage: Option<StorageIdentity>,
}

/// A session that was closed and handed to the ledger.
#[derive(Debug)]
pub struct Commit {
    pub session: Session,
    /// Duration in whole seconds.
    pub secs: u64,
    /// Set when the ledger could not persist the session. The session is
    /// still part of the in-memory ledger.
    pub persist_error: Option<LedgerError>,
}

impl Commit {
    pub const fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Result of a recompute request.
#[derive(Debug)]
pub struct Recomputed {
    pub previous: u64,
    pub total: u64,
    pub persist_error: Option<LedgerError>,
}

/// What a delivered tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// The tick belonged to a cancelled schedule and was ignored.
    Stale,
    /// The host was notified and the idle counter updated.
    Counted { idle_secs: u32 },
    /// The idle threshold was exceeded and the session committed.
    AutoPaused(Commit),
}

/// Read-only view of a tracker for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerStatus {
    pub state: TrackerState,
    pub storage: Option<StorageIdentity>,
    /// Seconds in the open session, `0` when none is open.
    pub session_secs: u64,
    /// Cached total of the bound ledger.
    pub committed_secs: u64,
    pub session_count: usize,
    pub idle_secs: u32,
}

impl TrackerStatus {
    /// Committed time plus the open session.
    pub const fn total_secs(&self) -> u64 {
        self.committed_secs.saturating_add(self.session_secs)
    }
}

enum Phase {
    Stopped,
    Started { session: Session, idle_secs: u32 },
    Paused,
}

/// Session lifecycle and idle detection for one workspace at a time.
pub struct Tracker {
    phase: Phase,
    idle_threshold_secs: u32,
    ledger: Option<Ledger>,
    store: Rc<dyn LedgerStore>,
    clock: Rc<dyn Clock>,
    scheduler: Box<dyn TickScheduler>,
    notifier: Option<Notifier>,
    epoch: Epoch,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("state", &self.state())
            .field("idle_threshold_secs", &self.idle_threshold_secs)
            .field("ledger", &self.ledger)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    /// Creates a stopped tracker, loading the ledger for the configured storage.
    pub fn new(
        settings: TrackerSettings,
        store: Rc<dyn LedgerStore>,
        clock: Rc<dyn Clock>,
        scheduler: Box<dyn TickScheduler>,
    ) -> Result<Self, TrackerError> {
        let ledger = settings
            .storage
            .map(|identity| open_ledger(identity, &store))
            .transpose()?;
        Ok(Self {
            phase: Phase::Stopped,
            idle_threshold_secs: settings.idle_threshold_secs,
            ledger,
            store,
            clock,
            scheduler,
            notifier: None,
            epoch: Epoch::default(),
        })
    }

    pub const fn state(&self) -> TrackerState {
        match self.phase {
            Phase::Stopped => TrackerState::Stopped,
            Phase::Started { .. } => TrackerState::Started,
            Phase::Paused => TrackerState::Paused,
        }
    }

    /// The open session. Present exactly while started.
    pub const fn current_session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Started { session, .. } => Some(session),
            _ => None,
        }
    }

    /// Seconds counted since the last activity, `0` unless started.
    pub const fn idle_secs(&self) -> u32 {
        match self.phase {
            Phase::Started { idle_secs, .. } => idle_secs,
            _ => 0,
        }
    }

    pub const fn idle_threshold_secs(&self) -> u32 {
        self.idle_threshold_secs
    }

    /// Changes the idle threshold. Takes effect on the next tick.
    pub fn set_idle_threshold_secs(&mut self, secs: u32) {
        self.idle_threshold_secs = secs;
    }

    pub const fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_ref()
    }

    pub fn storage(&self) -> Option<&StorageIdentity> {
        self.ledger.as_ref().map(Ledger::identity)
    }

    /// The epoch that live ticks must carry.
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Registers the callback invoked on ticks and transitions.
    pub fn set_notifier(&mut self, notifier: impl FnMut(&Self) + 'static) {
        self.notifier = Some(Box::new(notifier));
    }

    pub fn status(&self) -> TrackerStatus {
        let now = self.clock.now();
        TrackerStatus {
            state: self.state(),
            storage: self.storage().cloned(),
            session_secs: self.current_session().map_or(0, |s| s.current_secs(now)),
            committed_secs: self.ledger.as_ref().map_or(0, Ledger::total_time),
            session_count: self.ledger.as_ref().map_or(0, Ledger::len),
            idle_secs: self.idle_secs(),
        }
    }

    /// Opens a new session and starts ticking.
    ///
    /// Fails without any change if a session is already open or no storage
    /// is bound.
    pub fn start(&mut self) -> Result<(), TrackerError> {
        if matches!(self.phase, Phase::Started { .. }) {
            tracing::info!("start refused: a session is already active");
            return Err(TrackerError::AlreadyActive);
        }
        if self.ledger.is_none() {
            tracing::debug!("start refused: no storage bound");
            return Err(TrackerError::UnboundStorage);
        }
        self.open_session();
        tracing::info!(storage = ?self.storage().map(ToString::to_string), "tracking started");
        self.notify();
        Ok(())
    }

    /// Commits the open session and stops ticking, keeping the tracker
    /// ready to resume.
    pub fn pause(&mut self) -> Result<Commit, TrackerError> {
        let commit = self
            .close_session(Phase::Paused)
            .ok_or(TrackerError::NoActiveSession)?;
        tracing::info!(secs = commit.secs, "tracking paused");
        self.notify();
        Ok(commit)
    }

    /// Opens a new session after a pause.
    pub fn resume(&mut self) -> Result<(), TrackerError> {
        match self.phase {
            Phase::Paused => {}
            Phase::Started { .. } => return Err(TrackerError::AlreadyActive),
            Phase::Stopped => return Err(TrackerError::NotPaused),
        }
        if self.ledger.is_none() {
            return Err(TrackerError::UnboundStorage);
        }
        self.open_session();
        tracing::info!("tracking resumed");
        self.notify();
        Ok(())
    }

    /// Ends tracking, committing the open session if there is one.
    ///
    /// Returns the commit when a session was open, `None` when stopping from
    /// paused.
    pub fn stop(&mut self) -> Result<Option<Commit>, TrackerError> {
        let commit = match self.phase {
            Phase::Stopped => {
                tracing::info!("stop refused: no active session");
                return Err(TrackerError::NoActiveSession);
            }
            Phase::Paused => {
                self.phase = Phase::Stopped;
                self.scheduler.cancel();
                None
            }
            Phase::Started { .. } => self.close_session(Phase::Stopped),
        };
        tracing::info!(secs = commit.as_ref().map(|c| c.secs), "tracking stopped");
        self.notify();
        Ok(commit)
    }

    /// Handles one scheduled tick.
    ///
    /// Ticks from another epoch, or arriving while not started, are ignored.
    pub fn tick(&mut self, epoch: Epoch) -> TickOutcome {
        if epoch != self.epoch || !matches!(self.phase, Phase::Started { .. }) {
            tracing::debug!(%epoch, current = %self.epoch, "ignoring stale tick");
            return TickOutcome::Stale;
        }

        self.notify();

        let threshold = self.idle_threshold_secs;
        let Phase::Started { idle_secs, .. } = &mut self.phase else {
            return TickOutcome::Stale;
        };
        if threshold > 0 {
            *idle_secs = idle_secs.saturating_add(1);
        }
        let idle = *idle_secs;

        if threshold > 0 && idle > threshold {
            tracing::info!(idle_secs = idle, threshold, "idle threshold exceeded");
            if let Ok(commit) = self.pause() {
                return TickOutcome::AutoPaused(commit);
            }
        }
        TickOutcome::Counted { idle_secs: idle }
    }

    /// Records user activity. Does not change state.
    pub fn reset_idle_time(&mut self) {
        if let Phase::Started { idle_secs, .. } = &mut self.phase {
            *idle_secs = 0;
        }
    }

    /// Recomputes the bound ledger's total from its sessions.
    pub fn recompute(&mut self) -> Result<Recomputed, TrackerError> {
        let ledger = self.ledger.as_mut().ok_or(TrackerError::UnboundStorage)?;
        let previous = ledger.total_time();
        let persist_error = ledger.recompute_total_time().err();
        if let Some(err) = &persist_error {
            tracing::warn!(%err, "recomputed total was not persisted");
        }
        Ok(Recomputed {
            previous,
            total: ledger.total_time(),
            persist_error,
        })
    }

    /// Rebinds to another storage location, or unbinds with `None`.
    ///
    /// Tracking is forced to stopped first; an open session is committed to
    /// the old ledger before the new one is loaded. If loading fails the
    /// tracker is left unbound.
    pub fn set_storage(
        &mut self,
        storage: Option<StorageIdentity>,
    ) -> Result<Option<Commit>, TrackerError> {
        let commit = match self.phase {
            Phase::Started { .. } => self.close_session(Phase::Stopped),
            Phase::Paused => {
                self.phase = Phase::Stopped;
                self.scheduler.cancel();
                None
            }
            Phase::Stopped => None,
        };

        let previous = self.ledger.take();
        tracing::info!(
            from = ?previous.as_ref().map(|l| l.identity().to_string()),
            to = ?storage.as_ref().map(ToString::to_string),
            "rebinding storage"
        );
        drop(previous);

        let bound = storage
            .map(|identity| open_ledger(identity, &self.store))
            .transpose()
            .map(|ledger| self.ledger = ledger);
        self.notify();
        bound.map(|()| commit)
    }

    fn open_session(&mut self) {
        self.phase = Phase::Started {
            session: Session::open(self.clock.now()),
            idle_secs: 0,
        };
        self.epoch = self.epoch.next();
        self.scheduler.schedule(self.epoch);
    }

    fn close_session(&mut self, next: Phase) -> Option<Commit> {
        // Started is only reachable with a ledger bound.
        let ledger = self.ledger.as_mut()?;
        if !matches!(self.phase, Phase::Started { .. }) {
            return None;
        }
        let Phase::Started { mut session, .. } = std::mem::replace(&mut self.phase, next) else {
            return None;
        };
        self.scheduler.cancel();

        if let Err(err) = session.stop(self.clock.now()) {
            tracing::error!(%err, "open session was already closed");
        }
        let secs = session.final_secs().unwrap_or(0);

        let persist_error = ledger.add_session(session.clone()).err();
        match &persist_error {
            None => tracing::info!(secs, "session committed"),
            Some(err) => tracing::warn!(secs, %err, "session committed in memory only"),
        }

        Some(Commit {
            session,
            secs,
            persist_error,
        })
    }

    fn notify(&mut self) {
        if let Some(mut notifier) = self.notifier.take() {
            notifier(self);
            self.notifier = Some(notifier);
        }
    }
}

fn open_ledger(
    identity: StorageIdentity,
    store: &Rc<dyn LedgerStore>,
) -> Result<Ledger, TrackerError> {
    Ledger::open(identity.clone(), Rc::clone(store))
        .map_err(|source| TrackerError::Load { identity, source })
}
