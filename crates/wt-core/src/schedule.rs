//! Tick scheduling capability.
//!
//! The tracker never owns a timer. It asks a [`TickScheduler`] to start or stop
//! delivering ticks, and the host feeds each delivered tick back through
//! [`Tracker::tick`](crate::Tracker::tick). Every schedule carries a fresh
//! [`Epoch`]; ticks stamped with any other epoch are discarded, which covers
//! ticks that were already queued when the schedule was cancelled.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Identifies one tick schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Epoch(u64);

impl Epoch {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivers one tick per second to the tracker while scheduled.
pub trait TickScheduler {
    /// Starts delivering ticks stamped with `epoch`, replacing any earlier schedule.
    fn schedule(&mut self, epoch: Epoch);

    /// Stops delivering ticks.
    fn cancel(&mut self);
}

#[derive(Debug, Default)]
struct ManualState {
    active: Option<Epoch>,
    scheduled: usize,
    cancelled: usize,
}

/// A scheduler that only records requests; ticks are delivered by hand.
///
/// Clones share state, so a test keeps one handle to inspect what the
/// tracker asked for.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The epoch currently scheduled, if ticks are running.
    pub fn active(&self) -> Option<Epoch> {
        self.state.borrow().active
    }

    pub fn schedule_count(&self) -> usize {
        self.state.borrow().scheduled
    }

    pub fn cancel_count(&self) -> usize {
        self.state.borrow().cancelled
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&mut self, epoch: Epoch) {
        let mut state = self.state.borrow_mut();
        state.active = Some(epoch);
        state.scheduled += 1;
    }

    fn cancel(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.active.take().is_some() {
            state.cancelled += 1;
        }
    }
}
