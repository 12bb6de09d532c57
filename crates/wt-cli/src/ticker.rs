//! Tokio-backed tick scheduling.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use wt_core::{Epoch, TickScheduler};

/// Tracker ticks are once per second.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Spawns one interval task per schedule, sending epoch-stamped ticks over a
/// channel that the host loop feeds back into the tracker.
///
/// Cancelling aborts the task. Ticks already sitting in the channel still
/// arrive, and the tracker drops them by epoch.
#[derive(Debug)]
pub struct IntervalScheduler {
    period: Duration,
    tx: mpsc::UnboundedSender<Epoch>,
    task: Option<JoinHandle<()>>,
}

impl IntervalScheduler {
    /// Must be used from within a tokio runtime.
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<Epoch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            period,
            tx,
            task: None,
        };
        (scheduler, rx)
    }
}

impl TickScheduler for IntervalScheduler {
    fn schedule(&mut self, epoch: Epoch) {
        self.cancel();
        let tx = self.tx.clone();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(epoch).is_err() {
                    break;
                }
            }
        }));
        tracing::debug!(%epoch, "tick schedule started");
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("tick schedule cancelled");
        }
    }
}

impl Drop for IntervalScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
