//! A single continuous span of tracked work.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session started at {started_at} is already closed")]
    AlreadyClosed { started_at: DateTime<Utc> },
}

/// One span of active work, open while `ended_at` is absent.
///
/// Sessions are closed at most once and never reopened. Durations are
/// clamped at zero so a clock stepping backwards never produces negative time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Opens a session starting at `at`.
    #[must_use]
    pub const fn open(at: DateTime<Utc>) -> Self {
        Self {
            started_at: at,
            ended_at: None,
        }
    }

    /// Builds an already closed session, e.g. when loading stored data.
    #[must_use]
    pub const fn closed(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ended_at: Some(ended_at),
        }
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub const fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Closes the session at `at`, freezing its duration.
    pub fn stop(&mut self, at: DateTime<Utc>) -> Result<(), SessionError> {
        if self.ended_at.is_some() {
            return Err(SessionError::AlreadyClosed {
                started_at: self.started_at,
            });
        }
        self.ended_at = Some(at);
        Ok(())
    }

    /// Elapsed time: up to `now` while open, up to `ended_at` once closed.
    pub fn current_duration(&self, now: DateTime<Utc>) -> TimeDelta {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).max(TimeDelta::zero())
    }

    /// Elapsed whole seconds as of `now`.
    pub fn current_secs(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from(self.current_duration(now).num_seconds()).unwrap_or(0)
    }

    /// Whole seconds of a closed session, `None` while open.
    pub fn final_secs(&self) -> Option<u64> {
        self.ended_at.map(|end| self.current_secs(end))
    }
}
