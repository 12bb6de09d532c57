//! Status line rendering.

use std::io::{self, Write};

use wt_core::{TrackerState, TrackerStatus};

/// Formats whole seconds as `hh:mm:ss`. Hours do not wrap at 24.
pub fn format_hms(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Human-facing label for a tracker state.
pub const fn state_label(state: TrackerState) -> &'static str {
    match state {
        TrackerState::Started => "Active",
        TrackerState::Stopped => "Inactive",
        TrackerState::Paused => "Paused",
    }
}

const fn icon(state: TrackerState, compact: bool) -> &'static str {
    match (state, compact) {
        (TrackerState::Started, false) => "▶",
        (TrackerState::Started, true) => "◷",
        (TrackerState::Stopped, false) => "■",
        (TrackerState::Stopped, true) => "",
        (TrackerState::Paused, _) => "⏸",
    }
}

/// Renders the one-line status shown while tracking.
///
/// The total includes the open session.
pub fn status_line(status: &TrackerStatus, compact: bool) -> String {
    let total = format_hms(status.total_secs());
    let current = format_hms(status.session_secs);
    let icon = icon(status.state, compact);
    if compact {
        format!("{icon}{total}+{current}")
    } else {
        format!(
            "{icon} {}   Total: {total}   Current session: {current}",
            state_label(status.state)
        )
    }
}

/// Draws status updates to a terminal or a log-like stream.
///
/// On a terminal the line is redrawn in place on every update. Otherwise a
/// line is written only when the state changes, so piped output stays short.
#[derive(Debug)]
pub struct StatusRenderer {
    compact: bool,
    redraw: bool,
    last_state: Option<TrackerState>,
}

impl StatusRenderer {
    pub const fn new(compact: bool, redraw: bool) -> Self {
        Self {
            compact,
            redraw,
            last_state: None,
        }
    }

    pub fn render<W: Write>(&mut self, status: &TrackerStatus, out: &mut W) -> io::Result<()> {
        let line = status_line(status, self.compact);
        if self.redraw {
            write!(out, "\r\x1b[2K{line}")?;
        } else if self.last_state != Some(status.state) {
            writeln!(out, "{line}")?;
        }
        self.last_state = Some(status.state);
        out.flush()
    }
}
