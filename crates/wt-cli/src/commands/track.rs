//! Foreground tracking loop.
//!
//! This is the host side of the tracker: it owns the tick channel, turns
//! stdin lines into lifecycle calls or activity signals, and redraws the
//! status line whenever the tracker notifies.

use std::future::Future;
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use wt_core::{
    Commit, Epoch, SystemClock, TickOutcome, Tracker, TrackerError, TrackerSettings, TrackerState,
};

use crate::cli::LedgerArgs;
use crate::config::Config;
use crate::display::{StatusRenderer, format_hms, status_line};
use crate::ticker::{IntervalScheduler, TICK_PERIOD};
use crate::workspace;

/// Runs the track command until stdin closes, `quit`, or Ctrl-C.
///
/// Tracking starts immediately when both `start` and `config.auto_start` are
/// set; otherwise the ledger is bound and the loop waits for `start`.
pub async fn run(
    config: &Config,
    ledger: &LedgerArgs,
    idle_threshold: Option<u32>,
    start: bool,
) -> Result<()> {
    let identity = workspace::resolve_identity(config, ledger)?;
    let store = workspace::open_store(config)?;

    if !config.auto_create_file && !workspace::ledger_exists(config, store.as_ref(), &identity)? {
        anyhow::bail!(
            "No time tracking data at {identity}. Create it or set auto_create_file = true."
        );
    }

    let (scheduler, ticks) = IntervalScheduler::new(TICK_PERIOD);
    let settings = TrackerSettings {
        idle_threshold_secs: idle_threshold.unwrap_or(config.idle_threshold_secs),
        storage: Some(identity.clone()),
    };
    let mut tracker = Tracker::new(settings, store, Rc::new(SystemClock), Box::new(scheduler))?;

    let stderr_is_terminal = std::io::stderr().is_terminal();
    let mut renderer = StatusRenderer::new(config.compact_status, stderr_is_terminal);
    tracker.set_notifier(move |t| {
        let _ = renderer.render(&t.status(), &mut std::io::stderr());
    });

    let mut out = std::io::stdout();
    if start && config.auto_start {
        tracker.start()?;
        writeln!(out, "Time tracking started for {identity}")?;
    } else {
        writeln!(out, "Time tracking ready for {identity}. Enter `start` to begin.")?;
    }
    tracing::info!(
        %identity,
        idle_threshold_secs = tracker.idle_threshold_secs(),
        state = %tracker.state(),
        "tracking in foreground"
    );

    let input = BufReader::new(tokio::io::stdin());
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    run_loop(&mut tracker, ticks, input, shutdown, &mut out).await?;

    if stderr_is_terminal {
        eprintln!();
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Drives the tracker from ticks and input lines until input ends, `quit`,
/// or `shutdown` resolves, then stops any active tracking.
pub async fn run_loop<R, S, W>(
    tracker: &mut Tracker,
    mut ticks: mpsc::UnboundedReceiver<Epoch>,
    input: R,
    shutdown: S,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
    W: Write,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            Some(epoch) = ticks.recv() => {
                if let TickOutcome::AutoPaused(commit) = tracker.tick(epoch) {
                    writeln!(out, "Paused after {} idle", format_hms(u64::from(tracker.idle_threshold_secs())))?;
                    report_commit(&commit, out)?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    tracing::debug!("input closed");
                    break;
                };
                if handle_line(tracker, &line, out)? == Flow::Quit {
                    break;
                }
            }
            () = &mut shutdown => {
                tracing::debug!("interrupted");
                break;
            }
        }
    }

    if tracker.state() != TrackerState::Stopped {
        let commit = tracker.stop()?;
        if let Some(commit) = commit {
            report_commit(&commit, out)?;
        }
        writeln!(out, "Time tracking stopped")?;
    }
    Ok(())
}

fn handle_line<W: Write>(tracker: &mut Tracker, line: &str, out: &mut W) -> Result<Flow> {
    let line = line.trim();
    let (command, arg) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(c, a)| (c, a.trim()));

    let result = match command {
        "quit" | "exit" => return Ok(Flow::Quit),
        "start" => tracker.start().map(|()| writeln!(out, "Time tracking started")),
        "pause" => tracker.pause().map(|commit| report_commit(&commit, out)),
        "resume" | "continue" => tracker.resume().map(|()| writeln!(out, "Time tracking resumed")),
        "stop" => tracker.stop().map(|commit| {
            if let Some(commit) = commit {
                report_commit(&commit, out)?;
            }
            writeln!(out, "Time tracking stopped")
        }),
        "recompute" => tracker.recompute().map(|r| {
            if let Some(err) = &r.persist_error {
                writeln!(out, "Warning: {err}")?;
            }
            writeln!(
                out,
                "Total recomputed: {} -> {}",
                format_hms(r.previous),
                format_hms(r.total)
            )
        }),
        "idle" if !arg.is_empty() => match arg.parse::<u32>() {
            Ok(secs) => {
                tracker.set_idle_threshold_secs(secs);
                Ok(writeln!(out, "Idle threshold set to {}", format_hms(u64::from(secs))))
            }
            Err(_) => Ok(writeln!(out, "Invalid idle threshold: {arg}")),
        },
        "status" => {
            writeln!(out, "{}", status_line(&tracker.status(), false))?;
            Ok(Ok(()))
        }
        "use" if !arg.is_empty() => {
            let identity = match workspace::identity_for(Path::new(arg)) {
                Ok(identity) => identity,
                Err(err) => {
                    writeln!(out, "{err:#}")?;
                    return Ok(Flow::Continue);
                }
            };
            tracker.set_storage(Some(identity.clone())).map(|commit| {
                if let Some(commit) = commit {
                    report_commit(&commit, out)?;
                }
                writeln!(out, "Time Tracker will now use {identity}.")
            })
        }
        _ => {
            on_activity(tracker, out)?;
            Ok(Ok(()))
        }
    };

    match result {
        Ok(written) => written?,
        Err(TrackerError::UnboundStorage) => {
            tracing::debug!(command, "refused: no storage bound");
        }
        Err(err) => writeln!(out, "{err}")?,
    }
    Ok(Flow::Continue)
}

/// User activity: keeps an active session alive, or resumes a paused one.
fn on_activity<W: Write>(tracker: &mut Tracker, out: &mut W) -> Result<()> {
    match tracker.state() {
        TrackerState::Started => tracker.reset_idle_time(),
        TrackerState::Paused => {
            tracker.resume()?;
            writeln!(out, "Time tracking resumed")?;
        }
        TrackerState::Stopped => {}
    }
    Ok(())
}

fn report_commit<W: Write>(commit: &Commit, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Recorded session of {}", format_hms(commit.secs))?;
    if let Some(err) = &commit.persist_error {
        writeln!(out, "Warning: session kept in memory only: {err}")?;
    }
    Ok(())
}
