//! Lists the sessions recorded in a ledger.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use wt_core::{LedgerData, LedgerStore, StorageIdentity};

use crate::display::format_hms;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRow {
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    duration_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSessions<'a> {
    ledger: &'a StorageIdentity,
    sessions: Vec<SessionRow>,
    total_time: u64,
}

fn rows(data: &LedgerData) -> Vec<SessionRow> {
    data.sessions
        .iter()
        .map(|session| SessionRow {
            started_at: session.started_at(),
            ended_at: session.ended_at(),
            duration_secs: session.final_secs().unwrap_or(0),
        })
        .collect()
}

/// Formats sessions as a plain-text table, oldest first.
pub fn format_sessions(data: &LedgerData) -> String {
    let mut output = String::new();
    if data.sessions.is_empty() {
        output.push_str("No sessions recorded.\n");
        return output;
    }

    let _ = writeln!(output, "{:<4} {:<19}  {:<19}  {:>8}", "#", "STARTED (UTC)", "ENDED (UTC)", "DURATION");
    for (index, row) in rows(data).iter().enumerate() {
        let ended = row
            .ended_at
            .map_or_else(|| "(open)".to_string(), |t| t.format(TIME_FORMAT).to_string());
        let _ = writeln!(
            output,
            "{:<4} {:<19}  {:<19}  {:>8}",
            index + 1,
            row.started_at.format(TIME_FORMAT),
            ended,
            format_hms(row.duration_secs)
        );
    }
    let _ = writeln!(output, "\nTotal: {}", format_hms(data.total_time));
    output
}

/// Formats sessions as pretty JSON.
pub fn format_sessions_json(identity: &StorageIdentity, data: &LedgerData) -> Result<String> {
    let json = JsonSessions {
        ledger: identity,
        sessions: rows(data),
        total_time: data.total_time,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

/// Runs the sessions command.
pub fn run<W: Write>(
    writer: &mut W,
    store: &dyn LedgerStore,
    identity: &StorageIdentity,
    json: bool,
) -> Result<()> {
    let data = store
        .load(identity)
        .with_context(|| format!("failed to load {identity}"))?
        .unwrap_or_default();

    if json {
        writeln!(writer, "{}", format_sessions_json(identity, &data)?)?;
    } else {
        write!(writer, "{}", format_sessions(&data))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use wt_core::Session;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn sample() -> LedgerData {
        LedgerData {
            sessions: vec![
                Session::closed(at("2025-01-01T09:00:00Z"), at("2025-01-01T10:30:00Z")),
                Session::closed(at("2025-01-02T14:00:00Z"), at("2025-01-02T14:00:42Z")),
                Session::open(at("2025-01-03T08:00:00Z")),
            ],
            total_time: 5442,
        }
    }

    #[test]
    fn table_output() {
        assert_snapshot!(format_sessions(&sample()), @r"
        #    STARTED (UTC)        ENDED (UTC)          DURATION
        1    2025-01-01 09:00:00  2025-01-01 10:30:00  01:30:00
        2    2025-01-02 14:00:00  2025-01-02 14:00:42  00:00:42
        3    2025-01-03 08:00:00  (open)               00:00:00

        Total: 01:30:42
        ");
    }

    #[test]
    fn empty_ledger() {
        assert_eq!(format_sessions(&LedgerData::default()), "No sessions recorded.\n");
    }

    #[test]
    fn json_output() {
        let identity = StorageIdentity::new("/work/project/.timetracker").unwrap();
        let output = format_sessions_json(&identity, &sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["ledger"], "/work/project/.timetracker");
        assert_eq!(value["totalTime"], 5442);
        assert_eq!(value["sessions"][0]["durationSecs"], 5400);
        assert_eq!(value["sessions"][0]["startedAt"], "2025-01-01T09:00:00Z");
        assert!(value["sessions"][2]["endedAt"].is_null());
    }
}
