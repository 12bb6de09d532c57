//! Recompute a ledger's cached total from its sessions.

use std::io::Write;
use std::rc::Rc;

use anyhow::{Context, Result};
use wt_core::{Ledger, LedgerStore, StorageIdentity};

use crate::display::format_hms;

/// Rewrites the stored total as the sum of the recorded sessions.
///
/// A ledger that does not exist yet is left alone rather than created.
pub fn run<W: Write>(
    writer: &mut W,
    store: Rc<dyn LedgerStore>,
    identity: &StorageIdentity,
) -> Result<()> {
    let exists = store
        .load(identity)
        .with_context(|| format!("failed to load {identity}"))?
        .is_some();
    if !exists {
        writeln!(writer, "No time tracked yet at {identity}.")?;
        return Ok(());
    }

    let mut ledger = Ledger::open(identity.clone(), store)
        .with_context(|| format!("failed to load {identity}"))?;
    let previous = ledger.total_time();
    let total = ledger
        .recompute_total_time()
        .context("failed to save recomputed total")?;

    if previous == total {
        writeln!(writer, "Total unchanged: {}", format_hms(total))?;
    } else {
        writeln!(
            writer,
            "Total recomputed: {} -> {}",
            format_hms(previous),
            format_hms(total)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};
    use wt_core::{LedgerData, MemoryStore, Session};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn identity() -> StorageIdentity {
        StorageIdentity::new("/work/project/.timetracker").unwrap()
    }

    #[test]
    fn repairs_drifted_total() {
        let data = LedgerData {
            sessions: vec![
                Session::closed(at("2025-01-01T09:00:00Z"), at("2025-01-01T09:10:00Z")),
                Session::closed(at("2025-01-01T10:00:00Z"), at("2025-01-01T10:00:30Z")),
            ],
            total_time: 7,
        };
        let store = Rc::new(MemoryStore::new().with_ledger(identity(), data));

        let mut output = Vec::new();
        run(&mut output, Rc::clone(&store) as Rc<dyn LedgerStore>, &identity()).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Total recomputed: 00:00:07 -> 00:10:30\n"
        );
        assert_eq!(store.get(&identity()).unwrap().total_time, 630);
    }

    #[test]
    fn consistent_total_is_reported_unchanged() {
        let data = LedgerData {
            sessions: vec![Session::closed(
                at("2025-01-01T09:00:00Z"),
                at("2025-01-01T09:00:05Z"),
            )],
            total_time: 5,
        };
        let store = Rc::new(MemoryStore::new().with_ledger(identity(), data));

        let mut output = Vec::new();
        run(&mut output, store, &identity()).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "Total unchanged: 00:00:05\n");
    }

    #[test]
    fn missing_ledger_is_not_created() {
        let store = Rc::new(MemoryStore::new());

        let mut output = Vec::new();
        run(&mut output, Rc::clone(&store) as Rc<dyn LedgerStore>, &identity()).unwrap();

        assert!(store.get(&identity()).is_none());
        assert_eq!(store.save_count(), 0);
    }
}
