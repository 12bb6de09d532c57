//! Status command for showing what a ledger has recorded.

use std::io::Write;

use anyhow::{Context, Result};
use wt_core::{LedgerStore, StorageIdentity};

use crate::display::format_hms;

pub fn run<W: Write>(
    writer: &mut W,
    store: &dyn LedgerStore,
    identity: &StorageIdentity,
) -> Result<()> {
    let data = store
        .load(identity)
        .with_context(|| format!("failed to load {identity}"))?;

    writeln!(writer, "Time tracker status")?;
    writeln!(writer, "Ledger: {identity}")?;

    let Some(data) = data else {
        writeln!(writer, "No time tracked yet.")?;
        return Ok(());
    };

    writeln!(writer, "Sessions: {}", data.sessions.len())?;
    writeln!(writer, "Total: {}", format_hms(data.total_time))?;

    let sum = data.sum_secs();
    if sum != data.total_time {
        writeln!(
            writer,
            "Warning: sessions add up to {}; run `wt recompute` to repair the total.",
            format_hms(sum)
        )?;
    }

    Ok(())
}
