//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Workspace time tracker.
///
/// Measures how long you actively work in a workspace, pausing automatically
/// when you go idle, and keeps the totals in a ledger next to your code.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Selects the ledger a command works on.
#[derive(Debug, Clone, Default, Args)]
pub struct LedgerArgs {
    /// Workspace directory holding the ledger (defaults to the current directory).
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// Explicit ledger file, overriding --workspace.
    #[arg(short, long, conflicts_with = "workspace")]
    pub file: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track time in the foreground until stopped.
    ///
    /// Reads commands from stdin, one per line: pause, resume, start, stop,
    /// recompute, status, `use <path>`, `idle <secs>`, quit. Any other line
    /// counts as activity. EOF or Ctrl-C stops tracking.
    Track {
        #[command(flatten)]
        ledger: LedgerArgs,

        /// Override the idle threshold in seconds (0 disables auto-pause).
        #[arg(long)]
        idle_threshold: Option<u32>,

        /// Bind the ledger but wait for a `start` command.
        #[arg(long)]
        no_start: bool,
    },

    /// Show the recorded total for a ledger.
    Status {
        #[command(flatten)]
        ledger: LedgerArgs,
    },

    /// List recorded sessions.
    Sessions {
        #[command(flatten)]
        ledger: LedgerArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Recompute a ledger's total from its sessions.
    Recompute {
        #[command(flatten)]
        ledger: LedgerArgs,
    },

    /// Find ledger files below a directory.
    Find {
        /// Directory to search (defaults to the current directory).
        dir: Option<PathBuf>,
    },
}
