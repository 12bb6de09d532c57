//! Workspace time tracker CLI library.
//!
//! Hosts the tracking engine from `wt-core` in a terminal: a tokio tick
//! source, stdin commands, status rendering, and the configured store.

mod cli;
pub mod commands;
mod config;
pub mod display;
pub mod ticker;
pub mod workspace;

pub use cli::{Cli, Commands, LedgerArgs};
pub use config::{Backend, Config};
