//! CLI subcommand implementations.

pub mod find;
pub mod recompute;
pub mod sessions;
pub mod status;
pub mod track;
