//! Locate ledgers below a directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::{DirEntry, WalkDir};
use wt_core::{LedgerStore, StorageIdentity};
use wt_db::{JsonFileStore, SqliteStore};

use crate::config::{Backend, Config};
use crate::display::format_hms;

const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules"];

fn is_skipped(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Walks `root` for files named `file_name`, sorted by path.
pub fn find_ledger_files(root: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry));
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file() && entry.file_name() == file_name {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

fn find_in_database(config: &Config, root: &Path) -> Result<Vec<PathBuf>> {
    if !config.database_path.exists() {
        return Ok(Vec::new());
    }
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let identities = store
        .list_identities()
        .context("failed to list ledgers")?;
    Ok(identities
        .into_iter()
        .map(PathBuf::from)
        .filter(|path| path.starts_with(root))
        .collect())
}

/// Prints every ledger below `dir` with its recorded total.
pub fn run<W: Write>(writer: &mut W, config: &Config, dir: &Path) -> Result<()> {
    let root = std::path::absolute(dir)
        .with_context(|| format!("failed to resolve {}", dir.display()))?;

    let (paths, store): (Vec<PathBuf>, Box<dyn LedgerStore>) = match config.backend {
        Backend::File => (
            find_ledger_files(&root, &config.data_file_name)?,
            Box::new(JsonFileStore::new()),
        ),
        Backend::Sqlite => {
            let paths = find_in_database(config, &root)?;
            if paths.is_empty() {
                (paths, Box::new(JsonFileStore::new()))
            } else {
                (paths, Box::new(SqliteStore::open(&config.database_path)?))
            }
        }
    };

    if paths.is_empty() {
        writeln!(writer, "No ledgers found under {}.", root.display())?;
        return Ok(());
    }

    for path in paths {
        let identity = StorageIdentity::new(&path)?;
        match store.load(&identity) {
            Ok(data) => {
                let data = data.unwrap_or_default();
                writeln!(
                    writer,
                    "{}  {}  ({} sessions)",
                    format_hms(data.total_time),
                    identity,
                    data.sessions.len()
                )?;
            }
            Err(err) => {
                tracing::warn!(%identity, error = %err, "skipping unreadable ledger");
                writeln!(writer, "unreadable  {identity}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use insta::assert_snapshot;

    fn write_ledger(path: &Path, json: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, json).unwrap();
    }

    #[test]
    fn finds_ledgers_and_skips_build_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write_ledger(&root.join("b/.timetracker"), "{}");
        write_ledger(&root.join("a/nested/.timetracker"), "{}");
        write_ledger(&root.join("target/debug/.timetracker"), "{}");
        write_ledger(&root.join("c/.git/.timetracker"), "{}");
        write_ledger(&root.join("c/other.json"), "{}");

        let found = find_ledger_files(root, ".timetracker").unwrap();
        assert_eq!(
            found,
            vec![
                root.join("a/nested/.timetracker"),
                root.join("b/.timetracker")
            ]
        );
    }

    #[test]
    fn run_prints_totals_and_flags_unreadable_files() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write_ledger(
            &root.join("app/.timetracker"),
            r#"{"sessions":[{"startedAt":"2025-01-01T09:00:00Z","endedAt":"2025-01-01T09:02:00Z"}],"totalTime":120}"#,
        );
        write_ledger(&root.join("broken/.timetracker"), "not json");

        let mut output = Vec::new();
        run(&mut output, &Config::default(), root).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&root.display().to_string(), "[TEMP]");
        assert_snapshot!(output, @r"
        00:02:00  [TEMP]/app/.timetracker  (1 sessions)
        unreadable  [TEMP]/broken/.timetracker
        ");
    }

    #[test]
    fn sqlite_backend_lists_stored_identities() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            backend: Backend::Sqlite,
            database_path: temp.path().join("wt.db"),
            ..Config::default()
        };
        let inside = StorageIdentity::new(temp.path().join("work/.timetracker")).unwrap();
        let outside = StorageIdentity::new("/elsewhere/.timetracker").unwrap();
        let store = SqliteStore::open(&config.database_path).unwrap();
        store.save(&inside, &wt_core::LedgerData::default()).unwrap();
        store.save(&outside, &wt_core::LedgerData::default()).unwrap();
        drop(store);

        let found = find_in_database(&config, temp.path()).unwrap();
        assert_eq!(found, vec![inside.as_path().to_path_buf()]);
    }

    #[test]
    fn empty_directory() {
        let temp = tempfile::tempdir().unwrap();
        let mut output = Vec::new();
        run(&mut output, &Config::default(), temp.path()).unwrap();
        assert!(String::from_utf8(output).unwrap().starts_with("No ledgers found under"));
    }
}
