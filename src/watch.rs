//! File watcher: runs `check` on startup, then re-runs on tree changes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands;
use crate::config::Config;
use crate::error::Error;
use crate::scanner;

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// Collect the parent directories of every scanned document, plus the root.
///
/// # Errors
///
/// Returns errors from scanning.
fn collect_watch_dirs(root: &Path, config: &Config) -> Result<HashSet<PathBuf>, Error> {
    let snapshot = scanner::scan(root, config)?;
    let mut dirs = HashSet::new();
    dirs.insert(root.to_path_buf());
    for document in &snapshot.documents {
        if let Some(parent) = document.path.parent()
            && !parent.as_os_str().is_empty()
        {
            dirs.insert(root.join(parent));
        }
    }
    return Ok(dirs);
}

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::WatchSetup` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<()>,
) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return Error::WatchSetup { reason: e.to_string() };
    });
}

/// Entry point for the watch command.
///
/// Runs an initial check, then watches document directories and re-checks
/// on changes.
///
/// # Errors
///
/// Returns errors from config loading, scanning, or watcher setup.
pub fn run(root: &Path) -> Result<ExitCode, Error> {
    eprintln!("watch: initial check");
    let mut last_code = run_check(root);

    let config = Config::load(root)?;
    let watch_dirs = collect_watch_dirs(root, &config)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;

    for dir in &watch_dirs {
        if dir.exists() {
            let _ = watcher.watch(dir, RecursiveMode::NonRecursive);
        }
    }

    let dir_count = watch_dirs.len();
    eprintln!("watch: monitoring {dir_count} directories, press Ctrl+C to stop");

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, re-checking...");
        last_code = run_check(root);
    }

    return Ok(last_code);
}

/// Run check once and print the result. Returns the exit code from check.
fn run_check(root: &Path) -> ExitCode {
    return match commands::check(root, "text") {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(3_u8)
        },
    };
}
