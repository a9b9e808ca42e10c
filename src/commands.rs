//! Core CLI commands for docmove: check, plan preview, plan editing, apply.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;

use crate::config::Config;
use crate::error::Error;
use crate::integrity::{self, IntegrityReport};
use crate::plan;
use crate::rewrite;
use crate::scanner::{self, ScanWarning};
use crate::types::RewriteResult;

/// Run the full pipeline: scan, validate and expand the plan, move files,
/// patch links, re-scan, report. Phases are strictly sequential; plan
/// validation failures propagate before anything is touched.
///
/// # Errors
///
/// Returns plan-validation errors (exit 2 at the CLI) or `Error::Io`.
pub fn apply(root: &Path, plan_path: Option<&Path>, inline_moves: &[String]) -> Result<ExitCode, Error> {
    let root_abs = std::fs::canonicalize(root)?;
    let config = Config::load(root)?;

    // Phases 1-2: snapshot the tree and its link graph.
    let snapshot = scanner::scan(root, &config)?;

    // Phase 3: expand and validate the plan against the snapshot.
    let entries = plan::load(plan_path, inline_moves)?;
    let moveplan = plan::expand(&entries, root)?;
    let rewrites = plan::compute_rewrites(root, &root_abs, &moveplan, &snapshot);

    // Phase 4: moves. Phase 5: patches, fed from the pre-move snapshot
    // keyed by each document's post-move path.
    let moved = rewrite::apply_moves(root, &moveplan)?;
    let originals: BTreeMap<PathBuf, &str> = snapshot
        .documents
        .iter()
        .map(|d| return (moveplan.final_path(&d.path).to_path_buf(), d.text.as_str()))
        .collect();
    let mut results = rewrite::apply_patches(root, &rewrites.patches, &originals);
    merge_unresolved(&mut results, &rewrites.unresolved);

    // Phase 6: re-scan the final tree and report.
    let final_snapshot = scanner::scan(root, &config)?;
    let report = integrity::check(root, &root_abs, &final_snapshot);

    print_warnings(&snapshot.warnings);
    print_rewrite_results(&results, moved);
    print_integrity(&report);

    // Exit code priority: broken (1) > clean (0). Plan errors exited earlier.
    if report.is_clean() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(1));
}

/// Scan the tree and verify every reference resolves. Writes nothing.
///
/// # Errors
///
/// Returns `Error::Io` or `Error::TomlDe` from config loading or scanning.
pub fn check(root: &Path, format: &str) -> Result<ExitCode, Error> {
    let root_abs = std::fs::canonicalize(root)?;
    let config = Config::load(root)?;
    let snapshot = scanner::scan(root, &config)?;
    let report = integrity::check(root, &root_abs, &snapshot);

    if format == "json" {
        print_json_report(&snapshot.warnings, &report);
    } else {
        print_warnings(&snapshot.warnings);
        print_integrity(&report);
    }

    if report.is_clean() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(1));
}

/// Fold unresolved-reference counts into the per-document results.
fn merge_unresolved(results: &mut Vec<RewriteResult>, unresolved: &BTreeMap<PathBuf, usize>) {
    for (path, count) in unresolved {
        if let Some(existing) = results.iter_mut().find(|r| &r.path == path) {
            existing.unresolved = *count;
        } else {
            results.push(RewriteResult {
                failure: None,
                path: path.clone(),
                rewritten: 0,
                unresolved: *count,
            });
        }
    }
    results.sort_by(|a, b| return a.path.cmp(&b.path));
    return;
}

/// Append a move pair to a plan file, creating the file if needed.
///
/// # Errors
///
/// Returns `Error::PlanParse` or `Error::Io` from the plan file edit.
pub fn plan_add(plan_path: &Path, from: &Path, to: &Path) -> Result<ExitCode, Error> {
    plan::append_to_file(plan_path, from, to)?;
    eprintln!("Added move: {} -> {}", from.display(), to.display());
    return Ok(ExitCode::SUCCESS);
}

/// Validate a plan and print its expansion and predicted rewrites. Writes nothing.
///
/// # Errors
///
/// Returns plan-validation errors (exit 2 at the CLI) or `Error::Io`.
pub fn preview(root: &Path, plan_path: Option<&Path>, inline_moves: &[String]) -> Result<ExitCode, Error> {
    let root_abs = std::fs::canonicalize(root)?;
    let config = Config::load(root)?;
    let snapshot = scanner::scan(root, &config)?;

    let entries = plan::load(plan_path, inline_moves)?;
    let moveplan = plan::expand(&entries, root)?;
    if moveplan.is_empty() {
        println!("Plan is empty; nothing would move.");
        return Ok(ExitCode::SUCCESS);
    }
    let rewrites = plan::compute_rewrites(root, &root_abs, &moveplan, &snapshot);

    for (from, to) in &moveplan.moves {
        println!("{} -> {}", from.display(), to.display());
    }

    let moves = moveplan.len();
    let patches = rewrites.patches.len();
    let unresolved: usize = rewrites.unresolved.values().copied().sum();
    println!();
    println!("{moves} move(s), {patches} link rewrite(s) planned, {unresolved} unresolved");
    return Ok(ExitCode::SUCCESS);
}

/// Print broken and malformed references, then a one-line summary.
fn print_integrity(report: &IntegrityReport) {
    for m in &report.malformed {
        println!(
            "warning: {}:{} malformed reference `{}` ({})",
            m.file.display(),
            m.line,
            m.target,
            m.reason
        );
    }
    for b in &report.broken {
        println!("BROKEN  {}:{} {}", b.file.display(), b.line, b.target);
    }

    let ok = report.ok;
    let broken = report.broken.len();
    let external = report.external;
    if broken > 0 {
        println!();
        println!("{ok} ok, {broken} broken, {external} external");
    } else {
        println!("All {ok} references resolve ({external} external skipped)");
    }
    return;
}

/// Machine-readable form of a check run.
#[derive(Serialize)]
struct CheckJson<'a> {
    report: &'a IntegrityReport,
    warnings: Vec<String>,
}

/// Print the integrity report as JSON on stdout.
fn print_json_report(warnings: &[ScanWarning], report: &IntegrityReport) {
    let out = CheckJson {
        report,
        warnings: warnings
            .iter()
            .map(|w| return format!("{}: {}", w.path.display(), w.message))
            .collect(),
    };
    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&out).unwrap_or_default();
    println!("{json}");
    return;
}

/// Print per-document rewrite outcomes after an apply.
fn print_rewrite_results(results: &[RewriteResult], moved: usize) {
    println!("Moved {moved} file(s)");
    for result in results {
        match &result.failure {
            Some(reason) => println!(
                "warning: {} not rewritten ({reason})",
                result.path.display()
            ),
            None => println!(
                "rewrote {} reference(s), {} unresolved  {}",
                result.rewritten,
                result.unresolved,
                result.path.display()
            ),
        }
    }
    println!();
    return;
}

/// Print scan warnings (encoding failures) ahead of any report.
fn print_warnings(warnings: &[ScanWarning]) {
    for warning in warnings {
        println!("warning: {}: {}", warning.path.display(), warning.message);
    }
    return;
}
