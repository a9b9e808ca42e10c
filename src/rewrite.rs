//! Rewrite execution: file moves first, then per-file text patches.
//!
//! Moves run in two phases (stage out, then place) so plans that swap or
//! rotate paths never clobber a file. Patching works from the scan
//! snapshot, not the live tree, and is all-or-nothing per file: a file is
//! written once after every patch lands in memory, so a failure leaves it
//! byte-identical on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::plan::MovePlan;
use crate::types::{Patch, RewriteResult};

/// Execute every file move in the plan. Destination parents are created;
/// source directories left empty are removed afterwards.
///
/// # Errors
///
/// Returns `Error::Io` if a rename or directory creation fails.
pub fn apply_moves(root: &Path, plan: &MovePlan) -> Result<usize, Error> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::new();

    for (index, (from, to)) in plan.moves.iter().enumerate() {
        let stage = root.join(format!(".docmove-stage-{index}"));
        std::fs::rename(root.join(from), &stage)?;
        staged.push((stage, to));
    }

    for (stage, to) in &staged {
        let destination = root.join(to);
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(stage, &destination)?;
    }

    remove_emptied_dirs(root, plan);
    return Ok(staged.len());
}

/// Apply queued patches, grouped so each file is written once. Original
/// text comes from `originals`, the scan snapshot keyed by post-move path.
/// Per-file failures are collected in the results, never fatal.
pub fn apply_patches(
    root: &Path,
    patches: &[Patch],
    originals: &BTreeMap<PathBuf, &str>,
) -> Vec<RewriteResult> {
    let mut by_file: BTreeMap<PathBuf, Vec<&Patch>> = BTreeMap::new();
    for patch in patches {
        by_file.entry(patch.file.clone()).or_default().push(patch);
    }

    let mut results = Vec::new();
    for (file, mut file_patches) in by_file {
        // Right-to-left within the file so earlier spans stay valid.
        file_patches.sort_by(|a, b| (b.line, b.span.start).cmp(&(a.line, a.span.start)));
        results.push(patch_one_file(root, &file, &file_patches, originals));
    }
    return results;
}

/// Replace one span on one line, verifying the expected text first.
///
/// # Errors
///
/// Returns a description when the line or span no longer matches the scan.
fn apply_patch_to_lines(lines: &mut [String], patch: &Patch) -> Result<(), String> {
    let idx = usize::try_from(patch.line).unwrap_or(0).saturating_sub(1);
    let Some(line) = lines.get_mut(idx) else {
        return Err(format!("line {} out of range", patch.line));
    };

    let start = usize::try_from(patch.span.start).unwrap_or(usize::MAX);
    let end = usize::try_from(patch.span.end).unwrap_or(usize::MAX);
    if line.get(start..end) != Some(patch.old_text.as_str()) {
        return Err(format!(
            "line {} does not match scan, expected `{}`",
            patch.line, patch.old_text
        ));
    }

    line.replace_range(start..end, &patch.new_text);
    return Ok(());
}

/// A rewrite result for a file that could not be safely rewritten.
fn failed(file: &Path, reason: String) -> RewriteResult {
    return RewriteResult {
        failure: Some(reason),
        path: file.to_path_buf(),
        rewritten: 0,
        unresolved: 0,
    };
}

/// Apply all of one file's patches to its snapshot text, then write once.
fn patch_one_file(
    root: &Path,
    file: &Path,
    patches: &[&Patch],
    originals: &BTreeMap<PathBuf, &str>,
) -> RewriteResult {
    let Some(content) = originals.get(file) else {
        return failed(file, "file missing from scan snapshot".to_string());
    };

    let mut lines: Vec<String> = content.lines().map(String::from).collect();
    for patch in patches {
        if let Err(reason) = apply_patch_to_lines(&mut lines, patch) {
            // Nothing has been written; the on-disk file is untouched.
            return failed(file, reason);
        }
    }

    let mut output = lines.join("\n");
    if content.ends_with('\n') {
        output.push('\n');
    }
    if let Err(e) = std::fs::write(root.join(file), output) {
        return failed(file, format!("write failed: {e}"));
    }

    return RewriteResult {
        failure: None,
        path: file.to_path_buf(),
        rewritten: patches.len(),
        unresolved: 0,
    };
}

/// Remove source directories emptied by the moves, deepest first.
/// Non-empty directories are left alone.
fn remove_emptied_dirs(root: &Path, plan: &MovePlan) {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for from in plan.moves.keys() {
        let mut current = from.parent();
        while let Some(dir) = current {
            if !dir.as_os_str().is_empty() {
                dirs.push(dir.to_path_buf());
            }
            current = dir.parent();
        }
    }
    dirs.sort();
    dirs.dedup();
    dirs.reverse();

    for dir in &dirs {
        let _ = std::fs::remove_dir(root.join(dir));
    }
    return;
}
