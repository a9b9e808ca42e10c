//! Post-run link validation: classify every reference as OK, BROKEN,
//! or external. Pure with respect to the tree; safe to run any number
//! of times.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::resolver;
use crate::scanner::Snapshot;
use crate::types::LinkTarget;

/// A reference whose resolved target does not exist.
#[derive(Debug, Clone, Serialize)]
pub struct BrokenRef {
    /// Owning document, repository-relative.
    pub file: PathBuf,
    /// One-based line number of the reference.
    pub line: u32,
    /// Resolved repository-relative path that does not exist.
    pub resolved: PathBuf,
    /// Raw target as written in the document.
    pub target: String,
}

/// A link-like token that could not be classified.
#[derive(Debug, Clone, Serialize)]
pub struct MalformedRef {
    /// Owning document, repository-relative.
    pub file: PathBuf,
    /// One-based line number of the token.
    pub line: u32,
    /// Why classification failed.
    pub reason: String,
    /// Raw target as written in the document.
    pub target: String,
}

/// The full classification of one scan. Broken and malformed lists are
/// complete, never truncated, so one run's output fixes everything.
#[derive(Debug, Serialize)]
pub struct IntegrityReport {
    /// All broken references, in document order.
    pub broken: Vec<BrokenRef>,
    /// Count of external URLs and in-document anchors (informational).
    pub external: usize,
    /// All malformed references, in document order.
    pub malformed: Vec<MalformedRef>,
    /// Count of references whose target exists.
    pub ok: usize,
}

impl IntegrityReport {
    /// Whether the tree has no broken references. Malformed references
    /// are warnings and do not affect the exit signal.
    pub fn is_clean(&self) -> bool {
        return self.broken.is_empty();
    }
}

/// Resolve every reference in the snapshot and classify it.
pub fn check(root: &Path, root_abs: &Path, snapshot: &Snapshot) -> IntegrityReport {
    let mut broken = Vec::new();
    let mut malformed = Vec::new();
    let mut external = 0usize;
    let mut ok = 0usize;

    for reference in &snapshot.references {
        match resolver::resolve(&reference.raw_target, &reference.source, root_abs) {
            LinkTarget::Anchor | LinkTarget::External => external = external.saturating_add(1),
            LinkTarget::Local { path, .. } => {
                if exists_in_tree(root, &path) {
                    ok = ok.saturating_add(1);
                } else {
                    broken.push(BrokenRef {
                        file: reference.source.clone(),
                        line: reference.line,
                        resolved: path,
                        target: reference.raw_target.clone(),
                    });
                }
            }
            LinkTarget::Malformed { reason } => malformed.push(MalformedRef {
                file: reference.source.clone(),
                line: reference.line,
                reason,
                target: reference.raw_target.clone(),
            }),
        }
    }

    return IntegrityReport { broken, external, malformed, ok };
}

/// Whether a repository-relative path exists inside the tree.
/// Paths that escape the root (leading `..`) never exist by definition.
pub fn exists_in_tree(root: &Path, path: &Path) -> bool {
    if path.components().next() == Some(Component::ParentDir) {
        return false;
    }
    return root.join(path).exists();
}
