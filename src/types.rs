/// Core domain types for documents, references, and rewrite results.
use std::ops::Range;
use std::path::PathBuf;

/// A markdown file captured during the scan phase. The path is
/// repository-relative and serves as the document's identity; content
/// is an immutable snapshot taken before any mutation.
#[derive(Debug, Clone)]
pub struct Document {
    /// Repository-relative path of the file.
    pub path: PathBuf,
    /// Raw UTF-8 text at scan time.
    pub text: String,
}

/// Syntactic form a reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// A bare `file:///` URL embedded directly in prose.
    BareFileUrl,
    /// A markdown inline link `[label](target)`.
    Inline,
    /// A markdown reference-style definition `[label]: target`.
    RefDef,
}

/// Resolution of a raw target string against its owning document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A pure in-document anchor (`#section`). Never validated against headings.
    Anchor,
    /// An external URL (`http://`, `https://`, `mailto:`).
    External,
    /// A repository-relative file path.
    Local {
        /// Anchor fragment as written, without the leading `#`.
        fragment: Option<String>,
        /// Normalized repository-relative target path.
        path: PathBuf,
    },
    /// A target that cannot be classified. Reported, never silently dropped.
    Malformed {
        /// Why classification failed.
        reason: String,
    },
}

/// A queued text replacement produced by the move planner. Spans are
/// byte offsets within a single line, so unrelated text is never touched.
#[derive(Debug, Clone)]
pub struct Patch {
    /// Document path after moves are applied.
    pub file: PathBuf,
    /// One-based line number the span lives on.
    pub line: u32,
    /// Replacement text for the span.
    pub new_text: String,
    /// Text expected at the span. A mismatch aborts the whole file.
    pub old_text: String,
    /// Byte-column span of the old text within its line.
    pub span: Range<u32>,
}

/// One hyperlink occurrence inside a document.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Syntactic form of the reference.
    pub kind: LinkKind,
    /// One-based line number in the owning document.
    pub line: u32,
    /// Raw target string exactly as written, fragment included.
    pub raw_target: String,
    /// Owning document path, repository-relative.
    pub source: PathBuf,
    /// Byte-column span of the raw target within its line.
    pub span: Range<u32>,
}

/// Per-document outcome of the rewrite phase.
#[derive(Debug, Clone)]
pub struct RewriteResult {
    /// Why the file could not be rewritten, if it couldn't.
    pub failure: Option<String>,
    /// Document path after moves.
    pub path: PathBuf,
    /// References rewritten in this document.
    pub rewritten: usize,
    /// References left untouched because their target neither moves nor exists.
    pub unresolved: usize,
}
