/// Crate-level error types for docmove diagnostics.
use std::path::PathBuf;

/// All errors in docmove carry enough context to produce a useful diagnostic
/// without a debugger. Plan-validation variants are raised before any file
/// is moved or written, so they never leave the tree partially migrated.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A planned destination already exists on disk and is not itself moving.
    #[error(
        "dangling move: destination {} already exists (source {})",
        destination.display(),
        src.display()
    )]
    DanglingMove {
        /// Destination path that already exists outside the plan.
        destination: PathBuf,
        /// Source path whose move would clobber it.
        src: PathBuf,
    },

    /// The same source path appears twice in the plan.
    #[error("duplicate source in plan: {}", path.display())]
    DuplicateSource {
        /// Source path listed more than once.
        path: PathBuf,
    },

    /// An inline `--move` argument is not in `OLD=NEW` form.
    #[error("invalid --move argument `{arg}` (expected OLD=NEW)")]
    InvalidMoveArg {
        /// The argument as given on the command line.
        arg: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A plan source path does not exist on disk.
    #[error("plan source not found: {}", path.display())]
    MissingSource {
        /// Source path that does not exist.
        path: PathBuf,
    },

    /// One plan source is an ancestor of another, so the subtree split is ambiguous.
    #[error(
        "overlapping moves: {} contains {}",
        ancestor.display(),
        descendant.display()
    )]
    OverlappingMove {
        /// The enclosing source path.
        ancestor: PathBuf,
        /// The source path nested inside it.
        descendant: PathBuf,
    },

    /// Two distinct sources map to the same destination after expansion.
    #[error(
        "plan collision: {} and {} both map to {}",
        first.display(),
        second.display(),
        destination.display()
    )]
    PlanCollision {
        /// The duplicated destination path.
        destination: PathBuf,
        /// First source mapping to the destination.
        first: PathBuf,
        /// Second source mapping to the destination.
        second: PathBuf,
    },

    /// The given plan file does not exist on disk.
    #[error("plan file not found: {}", path.display())]
    PlanNotFound {
        /// Path to the missing plan file.
        path: PathBuf,
    },

    /// A plan file exists but cannot be parsed as TOML.
    #[error("plan parse failed: {}: {reason}", file.display())]
    PlanParse {
        /// Plan file that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The filesystem watcher could not be created or attached.
    #[error("watch setup failed: {reason}")]
    WatchSetup {
        /// Description of the watcher failure.
        reason: String,
    },
}

impl Error {
    /// Whether this error invalidates the move plan before any mutation.
    /// These map to exit code 2: the tree is guaranteed untouched.
    pub fn is_plan_invalid(&self) -> bool {
        return matches!(
            self,
            Error::DanglingMove { .. }
                | Error::DuplicateSource { .. }
                | Error::InvalidMoveArg { .. }
                | Error::MissingSource { .. }
                | Error::OverlappingMove { .. }
                | Error::PlanCollision { .. }
                | Error::PlanNotFound { .. }
                | Error::PlanParse { .. }
                | Error::TomlDe(_)
        );
    }
}
