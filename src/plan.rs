//! Move-plan loading, expansion, validation, and rewrite planning.
//!
//! Validation happens entirely before any mutation: a plan that fails here
//! leaves the tree byte-identical to its pre-run state.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::Error;
use crate::integrity;
use crate::resolver;
use crate::scanner::Snapshot;
use crate::types::{LinkKind, LinkTarget, Patch, Reference};

/// A single old-path/new-path pair as written by the user.
/// `from` may name a directory; expansion turns it into file-level moves.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveEntry {
    /// Repository-relative source path (file or directory).
    pub from: PathBuf,
    /// Repository-relative destination path.
    pub to: PathBuf,
}

/// Raw TOML structure of a plan file: repeated `[[move]]` tables.
#[derive(Debug, Default, Deserialize)]
struct PlanFile {
    #[serde(default, rename = "move")]
    moves: Vec<MoveEntry>,
}

/// A validated, file-level move plan. Construction via `expand` guarantees
/// unique sources, unique destinations, and sources that exist on disk.
#[derive(Debug, Default)]
pub struct MovePlan {
    /// File-level old path -> new path, ordered by source path.
    pub moves: BTreeMap<PathBuf, PathBuf>,
}

impl MovePlan {
    /// The post-move path of `path`: its mapping if it moves, itself otherwise.
    pub fn final_path<'a>(&'a self, path: &'a Path) -> &'a Path {
        return self.moves.get(path).map_or(path, PathBuf::as_path);
    }

    /// Whether the plan contains no moves.
    pub fn is_empty(&self) -> bool {
        return self.moves.is_empty();
    }

    /// Number of file-level moves in the plan.
    pub fn len(&self) -> usize {
        return self.moves.len();
    }
}

/// Rewrite instructions computed from an immutable pre-move snapshot.
pub struct RewritePlan {
    /// Queued text replacements, ordered by (file, line, column).
    pub patches: Vec<Patch>,
    /// Per post-move document: references whose target neither moves nor
    /// exists. Left textually untouched so pre-existing breakage stays visible.
    pub unresolved: BTreeMap<PathBuf, usize>,
}

/// Append a move pair to a plan file, preserving existing formatting and
/// comments. Creates the file if it doesn't exist.
///
/// # Errors
///
/// Returns `Error::PlanParse` if the file is not valid TOML or `move` is
/// not an array of tables, or `Error::Io` on read/write failure.
pub fn append_to_file(plan_path: &Path, from: &Path, to: &Path) -> Result<(), Error> {
    let content = match std::fs::read_to_string(plan_path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::Io(e)),
    };

    let mut doc: toml_edit::DocumentMut =
        content.parse().map_err(|e: toml_edit::TomlError| {
            return Error::PlanParse {
                file: plan_path.to_path_buf(),
                reason: e.to_string(),
            };
        })?;

    let item = doc
        .entry("move")
        .or_insert(toml_edit::Item::ArrayOfTables(toml_edit::ArrayOfTables::new()));
    let Some(tables) = item.as_array_of_tables_mut() else {
        return Err(Error::PlanParse {
            file: plan_path.to_path_buf(),
            reason: "`move` is not an array of tables".to_string(),
        });
    };

    let mut table = toml_edit::Table::new();
    table.insert("from", toml_edit::value(from.to_string_lossy().as_ref()));
    table.insert("to", toml_edit::value(to.to_string_lossy().as_ref()));
    tables.push(table);

    std::fs::write(plan_path, doc.to_string())?;
    return Ok(());
}

/// Compute every text patch the plan requires, from the snapshot alone.
///
/// A reference is patched when its resolved target moves, or when its
/// owning document moves and the relative expression changes. The new
/// target re-expresses the same final absolute path relative to the
/// owner's post-move directory; fragments are preserved verbatim.
pub fn compute_rewrites(
    root: &Path,
    root_abs: &Path,
    plan: &MovePlan,
    snapshot: &Snapshot,
) -> RewritePlan {
    let mut patches = Vec::new();
    let mut unresolved: BTreeMap<PathBuf, usize> = BTreeMap::new();

    for reference in &snapshot.references {
        let resolved = resolver::resolve(&reference.raw_target, &reference.source, root_abs);
        let LinkTarget::Local { fragment, path } = resolved else {
            continue;
        };
        plan_reference(
            root,
            root_abs,
            plan,
            reference,
            &path,
            fragment.as_deref(),
            &mut patches,
            &mut unresolved,
        );
    }

    patches.sort_by(|a, b| {
        return (&a.file, a.line, a.span.start).cmp(&(&b.file, b.line, b.span.start));
    });
    return RewritePlan { patches, unresolved };
}

/// Expand user-level entries to a validated file-level plan.
///
/// Directory entries become one move per contained file, preserving the
/// relative substructure. Entries mapping a path to itself are dropped.
///
/// # Errors
///
/// Returns `Error::DuplicateSource`, `Error::OverlappingMove`,
/// `Error::MissingSource`, `Error::PlanCollision`, or `Error::DanglingMove`.
/// All are raised before any file is touched.
pub fn expand(entries: &[MoveEntry], root: &Path) -> Result<MovePlan, Error> {
    validate_sources(entries)?;

    let mut moves: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    let mut by_destination: HashMap<PathBuf, PathBuf> = HashMap::new();

    for entry in entries {
        if entry.from == entry.to {
            continue;
        }
        let source_abs = root.join(&entry.from);
        if source_abs.is_dir() {
            expand_directory(root, entry, &mut moves, &mut by_destination)?;
        } else if source_abs.is_file() {
            insert_move(entry.from.clone(), entry.to.clone(), &mut moves, &mut by_destination)?;
        } else {
            return Err(Error::MissingSource { path: entry.from.clone() });
        }
    }

    // A destination may pre-exist only if it is itself moving away.
    for (source, destination) in &moves {
        if root.join(destination).exists() && !moves.contains_key(destination) {
            return Err(Error::DanglingMove {
                destination: destination.clone(),
                src: source.clone(),
            });
        }
    }

    return Ok(MovePlan { moves });
}

/// Read plan entries from an optional TOML file plus inline `OLD=NEW` pairs.
///
/// # Errors
///
/// Returns `Error::PlanNotFound` if the plan file doesn't exist,
/// `Error::TomlDe` if it is malformed, `Error::InvalidMoveArg` for a
/// malformed inline pair, or `Error::Io` on other read failures.
pub fn load(plan_path: Option<&Path>, inline_moves: &[String]) -> Result<Vec<MoveEntry>, Error> {
    let mut entries = Vec::new();

    if let Some(path) = plan_path {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::PlanNotFound { path: path.to_path_buf() });
            }
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let file: PlanFile = toml::from_str(&content)?;
        entries.extend(file.moves);
    }

    for arg in inline_moves {
        entries.push(parse_inline(arg)?);
    }

    return Ok(entries);
}

/// Expand one directory-level entry into per-file moves.
///
/// # Errors
///
/// Returns `Error::PlanCollision` or `Error::DuplicateSource` from insertion.
fn expand_directory(
    root: &Path,
    entry: &MoveEntry,
    moves: &mut BTreeMap<PathBuf, PathBuf>,
    by_destination: &mut HashMap<PathBuf, PathBuf>,
) -> Result<(), Error> {
    let source_abs = root.join(&entry.from);
    for file in WalkDir::new(&source_abs)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let rel = file.path().strip_prefix(&source_abs).unwrap_or(file.path());
        insert_move(entry.from.join(rel), entry.to.join(rel), moves, by_destination)?;
    }
    return Ok(());
}

/// Insert one file-level move, rejecting duplicate sources and destinations.
///
/// # Errors
///
/// Returns `Error::PlanCollision` if the destination is already claimed,
/// or `Error::DuplicateSource` if the source is already mapped.
fn insert_move(
    from: PathBuf,
    to: PathBuf,
    moves: &mut BTreeMap<PathBuf, PathBuf>,
    by_destination: &mut HashMap<PathBuf, PathBuf>,
) -> Result<(), Error> {
    if let Some(first) = by_destination.get(&to) {
        return Err(Error::PlanCollision {
            destination: to,
            first: first.clone(),
            second: from,
        });
    }
    by_destination.insert(to.clone(), from.clone());

    if moves.insert(from.clone(), to).is_some() {
        return Err(Error::DuplicateSource { path: from });
    }
    return Ok(());
}

/// Parse an inline `OLD=NEW` move argument.
///
/// # Errors
///
/// Returns `Error::InvalidMoveArg` if the separator or either side is missing.
fn parse_inline(arg: &str) -> Result<MoveEntry, Error> {
    let Some((from, to)) = arg.split_once('=') else {
        return Err(Error::InvalidMoveArg { arg: arg.to_string() });
    };
    if from.is_empty() || to.is_empty() {
        return Err(Error::InvalidMoveArg { arg: arg.to_string() });
    }
    return Ok(MoveEntry {
        from: PathBuf::from(from),
        to: PathBuf::from(to),
    });
}

/// Decide what, if anything, a single local reference needs after the plan.
/// Markdown link targets become relative paths; bare prose URLs keep their
/// absolute `file://` form so the prose keeps reading as a URL.
fn plan_reference(
    root: &Path,
    root_abs: &Path,
    plan: &MovePlan,
    reference: &Reference,
    target: &Path,
    fragment: Option<&str>,
    patches: &mut Vec<Patch>,
    unresolved: &mut BTreeMap<PathBuf, usize>,
) {
    let owner_moves = plan.moves.contains_key(&reference.source);
    let target_moves = plan.moves.contains_key(target);
    if !owner_moves && !target_moves {
        return;
    }

    let final_owner = plan.final_path(&reference.source).to_path_buf();

    // A target that neither moves nor exists is pre-existing breakage:
    // count it, leave the text alone, let the integrity checker report it.
    if !target_moves && !integrity::exists_in_tree(root, target) {
        let count = unresolved.entry(final_owner).or_default();
        *count = count.saturating_add(1);
        return;
    }

    let final_target = plan.final_path(target);
    let new_text = if reference.kind == LinkKind::BareFileUrl {
        render_file_url(root_abs, final_target, fragment)
    } else {
        let owner_dir = final_owner.parent().unwrap_or(Path::new(""));
        let new_path = resolver::relative_from(final_target, owner_dir);
        resolver::render_target(&new_path, fragment)
    };

    if new_text == reference.raw_target {
        return;
    }
    patches.push(Patch {
        file: final_owner,
        line: reference.line,
        new_text,
        old_text: reference.raw_target.clone(),
        span: reference.span.clone(),
    });
}

/// Render an absolute `file://` URL for a repository-relative target.
fn render_file_url(root_abs: &Path, target: &Path, fragment: Option<&str>) -> String {
    let absolute = root_abs.join(target);
    return match fragment {
        None => format!("file://{}", absolute.display()),
        Some(frag) => format!("file://{}#{frag}", absolute.display()),
    };
}

/// Reject duplicate sources and entries where one source contains another.
///
/// # Errors
///
/// Returns `Error::DuplicateSource` or `Error::OverlappingMove`.
fn validate_sources(entries: &[MoveEntry]) -> Result<(), Error> {
    for (i, a) in entries.iter().enumerate() {
        for b in entries.iter().skip(i.saturating_add(1)) {
            if a.from == b.from {
                return Err(Error::DuplicateSource { path: a.from.clone() });
            }
            if b.from.starts_with(&a.from) {
                return Err(Error::OverlappingMove {
                    ancestor: a.from.clone(),
                    descendant: b.from.clone(),
                });
            }
            if a.from.starts_with(&b.from) {
                return Err(Error::OverlappingMove {
                    ancestor: b.from.clone(),
                    descendant: a.from.clone(),
                });
            }
        }
    }
    return Ok(());
}
