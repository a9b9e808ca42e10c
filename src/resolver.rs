use std::path::{Component, Path, PathBuf};

use crate::types::LinkTarget;

/// Classify a raw target string and resolve it against its owning document.
///
/// `source` is the owning document's repository-relative path. `root_abs`
/// is the absolute repository root, needed to re-express `file:///` URLs
/// as repository-relative paths.
pub fn resolve(raw_target: &str, source: &Path, root_abs: &Path) -> LinkTarget {
    if raw_target.is_empty() {
        return LinkTarget::Malformed {
            reason: "empty target".to_string(),
        };
    }

    if raw_target.starts_with("http://")
        || raw_target.starts_with("https://")
        || raw_target.starts_with("mailto:")
    {
        return LinkTarget::External;
    }

    if raw_target.starts_with('#') {
        return LinkTarget::Anchor;
    }

    let (path_part, fragment) = split_fragment(raw_target);

    if let Some(rest) = path_part.strip_prefix("file://") {
        return resolve_file_url(rest, root_abs, fragment);
    }

    if looks_like_scheme(path_part) {
        return LinkTarget::Malformed {
            reason: format!("unsupported scheme in `{raw_target}`"),
        };
    }

    let source_dir = source.parent().unwrap_or(Path::new(""));
    let path = normalize_path(&source_dir.join(path_part));

    LinkTarget::Local { fragment, path }
}

/// Re-express a repository-relative target path relative to a document
/// directory, walking up with `..` components past the shared prefix.
/// Purely lexical; both inputs must be repository-relative.
pub fn relative_from(target: &Path, owner_dir: &Path) -> PathBuf {
    let target_components: Vec<Component<'_>> = target.components().collect();
    let owner_components: Vec<Component<'_>> = owner_dir.components().collect();

    let shared = target_components
        .iter()
        .zip(owner_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in owner_components.iter().skip(shared) {
        out.push("..");
    }
    for component in target_components.iter().skip(shared) {
        out.push(component);
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Render a repository-relative path plus optional fragment as link target text.
pub fn render_target(path: &Path, fragment: Option<&str>) -> String {
    let path_str = path.to_string_lossy();
    match fragment {
        None => path_str.into_owned(),
        Some(frag) => format!("{path_str}#{frag}"),
    }
}

/// A colon before any slash marks a scheme-like target (`ftp://`, `data:`).
/// Single letters are excluded so Windows-style drive paths stay path-like.
fn looks_like_scheme(target: &str) -> bool {
    let Some((head, _)) = target.split_once(':') else {
        return false;
    };
    head.len() > 1 && !head.contains('/') && head.chars().all(|c| c.is_ascii_alphabetic())
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    components.iter().collect()
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(
    components: &mut Vec<Component<'a>>,
    component: Component<'a>,
) {
    match component {
        Component::CurDir => {}
        Component::ParentDir => {
            let can_pop = matches!(
                components.last(),
                Some(c) if !matches!(c, Component::ParentDir)
            );
            if can_pop { components.pop(); } else { components.push(component); }
        }
        other => components.push(other),
    }
}

/// Strip the scheme from a `file://` URL and re-express it under the root.
/// URLs with a host portion or pointing outside the root are malformed:
/// they cannot be given a repository-relative identity.
fn resolve_file_url(rest: &str, root_abs: &Path, fragment: Option<String>) -> LinkTarget {
    if !rest.starts_with('/') {
        return LinkTarget::Malformed {
            reason: format!("file URL without absolute path: `file://{rest}`"),
        };
    }

    let absolute = PathBuf::from(rest);
    match absolute.strip_prefix(root_abs) {
        Ok(relative) => LinkTarget::Local {
            fragment,
            path: relative.to_path_buf(),
        },
        Err(_) => LinkTarget::Malformed {
            reason: format!("file URL outside repository root: `file://{rest}`"),
        },
    }
}

/// Split an anchor fragment off a target. The fragment is preserved as
/// written and never validated against heading existence.
fn split_fragment(raw: &str) -> (&str, Option<String>) {
    match raw.split_once('#') {
        None => (raw, None),
        Some((path, frag)) => (path, Some(frag.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;

    #[test]
    fn external_urls_are_classified() {
        let src = Path::new("docs/guide.md");
        let root = Path::new("/repo");
        assert_eq!(resolve("https://example.com/a.md", src, root), LinkTarget::External);
        assert_eq!(resolve("http://example.com", src, root), LinkTarget::External);
        assert_eq!(resolve("mailto:team@example.com", src, root), LinkTarget::External);
    }

    #[test]
    fn pure_anchor_is_not_a_file_reference() {
        let src = Path::new("docs/guide.md");
        assert_eq!(resolve("#overview", src, Path::new("/repo")), LinkTarget::Anchor);
    }

    #[test]
    fn bare_target_resolves_relative_to_owning_document() {
        let target = resolve("patterns/cqrs.md", Path::new("docs/guide.md"), Path::new("/repo"));
        assert_eq!(
            target,
            LinkTarget::Local {
                fragment: None,
                path: PathBuf::from("docs/patterns/cqrs.md"),
            }
        );
    }

    #[test]
    fn dot_and_dotdot_targets_normalize() {
        let root = Path::new("/repo");
        let target = resolve("./intro.md", Path::new("docs/guide.md"), root);
        assert_eq!(
            target,
            LinkTarget::Local { fragment: None, path: PathBuf::from("docs/intro.md") }
        );

        let target = resolve("../skills/README.md", Path::new("docs/guide.md"), root);
        assert_eq!(
            target,
            LinkTarget::Local { fragment: None, path: PathBuf::from("skills/README.md") }
        );
    }

    #[test]
    fn fragment_is_preserved_not_validated() {
        let target = resolve("arch.md#layered", Path::new("docs/guide.md"), Path::new("/repo"));
        assert_eq!(
            target,
            LinkTarget::Local {
                fragment: Some("layered".to_string()),
                path: PathBuf::from("docs/arch.md"),
            }
        );
    }

    #[test]
    fn file_url_inside_root_becomes_repo_relative() {
        let target = resolve(
            "file:///repo/skills/README.md",
            Path::new("docs/guide.md"),
            Path::new("/repo"),
        );
        assert_eq!(
            target,
            LinkTarget::Local { fragment: None, path: PathBuf::from("skills/README.md") }
        );
    }

    #[test]
    fn file_url_outside_root_is_malformed() {
        let target = resolve(
            "file:///elsewhere/a.md",
            Path::new("docs/guide.md"),
            Path::new("/repo"),
        );
        assert!(matches!(target, LinkTarget::Malformed { .. }));
    }

    #[test]
    fn empty_and_unknown_scheme_targets_are_malformed() {
        let src = Path::new("docs/guide.md");
        let root = Path::new("/repo");
        assert!(matches!(resolve("", src, root), LinkTarget::Malformed { .. }));
        assert!(matches!(resolve("ftp://host/a.md", src, root), LinkTarget::Malformed { .. }));
    }

    #[test]
    fn relative_from_walks_up_past_shared_prefix() {
        assert_eq!(
            relative_from(Path::new("architecture/README.md"), Path::new("skills")),
            PathBuf::from("../architecture/README.md")
        );
        assert_eq!(
            relative_from(Path::new("docs/a/x.md"), Path::new("docs/b")),
            PathBuf::from("../a/x.md")
        );
        assert_eq!(
            relative_from(Path::new("docs/x.md"), Path::new("docs")),
            PathBuf::from("x.md")
        );
        assert_eq!(
            relative_from(Path::new("x.md"), Path::new("")),
            PathBuf::from("x.md")
        );
    }

    #[test]
    fn render_target_appends_fragment() {
        assert_eq!(render_target(Path::new("a/b.md"), None), "a/b.md");
        assert_eq!(render_target(Path::new("a/b.md"), Some("top")), "a/b.md#top");
    }
}
