use std::ops::Range;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::types::{Document, LinkKind, Reference};

/// Line-anchored pattern for reference-style definitions: `[label]: target`.
const REF_DEF_PATTERN: &str = r"^\s*\[[^\]]+\]:\s*(\S+)";

/// Pattern for bare `file:///` URLs embedded in prose.
const FILE_URL_PATTERN: &str = r#"file:///[^\s)\]>"'`]+"#;

/// A non-fatal problem encountered while scanning.
#[derive(Debug, Clone)]
pub struct ScanWarning {
    /// Human-readable description.
    pub message: String,
    /// File the warning concerns, repository-relative.
    pub path: PathBuf,
}

/// Immutable snapshot of the tree produced by the scan phase. Later phases
/// consume this snapshot; nothing re-reads the live tree mid-phase.
pub struct Snapshot {
    /// All scanned documents, sorted by path.
    pub documents: Vec<Document>,
    /// All extracted references, in document order within each document.
    pub references: Vec<Reference>,
    /// Non-fatal scan problems, such as encoding failures.
    pub warnings: Vec<ScanWarning>,
}

/// Scan all markdown files under `root` and extract their references.
/// Applies the config's include/exclude filters. Hidden directories are
/// skipped. Files that fail UTF-8 decoding are recorded as warnings and
/// the scan continues.
///
/// # Errors
///
/// Returns `Error::Io` for read failures other than encoding errors.
///
/// # Panics
///
/// Panics if a hardcoded pattern is invalid (compile-time invariant).
pub fn scan(root: &Path, config: &Config) -> Result<Snapshot, Error> {
    let ref_def = Regex::new(REF_DEF_PATTERN).expect("valid regex");
    let file_url = Regex::new(FILE_URL_PATTERN).expect("valid regex");

    let mut documents = Vec::new();
    let mut references = Vec::new();
    let mut warnings = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(Result::ok)
        .filter(|e| is_markdown(e.path()))
    {
        let md_path = entry.path();
        let relative = md_path.strip_prefix(root).unwrap_or(md_path).to_path_buf();

        if !config.should_scan(&relative.to_string_lossy()) {
            continue;
        }

        let text = match std::fs::read_to_string(md_path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warnings.push(ScanWarning {
                    message: "not valid UTF-8, skipped".to_string(),
                    path: relative,
                });
                continue;
            }
            Err(e) => return Err(Error::Io(e)),
        };

        references.extend(extract(&text, &relative, &ref_def, &file_url));
        documents.push(Document { path: relative, text });
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(Snapshot { documents, references, warnings })
}

/// Extract all references from a document's text, in document order
/// (ascending line, then column). Fenced code blocks are excluded so
/// link-shaped strings inside example snippets are never treated as
/// real cross-document references.
pub fn extract(
    text: &str,
    source: &Path,
    ref_def: &Regex,
    file_url: &Regex,
) -> Vec<Reference> {
    let mut out = Vec::new();
    let mut in_fence = false;

    for (idx, line) in text.lines().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let line_no = u32::try_from(idx.saturating_add(1)).unwrap_or(u32::MAX);
        extract_from_line(line, line_no, source, ref_def, file_url, &mut out);
    }

    out
}

/// Extract references from a single line: inline links first, then a
/// reference-style definition, then bare file URLs not already covered
/// by an inline target. Results are sorted by column.
fn extract_from_line(
    line: &str,
    line_no: u32,
    source: &Path,
    ref_def: &Regex,
    file_url: &Regex,
    out: &mut Vec<Reference>,
) {
    let mut found: Vec<Reference> = scan_inline_links(line)
        .into_iter()
        .map(|(span, raw_target)| Reference {
            kind: LinkKind::Inline,
            line: line_no,
            raw_target,
            source: source.to_path_buf(),
            span,
        })
        .collect();

    if found.is_empty()
        && let Some(cap) = ref_def.captures(line)
        && let Some(m) = cap.get(1)
    {
        found.push(Reference {
            kind: LinkKind::RefDef,
            line: line_no,
            raw_target: m.as_str().to_string(),
            source: source.to_path_buf(),
            span: to_span(m.start(), m.end()),
        });
    }

    for m in file_url.find_iter(line) {
        let span = to_span(m.start(), m.end());
        if found.iter().any(|r| spans_overlap(&r.span, &span)) {
            continue;
        }
        found.push(Reference {
            kind: LinkKind::BareFileUrl,
            line: line_no,
            raw_target: m.as_str().to_string(),
            source: source.to_path_buf(),
            span,
        });
    }

    found.sort_by_key(|r| r.span.start);
    out.extend(found);
}

/// Whether a directory entry is hidden (name starts with a dot).
/// The repository root itself is exempt so `.` works as a root argument.
fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Whether a path has a markdown extension.
fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "md" || ext == "markdown")
}

/// Find the matching close bracket for the `[` at `open`, depth-aware.
fn matching_close(bytes: &[u8], open: usize, open_byte: u8, close_byte: u8) -> Option<usize> {
    let mut depth = 0u32;
    let mut i = open;
    while let Some(&b) = bytes.get(i) {
        if b == open_byte {
            depth = depth.saturating_add(1);
        } else if b == close_byte {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
        i = i.saturating_add(1);
    }
    None
}

/// Scan a line for inline links `[label](target)`, returning the byte
/// span and text of each target. Bracket and paren depth are tracked so
/// targets containing balanced parens (or labels containing nested
/// brackets, as in image links) are not mis-split.
fn scan_inline_links(line: &str) -> Vec<(Range<u32>, String)> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes.get(i) != Some(&b'[') {
            i = i.saturating_add(1);
            continue;
        }
        let Some(close_bracket) = matching_close(bytes, i, b'[', b']') else {
            i = i.saturating_add(1);
            continue;
        };
        let open_paren = close_bracket.saturating_add(1);
        if bytes.get(open_paren) != Some(&b'(') {
            i = close_bracket.saturating_add(1);
            continue;
        }
        let Some(close_paren) = matching_close(bytes, open_paren, b'(', b')') else {
            i = close_bracket.saturating_add(1);
            continue;
        };

        let start = open_paren.saturating_add(1);
        let target = line.get(start..close_paren).unwrap_or("");
        out.push((to_span(start, close_paren), target.to_string()));
        i = close_paren.saturating_add(1);
    }

    out
}

/// Whether two byte spans overlap.
fn spans_overlap(a: &Range<u32>, b: &Range<u32>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Convert byte offsets to a `u32` span.
fn to_span(start: usize, end: usize) -> Range<u32> {
    let s = u32::try_from(start).unwrap_or(u32::MAX);
    let e = u32::try_from(end).unwrap_or(u32::MAX);
    s..e
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;

    fn extract_all(text: &str) -> Vec<Reference> {
        let ref_def = Regex::new(REF_DEF_PATTERN).unwrap();
        let file_url = Regex::new(FILE_URL_PATTERN).unwrap();
        extract(text, Path::new("docs/guide.md"), &ref_def, &file_url)
    }

    #[test]
    fn inline_link_yields_target_and_span() {
        let refs = extract_all("see [intro](intro.md) for details");
        assert_eq!(refs.len(), 1);
        let r = refs.first().unwrap();
        assert_eq!(r.kind, LinkKind::Inline);
        assert_eq!(r.raw_target, "intro.md");
        assert_eq!(r.line, 1);
        let start = usize::try_from(r.span.start).unwrap();
        let end = usize::try_from(r.span.end).unwrap();
        assert_eq!(&"see [intro](intro.md) for details"[start..end], "intro.md");
    }

    #[test]
    fn multiple_links_on_one_line_come_in_column_order() {
        let refs = extract_all("[a](a.md) then [b](b.md)");
        let targets: Vec<&str> = refs.iter().map(|r| r.raw_target.as_str()).collect();
        assert_eq!(targets, vec!["a.md", "b.md"]);
        assert!(refs.first().unwrap().span.start < refs.last().unwrap().span.start);
    }

    #[test]
    fn target_with_balanced_parens_is_not_mis_split() {
        let refs = extract_all("[spec](design%20(v2).md) and [note](n.md)");
        let targets: Vec<&str> = refs.iter().map(|r| r.raw_target.as_str()).collect();
        assert_eq!(targets, vec!["design%20(v2).md", "n.md"]);
    }

    #[test]
    fn image_link_with_nested_brackets_extracts_outer_target() {
        let refs = extract_all("[![badge](img.png)](status.md)");
        let targets: Vec<&str> = refs.iter().map(|r| r.raw_target.as_str()).collect();
        assert_eq!(targets, vec!["status.md"]);
    }

    #[test]
    fn reference_style_definition_is_extracted() {
        let refs = extract_all("[spec]: ../spec/overview.md#intro");
        assert_eq!(refs.len(), 1);
        let r = refs.first().unwrap();
        assert_eq!(r.kind, LinkKind::RefDef);
        assert_eq!(r.raw_target, "../spec/overview.md#intro");
    }

    #[test]
    fn bare_file_url_in_prose_is_extracted() {
        let refs = extract_all("per the notes at file:///repo/skills/README.md today");
        assert_eq!(refs.len(), 1);
        let r = refs.first().unwrap();
        assert_eq!(r.kind, LinkKind::BareFileUrl);
        assert_eq!(r.raw_target, "file:///repo/skills/README.md");
    }

    #[test]
    fn file_url_inside_inline_target_is_not_double_counted() {
        let refs = extract_all("[skills](file:///repo/skills/README.md)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.first().unwrap().kind, LinkKind::Inline);
    }

    #[test]
    fn fenced_code_blocks_are_excluded() {
        let text = "\
before [real](real.md)

```java
// [fake](missing.md) inside a snippet
String url = \"file:///repo/fake.md\";
```

after [also](also.md)
";
        let refs = extract_all(text);
        let targets: Vec<&str> = refs.iter().map(|r| r.raw_target.as_str()).collect();
        assert_eq!(targets, vec!["real.md", "also.md"]);
    }

    #[test]
    fn references_are_in_document_order() {
        let text = "[b](b.md)\n[a](a.md)\n";
        let refs = extract_all(text);
        let lines: Vec<u32> = refs.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }
}
