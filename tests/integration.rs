use std::path::Path;
use std::process::Command;

fn docmove(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_docmove"));
    cmd.current_dir(root);
    cmd
}

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap()
}

#[test]
fn check_clean_tree_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "docs/a.md", "[b](b.md)\n");
    write_file(dir.path(), "docs/b.md", "# B\n");

    let out = docmove(dir.path()).arg("check").output().unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stdout));
}

#[test]
fn check_reports_broken_and_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "docs/a.md", "[gone](missing.md)\n");

    let out = docmove(dir.path()).arg("check").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("BROKEN"), "missing BROKEN line: {stdout}");
    assert!(stdout.contains("docs/a.md:1"), "missing location: {stdout}");
    assert!(stdout.contains("missing.md"), "missing target: {stdout}");
}

#[test]
fn file_url_link_follows_its_moved_target() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write_file(
        &root,
        "skills/README.md",
        &format!("[skills](file://{}/skills/README.md)\n", root.display()),
    );

    let out = docmove(&root)
        .args(["apply", "-m", "skills/README.md=architecture/README.md"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stdout));

    let moved = read(&root, "architecture/README.md");
    assert_eq!(moved, "[skills](README.md)\n");

    let check = docmove(&root).arg("check").output().unwrap();
    assert_eq!(check.status.code(), Some(0));
}

#[test]
fn collision_exits_two_and_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "old/a.md", "content a\n");
    write_file(dir.path(), "old/b.md", "content b\n");
    write_file(
        dir.path(),
        "plan.toml",
        "[[move]]\nfrom = \"old/a.md\"\nto = \"new/x.md\"\n\n[[move]]\nfrom = \"old/b.md\"\nto = \"new/x.md\"\n",
    );

    let out = docmove(dir.path()).args(["apply", "plan.toml"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2), "{}", String::from_utf8_lossy(&out.stderr));

    assert_eq!(read(dir.path(), "old/a.md"), "content a\n");
    assert_eq!(read(dir.path(), "old/b.md"), "content b\n");
    assert!(!dir.path().join("new").exists());
}

#[test]
fn preexisting_breakage_survives_an_unrelated_apply() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "docs/a.md", "[gone](old/missing.md)\n");
    write_file(dir.path(), "other.md", "# Other\n");

    let out = docmove(dir.path())
        .args(["apply", "-m", "other.md=misc/other.md"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("BROKEN"), "pre-existing breakage hidden: {stdout}");

    // The broken link text itself is left alone.
    assert_eq!(read(dir.path(), "docs/a.md"), "[gone](old/missing.md)\n");
}

#[test]
fn directory_move_rewrites_inbound_links_and_stays_clean() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "README.md", "see [a](docs/a.md)\n");
    write_file(dir.path(), "docs/a.md", "[b](b.md)\n");
    write_file(dir.path(), "docs/b.md", "# B\n");

    let out = docmove(dir.path())
        .args(["apply", "-m", "docs=guides"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stdout));

    // Inbound link is re-pointed; the intra-directory link needs no change.
    assert_eq!(read(dir.path(), "README.md"), "see [a](guides/a.md)\n");
    assert_eq!(read(dir.path(), "guides/a.md"), "[b](b.md)\n");
    assert!(!dir.path().join("docs").exists());
}

#[test]
fn second_run_with_empty_plan_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "README.md", "see [a](docs/a.md)\n");
    write_file(dir.path(), "docs/a.md", "# A\n");

    let first = docmove(dir.path())
        .args(["apply", "-m", "docs/a.md=guides/a.md"])
        .output()
        .unwrap();
    assert_eq!(first.status.code(), Some(0));

    let readme_after = read(dir.path(), "README.md");
    let second = docmove(dir.path()).arg("apply").output().unwrap();
    assert_eq!(second.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&second.stdout);
    assert!(stdout.contains("Moved 0 file(s)"), "unexpected moves: {stdout}");
    assert_eq!(read(dir.path(), "README.md"), readme_after);
}

#[test]
fn moved_owner_keeps_link_to_unmoved_target() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "docs/guide.md", "[arch](arch.md)\n");
    write_file(dir.path(), "docs/arch.md", "# Arch\n");

    let out = docmove(dir.path())
        .args(["apply", "-m", "docs/guide.md=handbook/guide.md"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stdout));

    assert_eq!(read(dir.path(), "handbook/guide.md"), "[arch](../docs/arch.md)\n");

    let check = docmove(dir.path()).arg("check").output().unwrap();
    assert_eq!(check.status.code(), Some(0));
}

#[test]
fn links_inside_fenced_code_blocks_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "docs/patterns.md",
        "# Patterns\n\n```java\n// [example](missing.md)\nString s = \"file:///nope.md\";\n```\n",
    );

    let out = docmove(dir.path()).arg("check").output().unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stdout));
}

#[test]
fn plan_preview_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.md", "# A\n");

    let out = docmove(dir.path())
        .args(["plan", "-m", "a.md=sub/a.md"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("a.md -> sub/a.md"), "missing expansion: {stdout}");
    assert!(dir.path().join("a.md").is_file(), "preview must not move files");
    assert!(!dir.path().join("sub").exists());
}

#[test]
fn plan_add_builds_a_file_that_apply_accepts() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.md", "# A\n");

    let add = docmove(dir.path())
        .args(["plan", "add", "plan.toml", "a.md", "sub/a.md"])
        .output()
        .unwrap();
    assert_eq!(add.status.code(), Some(0), "{}", String::from_utf8_lossy(&add.stderr));

    let out = docmove(dir.path()).args(["apply", "plan.toml"]).output().unwrap();
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stdout));
    assert!(dir.path().join("sub/a.md").is_file());
}

#[test]
fn check_json_lists_broken_references() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.md", "[gone](missing.md)\n");

    let out = docmove(dir.path())
        .args(["check", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));

    let parsed: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("check --format json must emit valid JSON");
    let broken = parsed
        .get("report")
        .and_then(|r| r.get("broken"))
        .and_then(|b| b.as_array())
        .unwrap();
    assert_eq!(broken.len(), 1);
    assert_eq!(
        broken.first().unwrap().get("resolved").and_then(|v| v.as_str()),
        Some("missing.md")
    );
}
