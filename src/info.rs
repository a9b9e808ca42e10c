use std::path::PathBuf;

use serde::Serialize;

/// Output the comprehensive docmove reference document.
pub fn run(json: bool) {
    let root = PathBuf::from(".");
    let config_found = root.join(".docmove.toml").exists();

    if json {
        print_json(config_found);
    } else {
        print_markdown(config_found);
    }
}

// ── Markdown output ───────────────────────────────────────────────────

fn print_markdown(config_found: bool) {
    let version = env!("CARGO_PKG_VERSION");
    print!(
        "\
# docmove {version}

Link-safe markdown reorganizer: move files, rewrite every cross-reference
that the move affects, and verify that no link in the tree is broken.

## Link Forms Recognized

    [label](path/to/file.md)            inline link
    [label](path/to/file.md#heading)    inline link with anchor
    [label]: path/to/file.md            reference-style definition
    file:///abs/path/inside/repo.md     bare file URL in prose

## Workflow

    docmove check                         Verify all links (exit 0/1)
    docmove plan add plan.toml OLD NEW    Build up a plan file
    docmove plan plan.toml                Preview expansion and rewrites
    docmove apply plan.toml               Move, rewrite, verify
    docmove apply -m OLD=NEW              Same, with inline pairs
    docmove watch                         Re-check on every change

## Plan Format (plan.toml)

    [[move]]
    from = \"skills/README.md\"          # file or directory
    to = \"architecture/README.md\"

## Configuration (.docmove.toml)

    include = [\"docs/\"]                 # only scan these paths
    exclude = [\"docs/archive/\"]         # skip these paths

## Current State

"
    );

    if config_found {
        println!("Config: .docmove.toml (found)");
    } else {
        println!("Config: .docmove.toml (not found)");
    }
    println!();
    print_markdown_exit_codes();
}

fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | Clean: no broken references |
| 1    | Broken references remain |
| 2    | Invalid move plan (nothing was touched) |
| 3    | Runtime error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct InfoJson {
    version: String,
    link_forms: Vec<String>,
    exit_codes: Vec<ExitCodeInfo>,
    current_state: StateJson,
}

#[derive(Serialize)]
struct ExitCodeInfo {
    code: u8,
    meaning: String,
}

#[derive(Serialize)]
struct StateJson {
    config_found: bool,
}

fn print_json(config_found: bool) {
    let info = InfoJson {
        version: env!("CARGO_PKG_VERSION").to_string(),
        link_forms: vec![
            "[label](path/to/file.md)".to_string(),
            "[label]: path/to/file.md".to_string(),
            "file:///abs/path/inside/repo.md".to_string(),
        ],
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "Clean: no broken references".to_string() },
            ExitCodeInfo { code: 1, meaning: "Broken references remain".to_string() },
            ExitCodeInfo {
                code: 2,
                meaning: "Invalid move plan (nothing was touched)".to_string(),
            },
            ExitCodeInfo { code: 3, meaning: "Runtime error".to_string() },
        ],
        current_state: StateJson { config_found },
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
