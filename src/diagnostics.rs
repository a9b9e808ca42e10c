use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and how to fix it.
/// Designed to be readable by both humans and LLM agents.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::DanglingMove { destination, src } => format!("\
# Error: Dangling Move

Moving `{}` would overwrite `{}`, which already exists and is not part
of the plan.

## Fix

Pick a different destination, or add a move that relocates `{}` first.
", src.display(), destination.display(), destination.display()),

        Error::DuplicateSource { path } => format!("\
# Error: Duplicate Source

`{}` appears more than once in the plan.

## Fix

Keep a single `[[move]]` entry per source path.
", path.display()),

        Error::InvalidMoveArg { arg } => format!("\
# Error: Invalid Move Argument

`{arg}` is not in `OLD=NEW` form.

## Fix

    docmove apply --move old/path.md=new/path.md
"),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),

        Error::MissingSource { path } => format!("\
# Error: Plan Source Not Found

`{}` does not exist in the repository.

## Fix

Check the `from` paths in your plan; they are repository-relative.
", path.display()),

        Error::OverlappingMove { ancestor, descendant } => format!("\
# Error: Overlapping Moves

`{}` already moves everything under it, including `{}`.

## Fix

Remove the nested entry; a directory move carries its contents.
", ancestor.display(), descendant.display()),

        Error::PlanCollision { destination, first, second } => format!("\
# Error: Plan Collision

Both `{}` and `{}` map to `{}`.

## Fix

Give each source a distinct destination. Nothing has been moved.
", first.display(), second.display(), destination.display()),

        Error::PlanNotFound { path } => format!("\
# Error: Plan File Not Found

`{}` does not exist.

## Fix

Create it with:

    docmove plan add {} old/path.md new/path.md
", path.display(), path.display()),

        Error::PlanParse { file, reason } => format!("\
# Error: Plan Parse Failed

Could not parse `{}`: {reason}

## Fix

A plan file is a list of `[[move]]` tables:

    [[move]]
    from = \"old/path.md\"
    to = \"new/path.md\"
", file.display()),

        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}
"),

        Error::WatchSetup { reason } => format!("\
# Error: Watch Setup Failed

{reason}
"),
    }
}
