mod commands;
mod config;
mod diagnostics;
mod error;
mod info;
mod integrity;
mod plan;
mod resolver;
mod rewrite;
mod scanner;
mod types;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "docmove", about = "Link-safe markdown reorganizer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move files per the plan, rewrite affected links, then verify
    Apply {
        /// TOML plan file with [[move]] entries
        plan: Option<PathBuf>,
        /// Inline move pair, repeatable
        #[arg(short = 'm', long = "move", value_name = "OLD=NEW")]
        moves: Vec<String>,
        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Verify every link in the tree resolves; writes nothing
    Check {
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Print the reference document for docmove
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a plan and preview its expansion; writes nothing
    Plan {
        #[command(subcommand)]
        action: Option<PlanAction>,
        /// TOML plan file with [[move]] entries
        plan: Option<PathBuf>,
        /// Inline move pair, repeatable
        #[arg(short = 'm', long = "move", value_name = "OLD=NEW")]
        moves: Vec<String>,
        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Re-run check whenever scanned files change
    Watch {
        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

#[derive(Subcommand)]
enum PlanAction {
    /// Append a move pair to a plan file, creating it if needed
    Add {
        /// Plan file to edit
        plan: PathBuf,
        /// Repository-relative source path (file or directory)
        from: PathBuf,
        /// Repository-relative destination path
        to: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply { plan, moves, root } => commands::apply(&root, plan.as_deref(), &moves),
        Commands::Check { format, root } => commands::check(&root, &format),
        Commands::Info { json } => {
            info::run(json);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Plan { action: Some(PlanAction::Add { plan, from, to }), .. } => {
            commands::plan_add(&plan, &from, &to)
        },
        Commands::Plan { action: None, plan, moves, root } => {
            commands::preview(&root, plan.as_deref(), &moves)
        },
        Commands::Watch { root } => watch::run(&root),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            exit_code_for(&e)
        },
    }
}

/// Exit code priority: 2 = invalid plan (tree untouched), 3 = runtime error.
fn exit_code_for(e: &error::Error) -> ExitCode {
    if e.is_plan_invalid() {
        return ExitCode::from(2);
    }
    ExitCode::from(3)
}
