//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tsmend",
    version,
    about = "Diagnostic-driven source rewriting",
    long_about = "tsmend — apply ordered, regex-based fix steps to a TypeScript tree, guided by type-checker diagnostics.\n\nConfiguration precedence: CLI > tsmend.toml > defaults.",
    after_help = "Examples:\n  tsmend run --path server --dry-run --diff\n  tsmend run --step 1,2 --verify\n  tsmend steps\n  tsmend check --path server",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current tsmend version.")]
    Version,
    /// Apply fix steps
    #[command(
        about = "Apply fix steps",
        long_about = "Run the selected fix steps over every matching file, writing backups before overwriting. With --dry-run nothing is written.",
        after_help = "Examples:\n  tsmend run --dry-run\n  tsmend run --include ts --step 2 --verify --strict"
    )]
    Run {
        #[arg(long, help = "Target directory or file (default: repository root)")]
        path: Option<String>,
        #[arg(long = "dry-run", alias = "dryrun", action = clap::ArgAction::SetTrue, help = "Report changes without writing")]
        dry_run: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Log per-rule activity and list zero-count rules")]
        verbose: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Re-run the checker afterwards and compare counts")]
        verify: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "With --verify, exit 1 when diagnostics remain")]
        strict: bool,
        #[arg(long, value_delimiter = ',', help = "File extensions to include (default: ts,tsx)")]
        include: Vec<String>,
        #[arg(long = "step", value_delimiter = ',', help = "Step priorities to run (default: all)")]
        steps: Option<Vec<u32>>,
        #[arg(long, help = "Worker threads (default: number of CPUs)")]
        jobs: Option<usize>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Show unified diffs for dry-run changes")]
        diff: bool,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, help = "Path to a TOML fix catalog (default: built-in)")]
        catalog: Option<String>,
    },
    /// List fix steps
    #[command(
        about = "List fix steps",
        long_about = "Print every step in priority order with its rules, file filters, and diagnostic scopes."
    )]
    Steps {
        #[arg(long, help = "Repository root or subdirectory (default: current dir)")]
        path: Option<String>,
        #[arg(long, help = "Path to a TOML fix catalog (default: built-in)")]
        catalog: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Collect diagnostics only
    #[command(
        about = "Collect diagnostics",
        long_about = "Run the configured checker and summarize diagnostics by code. Files are not modified."
    )]
    Check {
        #[arg(long, help = "Repository root or subdirectory (default: current dir)")]
        path: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Print every parsed diagnostic")]
        verbose: bool,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
}
