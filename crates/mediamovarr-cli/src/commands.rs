use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mediamovarr")]
#[command(about = "Classify downloaded media folders and move them into a library", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./mediamovarr.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify every folder under the source directories and move them
    Organize(OrganizeArgs),
    /// Classify a single folder and show how the score was reached
    Classify {
        dir: PathBuf,
        /// Show extracted features as well
        #[arg(long)]
        verbose: bool,
    },
    /// Compile the configured rules and report malformed ones
    CheckRules,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Source directory (repeatable, replaces the configured list)
    #[arg(long = "source")]
    pub sources: Vec<String>,
    /// Library root
    #[arg(long)]
    pub dest: Option<String>,
    /// Plan and report without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,
    /// Overwrite destinations whose content differs
    #[arg(long)]
    pub force: bool,
    /// Never prompt; medium-confidence folders are skipped
    #[arg(long, visible_alias = "non-interactive")]
    pub yes: bool,
    /// Disable metadata lookups for this run
    #[arg(long)]
    pub no_metadata: bool,
    /// Print the adjustment trace of every folder
    #[arg(long)]
    pub verbose: bool,
    /// Write a per-folder CSV report
    #[arg(long)]
    pub report_csv: Option<PathBuf>,
}
