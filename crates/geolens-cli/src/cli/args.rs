use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "geolens",
    version,
    about = "Daily LLM audits of brand positioning, with history and dashboards"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Settings file (geolens.yaml is used when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// fail on unknown config fields instead of warning
    #[arg(long, global = true)]
    pub strict: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Query every provider for every tracked target and append to history
    Audit(AuditArgs),
    /// Manage tracked targets
    Targets(TargetsArgs),
    /// Render the dashboard for one category and use case
    Dashboard(DashboardArgs),
    /// Inspect or reset the audit history
    History(HistoryArgs),
    /// Write a sample geolens.yaml
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AuditArgs {
    /// Run date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Answer every prompt with this file's contents instead of calling providers
    #[arg(long)]
    pub replay_file: Option<PathBuf>,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json
}

#[derive(Parser, Clone)]
pub struct TargetsArgs {
    #[command(subcommand)]
    pub cmd: TargetsSub,
}

#[derive(Subcommand, Clone)]
pub enum TargetsSub {
    List {
        #[arg(long, default_value = "text")]
        format: String,
    },
    Add {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        use_case: String,
    },
    /// Remove by brand, optionally narrowed by category and use case
    Remove {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        use_case: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct DashboardArgs {
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub use_case: Option<String>,

    /// Number of domains shown in the power ranking
    #[arg(long, default_value_t = geolens_metrics::dashboard::DEFAULT_POWER_TOP_N)]
    pub top: usize,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json
}

#[derive(Parser, Clone)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub cmd: HistorySub,
}

#[derive(Subcommand, Clone)]
pub enum HistorySub {
    /// Print the most recent rows
    Show {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Replace the history with an empty table
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    /// generate .gitignore for the local store
    #[arg(long)]
    pub gitignore: bool,
}
