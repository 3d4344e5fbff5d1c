use catalog_advisor_core::analysis::AnalysisType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "catalog-advisor",
    version,
    about = "Catalog Advisor - AI-assisted review of monorepo catalog dependency updates",
    long_about = "Catalog Advisor analyzes proposed catalog dependency updates with an installed model CLI (claude, gemini or codex) and falls back to rule-based analysis when none is available."
)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze proposed updates
    #[command(about = "Analyze a batch of proposed catalog updates")]
    Analyze(AnalyzeArgs),

    /// Show provider and cache status
    #[command(about = "Show detected providers, fallback and cache status")]
    Status(StatusArgs),

    /// Manage the analysis cache
    #[command(about = "Inspect, invalidate or clear the persistent analysis cache")]
    Cache(super::commands::cache::CacheCommand),
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// JSON file with `workspace` and `packages`
    #[arg(help = "Path to the update batch JSON file")]
    pub input: PathBuf,

    /// Analysis type (impact, security, compatibility, recommend)
    #[arg(short = 't', long = "type", default_value = "impact", value_parser = parse_analysis_type)]
    pub analysis_type: AnalysisType,

    /// Preferred provider (claude, gemini, codex, rule-engine)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Ignore cached results
    #[arg(long)]
    pub no_cache: bool,

    /// Split the batch into chunks even when it is small
    #[arg(long)]
    pub chunk: bool,

    /// Run every analysis type and merge the results
    #[arg(long, conflicts_with = "chunk")]
    pub comprehensive: bool,

    /// JSON file with vulnerability data keyed by `name@version`
    #[arg(long)]
    pub security: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_analysis_type(value: &str) -> Result<AnalysisType, String> {
    AnalysisType::parse(value).ok_or_else(|| {
        format!("unknown analysis type '{}' (expected impact, security, compatibility or recommend)", value)
    })
}
