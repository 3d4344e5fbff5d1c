use anyhow::Result;
use catalog_advisor_core::AnalysisConfig;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Parse CLI arguments first to get verbosity level
    let cli = Cli::parse();

    // Initialize tracing with appropriate verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = AnalysisConfig::load(cli.config.as_deref())?;
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Analyze(args) => {
            info!("Analyze command: {:?}", args);
            runtime.block_on(cli::commands::analyze::execute(args, config))?;
        }
        Commands::Status(args) => {
            info!("Status command");
            runtime.block_on(cli::commands::status::execute(args, config))?;
        }
        Commands::Cache(command) => {
            info!("Cache command: {:?}", command);
            runtime.block_on(cli::commands::cache::handle_cache_command(command, config))?;
        }
    }

    Ok(())
}
