//! Cache command for the persistent analysis cache

use anyhow::Result;
use catalog_advisor_core::analysis::{AnalysisCache, AnalysisConfig};
use clap::{Args, Subcommand};
use tracing::{info, warn};

/// Inspect or clear cached analysis results
#[derive(Debug, Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub subcommand: CacheSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum CacheSubcommand {
    /// Show cache configuration and statistics
    Stats,

    /// Remove every cached result
    Clear,

    /// Remove cached results that mention any of the given packages
    Invalidate {
        /// Package names
        #[arg(required = true)]
        names: Vec<String>,
    },
}

pub async fn handle_cache_command(command: CacheCommand, config: AnalysisConfig) -> Result<()> {
    let settings = &config.cache;

    if !settings.enabled {
        println!("Caching is disabled in configuration");
        return Ok(());
    }
    if !settings.persistent {
        warn!("Cache persistence is off; results are only kept for a single run");
    }

    let cache = AnalysisCache::from_config(settings);

    match command.subcommand {
        CacheSubcommand::Stats => {
            println!("Persistent:  {}", settings.persistent);
            if let Some(dir) = settings.resolved_cache_dir().filter(|_| settings.persistent) {
                println!("Directory:   {}", dir.display());
            }
            println!("TTL:         {}s", settings.default_ttl_secs);
            println!("Max entries: {}", settings.max_entries);
            if let Some(count) = cache.persisted_entries().await {
                println!("On disk:     {}", count);
            }
        }
        CacheSubcommand::Clear => {
            cache.clear().await;
            info!("Analysis cache cleared");
            println!("Cache cleared");
        }
        CacheSubcommand::Invalidate { names } => {
            let removed = cache.invalidate_for_packages(&names).await;
            println!("Removed {} cached results mentioning {}", removed, names.join(", "));
        }
    }

    Ok(())
}
