//! Status command: provider detection and service state

use crate::cli::app::StatusArgs;
use anyhow::Result;
use catalog_advisor_core::analysis::{AnalysisConfig, AnalysisService, ServiceStatus};

pub async fn execute(args: StatusArgs, config: AnalysisConfig) -> Result<()> {
    let service = AnalysisService::new(config);
    let status = service.get_status().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }

    Ok(())
}

fn print_status(status: &ServiceStatus) {
    println!("Analysis:  {}", if status.enabled { "enabled" } else { "disabled" });
    println!("Active:    {}", status.active_provider.as_deref().unwrap_or("none"));
    println!("Fallback:  {}", if status.fallback_enabled { "rule engine" } else { "off" });
    println!();
    println!("Providers:");

    for info in &status.providers {
        let state = if info.available { "available" } else { "not found" };
        let version = info.version.as_deref().unwrap_or("-");
        let location = info
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let method = info
            .detection_method
            .map(|m| format!("{:?}", m))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {:<12} {:<10} priority {:<4} version {:<10} {} ({})",
            info.name, state, info.priority, version, location, method
        );
    }

    println!();
    match &status.cache_stats {
        Some(stats) => println!(
            "Cache:     {} entries, {} hits, {} misses ({:.0}% hit rate)",
            stats.entries,
            stats.hits,
            stats.misses,
            stats.hit_rate * 100.0
        ),
        None => println!("Cache:     disabled"),
    }
}
