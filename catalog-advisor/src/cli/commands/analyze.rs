//! Analyze command: run the analysis service over an update batch file

use crate::cli::app::AnalyzeArgs;
use anyhow::{Context, Result};
use catalog_advisor_core::analysis::{
    AnalysisConfig, AnalysisOptions, AnalysisResult, AnalysisService, ChunkProgress,
    PackageUpdateInfo, SecurityData, WorkspaceInfo,
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Input file layout
#[derive(Debug, Deserialize)]
pub struct UpdateBatch {
    pub workspace: WorkspaceInfo,
    pub packages: Vec<PackageUpdateInfo>,
}

pub async fn execute(args: AnalyzeArgs, config: AnalysisConfig) -> Result<()> {
    let batch = load_batch(&args.input)?;
    info!("Loaded {} proposed updates for {}", batch.packages.len(), batch.workspace.name);

    let mut options = AnalysisOptions {
        provider: args.provider.clone(),
        analysis_type: Some(args.analysis_type),
        skip_cache: args.no_cache,
        ..Default::default()
    };

    if let Some(path) = &args.security {
        options = options.with_security_data(load_security(path)?);
    }

    if args.chunk {
        options.chunking.enabled = Some(true);
        options.chunking.threshold = Some(0);
    }

    let service = AnalysisService::new(config);

    if args.comprehensive {
        let result = service.analyze_comprehensive(&batch.packages, &batch.workspace, options).await;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("Providers: {}", result.providers.join(", "));
            print_result(result.merged.as_ref().unwrap_or(&result.primary));
        }
        return Ok(());
    }

    let report: &(dyn Fn(ChunkProgress) + Send + Sync) = &|progress| {
        eprintln!(
            "Analyzed chunk {}/{} ({}%)",
            progress.current.min(progress.total),
            progress.total,
            progress.percent
        );
    };

    let result = service
        .analyze_with_chunking(
            &batch.packages,
            &batch.workspace,
            args.analysis_type,
            options,
            Some(report),
        )
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

pub fn load_batch(path: &Path) -> Result<UpdateBatch> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read update batch {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse update batch {}", path.display()))
}

pub fn load_security(path: &Path) -> Result<SecurityData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read security data {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse security data {}", path.display()))
}

fn print_result(result: &AnalysisResult) {
    println!("Provider:   {}", result.provider);
    println!("Type:       {}", result.analysis_type);
    println!("Confidence: {:.0}%", result.confidence * 100.0);
    println!();
    println!("{}", result.summary);
    println!();

    for rec in &result.recommendations {
        println!(
            "  {:<30} {:>12} -> {:<12} {:<7} {}",
            rec.package,
            rec.current_version,
            rec.target_version,
            rec.action.as_str(),
            rec.risk_level.as_str()
        );
        println!("      {}", rec.reason);
        for change in &rec.breaking_changes {
            println!("      ! {}", change);
        }
        for fix in &rec.security_fixes {
            println!("      + {}", fix);
        }
    }

    if !result.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }
}
