//! Analysis service
//!
//! Entry point for callers. Selects a provider, consults the cache, splits
//! large batches into chunks, merges multi-type runs and falls back to the
//! rule engine when no model CLI can answer. Public operations always return
//! a result; provider errors are turned into degraded results here.

use super::cache::{AnalysisCache, CacheStats};
use super::cli_provider::CliProvider;
use super::config::AnalysisConfig;
use super::detector::{CliBackend, ProviderDetector};
use super::parser::FALLBACK_CONFIDENCE;
use super::provider::AnalysisProvider;
use super::rule_engine::{RULE_ENGINE_NAME, RuleEngine};
use super::types::{
    AnalysisContext, AnalysisOptions, AnalysisResult, AnalysisType, ChunkProgress,
    ComprehensiveResult, PackageUpdateInfo, ProviderInfo, Recommendation, RiskLevel,
    WorkspaceInfo,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Provider reported when no analysis ran
pub const DISABLED_PROVIDER: &str = "none";

/// Cache namespace used when the caller did not pick a provider
const AUTO_PROVIDER: &str = "auto";

/// Snapshot of the service for status displays
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub enabled: bool,
    /// All providers, available first then by priority
    pub providers: Vec<ProviderInfo>,
    pub active_provider: Option<String>,
    pub cache_enabled: bool,
    pub cache_stats: Option<CacheStats>,
    pub fallback_enabled: bool,
}

pub struct AnalysisService {
    config: AnalysisConfig,
    detector: ProviderDetector,
    rule_engine: Arc<RuleEngine>,
    cache: Option<AnalysisCache>,
}

impl AnalysisService {
    /// Service with one CLI provider per supported backend
    pub fn new(config: AnalysisConfig) -> Self {
        let providers = CliBackend::ALL
            .into_iter()
            .map(|backend| {
                let settings = config.providers.get(backend).clone();
                Arc::new(CliProvider::new(backend, settings)) as Arc<dyn AnalysisProvider>
            })
            .collect();

        Self::with_providers(config, providers)
    }

    pub fn with_providers(config: AnalysisConfig, providers: Vec<Arc<dyn AnalysisProvider>>) -> Self {
        let cache = config.cache.enabled.then(|| AnalysisCache::from_config(&config.cache));
        Self {
            config,
            detector: ProviderDetector::new(providers),
            rule_engine: Arc::new(RuleEngine::new()),
            cache,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one batch with a single analysis type
    pub async fn analyze(
        &self,
        packages: &[PackageUpdateInfo],
        workspace: &WorkspaceInfo,
        analysis_type: AnalysisType,
        options: AnalysisOptions,
    ) -> AnalysisResult {
        let context = AnalysisContext::new(packages.to_vec(), workspace.clone(), analysis_type)
            .with_options(options);

        if !self.config.enabled {
            debug!("Analysis requested while disabled");
            return disabled_result(&context, "AI analysis is disabled in configuration");
        }

        let requested = context.options.provider.clone().unwrap_or_else(|| AUTO_PROVIDER.to_string());

        if let Some(cache) = self.cache.as_ref().filter(|_| !context.options.skip_cache) {
            if let Some(mut cached) = cache.get(&context, &requested).await {
                info!("Using cached {} analysis for {} packages", analysis_type, packages.len());
                cached.provider = format!("{} (cached)", cached.provider);
                return cached;
            }
        }

        let result = self.run_provider(&context).await;

        // Degraded and fallback results are never cached
        if let Some(cache) = &self.cache {
            if result.confidence > FALLBACK_CONFIDENCE {
                cache.set(&context, &requested, &result, None).await;
            }
        }

        result
    }

    /// Analysis type from `options.analysis_type`, impact by default
    pub async fn analyze_updates(
        &self,
        packages: &[PackageUpdateInfo],
        workspace: &WorkspaceInfo,
        options: AnalysisOptions,
    ) -> AnalysisResult {
        let analysis_type = options.analysis_type.unwrap_or(AnalysisType::Impact);
        self.analyze(packages, workspace, analysis_type, options).await
    }

    pub async fn analyze_impact(
        &self,
        packages: &[PackageUpdateInfo],
        workspace: &WorkspaceInfo,
        options: AnalysisOptions,
    ) -> AnalysisResult {
        self.analyze(packages, workspace, AnalysisType::Impact, options).await
    }

    pub async fn analyze_security(
        &self,
        packages: &[PackageUpdateInfo],
        workspace: &WorkspaceInfo,
        options: AnalysisOptions,
    ) -> AnalysisResult {
        self.analyze(packages, workspace, AnalysisType::Security, options).await
    }

    pub async fn analyze_compatibility(
        &self,
        packages: &[PackageUpdateInfo],
        workspace: &WorkspaceInfo,
        options: AnalysisOptions,
    ) -> AnalysisResult {
        self.analyze(packages, workspace, AnalysisType::Compatibility, options).await
    }

    pub async fn get_recommendations(
        &self,
        packages: &[PackageUpdateInfo],
        workspace: &WorkspaceInfo,
        options: AnalysisOptions,
    ) -> AnalysisResult {
        self.analyze(packages, workspace, AnalysisType::Recommend, options).await
    }

    /// Split large batches and analyze the chunks one after another.
    ///
    /// `progress` is called after each chunk and once more at 100%.
    pub async fn analyze_with_chunking(
        &self,
        packages: &[PackageUpdateInfo],
        workspace: &WorkspaceInfo,
        analysis_type: AnalysisType,
        options: AnalysisOptions,
        progress: Option<&(dyn Fn(ChunkProgress) + Send + Sync)>,
    ) -> AnalysisResult {
        let enabled = options.chunking.enabled.unwrap_or(self.config.chunking.enabled);
        let threshold = options.chunking.threshold.unwrap_or(self.config.chunking.threshold);
        let chunk_size = options.chunking.chunk_size.unwrap_or(self.config.chunking.chunk_size).max(1);

        if !enabled || packages.len() <= threshold {
            let result = self.analyze(packages, workspace, analysis_type, options).await;
            if let Some(report) = progress {
                report(ChunkProgress::new(1, 1));
            }
            return result;
        }

        let chunks: Vec<&[PackageUpdateInfo]> = packages.chunks(chunk_size).collect();
        let total = chunks.len();
        info!("Analyzing {} packages in {} chunks of {}", packages.len(), total, chunk_size);

        let mut results = Vec::with_capacity(total);
        for (index, chunk) in chunks.into_iter().enumerate() {
            results.push(self.analyze(chunk, workspace, analysis_type, options.clone()).await);
            if let Some(report) = progress {
                report(ChunkProgress::new(index + 1, total));
            }
        }

        if let Some(report) = progress {
            report(ChunkProgress::new(total, total));
        }

        merge_chunks(results, packages.len(), analysis_type)
    }

    /// Run every analysis type and merge by highest risk
    pub async fn analyze_comprehensive(
        &self,
        packages: &[PackageUpdateInfo],
        workspace: &WorkspaceInfo,
        options: AnalysisOptions,
    ) -> ComprehensiveResult {
        let mut results = Vec::with_capacity(AnalysisType::ALL.len());
        for analysis_type in AnalysisType::ALL {
            results.push(self.analyze(packages, workspace, analysis_type, options.clone()).await);
        }

        let providers = distinct(results.iter().map(|r| r.provider.clone()));
        let merged = merge_by_risk(&results, &providers);
        let primary = results.swap_remove(0);

        ComprehensiveResult { primary, merged, providers, timestamp: Utc::now() }
    }

    /// Provider for this call, or `None` when only fallback remains
    async fn select_provider(&self, preferred: Option<&str>) -> Option<Arc<dyn AnalysisProvider>> {
        if let Some(name) = preferred {
            if name == RULE_ENGINE_NAME {
                return Some(self.rule_engine.clone() as Arc<dyn AnalysisProvider>);
            }

            match self.detector.find(name) {
                Some(provider) => {
                    if provider.is_available().await {
                        return Some(provider);
                    }
                    warn!("Preferred provider {} is not available", name);
                }
                None => warn!("Unknown provider {}", name),
            }
        }

        self.detector.get_best_provider().await
    }

    async fn run_provider(&self, context: &AnalysisContext) -> AnalysisResult {
        let Some(provider) = self.select_provider(context.options.provider.as_deref()).await else {
            return self.fallback_result(context, None);
        };

        debug!("Using provider {}", provider.name());
        match provider.analyze(context).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Provider {} failed: {}", provider.name(), e);
                self.fallback_result(context, Some(format!("Provider {} failed: {}", provider.name(), e)))
            }
        }
    }

    fn fallback_result(&self, context: &AnalysisContext, warning: Option<String>) -> AnalysisResult {
        let fallback = &self.config.fallback;

        let mut result = if fallback.enabled && fallback.use_rule_engine {
            info!("No AI provider available, using rule-based analysis");
            self.rule_engine.evaluate(context)
        } else {
            warn!("No AI provider available and fallback is disabled");
            disabled_result(context, "AI analysis is disabled: no provider is available")
        };

        result.warnings.extend(warning);
        result
    }

    pub async fn get_status(&self) -> ServiceStatus {
        let mut providers = self.detector.detect_all().await;
        providers.push(self.rule_engine.get_info().await);
        ProviderDetector::sort_by_priority(&mut providers);

        let fallback_enabled = self.config.fallback.enabled && self.config.fallback.use_rule_engine;

        let active_provider = if !self.config.enabled {
            None
        } else {
            providers
                .iter()
                .find(|info| info.available && info.name != RULE_ENGINE_NAME)
                .map(|info| info.name.clone())
                .or_else(|| fallback_enabled.then(|| RULE_ENGINE_NAME.to_string()))
        };

        ServiceStatus {
            enabled: self.config.enabled,
            providers,
            active_provider,
            cache_enabled: self.cache.is_some(),
            cache_stats: self.get_cache_stats().await,
            fallback_enabled,
        }
    }

    /// Whether a call would reach a provider or the rule engine
    pub async fn is_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        if self.config.fallback.enabled && self.config.fallback.use_rule_engine {
            return true;
        }
        self.detector.get_best_provider().await.is_some()
    }

    /// Drop cached results and memoized provider detection
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear().await;
        }
        self.detector.clear_cache().await;
    }

    /// Drop cached results mentioning any of `names`
    pub async fn invalidate_cache(&self, names: &[String]) -> usize {
        match &self.cache {
            Some(cache) => cache.invalidate_for_packages(names).await,
            None => 0,
        }
    }

    pub async fn get_cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.get_stats().await),
            None => None,
        }
    }
}

fn disabled_result(context: &AnalysisContext, summary: &str) -> AnalysisResult {
    AnalysisResult::review_all(
        DISABLED_PROVIDER,
        context,
        "AI analysis unavailable; manual review required",
        summary,
        0.0,
    )
}

fn distinct(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}

/// Concatenate chunk results in order
fn merge_chunks(
    results: Vec<AnalysisResult>,
    package_count: usize,
    analysis_type: AnalysisType,
) -> AnalysisResult {
    let chunk_count = results.len();
    let confidence = if chunk_count == 0 {
        0.0
    } else {
        results.iter().map(|r| r.confidence).sum::<f64>() / chunk_count as f64
    };

    let provider = distinct(results.iter().map(|r| r.provider.clone())).join(", ");
    let warnings = distinct(results.iter().flat_map(|r| r.warnings.iter().cloned()));
    let processing_time_ms = results.iter().filter_map(|r| r.processing_time_ms).reduce(|a, b| a + b);
    let tokens_used = results.iter().filter_map(|r| r.tokens_used).reduce(|a, b| a + b);

    AnalysisResult {
        provider,
        analysis_type,
        recommendations: results.into_iter().flat_map(|r| r.recommendations).collect(),
        summary: format!("Analyzed {} packages in {} chunks", package_count, chunk_count),
        confidence: confidence.clamp(0.0, 1.0),
        details: None,
        warnings,
        timestamp: Utc::now(),
        processing_time_ms,
        tokens_used,
    }
}

/// One recommendation per package, the riskiest across all results
fn merge_by_risk(results: &[AnalysisResult], providers: &[String]) -> Option<AnalysisResult> {
    let mut order: Vec<&str> = Vec::new();
    let mut riskiest: HashMap<&str, &Recommendation> = HashMap::new();

    for rec in results.iter().flat_map(|r| &r.recommendations) {
        match riskiest.get(rec.package.as_str()) {
            Some(existing) if existing.risk_level >= rec.risk_level => {}
            Some(_) => {
                riskiest.insert(&rec.package, rec);
            }
            None => {
                order.push(&rec.package);
                riskiest.insert(&rec.package, rec);
            }
        }
    }

    if order.is_empty() {
        return None;
    }

    let recommendations: Vec<Recommendation> =
        order.iter().filter_map(|name| riskiest.get(name).map(|rec| (*rec).clone())).collect();
    let high_risk = recommendations.iter().filter(|r| r.risk_level >= RiskLevel::High).count();
    let confidence = results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64;

    Some(AnalysisResult {
        provider: providers.join(", "),
        analysis_type: AnalysisType::Recommend,
        summary: format!(
            "Combined {} analyses: {} packages, {} high risk",
            results.len(),
            recommendations.len(),
            high_risk
        ),
        recommendations,
        confidence: confidence.clamp(0.0, 1.0),
        details: None,
        warnings: distinct(results.iter().flat_map(|r| r.warnings.iter().cloned())),
        timestamp: Utc::now(),
        processing_time_ms: None,
        tokens_used: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::mock::{StaticProvider, risk_for, uniform_result};
    use crate::analysis::types::{Action, UpdateType};
    use std::sync::Mutex;

    fn workspace() -> WorkspaceInfo {
        WorkspaceInfo::new("acme", "/work/acme")
    }

    fn packages(count: usize) -> Vec<PackageUpdateInfo> {
        (0..count)
            .map(|i| PackageUpdateInfo::new(format!("pkg-{}", i), "1.0.0", "1.0.1", UpdateType::Patch))
            .collect()
    }

    fn service_with(providers: Vec<Arc<dyn AnalysisProvider>>) -> AnalysisService {
        AnalysisService::with_providers(AnalysisConfig::default(), providers)
    }

    #[tokio::test]
    async fn test_one_recommendation_per_package() {
        let service = service_with(vec![Arc::new(StaticProvider::new("claude", 100))]);
        let input = packages(4);

        let result = service.analyze_updates(&input, &workspace(), AnalysisOptions::default()).await;

        assert_eq!(result.recommendations.len(), 4);
        assert_eq!(result.analysis_type, AnalysisType::Impact);
        assert!((0.0..=1.0).contains(&result.confidence));
        for (rec, pkg) in result.recommendations.iter().zip(&input) {
            assert_eq!(rec.package, pkg.name);
        }
    }

    #[tokio::test]
    async fn test_second_call_is_cached() {
        let provider = Arc::new(StaticProvider::new("claude", 100));
        let service = service_with(vec![provider.clone()]);
        let input = packages(2);

        let first = service.analyze_impact(&input, &workspace(), AnalysisOptions::default()).await;
        let second = service.analyze_impact(&input, &workspace(), AnalysisOptions::default()).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(first.provider, "claude");
        assert_eq!(second.provider, "claude (cached)");
        assert_eq!(first.recommendations, second.recommendations);

        // Different analysis type is a different cache entry
        service.analyze_security(&input, &workspace(), AnalysisOptions::default()).await;
        assert_eq!(provider.calls(), 2);

        let stats = service.get_cache_stats().await.unwrap();
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_skip_cache_forces_fresh_run() {
        let provider = Arc::new(StaticProvider::new("claude", 100));
        let service = service_with(vec![provider.clone()]);
        let input = packages(1);

        service.analyze_impact(&input, &workspace(), AnalysisOptions::default()).await;
        let fresh = service
            .analyze_impact(&input, &workspace(), AnalysisOptions::default().skip_cache())
            .await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(fresh.provider, "claude");
    }

    #[tokio::test]
    async fn test_disabled_service() {
        let provider = Arc::new(StaticProvider::new("claude", 100));
        let config = AnalysisConfig::disabled();
        let service = AnalysisService::with_providers(config, vec![provider.clone()]);

        let result = service.analyze_updates(&packages(3), &workspace(), AnalysisOptions::default()).await;

        assert_eq!(result.provider, DISABLED_PROVIDER);
        assert_eq!(result.recommendations.len(), 3);
        assert!(result.recommendations.iter().all(|r| r.action == Action::Review));
        assert!(result.summary.contains("disabled"));
        assert_eq!(result.confidence, 0.0);
        assert_eq!(provider.calls(), 0);
        assert!(!service.is_available().await);
    }

    #[tokio::test]
    async fn test_rule_engine_fallback() {
        let service = service_with(vec![Arc::new(StaticProvider::new("claude", 100).unavailable())]);
        let input = vec![PackageUpdateInfo::new("lodash", "4.17.20", "4.17.21", UpdateType::Patch)];

        let result = service.analyze_updates(&input, &workspace(), AnalysisOptions::default()).await;

        assert_eq!(result.provider, RULE_ENGINE_NAME);
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].action, Action::Update);
        assert_eq!(result.recommendations[0].risk_level, RiskLevel::Low);
        assert!(service.is_available().await);
    }

    #[tokio::test]
    async fn test_no_fallback_gives_disabled_result() {
        let mut config = AnalysisConfig::default();
        config.fallback.enabled = false;
        let service = AnalysisService::with_providers(config, Vec::new());

        let result = service.analyze_updates(&packages(2), &workspace(), AnalysisOptions::default()).await;

        assert_eq!(result.provider, DISABLED_PROVIDER);
        assert_eq!(result.recommendations.len(), 2);
        assert!(result.summary.contains("disabled"));
        assert!(!service.is_available().await);
    }

    #[tokio::test]
    async fn test_priority_and_preferred_provider() {
        let claude = Arc::new(StaticProvider::new("claude", 100).unavailable());
        let gemini = Arc::new(StaticProvider::new("gemini", 80));
        let codex = Arc::new(StaticProvider::new("codex", 60));
        let service = service_with(vec![codex.clone(), claude, gemini.clone()]);
        let input = packages(1);

        let auto = service.analyze_impact(&input, &workspace(), AnalysisOptions::default()).await;
        assert_eq!(auto.provider, "gemini");

        let preferred = service
            .analyze_impact(&input, &workspace(), AnalysisOptions::default().with_provider("codex"))
            .await;
        assert_eq!(preferred.provider, "codex");

        // Unavailable preference falls through to the best available
        let fallthrough = service
            .analyze_security(&input, &workspace(), AnalysisOptions::default().with_provider("claude"))
            .await;
        assert_eq!(fallthrough.provider, "gemini");

        let rules = service
            .analyze_impact(&input, &workspace(), AnalysisOptions::default().with_provider("rule-engine"))
            .await;
        assert_eq!(rules.provider, RULE_ENGINE_NAME);
    }

    #[tokio::test]
    async fn test_provider_error_uses_fallback() {
        let service = service_with(vec![Arc::new(StaticProvider::new("claude", 100).failing())]);

        let result = service.analyze_updates(&packages(2), &workspace(), AnalysisOptions::default()).await;

        assert_eq!(result.provider, RULE_ENGINE_NAME);
        assert_eq!(result.recommendations.len(), 2);
        assert!(result.warnings.iter().any(|w| w.contains("Provider claude failed")));
    }

    #[tokio::test]
    async fn test_low_confidence_results_are_not_cached() {
        let provider = Arc::new(StaticProvider::new("claude", 100).responding(|ctx| {
            let mut result = uniform_result("claude", ctx, Action::Review, RiskLevel::Medium);
            result.confidence = 0.1;
            Ok(result)
        }));
        let service = service_with(vec![provider.clone()]);
        let input = packages(1);

        service.analyze_impact(&input, &workspace(), AnalysisOptions::default()).await;
        service.analyze_impact(&input, &workspace(), AnalysisOptions::default()).await;

        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_chunking_preserves_count_and_order() {
        let service = service_with(vec![Arc::new(StaticProvider::new("claude", 100))]);
        let input = packages(5);
        let seen = Mutex::new(Vec::new());
        let report: &(dyn Fn(ChunkProgress) + Send + Sync) =
            &|progress| seen.lock().unwrap().push(progress);

        let mut options = AnalysisOptions::default();
        options.chunking.threshold = Some(0);
        options.chunking.chunk_size = Some(2);

        let chunked = service
            .analyze_with_chunking(&input, &workspace(), AnalysisType::Impact, options, Some(report))
            .await;
        let unchunked = service
            .analyze(&input, &workspace(), AnalysisType::Compatibility, AnalysisOptions::default())
            .await;

        assert_eq!(chunked.recommendations.len(), unchunked.recommendations.len());
        let names: Vec<&str> = chunked.recommendations.iter().map(|r| r.package.as_str()).collect();
        assert_eq!(names, vec!["pkg-0", "pkg-1", "pkg-2", "pkg-3", "pkg-4"]);
        assert_eq!(chunked.summary, "Analyzed 5 packages in 3 chunks");
        assert_eq!(chunked.warnings, vec!["claude warning".to_string()]);

        let percents: Vec<u8> = seen.lock().unwrap().iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![33, 66, 100, 100]);
    }

    #[tokio::test]
    async fn test_small_batches_are_not_chunked() {
        let provider = Arc::new(StaticProvider::new("claude", 100));
        let service = service_with(vec![provider.clone()]);

        let result = service
            .analyze_with_chunking(&packages(3), &workspace(), AnalysisType::Impact, AnalysisOptions::default(), None)
            .await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(result.recommendations.len(), 3);
        assert_eq!(result.provider, "claude");
    }

    #[tokio::test]
    async fn test_comprehensive_keeps_riskiest() {
        let provider = Arc::new(StaticProvider::new("claude", 100).responding(|ctx| {
            Ok(uniform_result("claude", ctx, Action::Review, risk_for(ctx.analysis_type)))
        }));
        let service = service_with(vec![provider.clone()]);
        let input = packages(3);

        let result = service.analyze_comprehensive(&input, &workspace(), AnalysisOptions::default()).await;

        assert_eq!(provider.calls(), 4);
        assert_eq!(result.primary.analysis_type, AnalysisType::Impact);
        assert_eq!(result.providers, vec!["claude".to_string()]);

        let merged = result.merged.unwrap();
        assert!(merged.recommendations.len() >= result.primary.recommendations.len());
        assert!(merged.recommendations.iter().all(|r| r.risk_level == RiskLevel::Critical));
        let names: Vec<&str> = merged.recommendations.iter().map(|r| r.package.as_str()).collect();
        assert_eq!(names, vec!["pkg-0", "pkg-1", "pkg-2"]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let service = service_with(Vec::new());

        let result = service.analyze_updates(&[], &workspace(), AnalysisOptions::default()).await;
        assert!(result.recommendations.is_empty());
        assert_eq!(result.summary, "No updates to analyze");

        let comprehensive = service.analyze_comprehensive(&[], &workspace(), AnalysisOptions::default()).await;
        assert!(comprehensive.merged.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_cache_by_name() {
        let provider = Arc::new(StaticProvider::new("claude", 100));
        let service = service_with(vec![provider.clone()]);
        let react = vec![PackageUpdateInfo::new("react", "18.3.1", "19.0.0", UpdateType::Major)];
        let vue = vec![PackageUpdateInfo::new("vue", "3.4.0", "3.5.0", UpdateType::Minor)];

        service.analyze_impact(&react, &workspace(), AnalysisOptions::default()).await;
        service.analyze_impact(&vue, &workspace(), AnalysisOptions::default()).await;

        assert_eq!(service.invalidate_cache(&["react".to_string()]).await, 1);

        service.analyze_impact(&react, &workspace(), AnalysisOptions::default()).await;
        let vue_again = service.analyze_impact(&vue, &workspace(), AnalysisOptions::default()).await;
        assert_eq!(provider.calls(), 3);
        assert_eq!(vue_again.provider, "claude (cached)");

        service.clear_cache().await;
        assert_eq!(service.get_cache_stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_status() {
        let service = service_with(vec![
            Arc::new(StaticProvider::new("claude", 100).unavailable()),
            Arc::new(StaticProvider::new("codex", 60)),
        ]);

        let status = service.get_status().await;
        assert!(status.enabled);
        assert!(status.cache_enabled);
        assert!(status.fallback_enabled);
        assert_eq!(status.active_provider.as_deref(), Some("codex"));

        let names: Vec<&str> = status.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["codex", RULE_ENGINE_NAME, "claude"]);

        let fallback_only = service_with(Vec::new()).get_status().await;
        assert_eq!(fallback_only.active_provider.as_deref(), Some(RULE_ENGINE_NAME));
    }
}
