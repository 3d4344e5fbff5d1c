//! Provider backed by a model command-line tool
//!
//! One implementation serves every [`CliBackend`]; the backends differ only in
//! how the prompt is passed on the command line.

use super::config::ProviderSettings;
use super::detector::{self, CliBackend, ProviderDefinition};
use super::errors::{AnalysisError, ProviderResult};
use super::parser::{self, FALLBACK_CONFIDENCE, UNPARSEABLE_REASON};
use super::process::{CommandRunner, CommandSpec, ProcessRunner, RetryPolicy, retry_with_backoff};
use super::prompts::AnalysisPrompts;
use super::provider::{AnalysisProvider, InfoCache};
use super::types::{AnalysisContext, AnalysisResult, AnalysisType, DetectionMethod, ProviderInfo};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Confidence of a result built after the provider failed
pub const DEGRADED_CONFIDENCE: f64 = 0.1;

pub struct CliProvider {
    backend: CliBackend,
    definition: ProviderDefinition,
    settings: ProviderSettings,
    runner: Arc<dyn CommandRunner>,
    info: InfoCache,
    shell_probe: bool,
}

impl CliProvider {
    pub fn new(backend: CliBackend, settings: ProviderSettings) -> Self {
        Self {
            backend,
            definition: ProviderDefinition::for_backend(backend),
            settings,
            runner: Arc::new(ProcessRunner),
            info: InfoCache::new(),
            shell_probe: true,
        }
    }

    /// Replace the subprocess runner
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_definition(mut self, definition: ProviderDefinition) -> Self {
        self.definition = definition;
        self
    }

    pub fn without_shell_probe(mut self) -> Self {
        self.shell_probe = false;
        self
    }

    pub fn backend(&self) -> CliBackend {
        self.backend
    }

    /// Command-line arguments carrying the prompt
    pub fn build_args(&self, prompt: &str) -> Vec<String> {
        match self.backend {
            CliBackend::Claude => vec![
                "-p".to_string(),
                prompt.to_string(),
                "--output-format".to_string(),
                "text".to_string(),
            ],
            CliBackend::Gemini => vec!["-p".to_string(), prompt.to_string()],
            CliBackend::Codex => vec!["exec".to_string(), prompt.to_string()],
        }
    }

    async fn probe_info(&self) -> ProviderInfo {
        let name = self.backend.name();

        if !self.settings.enabled {
            debug!("{} is disabled in configuration", name);
            return ProviderInfo::unavailable(name);
        }

        if let Some(path) = &self.settings.path {
            if path.is_file() {
                return ProviderInfo {
                    name: name.to_string(),
                    version: detector::probe_version(name, path).await,
                    path: Some(path.clone()),
                    available: true,
                    priority: self.definition.priority,
                    capabilities: AnalysisType::ALL.to_vec(),
                    detection_method: Some(DetectionMethod::Config),
                };
            }
            warn!("Configured path {:?} for {} does not exist, falling back to detection", path, name);
        }

        self.definition.detect(self.shell_probe).await
    }

    /// Run the CLI and parse its answer, surfacing subprocess failures as
    /// typed errors. Unparseable output is not an error: it yields the
    /// fallback result.
    pub async fn invoke(&self, context: &AnalysisContext) -> ProviderResult<AnalysisResult> {
        let name = self.backend.name();
        let info = self.get_info().await;

        let path = match info.path {
            Some(path) if info.available => path,
            _ => return Err(AnalysisError::unavailable(name)),
        };

        if context.packages.is_empty() {
            return Ok(AnalysisResult::review_all(name, context, "", "No updates to analyze", 1.0));
        }

        let prompt = AnalysisPrompts::build(context);
        let spec = CommandSpec::new(name, path).args(self.build_args(&prompt));
        let timeout = context.options.timeout.unwrap_or_else(|| self.settings.timeout());
        let policy = RetryPolicy::new(self.settings.max_retries, self.settings.retry_delay());

        info!("Analyzing {} updates with {}", context.packages.len(), name);
        let started = Instant::now();

        let output = retry_with_backoff(name, &policy, |attempt| {
            let runner = self.runner.clone();
            let spec = spec.clone();
            async move {
                debug!("{} attempt {}", spec.label, attempt);
                runner.run(&spec, timeout).await
            }
        })
        .await?;

        let response = output.stdout;
        let mut result = match parser::parse_response(&response, context) {
            Ok(parsed) => AnalysisResult {
                provider: name.to_string(),
                analysis_type: context.analysis_type,
                recommendations: parsed.recommendations,
                summary: parsed.summary.unwrap_or_else(|| {
                    format!("{} analyzed {} updates", name, context.packages.len())
                }),
                confidence: parsed.confidence,
                details: parsed.details,
                warnings: parsed.warnings,
                timestamp: Utc::now(),
                processing_time_ms: None,
                tokens_used: None,
            },
            Err(e) => {
                warn!("Could not parse {} response ({} chars): {}", name, response.len(), e);
                self.fallback_result(context, &response)
            }
        };

        result.processing_time_ms = Some(started.elapsed().as_millis() as u64);
        result.tokens_used = Some(((prompt.chars().count() + response.chars().count()) / 4) as u64);
        Ok(result)
    }

    /// Every package marked for review, raw response kept for inspection
    fn fallback_result(&self, context: &AnalysisContext, response: &str) -> AnalysisResult {
        let mut result = AnalysisResult::review_all(
            self.backend.name(),
            context,
            UNPARSEABLE_REASON,
            format!("{} returned a response that could not be parsed", self.backend.name()),
            FALLBACK_CONFIDENCE,
        );
        result.details = Some(response.to_string());
        result.warnings.push(UNPARSEABLE_REASON.to_string());
        result
    }

    fn degraded_result(&self, context: &AnalysisContext, error: &AnalysisError) -> AnalysisResult {
        let mut result = AnalysisResult::review_all(
            self.backend.name(),
            context,
            "AI analysis failed; manual review recommended",
            format!("{} analysis failed", self.backend.name()),
            DEGRADED_CONFIDENCE,
        );
        result.warnings.push(error.to_string());
        result
    }
}

#[async_trait]
impl AnalysisProvider for CliProvider {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn get_info(&self) -> ProviderInfo {
        self.info.get_or_probe(|| self.probe_info()).await
    }

    async fn analyze(&self, context: &AnalysisContext) -> ProviderResult<AnalysisResult> {
        match self.invoke(context).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("{} analysis failed: {}", self.backend.name(), e);
                Ok(self.degraded_result(context, &e))
            }
        }
    }

    async fn clear_cache(&self) {
        self.info.clear().await;
    }
}
