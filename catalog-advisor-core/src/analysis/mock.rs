//! Test doubles for providers and subprocesses
//!
//! Available in unit tests only.

#![cfg(test)]

use super::errors::{AnalysisError, ProviderResult};
use super::process::{CommandOutput, CommandRunner, CommandSpec};
use super::provider::AnalysisProvider;
use super::types::{
    Action, AnalysisContext, AnalysisResult, AnalysisType, Effort, ProviderInfo, Recommendation,
    RiskLevel,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Command runner that replays canned replies in order
#[derive(Default)]
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<ProviderResult<CommandOutput>>>,
    calls: Mutex<Vec<(CommandSpec, Duration)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful run printing `stdout`
    pub fn reply(self, stdout: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(CommandOutput {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }));
        self
    }

    /// Queue a failed run
    pub fn fail(self, error: AnalysisError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<(CommandSpec, Duration)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> ProviderResult<CommandOutput> {
        self.calls.lock().unwrap().push((spec.clone(), timeout));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AnalysisError::execution(&spec.label, "no scripted reply", None)))
    }
}

type Responder = Box<dyn Fn(&AnalysisContext) -> ProviderResult<AnalysisResult> + Send + Sync>;

/// Provider with fixed availability and a programmable response
pub struct StaticProvider {
    name: String,
    priority: u32,
    available: bool,
    respond: Responder,
    calls: AtomicUsize,
}

impl StaticProvider {
    /// Available provider answering `update`/`low` for every package
    pub fn new(name: &str, priority: u32) -> Self {
        let provider = name.to_string();
        Self {
            name: name.to_string(),
            priority,
            available: true,
            respond: Box::new(move |ctx: &AnalysisContext| {
                Ok(uniform_result(&provider, ctx, Action::Update, RiskLevel::Low))
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn responding<F>(mut self, respond: F) -> Self
    where
        F: Fn(&AnalysisContext) -> ProviderResult<AnalysisResult> + Send + Sync + 'static,
    {
        self.respond = Box::new(respond);
        self
    }

    /// Every call fails with an execution error
    pub fn failing(self) -> Self {
        let provider = self.name.clone();
        self.responding(move |_| Err(AnalysisError::execution(&provider, "boom", Some(1))))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_info(&self) -> ProviderInfo {
        ProviderInfo {
            available: self.available,
            priority: if self.available { self.priority } else { 0 },
            ..ProviderInfo::unavailable(self.name.clone())
        }
    }

    async fn analyze(&self, context: &AnalysisContext) -> ProviderResult<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(context)
    }

    async fn clear_cache(&self) {}
}

/// Same action and risk for every package
pub fn uniform_result(
    provider: &str,
    context: &AnalysisContext,
    action: Action,
    risk_level: RiskLevel,
) -> AnalysisResult {
    AnalysisResult {
        provider: provider.to_string(),
        analysis_type: context.analysis_type,
        recommendations: context
            .packages
            .iter()
            .map(|p| Recommendation {
                package: p.name.clone(),
                current_version: p.current_version.clone(),
                target_version: p.target_version.clone(),
                action,
                reason: format!("{} says {}", provider, action.as_str()),
                risk_level,
                breaking_changes: Vec::new(),
                security_fixes: Vec::new(),
                estimated_effort: Effort::Low,
            })
            .collect(),
        summary: format!("{} analyzed {} updates", provider, context.packages.len()),
        confidence: 0.9,
        details: None,
        warnings: vec![format!("{} warning", provider)],
        timestamp: Utc::now(),
        processing_time_ms: Some(5),
        tokens_used: Some(100),
    }
}

/// Risk per analysis type, for merge tests
pub fn risk_for(analysis_type: AnalysisType) -> RiskLevel {
    match analysis_type {
        AnalysisType::Impact => RiskLevel::Low,
        AnalysisType::Security => RiskLevel::Critical,
        AnalysisType::Compatibility => RiskLevel::Medium,
        AnalysisType::Recommend => RiskLevel::High,
    }
}
