//! Deterministic rule-based provider
//!
//! Derives recommendations from the kind of version bump alone. Needs no
//! external process and is always available.

use super::errors::ProviderResult;
use super::provider::AnalysisProvider;
use super::types::{
    Action, AnalysisContext, AnalysisResult, AnalysisType, DetectionMethod, Effort,
    PackageUpdateInfo, ProviderInfo, Recommendation, RiskLevel, UpdateType, VulnerabilitySummary,
};
use async_trait::async_trait;
use chrono::Utc;
use semver::Version;
use std::time::Instant;
use tracing::debug;

pub const RULE_ENGINE_NAME: &str = "rule-engine";

/// Minor versions skipped at once before a minor update counts as medium risk
pub const MINOR_JUMP_THRESHOLD: u64 = 5;

pub const RULE_ENGINE_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous analysis; never fails
    pub fn evaluate(&self, context: &AnalysisContext) -> AnalysisResult {
        let started = Instant::now();

        if context.packages.is_empty() {
            return AnalysisResult {
                processing_time_ms: Some(0),
                ..AnalysisResult::review_all(
                    RULE_ENGINE_NAME,
                    context,
                    "",
                    "No updates to analyze",
                    RULE_ENGINE_CONFIDENCE,
                )
            };
        }

        let recommendations: Vec<Recommendation> = context
            .packages
            .iter()
            .map(|package| Self::classify(package, context.security_for(package)))
            .collect();

        let ready = recommendations.iter().filter(|r| r.action == Action::Update).count();
        let review = recommendations.iter().filter(|r| r.action == Action::Review).count();
        let high_risk = recommendations.iter().filter(|r| r.risk_level >= RiskLevel::High).count();

        debug!("Rule engine classified {} updates", recommendations.len());

        AnalysisResult {
            provider: RULE_ENGINE_NAME.to_string(),
            analysis_type: context.analysis_type,
            recommendations,
            summary: format!(
                "Rule-based analysis: {} ready to update, {} need review, {} high risk",
                ready, review, high_risk
            ),
            confidence: RULE_ENGINE_CONFIDENCE,
            details: None,
            warnings: vec![
                "Rule-based analysis only considers version numbers; no changelogs were read"
                    .to_string(),
            ],
            timestamp: Utc::now(),
            processing_time_ms: Some(started.elapsed().as_millis() as u64),
            tokens_used: None,
        }
    }

    /// Recommendation for a single update
    pub fn classify(
        package: &PackageUpdateInfo,
        security: Option<&VulnerabilitySummary>,
    ) -> Recommendation {
        let current = parse_loose(&package.current_version);
        let target = parse_loose(&package.target_version);

        let mut rec = Recommendation::review(package, "");

        match package.update_type {
            UpdateType::Patch => {
                rec.action = Action::Update;
                rec.risk_level = RiskLevel::Low;
                rec.estimated_effort = Effort::Low;
                rec.reason = "Patch release with bug fixes only; safe to update".to_string();
            }
            UpdateType::Minor => {
                rec.action = Action::Update;
                match minor_distance(current.as_ref(), target.as_ref()) {
                    Some(distance) if distance < MINOR_JUMP_THRESHOLD => {
                        rec.risk_level = RiskLevel::Low;
                        rec.estimated_effort = Effort::Low;
                        rec.reason = "Minor release with backward-compatible changes".to_string();
                    }
                    Some(distance) => {
                        rec.risk_level = RiskLevel::Medium;
                        rec.estimated_effort = Effort::Medium;
                        rec.reason = format!(
                            "Minor release spanning {} minor versions; check for deprecations",
                            distance
                        );
                    }
                    None => {
                        rec.risk_level = RiskLevel::Medium;
                        rec.estimated_effort = Effort::Medium;
                        rec.reason = "Minor release; versions could not be compared".to_string();
                    }
                }
            }
            UpdateType::Major => {
                rec.action = Action::Review;
                rec.risk_level = RiskLevel::High;
                rec.estimated_effort = Effort::High;
                rec.reason = "Major release; review the changelog before updating".to_string();
                rec.breaking_changes.push(major_note(package));
            }
            UpdateType::Prerelease => {
                rec.risk_level = RiskLevel::High;
                rec.estimated_effort = Effort::Medium;

                let crosses_major = matches!(
                    (&current, &target),
                    (Some(current), Some(target)) if target.major > current.major
                );

                if crosses_major {
                    rec.action = Action::Review;
                    rec.reason = "Prerelease of a new major version; expect breaking changes"
                        .to_string();
                    rec.breaking_changes.push(major_note(package));
                } else {
                    rec.action = Action::Update;
                    rec.reason = "Prerelease version; may be unstable".to_string();
                }
            }
        }

        if let Some(summary) = security {
            rec.security_fixes = summary
                .identifiers
                .iter()
                .map(|id| format!("Security advisory {}", id))
                .collect();

            if let Some(safe) = &summary.safe_version {
                if safe.version != package.target_version {
                    rec.reason.push_str(&format!("; verified safe version is {}", safe.version));
                }
            }
        }

        rec
    }
}

fn major_note(package: &PackageUpdateInfo) -> String {
    format!(
        "Major version change from {} to {} may contain breaking changes",
        package.current_version, package.target_version
    )
}

/// Minor versions between two releases of the same major line
fn minor_distance(current: Option<&Version>, target: Option<&Version>) -> Option<u64> {
    let (current, target) = (current?, target?);
    if current.major != target.major {
        return None;
    }
    Some(target.minor.saturating_sub(current.minor))
}

/// Accepts range prefixes and partial versions such as `^4.17` or `v2`
fn parse_loose(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches(['^', '~', '=', '>', '<', 'v', ' ']);

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let (core, rest) = match trimmed.find(['-', '+']) {
        Some(index) => trimmed.split_at(index),
        None => (trimmed, ""),
    };
    let padded = match core.split('.').count() {
        1 => format!("{}.0.0{}", core, rest),
        2 => format!("{}.0{}", core, rest),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

#[async_trait]
impl AnalysisProvider for RuleEngine {
    fn name(&self) -> &str {
        RULE_ENGINE_NAME
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn get_info(&self) -> ProviderInfo {
        ProviderInfo {
            name: RULE_ENGINE_NAME.to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            path: None,
            available: true,
            priority: 0,
            capabilities: AnalysisType::ALL.to_vec(),
            detection_method: Some(DetectionMethod::Builtin),
        }
    }

    async fn analyze(&self, context: &AnalysisContext) -> ProviderResult<AnalysisResult> {
        Ok(self.evaluate(context))
    }

    async fn clear_cache(&self) {}
}
