//! Data model shared by providers, the cache and the analysis service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Kind of version bump a proposed update represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Major,
    Minor,
    Patch,
    Prerelease,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::Prerelease => "prerelease",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a provider is asked to look at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Impact,
    Security,
    Compatibility,
    Recommend,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 4] =
        [Self::Impact, Self::Security, Self::Compatibility, Self::Recommend];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Impact => "impact",
            Self::Security => "security",
            Self::Compatibility => "compatibility",
            Self::Recommend => "recommend",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommended course of action for a single update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Update,
    Skip,
    Review,
    Defer,
}

impl Action {
    /// Lenient parse used on model output; unknown values become `Review`
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "update" => Self::Update,
            "skip" => Self::Skip,
            "review" => Self::Review,
            "defer" => Self::Defer,
            _ => Self::Review,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Skip => "skip",
            Self::Review => "review",
            Self::Defer => "defer",
        }
    }
}

/// Ordered from least to most severe so `max` picks the riskiest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Lenient parse used on model output; unknown values become `Medium`
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl Effort {
    /// Lenient parse used on model output; unknown values become `Medium`
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

/// A single proposed catalog update
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageUpdateInfo {
    pub name: String,
    pub current_version: String,
    pub target_version: String,
    pub update_type: UpdateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_name: Option<String>,
}

impl PackageUpdateInfo {
    pub fn new(
        name: impl Into<String>,
        current_version: impl Into<String>,
        target_version: impl Into<String>,
        update_type: UpdateType,
    ) -> Self {
        Self {
            name: name.into(),
            current_version: current_version.into(),
            target_version: target_version.into(),
            update_type,
            catalog_name: None,
        }
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog_name = Some(catalog.into());
        self
    }

    /// Key used by the security collaborator: `name@targetVersion`
    pub fn security_key(&self) -> String {
        format!("{}@{}", self.name, self.target_version)
    }
}

/// Summary of the workspace the updates belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub package_count: usize,
    #[serde(default)]
    pub catalog_count: usize,
}

impl WorkspaceInfo {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), path: path.into(), package_count: 0, catalog_count: 0 }
    }
}

/// Pre-verified replacement version offered by the security collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeVersion {
    pub version: String,
    #[serde(default)]
    pub same_major: bool,
    #[serde(default)]
    pub same_minor: bool,
    #[serde(default)]
    pub skipped_versions: Vec<String>,
}

/// Vulnerability summary for one `name@version`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VulnerabilitySummary {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub identifiers: Vec<String>,
    pub fixed_versions: Vec<String>,
    pub safe_version: Option<SafeVersion>,
}

impl VulnerabilitySummary {
    /// Findings across all buckets, saturating at `u32::MAX`
    pub fn total(&self) -> u32 {
        self.critical.saturating_add(self.high).saturating_add(self.medium).saturating_add(self.low)
    }

    /// Worst severity bucket with at least one finding
    pub fn highest_severity(&self) -> Option<RiskLevel> {
        if self.critical > 0 {
            Some(RiskLevel::Critical)
        } else if self.high > 0 {
            Some(RiskLevel::High)
        } else if self.medium > 0 {
            Some(RiskLevel::Medium)
        } else if self.low > 0 {
            Some(RiskLevel::Low)
        } else {
            None
        }
    }
}

/// Security data keyed by `name@version`
pub type SecurityData = HashMap<String, VulnerabilitySummary>;

/// Per-call chunking overrides; `None` falls back to configuration
#[derive(Debug, Clone, Default)]
pub struct ChunkingOptions {
    pub enabled: Option<bool>,
    pub threshold: Option<usize>,
    pub chunk_size: Option<usize>,
}

/// Per-call analysis options
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Preferred provider name (`claude`, `gemini`, `codex`, `rule-engine`)
    pub provider: Option<String>,
    /// Analysis type for `analyze_updates`; defaults to impact
    pub analysis_type: Option<AnalysisType>,
    pub skip_cache: bool,
    /// Overrides the provider's configured subprocess timeout
    pub timeout: Option<Duration>,
    pub security_data: Option<SecurityData>,
    pub chunking: ChunkingOptions,
}

impl AnalysisOptions {
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    pub fn with_security_data(mut self, data: SecurityData) -> Self {
        self.security_data = Some(data);
        self
    }
}

/// Everything a provider needs for one analysis
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub packages: Vec<PackageUpdateInfo>,
    pub workspace_info: WorkspaceInfo,
    pub analysis_type: AnalysisType,
    pub security_data: Option<SecurityData>,
    pub options: AnalysisOptions,
}

impl AnalysisContext {
    pub fn new(
        packages: Vec<PackageUpdateInfo>,
        workspace_info: WorkspaceInfo,
        analysis_type: AnalysisType,
    ) -> Self {
        Self {
            packages,
            workspace_info,
            analysis_type,
            security_data: None,
            options: AnalysisOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.security_data = options.security_data.clone();
        self.options = options;
        self
    }

    pub fn package_names(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    /// Vulnerability summary for a package's target version, if supplied
    pub fn security_for(&self, package: &PackageUpdateInfo) -> Option<&VulnerabilitySummary> {
        self.security_data.as_ref()?.get(&package.security_key())
    }
}

/// One recommendation per input package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub package: String,
    pub current_version: String,
    pub target_version: String,
    pub action: Action,
    pub reason: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub breaking_changes: Vec<String>,
    #[serde(default)]
    pub security_fixes: Vec<String>,
    pub estimated_effort: Effort,
}

impl Recommendation {
    /// Placeholder asking a human to look at the update
    pub fn review(package: &PackageUpdateInfo, reason: impl Into<String>) -> Self {
        Self {
            package: package.name.clone(),
            current_version: package.current_version.clone(),
            target_version: package.target_version.clone(),
            action: Action::Review,
            reason: reason.into(),
            risk_level: RiskLevel::Medium,
            breaking_changes: Vec::new(),
            security_fixes: Vec::new(),
            estimated_effort: Effort::Medium,
        }
    }
}

/// Outcome of one analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub provider: String,
    pub analysis_type: AnalysisType,
    pub recommendations: Vec<Recommendation>,
    pub summary: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
}

impl AnalysisResult {
    /// Result with one `review` recommendation per package
    pub fn review_all(
        provider: impl Into<String>,
        context: &AnalysisContext,
        reason: &str,
        summary: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            provider: provider.into(),
            analysis_type: context.analysis_type,
            recommendations: context
                .packages
                .iter()
                .map(|p| Recommendation::review(p, reason))
                .collect(),
            summary: summary.into(),
            confidence: confidence.clamp(0.0, 1.0),
            details: None,
            warnings: Vec::new(),
            timestamp: Utc::now(),
            processing_time_ms: None,
            tokens_used: None,
        }
    }
}

/// How a provider's executable was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    Config,
    EnvVar,
    PathLookup,
    ShellAlias,
    InstallDir,
    AppBundle,
    Builtin,
}

/// Provider metadata, memoized per provider instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub name: String,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub available: bool,
    pub priority: u32,
    pub capabilities: Vec<AnalysisType>,
    pub detection_method: Option<DetectionMethod>,
}

impl ProviderInfo {
    pub fn unavailable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            path: None,
            available: false,
            priority: 0,
            capabilities: AnalysisType::ALL.to_vec(),
            detection_method: None,
        }
    }
}

/// Output of a comprehensive (all analysis types) run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveResult {
    pub primary: AnalysisResult,
    pub merged: Option<AnalysisResult>,
    pub providers: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Progress report emitted after each analyzed chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    pub current: usize,
    pub total: usize,
    pub percent: u8,
}

impl ChunkProgress {
    pub fn new(current: usize, total: usize) -> Self {
        let percent = if total == 0 { 100 } else { (current.min(total) * 100 / total) as u8 };
        Self { current, total, percent }
    }
}
