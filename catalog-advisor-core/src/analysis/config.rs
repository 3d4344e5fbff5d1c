//! Configuration for the analysis service
//!
//! Controls the enable switch, fallback policy, per-provider subprocess
//! limits, caching and chunking. Loaded from TOML.

use super::detector::CliBackend;
use super::errors::{AnalysisError, ProviderResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the analysis service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Master switch; when off every analysis returns a disabled result
    pub enabled: bool,

    /// Fallback policy when no provider is usable
    pub fallback: FallbackConfig,

    /// Per-provider settings
    pub providers: ProvidersConfig,

    /// Result cache
    pub cache: CacheConfig,

    /// Large batch splitting
    pub chunking: ChunkingConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback: FallbackConfig::default(),
            providers: ProvidersConfig::default(),
            cache: CacheConfig::default(),
            chunking: ChunkingConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate().with_context(|| format!("Invalid config file {:?}", path))?;

        Ok(config)
    }

    /// Reject limits that would make every call fail or loop
    pub fn validate(&self) -> ProviderResult<()> {
        for backend in CliBackend::ALL {
            if self.providers.get(backend).timeout_secs == 0 {
                return Err(AnalysisError::config(format!(
                    "providers.{}.timeout_secs must be greater than zero",
                    backend.name()
                )));
            }
        }

        if self.chunking.chunk_size == 0 {
            return Err(AnalysisError::config("chunking.chunk_size must be greater than zero"));
        }

        if self.cache.max_entries == 0 {
            return Err(AnalysisError::config("cache.max_entries must be greater than zero"));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Default location: `<config dir>/catalog-advisor/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("catalog-advisor").join("config.toml"))
    }

    /// Load from an explicit path, else the default path if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(default) if default.exists() => Self::from_file(&default),
            _ => Ok(Self::default()),
        }
    }

    /// Configuration with analysis switched off
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }
}

/// Fallback policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Produce a result even when no provider is available
    pub enabled: bool,

    /// Use the rule engine for that result instead of a disabled-style one
    pub use_rule_engine: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self { enabled: true, use_rule_engine: true }
    }
}

/// Provider configurations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub claude: ProviderSettings,
    pub gemini: ProviderSettings,
    pub codex: ProviderSettings,
}

impl ProvidersConfig {
    pub fn get(&self, backend: CliBackend) -> &ProviderSettings {
        match backend {
            CliBackend::Claude => &self.claude,
            CliBackend::Gemini => &self.gemini,
            CliBackend::Codex => &self.codex,
        }
    }

    pub fn get_mut(&mut self, backend: CliBackend) -> &mut ProviderSettings {
        match backend {
            CliBackend::Claude => &mut self.claude,
            CliBackend::Gemini => &mut self.gemini,
            CliBackend::Codex => &mut self.codex,
        }
    }
}

/// Subprocess limits for one CLI provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Explicit executable path, checked before any detection strategy
    pub path: Option<PathBuf>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self { enabled: true, timeout_secs: 120, max_retries: 2, retry_delay_ms: 1000, path: None }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable result caching
    pub enabled: bool,

    /// Maximum cache size (entries)
    pub max_entries: usize,

    /// Default TTL (seconds)
    pub default_ttl_secs: u64,

    /// Cache directory
    pub cache_dir: Option<PathBuf>,

    /// Enable persistent cache
    pub persistent: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            default_ttl_secs: 3600,
            cache_dir: None,
            persistent: false,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Configured directory, else `<cache dir>/catalog-advisor/analysis`
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("catalog-advisor").join("analysis")))
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub enabled: bool,
    /// Batches larger than this are split
    pub threshold: usize,
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { enabled: true, threshold: 20, chunk_size: 10 }
    }
}

/// Example configuration TOML
pub const EXAMPLE_CONFIG: &str = r#"
# catalog-advisor analysis configuration

enabled = true

[fallback]
enabled = true
use_rule_engine = true

[providers.claude]
enabled = true
timeout_secs = 120
max_retries = 2
retry_delay_ms = 1000

[providers.gemini]
enabled = true
timeout_secs = 90

[providers.codex]
enabled = false

[cache]
enabled = true
max_entries = 1000
default_ttl_secs = 3600
persistent = false

[chunking]
enabled = true
threshold = 20
chunk_size = 10
"#;
