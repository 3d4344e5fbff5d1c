//! Error types for analysis operations
//!
//! Strongly-typed errors raised by providers and the subprocess layer. The
//! analysis service converts all of them into degraded results, so callers of
//! the public service API never see these directly.

use std::time::Duration;
use thiserror::Error;

/// Main error type for analysis operations
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The backing CLI could not be found or is disabled
    #[error("Provider '{provider}' is not available")]
    ServiceUnavailable { provider: String },

    /// The subprocess exceeded its wall-clock limit and was killed
    #[error("Provider '{provider}' timed out after {duration:?}")]
    Timeout { provider: String, duration: Duration },

    /// Non-zero exit or spawn failure
    #[error("Provider '{provider}' failed: {message}")]
    ExecutionFailed { provider: String, message: String, exit_code: Option<i32> },

    /// Response could not be turned into recommendations
    #[error("Parsing error: {message}")]
    ParseError { message: String },

    /// Cache or persistence operation failed
    #[error("Cache error: {message}")]
    CacheError { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Create a service unavailable error
    pub fn unavailable(provider: impl Into<String>) -> Self {
        Self::ServiceUnavailable { provider: provider.into() }
    }

    /// Create a timeout error
    pub fn timeout(provider: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout { provider: provider.into(), duration }
    }

    /// Create an execution failure
    pub fn execution(
        provider: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ExecutionFailed { provider: provider.into(), message: message.into(), exit_code }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError { message: message.into() }
    }

    /// Create a cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::CacheError { message: message.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Timeouts indicate a hung process and are never retried
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Timeout { .. } | Self::ServiceUnavailable { .. })
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, AnalysisError>;

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError { message: err.to_string() }
    }
}
