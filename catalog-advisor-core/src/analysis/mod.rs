//! Dependency update analysis
//!
//! Turns a batch of proposed catalog updates into risk-annotated
//! recommendations using a model CLI when one is installed, with a cache in
//! front and a rule engine behind.

pub mod cache;
pub mod cli_provider;
pub mod config;
pub mod detector;
pub mod errors;
pub mod parser;
pub mod process;
pub mod prompts;
pub mod provider;
pub mod rule_engine;
pub mod service;
pub mod types;

#[cfg(test)]
mod mock;

pub use cache::{AnalysisCache, CacheEntry, CacheStats};
pub use cli_provider::CliProvider;
pub use config::AnalysisConfig;
pub use detector::{CliBackend, ProviderDefinition, ProviderDetector};
pub use errors::{AnalysisError, ProviderResult};
pub use provider::AnalysisProvider;
pub use rule_engine::{RULE_ENGINE_NAME, RuleEngine};
pub use service::{AnalysisService, ServiceStatus};
pub use types::*;
