//! Core functionality for catalog-advisor
//!
//! This crate contains the analysis engine behind the catalog-advisor tool:
//! provider detection, CLI-backed and rule-based providers, the result cache
//! and the service that ties them together.

pub mod analysis;

pub use analysis::{AnalysisConfig, AnalysisService};
