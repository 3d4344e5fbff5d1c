//! Analysis provider trait
//!
//! Every backend (CLI-driven model or the rule engine) implements
//! [`AnalysisProvider`]. Availability and metadata are memoized in an
//! explicit [`InfoCache`] owned by the provider value.

use super::errors::ProviderResult;
use super::types::{AnalysisContext, AnalysisResult, ProviderInfo};
use async_trait::async_trait;
use std::future::Future;
use tokio::sync::Mutex;

/// Common trait for all analysis providers
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Check if the provider can currently be used
    async fn is_available(&self) -> bool {
        self.get_info().await.available
    }

    /// Provider metadata; computed once and memoized until `clear_cache`
    async fn get_info(&self) -> ProviderInfo;

    /// Analyze a batch of updates
    async fn analyze(&self, context: &AnalysisContext) -> ProviderResult<AnalysisResult>;

    /// Drop memoized availability and metadata
    async fn clear_cache(&self);
}

/// Memoized [`ProviderInfo`] with manual invalidation
#[derive(Debug, Default)]
pub struct InfoCache {
    slot: Mutex<Option<ProviderInfo>>,
}

impl InfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized info, running `probe` on first use.
    ///
    /// The lock is held across the probe so concurrent callers share one
    /// detection run.
    pub async fn get_or_probe<F, Fut>(&self, probe: F) -> ProviderInfo
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProviderInfo>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(info) = slot.as_ref() {
            return info.clone();
        }

        let info = probe().await;
        *slot = Some(info.clone());
        info
    }

    pub async fn peek(&self) -> Option<ProviderInfo> {
        self.slot.lock().await.clone()
    }

    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}
