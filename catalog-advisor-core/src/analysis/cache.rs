//! Result cache for analysis calls
//!
//! Entries are keyed by a fingerprint of the analysis context and provider,
//! expire after a TTL, and can optionally be persisted as one JSON file per
//! key. Persistence problems are logged and behave like a miss.

use super::config::CacheConfig;
use super::errors::{AnalysisError, ProviderResult};
use super::types::{AnalysisContext, AnalysisResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A cached result and its bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub value: AnalysisResult,
    pub created_at: DateTime<Utc>,
    pub ttl_ms: u64,
    /// Package names of the originating context
    pub packages: Vec<String>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at).num_milliseconds();
        age >= i64::try_from(self.ttl_ms).unwrap_or(i64::MAX)
    }

    fn mentions_any(&self, names: &HashSet<&str>) -> bool {
        self.packages.iter().any(|p| names.contains(p.as_str()))
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, zero before the first lookup
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

pub struct AnalysisCache {
    state: Mutex<CacheState>,
    default_ttl: Duration,
    max_entries: usize,
    persist_dir: Option<PathBuf>,
}

impl AnalysisCache {
    /// In-memory cache
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            default_ttl,
            max_entries: max_entries.max(1),
            persist_dir: None,
        }
    }

    /// Also write entries to `dir`
    pub fn with_persistence(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = Some(dir.into());
        self
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let cache = Self::new(config.default_ttl(), config.max_entries);
        match config.persistent.then(|| config.resolved_cache_dir()).flatten() {
            Some(dir) => cache.with_persistence(dir),
            None => cache,
        }
    }

    /// SHA-256 over the canonical JSON of the context, joined with the provider
    pub fn fingerprint(context: &AnalysisContext, provider: &str) -> String {
        let packages: Vec<serde_json::Value> = context
            .packages
            .iter()
            .map(|p| {
                serde_json::json!([p.name, p.current_version, p.target_version, p.update_type])
            })
            .collect();

        let canonical = serde_json::json!({
            "packages": packages,
            "workspace": {
                "name": context.workspace_info.name,
                "path": context.workspace_info.path.to_string_lossy(),
            },
            "analysisType": context.analysis_type,
        });

        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(provider.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Cached result for the context, if present and fresh
    pub async fn get(&self, context: &AnalysisContext, provider: &str) -> Option<AnalysisResult> {
        let key = Self::fingerprint(context, provider);
        let now = Utc::now();
        let mut state = self.state.lock().await;

        if let Some(entry) = state.entries.get(&key) {
            if !entry.is_expired(now) {
                let value = entry.value.clone();
                state.hits += 1;
                debug!("Cache hit for {}", short(&key));
                return Some(value);
            }

            debug!("Cache entry {} expired", short(&key));
            state.entries.remove(&key);
            self.remove_file(&key).await;
        } else if let Some(entry) = self.load_file(&key).await {
            if !entry.is_expired(now) {
                let value = entry.value.clone();
                state.entries.insert(key.clone(), entry);
                self.enforce_capacity(&mut state, &key).await;
                state.hits += 1;
                return Some(value);
            }
            self.remove_file(&key).await;
        }

        state.misses += 1;
        None
    }

    /// Store a result; `ttl` overrides the default.
    ///
    /// Expired entries are purged from memory and disk on the way.
    pub async fn set(
        &self,
        context: &AnalysisContext,
        provider: &str,
        result: &AnalysisResult,
        ttl: Option<Duration>,
    ) {
        let key = Self::fingerprint(context, provider);
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = Utc::now();
        let entry = CacheEntry {
            key: key.clone(),
            value: result.clone(),
            created_at: now,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            packages: context.package_names(),
        };

        let mut state = self.state.lock().await;
        self.write_file(&entry).await;
        state.entries.insert(key.clone(), entry);
        state.entries.retain(|_, e| !e.is_expired(now));

        self.enforce_capacity(&mut state, &key).await;
        self.sweep_disk(&mut state, now, &key).await;
    }

    /// Remove every entry whose package list contains one of `names`.
    ///
    /// Returns the number of distinct entries removed (memory and disk).
    pub async fn invalidate_for_packages(&self, names: &[String]) -> usize {
        let names: HashSet<&str> = names.iter().map(String::as_str).collect();
        let mut removed = HashSet::new();
        let mut state = self.state.lock().await;

        state.entries.retain(|key, entry| {
            if entry.mentions_any(&names) {
                removed.insert(key.clone());
                false
            } else {
                true
            }
        });

        for entry in self.load_all_files().await {
            if entry.mentions_any(&names) {
                self.remove_file(&entry.key).await;
                removed.insert(entry.key);
            }
        }

        debug!("Invalidated {} cache entries", removed.len());
        removed.len()
    }

    /// Drop all entries and reset statistics
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = CacheState::default();

        for entry in self.load_all_files().await {
            self.remove_file(&entry.key).await;
        }
    }

    /// Statistics for this instance; `entries` counts fresh in-memory entries
    pub async fn get_stats(&self) -> CacheStats {
        let now = Utc::now();
        let state = self.state.lock().await;
        let lookups = state.hits + state.misses;
        CacheStats {
            entries: state.entries.values().filter(|e| !e.is_expired(now)).count(),
            hits: state.hits,
            misses: state.misses,
            hit_rate: if lookups == 0 { 0.0 } else { state.hits as f64 / lookups as f64 },
        }
    }

    /// Fresh entries on disk, `None` without persistence
    pub async fn persisted_entries(&self) -> Option<usize> {
        if self.persist_dir.is_none() {
            return None;
        }
        let now = Utc::now();
        Some(self.load_all_files().await.iter().filter(|e| !e.is_expired(now)).count())
    }

    /// Evict the oldest entries beyond `max_entries`, never `keep`
    async fn enforce_capacity(&self, state: &mut CacheState, keep: &str) {
        while state.entries.len() > self.max_entries {
            let Some(oldest) = state
                .entries
                .values()
                .filter(|e| e.key != keep)
                .min_by_key(|e| e.created_at)
                .map(|e| e.key.clone())
            else {
                break;
            };
            debug!("Evicting cache entry {}", short(&oldest));
            state.entries.remove(&oldest);
            self.remove_file(&oldest).await;
        }
    }

    /// Delete expired files, then the oldest files beyond `max_entries`
    async fn sweep_disk(&self, state: &mut CacheState, now: DateTime<Utc>, keep: &str) {
        if self.persist_dir.is_none() {
            return;
        }

        let mut live = Vec::new();
        for entry in self.load_all_files().await {
            if entry.is_expired(now) {
                debug!("Purging expired cache file {}", short(&entry.key));
                self.remove_file(&entry.key).await;
            } else {
                live.push(entry);
            }
        }

        if live.len() <= self.max_entries {
            return;
        }

        live.sort_by_key(|e| e.created_at);
        let excess = live.len() - self.max_entries;
        for entry in live.iter().filter(|e| e.key != keep).take(excess) {
            state.entries.remove(&entry.key);
            self.remove_file(&entry.key).await;
        }
    }

    fn file_for(&self, key: &str) -> Option<PathBuf> {
        self.persist_dir.as_ref().map(|dir| dir.join(format!("{}.json", key)))
    }

    async fn load_file(&self, key: &str) -> Option<CacheEntry> {
        let path = self.file_for(key)?;
        match Self::read_entry(&path).await {
            Ok(mut entry) => {
                entry.key = key.to_string();
                Some(entry)
            }
            Err(AnalysisError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Ignoring cache file {:?}: {}", path, e);
                None
            }
        }
    }

    async fn read_entry(path: &Path) -> ProviderResult<CacheEntry> {
        let bytes = fs::read(path).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AnalysisError::cache(format!("unreadable entry: {}", e)))
    }

    async fn load_all_files(&self) -> Vec<CacheEntry> {
        let Some(dir) = &self.persist_dir else {
            return Vec::new();
        };
        let Ok(mut listing) = fs::read_dir(dir).await else {
            return Vec::new();
        };

        let mut entries = Vec::new();
        while let Ok(Some(item)) = listing.next_entry().await {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(entry) = self.load_file(key).await {
                entries.push(entry);
            }
        }
        entries
    }

    async fn write_file(&self, entry: &CacheEntry) {
        let Some(path) = self.file_for(&entry.key) else {
            return;
        };
        if let Err(e) = Self::write_atomic(&path, entry).await {
            warn!("Failed to persist cache entry {:?}: {}", path, e);
        }
    }

    /// Write via a temp file and rename so readers never see partial JSON
    async fn write_atomic(path: &Path, entry: &CacheEntry) -> ProviderResult<()> {
        let json = serde_json::to_vec(entry)
            .map_err(|e| AnalysisError::cache(format!("cannot encode entry: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn remove_file(&self, key: &str) {
        let Some(path) = self.file_for(key) else {
            return;
        };
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove cache file {:?}: {}", path, e),
        }
    }
}

/// Key prefix for log lines
fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{AnalysisType, PackageUpdateInfo, UpdateType, WorkspaceInfo};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(names: &[&str], analysis_type: AnalysisType) -> AnalysisContext {
        AnalysisContext::new(
            names
                .iter()
                .map(|n| PackageUpdateInfo::new(*n, "1.0.0", "1.0.1", UpdateType::Patch))
                .collect(),
            WorkspaceInfo::new("acme", "/work/acme"),
            analysis_type,
        )
    }

    fn result(ctx: &AnalysisContext) -> AnalysisResult {
        AnalysisResult::review_all("claude", ctx, "check", "cached summary", 0.8)
    }

    #[test]
    fn test_fingerprint_identity() {
        let a = context(&["react", "vue"], AnalysisType::Impact);
        let b = context(&["react", "vue"], AnalysisType::Impact);
        let security = context(&["react", "vue"], AnalysisType::Security);
        let reordered = context(&["vue", "react"], AnalysisType::Impact);

        assert_eq!(AnalysisCache::fingerprint(&a, "claude"), AnalysisCache::fingerprint(&b, "claude"));
        assert_ne!(AnalysisCache::fingerprint(&a, "claude"), AnalysisCache::fingerprint(&security, "claude"));
        assert_ne!(AnalysisCache::fingerprint(&a, "claude"), AnalysisCache::fingerprint(&a, "gemini"));
        assert_ne!(AnalysisCache::fingerprint(&a, "claude"), AnalysisCache::fingerprint(&reordered, "claude"));
        assert_eq!(AnalysisCache::fingerprint(&a, "claude").len(), 64);
    }

    #[tokio::test]
    async fn test_get_set_and_stats() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 10);
        let ctx = context(&["react"], AnalysisType::Impact);

        let stored = result(&ctx);

        assert!(cache.get(&ctx, "claude").await.is_none());
        cache.set(&ctx, "claude", &stored, None).await;
        assert_eq!(cache.get(&ctx, "claude").await.unwrap(), stored);

        let stats = cache.get_stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_empty_stats() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 10);
        assert_eq!(cache.get_stats().await, CacheStats::default());
    }

    #[tokio::test]
    async fn test_expired_entries_are_invisible() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 10);
        let ctx = context(&["react"], AnalysisType::Impact);

        cache.set(&ctx, "claude", &result(&ctx), Some(Duration::from_millis(20))).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cache.get(&ctx, "claude").await.is_none());
        assert_eq!(cache.get_stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_invalidation_is_exact() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 10);
        let with_react = context(&["react", "react-dom"], AnalysisType::Impact);
        let without = context(&["vue"], AnalysisType::Impact);
        let prefix_only = context(&["reactive"], AnalysisType::Impact);

        for ctx in [&with_react, &without, &prefix_only] {
            cache.set(ctx, "claude", &result(ctx), None).await;
        }

        let removed = cache.invalidate_for_packages(&["react".to_string()]).await;
        assert_eq!(removed, 1);
        assert!(cache.get(&with_react, "claude").await.is_none());
        assert!(cache.get(&without, "claude").await.is_some());
        assert!(cache.get(&prefix_only, "claude").await.is_some());
    }

    #[tokio::test]
    async fn test_bounded_size_evicts_oldest() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 2);
        let first = context(&["a"], AnalysisType::Impact);
        let second = context(&["b"], AnalysisType::Impact);
        let third = context(&["c"], AnalysisType::Impact);

        for ctx in [&first, &second, &third] {
            cache.set(ctx, "claude", &result(ctx), None).await;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(cache.get_stats().await.entries, 2);
        assert!(cache.get(&first, "claude").await.is_none());
        assert!(cache.get(&third, "claude").await.is_some());
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 10);
        let ctx = context(&["react"], AnalysisType::Impact);
        cache.set(&ctx, "claude", &result(&ctx), None).await;
        cache.get(&ctx, "claude").await;

        cache.clear().await;
        assert_eq!(cache.get_stats().await, CacheStats::default());
    }

    #[tokio::test]
    async fn test_persistence_survives_restart() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&["react"], AnalysisType::Security);

        {
            let cache = AnalysisCache::new(Duration::from_secs(60), 10).with_persistence(dir.path());
            cache.set(&ctx, "gemini", &result(&ctx), None).await;
        }

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);

        let reopened = AnalysisCache::new(Duration::from_secs(60), 10).with_persistence(dir.path());
        let cached = reopened.get(&ctx, "gemini").await.unwrap();
        assert_eq!(cached.summary, "cached summary");
        assert_eq!(reopened.get_stats().await.hits, 1);

        assert_eq!(reopened.invalidate_for_packages(&["react".to_string()]).await, 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_disk_only_entries_are_invalidated() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&["lodash"], AnalysisType::Impact);

        let writer = AnalysisCache::new(Duration::from_secs(60), 10).with_persistence(dir.path());
        writer.set(&ctx, "claude", &result(&ctx), None).await;

        let other = AnalysisCache::new(Duration::from_secs(60), 10).with_persistence(dir.path());
        assert_eq!(other.invalidate_for_packages(&["lodash".to_string()]).await, 1);
        assert!(other.get(&ctx, "claude").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&["react"], AnalysisType::Impact);
        let key = AnalysisCache::fingerprint(&ctx, "claude");
        std::fs::write(dir.path().join(format!("{}.json", key)), "{ not json").unwrap();

        let cache = AnalysisCache::new(Duration::from_secs(60), 10).with_persistence(dir.path());
        assert!(cache.get(&ctx, "claude").await.is_none());
        assert_eq!(cache.get_stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let cache = Arc::new(AnalysisCache::new(Duration::from_secs(60), 100));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let name = format!("pkg-{}", i);
                    let ctx = context(&[name.as_str()], AnalysisType::Impact);
                    cache.set(&ctx, "claude", &result(&ctx), None).await;
                    cache.get(&ctx, "claude").await.is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let stats = cache.get_stats().await;
        assert_eq!(stats.entries, 16);
        assert_eq!(stats.hits, 16);
    }

    fn json_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .count()
    }

    #[tokio::test]
    async fn test_reopened_cache_respects_max_entries() {
        let dir = TempDir::new().unwrap();
        let contexts: Vec<_> =
            ["a", "b", "c"].iter().map(|n| context(&[*n], AnalysisType::Impact)).collect();

        let writer = AnalysisCache::new(Duration::from_secs(60), 10).with_persistence(dir.path());
        for ctx in &contexts {
            writer.set(ctx, "claude", &result(ctx), None).await;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(json_files(dir.path()), 3);

        let small = AnalysisCache::new(Duration::from_secs(60), 1).with_persistence(dir.path());
        for ctx in &contexts {
            assert!(small.get(ctx, "claude").await.is_some());
        }

        assert_eq!(small.get_stats().await.entries, 1);
        assert_eq!(json_files(dir.path()), 1);
        assert!(small.get(&contexts[2], "claude").await.is_some());
    }

    #[tokio::test]
    async fn test_set_purges_expired_files() {
        let dir = TempDir::new().unwrap();
        let cache = AnalysisCache::new(Duration::from_secs(60), 10).with_persistence(dir.path());

        for name in ["a", "b", "c"] {
            let ctx = context(&[name], AnalysisType::Impact);
            cache.set(&ctx, "claude", &result(&ctx), Some(Duration::from_millis(10))).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        let fresh = context(&["d"], AnalysisType::Impact);
        cache.set(&fresh, "claude", &result(&fresh), None).await;

        assert_eq!(json_files(dir.path()), 1);
        assert_eq!(cache.get_stats().await.entries, 1);
        assert_eq!(cache.persisted_entries().await, Some(1));
    }

    #[tokio::test]
    async fn test_disk_is_bounded_across_instances() {
        let dir = TempDir::new().unwrap();

        for name in ["a", "b", "c"] {
            // A fresh instance per run, each holding a single entry in memory
            let cache = AnalysisCache::new(Duration::from_secs(60), 2).with_persistence(dir.path());
            let ctx = context(&[name], AnalysisType::Impact);
            cache.set(&ctx, "claude", &result(&ctx), None).await;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(json_files(dir.path()), 2);
        let reader = AnalysisCache::new(Duration::from_secs(60), 2).with_persistence(dir.path());
        assert!(reader.get(&context(&["a"], AnalysisType::Impact), "claude").await.is_none());
        assert!(reader.get(&context(&["c"], AnalysisType::Impact), "claude").await.is_some());
    }

    #[tokio::test]
    async fn test_stats_skip_expired_entries() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 10);
        let ctx = context(&["react"], AnalysisType::Impact);

        cache.set(&ctx, "claude", &result(&ctx), Some(Duration::from_millis(10))).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get_stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_persisted_entries() {
        let dir = TempDir::new().unwrap();
        let writer = AnalysisCache::new(Duration::from_secs(60), 10).with_persistence(dir.path());
        let lasting = context(&["react"], AnalysisType::Impact);
        let fleeting = context(&["vue"], AnalysisType::Impact);

        writer.set(&lasting, "claude", &result(&lasting), None).await;
        writer.set(&fleeting, "claude", &result(&fleeting), Some(Duration::from_millis(10))).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let reader = AnalysisCache::new(Duration::from_secs(60), 10).with_persistence(dir.path());
        assert_eq!(reader.persisted_entries().await, Some(1));
        assert_eq!(reader.get_stats().await.entries, 0);

        let memory_only = AnalysisCache::new(Duration::from_secs(60), 10);
        assert_eq!(memory_only.persisted_entries().await, None);
    }

    #[tokio::test]
    async fn test_unwritable_directory_keeps_memory_entry() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let cache = AnalysisCache::new(Duration::from_secs(60), 10).with_persistence(blocker.join("cache"));
        let ctx = context(&["react"], AnalysisType::Impact);
        cache.set(&ctx, "claude", &result(&ctx), None).await;

        assert!(cache.get(&ctx, "claude").await.is_some());
        assert_eq!(cache.persisted_entries().await, Some(0));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_cache_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AnalysisCache::read_entry(&path).await.unwrap_err();
        assert!(matches!(err, AnalysisError::CacheError { .. }));

        let missing = AnalysisCache::read_entry(&dir.path().join("absent.json")).await.unwrap_err();
        assert!(matches!(missing, AnalysisError::Io(_)));
    }
}
