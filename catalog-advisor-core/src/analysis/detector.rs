//! Model CLI detection
//!
//! Detects the supported model command-line tools across platforms and
//! installation methods, and ranks them by priority.

use super::process::{CommandRunner, CommandSpec, ProcessRunner};
use super::provider::AnalysisProvider;
use super::types::{AnalysisType, DetectionMethod, ProviderInfo};
use serde::{Deserialize, Serialize};
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
const SHELL_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The model CLIs we know how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CliBackend {
    Claude,
    Gemini,
    Codex,
}

impl CliBackend {
    /// In priority order
    pub const ALL: [CliBackend; 3] = [Self::Claude, Self::Gemini, Self::Codex];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Codex => "codex",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn command(&self) -> &'static str {
        self.name()
    }

    /// Environment variable holding an explicit executable path
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Claude => "CLAUDE_CLI_PATH",
            Self::Gemini => "GEMINI_CLI_PATH",
            Self::Codex => "CODEX_CLI_PATH",
        }
    }

    pub fn priority(&self) -> u32 {
        match self {
            Self::Claude => 100,
            Self::Gemini => 80,
            Self::Codex => 60,
        }
    }
}

/// Where to look for one provider's executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDefinition {
    pub backend: CliBackend,
    pub command: String,
    pub env_var: Option<String>,
    pub priority: u32,
    pub install_paths: Vec<PathBuf>,
    /// Executables inside GUI application bundles
    pub app_bundle_paths: Vec<PathBuf>,
    /// Directory list searched instead of the process `PATH`
    pub search_path: Option<OsString>,
}

impl ProviderDefinition {
    /// Built-in definition with platform-specific install locations
    pub fn for_backend(backend: CliBackend) -> Self {
        Self {
            backend,
            command: backend.command().to_string(),
            env_var: Some(backend.env_var().to_string()),
            priority: backend.priority(),
            install_paths: install_paths(backend),
            app_bundle_paths: app_bundle_paths(backend),
            search_path: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run every strategy and describe what was found
    pub async fn detect(&self, shell_probe: bool) -> ProviderInfo {
        match self.locate(shell_probe).await {
            Some((path, method)) => {
                let version = probe_version(self.name(), &path).await;
                info!(
                    "Found {} at {:?} via {:?} (version {})",
                    self.name(),
                    path,
                    method,
                    version.as_deref().unwrap_or("unknown")
                );

                ProviderInfo {
                    name: self.name().to_string(),
                    version,
                    path: Some(path),
                    available: true,
                    priority: self.priority,
                    capabilities: AnalysisType::ALL.to_vec(),
                    detection_method: Some(method),
                }
            }
            None => {
                debug!("{} CLI not found", self.name());
                ProviderInfo::unavailable(self.name())
            }
        }
    }

    /// Strategies in order; the first hit wins
    async fn locate(&self, shell_probe: bool) -> Option<(PathBuf, DetectionMethod)> {
        if let Some(path) = self.detect_env_override() {
            return Some((path, DetectionMethod::EnvVar));
        }

        if let Some(path) = self.detect_in_path().await {
            return Some((path, DetectionMethod::PathLookup));
        }

        if shell_probe {
            if let Some(path) = self.detect_shell_alias().await {
                return Some((path, DetectionMethod::ShellAlias));
            }
        }

        if let Some(path) = first_existing(&self.install_paths) {
            return Some((path, DetectionMethod::InstallDir));
        }

        if let Some(path) = first_existing(&self.app_bundle_paths) {
            return Some((path, DetectionMethod::AppBundle));
        }

        None
    }

    /// Check for user-specified path via environment variable
    fn detect_env_override(&self) -> Option<PathBuf> {
        let var = self.env_var.as_deref()?;
        let path = PathBuf::from(env::var_os(var)?);
        path.is_file().then_some(path)
    }

    /// `which`/`where`, then a manual PATH walk
    async fn detect_in_path(&self) -> Option<PathBuf> {
        if let Some(path_var) = &self.search_path {
            return search_path_var(&self.command, path_var);
        }

        let locator = if cfg!(windows) { "where" } else { "which" };
        let spec = CommandSpec::new(self.name(), locator).arg(&self.command);

        if let Ok(output) = ProcessRunner.run(&spec, LOOKUP_TIMEOUT).await {
            let found = output
                .stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .find(|path| path.is_file());
            if found.is_some() {
                return found;
            }
        }

        search_path_var(&self.command, &env::var_os("PATH")?)
    }

    /// Aliases and functions only exist inside an interactive shell
    async fn detect_shell_alias(&self) -> Option<PathBuf> {
        if cfg!(windows) {
            return None;
        }

        let shell = env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        let spec = CommandSpec::new(self.name(), shell)
            .args(["-i", "-c"])
            .arg(format!("type {}", self.command));

        let output = ProcessRunner.run(&spec, SHELL_PROBE_TIMEOUT).await.ok()?;
        alias_target(&output.stdout).filter(|path| path.is_file())
    }
}

/// Well-known install directories for a backend on this platform
fn install_paths(backend: CliBackend) -> Vec<PathBuf> {
    let command = backend.command();
    let home = dirs::home_dir();

    if cfg!(windows) {
        let mut paths = Vec::new();
        if let Some(appdata) = env::var_os("APPDATA") {
            let npm = Path::new(&appdata).join("npm");
            paths.push(npm.join(format!("{}.cmd", command)));
            paths.push(npm.join(format!("{}.exe", command)));
        }
        if let Some(local) = env::var_os("LOCALAPPDATA") {
            paths.push(
                Path::new(&local).join("Programs").join(command).join(format!("{}.exe", command)),
            );
        }
        return paths;
    }

    let mut paths = Vec::new();

    // Claude's self-managed installer
    if backend == CliBackend::Claude {
        if let Some(home) = &home {
            paths.push(home.join(".claude").join("local").join("claude"));
        }
    }

    if cfg!(target_os = "macos") {
        paths.push(PathBuf::from("/opt/homebrew/bin").join(command));
    }

    paths.push(PathBuf::from("/usr/local/bin").join(command));
    paths.push(PathBuf::from("/usr/bin").join(command));

    if let Some(home) = &home {
        for dir in [".npm-global/bin", ".local/bin", ".bun/bin", ".volta/bin", ".yarn/bin"] {
            paths.push(home.join(dir).join(command));
        }
    }

    paths
}

/// CLI executables shipped inside desktop application bundles
fn app_bundle_paths(backend: CliBackend) -> Vec<PathBuf> {
    if !cfg!(target_os = "macos") {
        return Vec::new();
    }

    let bundle = match backend {
        CliBackend::Claude => "Claude.app/Contents/MacOS/claude",
        CliBackend::Codex => "Codex.app/Contents/Resources/codex",
        CliBackend::Gemini => return Vec::new(),
    };

    let mut paths = vec![PathBuf::from("/Applications").join(bundle)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join("Applications").join(bundle));
    }
    paths
}

/// Ranks analysis providers, memoizing the ranking until cleared
pub struct ProviderDetector {
    providers: Vec<Arc<dyn AnalysisProvider>>,
    cache: Mutex<Option<Vec<ProviderInfo>>>,
}

impl ProviderDetector {
    pub fn new(providers: Vec<Arc<dyn AnalysisProvider>>) -> Self {
        Self { providers, cache: Mutex::new(None) }
    }

    pub fn providers(&self) -> &[Arc<dyn AnalysisProvider>] {
        &self.providers
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn AnalysisProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// Every known provider, sorted available-first then by priority
    pub async fn detect_all(&self) -> Vec<ProviderInfo> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            debug!("Using cached provider detection ({} providers)", cached.len());
            return cached.clone();
        }

        let mut results = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            results.push(provider.get_info().await);
        }
        Self::sort_by_priority(&mut results);

        *cache = Some(results.clone());
        results
    }

    /// Highest-priority available provider, if any
    pub async fn get_best_provider(&self) -> Option<Arc<dyn AnalysisProvider>> {
        let best = self.detect_all().await.into_iter().find(|info| info.available)?;
        self.find(&best.name)
    }

    /// Forget the ranking and every provider's memoized info
    /// (useful when a CLI was just installed)
    pub async fn clear_cache(&self) {
        *self.cache.lock().await = None;
        for provider in &self.providers {
            provider.clear_cache().await;
        }
    }

    /// Availability is the primary key, priority the secondary
    pub fn sort_by_priority(infos: &mut [ProviderInfo]) {
        infos.sort_by(|a, b| b.available.cmp(&a.available).then(b.priority.cmp(&a.priority)));
    }
}

/// Parse version string from `--version` output (stdout, else stderr)
pub(crate) async fn probe_version(name: &str, path: &Path) -> Option<String> {
    let spec = CommandSpec::new(name, path).arg("--version");
    let output = ProcessRunner.run(&spec, VERSION_PROBE_TIMEOUT).await.ok()?;

    let text = if output.stdout.trim().is_empty() { &output.stderr } else { &output.stdout };
    regex_utils::version::extract(text)
}

fn first_existing(paths: &[PathBuf]) -> Option<PathBuf> {
    paths.iter().find(|p| p.is_file()).cloned()
}

fn search_path_var(command: &str, path_var: &OsStr) -> Option<PathBuf> {
    for dir in env::split_paths(path_var) {
        let candidate = dir.join(command);
        if candidate.is_file() {
            return Some(candidate);
        }

        // On Windows, also check the usual launcher extensions
        if cfg!(windows) {
            for ext in ["cmd", "exe", "bat"] {
                let candidate = dir.join(format!("{}.{}", command, ext));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }

    None
}

/// Executable named by `type <cmd>` output; functions cannot be spawned
fn alias_target(type_output: &str) -> Option<PathBuf> {
    if regex_utils::shell::is_function(type_output) {
        debug!("Shell function found; it cannot be spawned directly");
        return None;
    }

    regex_utils::shell::resolve_target(type_output).map(|target| expand_home(&target))
}

fn expand_home(target: &str) -> PathBuf {
    match (target.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(target),
    }
}
