//! Subprocess execution for CLI-backed providers
//!
//! Timeout and retry are independent helpers: [`with_timeout`] bounds a
//! single attempt, [`retry_with_backoff`] repeats attempts that fail with a
//! retryable error.

use super::errors::{AnalysisError, ProviderResult};
use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Environment that keeps CLI output free of ANSI escapes
const PLAIN_OUTPUT_ENV: [(&str, &str); 3] =
    [("NO_COLOR", "1"), ("FORCE_COLOR", "0"), ("TERM", "dumb")];

/// A fully resolved command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Provider name, used in errors and logs
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self { label: label.into(), program: program.into(), args: Vec::new(), env: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Captured output of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Runs a command to completion under a wall-clock limit
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> ProviderResult<CommandOutput>;
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> ProviderResult<CommandOutput> {
        debug!("Running {:?} with {} args (timeout {:?})", spec.program, spec.args.len(), timeout);

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(PLAIN_OUTPUT_ENV)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            // The CLI must never wait on input
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            AnalysisError::execution(
                &spec.label,
                format!("Failed to spawn {:?}: {}", spec.program, e),
                None,
            )
        })?;

        // On timeout the future is dropped, which drops and kills the child
        let output = with_timeout(&spec.label, timeout, async {
            child.wait_with_output().await.map_err(AnalysisError::from)
        })
        .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let message = if stderr.trim().is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(AnalysisError::execution(&spec.label, message, output.status.code()));
        }

        Ok(CommandOutput { stdout, stderr, exit_code: output.status.code() })
    }
}

/// Bound a single attempt by a hard timeout
pub async fn with_timeout<T, F>(provider: &str, duration: Duration, future: F) -> ProviderResult<T>
where
    F: Future<Output = ProviderResult<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(AnalysisError::timeout(provider, duration)),
    }
}

/// Retry policy with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// `base * 2^(attempt-1)` for the 1-based attempt that just failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay: Duration::from_millis(1000) }
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// exhausts the policy. The last error is returned unchanged.
pub async fn retry_with_backoff<T, F, Fut>(
    provider: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> ProviderResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt > policy.max_retries => {
                warn!("{} failed after {} attempts: {}", provider, attempt, e);
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!("{} attempt {} failed, retrying in {:?}: {}", provider, attempt, delay, e);
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
