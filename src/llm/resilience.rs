//! Timeout and retry around completion-service calls
//!
//! Every call gets a hard deadline; when it passes the in-flight request is
//! dropped (cancelling it) and the failure is returned straight away. Rate
//! limits and server errors are retried a bounded number of times with a
//! fixed pause in between.

use crate::core::config::PipelineConfig;
use crate::core::error::{Result, VoxError};
use std::future::Future;
use std::time::Duration;

/// Anything that turns a prompt into text
pub trait CompletionService {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>>;
}

/// Retry and timeout settings for completion calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.retry_backoff(),
            timeout: config.request_timeout(),
        }
    }
}

/// Completion service wrapped with [`RetryPolicy`]
pub struct ResilientCompletion<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: CompletionService> ResilientCompletion<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn complete_with_retry(&self, prompt: &str) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let outcome = tokio::time::timeout(self.policy.timeout, self.inner.complete(prompt)).await;

            match outcome {
                Err(_elapsed) => {
                    tracing::warn!(attempt, timeout = ?self.policy.timeout, "Completion request timed out");
                    return Err(VoxError::Timeout(self.policy.timeout));
                }
                Ok(Ok(text)) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Completion succeeded after retry");
                    }
                    return Ok(text);
                }
                Ok(Err(e)) if e.is_retryable() && attempt <= self.policy.max_retries => {
                    tracing::warn!(attempt, error = %e, backoff = ?self.policy.backoff, "Retrying completion request");
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Ok(Err(e)) => {
                    tracing::error!(attempt, error = %e, "Completion request failed");
                    return Err(e);
                }
            }
        }
    }
}

impl<S: CompletionService> CompletionService for ResilientCompletion<S> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.complete_with_retry(prompt).await
    }
}
