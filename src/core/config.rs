//! Pipeline configuration with documented constants
//!
//! Timing and sizing knobs for the command pipeline live here. Values can be
//! overridden from a TOML file; any key left out keeps its default.

use crate::core::error::{Result, VoxError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration for the command pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // === TRANSCRIPT GATE ===
    /// Quiet window after the last accepted transcript before it is dispatched (ms)
    ///
    /// Speech recognition streams growing partial transcripts ("go", "go to",
    /// "go to line 10"). Only the one still current when this window elapses
    /// becomes a command.
    pub debounce_ms: u64,

    // === COMPLETION SERVICE ===
    /// Hard limit for a single completion request (seconds)
    ///
    /// A timed-out request is not retried.
    pub request_timeout_secs: u64,

    /// Additional attempts after a rate-limit or server error
    ///
    /// At 2, a request that keeps failing is attempted 3 times in total.
    pub max_retries: u32,

    /// Fixed delay between attempts (ms)
    pub retry_backoff_ms: u64,

    // === FEEDBACK ===
    /// How long a status message stays visible (ms)
    pub status_ttl_ms: u64,

    // === PROMPT CONTEXT ===
    /// Buffer characters included in the classifier prompt
    pub classifier_excerpt_chars: usize,

    /// Buffer characters included in generator prompts
    pub generator_excerpt_chars: usize,

    /// Buffer characters captured in the editor snapshot
    ///
    /// Longer buffers are cut and suffixed with "...".
    pub context_excerpt_chars: usize,

    /// Lines above and below the cursor captured as surrounding context
    pub surrounding_lines: u32,

    // === EDITING ===
    /// Spaces per indentation level for indent, outdent and formatting
    pub indent_width: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,

            request_timeout_secs: 15,
            max_retries: 2,
            retry_backoff_ms: 1500,

            status_ttl_ms: 3000,

            classifier_excerpt_chars: 1000,
            generator_excerpt_chars: 2000,
            context_excerpt_chars: 3000,
            surrounding_lines: 5,

            indent_width: 4,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(VoxError::Config("request_timeout_secs must be positive".into()));
        }

        // A retry that waits longer than the request budget itself is a misconfiguration
        if self.retry_backoff_ms > self.request_timeout_secs * 1000 {
            return Err(VoxError::Config(format!(
                "retry_backoff_ms ({}) should be <= request_timeout_secs * 1000 ({})",
                self.retry_backoff_ms,
                self.request_timeout_secs * 1000
            )));
        }

        if self.classifier_excerpt_chars > self.context_excerpt_chars
            || self.generator_excerpt_chars > self.context_excerpt_chars
        {
            return Err(VoxError::Config(format!(
                "prompt excerpts must fit within context_excerpt_chars ({})",
                self.context_excerpt_chars
            )));
        }

        if self.indent_width == 0 {
            return Err(VoxError::Config("indent_width must be positive".into()));
        }

        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_millis(self.status_ttl_ms)
    }
}
