use crate::completion::CompletionSettings;
use crate::dispatcher::{AnalysisDispatcher, RetryPolicy};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix of the environment variables read by [`AnalysisConfig::from_env`].
pub const ENV_PREFIX: &str = "DEAL_ANALYZER_";

/// Tuning knobs for chunking, dispatch and the completion calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub model: String,
    /// Maximum estimated cost (characters / 4) of one chunk.
    pub max_chunk_size: usize,
    pub concurrency_limit: usize,
    pub max_retries: u32,
    /// Backoff unit; the wait after failed attempt `n` is `unit * 2^n`.
    pub backoff_unit_ms: u64,
    pub backoff_jitter_ms: u64,
    pub chunk_temperature: f32,
    pub chunk_max_tokens: u32,
    pub summary_temperature: f32,
    pub summary_max_tokens: u32,
    pub synthesis_temperature: f32,
    pub synthesis_max_tokens: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            max_chunk_size: 4000,
            concurrency_limit: 3,
            max_retries: 3,
            backoff_unit_ms: 1000,
            backoff_jitter_ms: 0,
            chunk_temperature: 0.3,
            chunk_max_tokens: 1500,
            summary_temperature: 0.3,
            summary_max_tokens: 2000,
            synthesis_temperature: 0.2,
            synthesis_max_tokens: 4000,
        }
    }
}

impl AnalysisConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `DEAL_ANALYZER_*` environment variables
    /// (e.g. `DEAL_ANALYZER_CONCURRENCY_LIMIT=5`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(model) = get("MODEL") {
            config.model = model;
        }
        override_parsed(&mut config.max_chunk_size, "MAX_CHUNK_SIZE", get("MAX_CHUNK_SIZE"))?;
        override_parsed(
            &mut config.concurrency_limit,
            "CONCURRENCY_LIMIT",
            get("CONCURRENCY_LIMIT"),
        )?;
        override_parsed(&mut config.max_retries, "MAX_RETRIES", get("MAX_RETRIES"))?;
        override_parsed(&mut config.backoff_unit_ms, "BACKOFF_UNIT_MS", get("BACKOFF_UNIT_MS"))?;
        override_parsed(
            &mut config.backoff_jitter_ms,
            "BACKOFF_JITTER_MS",
            get("BACKOFF_JITTER_MS"),
        )?;
        override_parsed(
            &mut config.chunk_temperature,
            "CHUNK_TEMPERATURE",
            get("CHUNK_TEMPERATURE"),
        )?;
        override_parsed(
            &mut config.synthesis_temperature,
            "SYNTHESIS_TEMPERATURE",
            get("SYNTHESIS_TEMPERATURE"),
        )?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(AnalysisError::Config("model must not be empty".to_string()));
        }
        if self.max_chunk_size == 0 {
            return Err(AnalysisError::Config(
                "max_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.concurrency_limit == 0 {
            return Err(AnalysisError::Config(
                "concurrency_limit must be at least 1".to_string(),
            ));
        }
        for (name, tokens) in [
            ("chunk_max_tokens", self.chunk_max_tokens),
            ("summary_max_tokens", self.summary_max_tokens),
            ("synthesis_max_tokens", self.synthesis_max_tokens),
        ] {
            if tokens == 0 {
                return Err(AnalysisError::Config(format!("{} must be positive", name)));
            }
        }
        for (name, temperature) in [
            ("chunk_temperature", self.chunk_temperature),
            ("summary_temperature", self.summary_temperature),
            ("synthesis_temperature", self.synthesis_temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AnalysisError::Config(format!(
                    "{} {} must be between 0.0 and 2.0",
                    name, temperature
                )));
            }
        }
        Ok(())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    pub fn with_concurrency_limit(mut self, concurrency_limit: usize) -> Self {
        self.concurrency_limit = concurrency_limit;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff_unit: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff_unit_ms = backoff_unit.as_millis() as u64;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.backoff_unit_ms))
            .with_jitter(Duration::from_millis(self.backoff_jitter_ms))
    }

    pub fn dispatcher(&self) -> AnalysisDispatcher {
        AnalysisDispatcher::new(self.retry_policy(), self.concurrency_limit)
    }

    pub fn chunk_settings(&self) -> CompletionSettings {
        CompletionSettings::new(self.chunk_temperature, self.chunk_max_tokens)
    }

    pub fn summary_settings(&self) -> CompletionSettings {
        CompletionSettings::new(self.summary_temperature, self.summary_max_tokens)
    }

    pub fn synthesis_settings(&self) -> CompletionSettings {
        CompletionSettings::new(self.synthesis_temperature, self.synthesis_max_tokens)
    }
}

fn override_parsed<T: std::str::FromStr>(
    target: &mut T,
    name: &str,
    raw: Option<String>,
) -> Result<()> {
    if let Some(raw) = raw {
        *target = raw.trim().parse().map_err(|_| {
            AnalysisError::Config(format!("{}{} has invalid value '{}'", ENV_PREFIX, name, raw))
        })?;
    }
    Ok(())
}
