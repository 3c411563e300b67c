//! Tunable constants for alignment and synthesis.
//!
//! Every field has a default, so a TOML file only needs the keys it overrides:
//!
//! ```toml
//! [synthesis]
//! chunk_window_chars = 100000
//!
//! [generation]
//! provider = "openai"
//! timeout_secs = 120
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SyllabusError},
    provider::Provider,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aligner: AlignerConfig,
    pub synthesis: SynthesisConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    pub anchor_tokens: usize,
    /// How many timeline words past the cursor a start anchor may begin at.
    pub start_search_window: usize,
    /// How many timeline words past the start match an end anchor may begin at.
    pub end_search_window: usize,
    pub seconds_per_word: f64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            anchor_tokens: 3,
            start_search_window: 500,
            end_search_window: 1000,
            seconds_per_word: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub direct_threshold_chars: usize,
    pub chunk_window_chars: usize,
    pub chunk_overlap_chars: usize,
    pub summary_concurrency: usize,
    pub module_concurrency: usize,
    pub chunk_concurrency: usize,
    pub enrichment_concurrency: usize,
    pub chunk_max_attempts: u32,
    pub chunk_retry_backoff_ms: u64,
    pub consolidation_threshold: usize,
    pub consolidation_min_lessons: usize,
    pub consolidation_max_lessons: usize,
    pub enrichment_batch_size: usize,
    pub min_on_screen_chars: usize,
    pub persona_sample_videos: usize,
    pub persona_sample_chars: usize,
    pub fallback_summary_chars: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            direct_threshold_chars: 3_200_000,
            chunk_window_chars: 150_000,
            chunk_overlap_chars: 5_000,
            summary_concurrency: 10,
            module_concurrency: 10,
            chunk_concurrency: 5,
            enrichment_concurrency: 10,
            chunk_max_attempts: 3,
            chunk_retry_backoff_ms: 1_000,
            consolidation_threshold: 20,
            consolidation_min_lessons: 10,
            consolidation_max_lessons: 15,
            enrichment_batch_size: 20,
            min_on_screen_chars: 4,
            persona_sample_videos: 3,
            persona_sample_chars: 4_000,
            fallback_summary_chars: 2_000,
        }
    }
}

impl SynthesisConfig {
    /// Linear backoff: the wait after failed attempt `n` is `n` times the base.
    pub fn chunk_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.chunk_retry_backoff_ms.saturating_mul(attempt as u64))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend used when the command line does not pick one.
    pub provider: Provider,
    /// Upper bound for a single generation request, connect to last byte.
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            timeout_secs: 300,
            temperature: 0.3,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw).map_err(|reason| SyllabusError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Self::parse(raw).map_err(|reason| SyllabusError::Config {
            path: "<inline>".into(),
            reason,
        })
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        let config: Config = toml::from_str(raw).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let s = &self.synthesis;
        if s.chunk_overlap_chars >= s.chunk_window_chars {
            return Err(format!(
                "chunk_overlap_chars ({}) must be smaller than chunk_window_chars ({})",
                s.chunk_overlap_chars, s.chunk_window_chars
            ));
        }
        if s.summary_concurrency == 0
            || s.module_concurrency == 0
            || s.chunk_concurrency == 0
            || s.enrichment_concurrency == 0
        {
            return Err("concurrency limits must be at least 1".to_string());
        }
        if s.chunk_max_attempts == 0 || s.enrichment_batch_size == 0 {
            return Err("chunk_max_attempts and enrichment_batch_size must be at least 1".into());
        }
        if self.aligner.anchor_tokens == 0 {
            return Err("anchor_tokens must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [synthesis]
            chunk_window_chars = 1000
            chunk_overlap_chars = 100

            [generation]
            provider = "openai"
            timeout_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.synthesis.chunk_window_chars, 1000);
        assert_eq!(config.synthesis.chunk_overlap_chars, 100);
        assert_eq!(config.synthesis.direct_threshold_chars, 3_200_000);
        assert_eq!(config.generation.timeout(), Duration::from_secs(60));
        assert_eq!(config.generation.provider, Provider::Openai);
        assert_eq!(Config::default().generation.provider, Provider::Grok);
        assert_eq!(config.aligner, AlignerConfig::default());
    }

    #[test]
    fn overlap_must_fit_inside_window() {
        let err = Config::from_toml(
            r#"
            [synthesis]
            chunk_window_chars = 10
            chunk_overlap_chars = 10
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("chunk_overlap_chars"));
    }

    #[test]
    fn backoff_is_linear() {
        let s = SynthesisConfig::default();
        assert_eq!(s.chunk_backoff(1), Duration::from_secs(1));
        assert_eq!(s.chunk_backoff(2), Duration::from_secs(2));
    }
}
