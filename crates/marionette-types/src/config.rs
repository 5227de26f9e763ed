//! Runtime configuration loaded from `marionette.toml`.
//!
//! Every field has a default matching the stock firmware build, so an empty
//! file (or no file at all) yields a working instrument.

use std::path::Path;

use serde::Deserialize;

use crate::error::{MarionetteError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarionetteConfig {
    pub fetch: FetchConfig,
    pub pipe: PipeConfig,
    pub adc: AdcConfig,
    pub shell: ShellConfig,
}

/// Limits applied by the Fetch tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Longest accepted host line, excluding the line terminator.
    pub max_line_chars: usize,
    /// Maximum number of colon-delimited command tokens.
    pub max_command_tokens: usize,
    /// Maximum number of whitespace-delimited data tokens.
    pub max_data_tokens: usize,
    /// Emit `?:` debug lines to the host.
    pub debug: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_line_chars: 256,
            max_command_tokens: 8,
            max_data_tokens: 8,
            debug: false,
        }
    }
}

/// A consumer mailbox fed by the acquisition source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SinkConfig {
    pub name: String,
    #[serde(default = "default_sink_capacity")]
    pub capacity: usize,
}

fn default_sink_capacity() -> usize {
    16
}

/// Sample pool and mailbox sizing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Number of sample sets in the fixed pool.
    pub pool_size: usize,
    /// Samples carried by each sample set.
    pub samples_per_set: usize,
    /// Bounded wait used by consumer threads between shutdown checks.
    pub consumer_timeout_ms: u64,
    pub sinks: Vec<SinkConfig>,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            samples_per_set: 16,
            consumer_timeout_ms: 10,
            sinks: vec![SinkConfig {
                name: "adc".to_string(),
                capacity: default_sink_capacity(),
            }],
        }
    }
}

/// Acquisition source settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    /// Prefix of streamed data lines.
    pub tag: String,
    /// Conversion period in continuous mode.
    pub period_us: u64,
    /// Pins claimed as analog inputs while the converter runs.
    pub inputs: Vec<String>,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            tag: "A2".to_string(),
            period_us: 1000,
            inputs: vec!["PA3".to_string()],
        }
    }
}

/// Host shell presentation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub prompt: String,
    /// Print the welcome line when the host loop starts.
    pub banner: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            banner: true,
        }
    }
}

impl MarionetteConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(toml_str)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        log::info!("loading config from {}", path.display());
        Self::from_toml(&text)
    }

    /// Reject sizes that would leave the pipeline or tokenizer unusable.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_line_chars == 0 {
            return Err(MarionetteError::Config(
                "fetch.max_line_chars must be non-zero".into(),
            ));
        }
        if self.fetch.max_command_tokens == 0 {
            return Err(MarionetteError::Config(
                "fetch.max_command_tokens must be non-zero".into(),
            ));
        }
        if self.pipe.pool_size == 0 {
            return Err(MarionetteError::Config(
                "pipe.pool_size must be non-zero".into(),
            ));
        }
        if self.pipe.samples_per_set == 0 {
            return Err(MarionetteError::Config(
                "pipe.samples_per_set must be non-zero".into(),
            ));
        }
        if self.pipe.pool_size > usize::from(u16::MAX) {
            return Err(MarionetteError::Config(format!(
                "pipe.pool_size {} exceeds {}",
                self.pipe.pool_size,
                u16::MAX
            )));
        }
        for sink in &self.pipe.sinks {
            if sink.capacity == 0 {
                return Err(MarionetteError::Config(format!(
                    "pipe.sinks.{}: capacity must be non-zero",
                    sink.name
                )));
            }
        }
        if self.adc.tag.is_empty() {
            return Err(MarionetteError::Config("adc.tag must not be empty".into()));
        }
        Ok(())
    }
}
