//! Search configuration
//!
//! [`SearchConfig`] carries every tunable of a run. It deserializes from TOML
//! (all fields optional) and exposes `with_*` builders for callers that
//! construct it in code.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder substituted with the test file path in runner commands
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Search configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Generation cap; the search stops once the counter exceeds it
    pub max_generations: u32,
    /// Candidate must satisfy `fitness * acceptance_factor < best`
    pub acceptance_factor: f64,
    /// Stop when measured duration `<= baseline * speedup_threshold`
    pub speedup_threshold: f64,
    /// Probability of applying another rule after each application
    pub chain_continue_probability: f64,
    /// Multiplier applied to the duration of any run with a failing test
    pub failure_penalty: f64,
    /// Per-evaluation timeout in seconds (none by default)
    pub evaluation_timeout_secs: Option<f64>,
    /// Runner command; `{path}` is replaced with the file under test
    pub command: Vec<String>,
    /// Directory for candidate files (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
    /// Seed for rule selection and chaining
    pub seed: Option<u64>,
    /// Extra regex rules appended to the built-in catalog
    pub rules: Vec<RuleConfig>,
}

impl SearchConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// With generation cap
    #[inline]
    #[must_use]
    pub fn with_max_generations(mut self, max: u32) -> Self {
        self.max_generations = max;
        self
    }

    /// With seed
    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// With evaluation timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.evaluation_timeout_secs = Some(timeout.as_secs_f64());
        self
    }

    /// With runner command
    #[must_use]
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// With scratch directory for candidate files
    #[inline]
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// With chain continuation probability
    #[inline]
    #[must_use]
    pub fn with_chain_probability(mut self, p: f64) -> Self {
        self.chain_continue_probability = p;
        self
    }

    /// Evaluation timeout as a duration
    ///
    /// `None` when unset or not representable; `validate` rejects the latter.
    #[must_use]
    pub fn evaluation_timeout(&self) -> Option<Duration> {
        self.evaluation_timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Check numeric ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.acceptance_factor > 0.0 && self.acceptance_factor <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "acceptance_factor",
                expected: "in (0, 1]",
                value: self.acceptance_factor,
            });
        }
        if !(self.speedup_threshold > 0.0 && self.speedup_threshold <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "speedup_threshold",
                expected: "in (0, 1]",
                value: self.speedup_threshold,
            });
        }
        // 1.0 would never stop chaining
        if !(0.0..1.0).contains(&self.chain_continue_probability) {
            return Err(ConfigError::OutOfRange {
                field: "chain_continue_probability",
                expected: "in [0, 1)",
                value: self.chain_continue_probability,
            });
        }
        if !(self.failure_penalty > 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "failure_penalty",
                expected: "greater than 1",
                value: self.failure_penalty,
            });
        }
        if let Some(timeout) = self.evaluation_timeout_secs {
            if !(timeout > 0.0) || Duration::try_from_secs_f64(timeout).is_err() {
                return Err(ConfigError::OutOfRange {
                    field: "evaluation_timeout_secs",
                    expected: "positive and representable as a duration",
                    value: timeout,
                });
            }
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_generations: 5,
            acceptance_factor: 0.95,
            speedup_threshold: 0.9,
            chain_continue_probability: 0.5,
            failure_penalty: 1_000_000.0,
            evaluation_timeout_secs: None,
            command: vec!["ruby".into(), "-Itest".into(), PATH_PLACEHOLDER.into()],
            scratch_dir: None,
            seed: None,
            rules: Vec::new(),
        }
    }
}

/// User-declared regex rewrite rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Rule name, unique within the catalog
    pub name: String,
    /// Regex matched against the source
    pub pattern: String,
    /// Replacement; `$1` style group references allowed
    pub replacement: String,
}
