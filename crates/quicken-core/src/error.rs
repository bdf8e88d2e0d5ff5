//! Error types for quicken
//!
//! Provides error handling for:
//! - Preconditions checked before any mutation (target present, baseline green)
//! - Test runner failures (spawn, timeout, unparseable report)
//! - Configuration loading and validation
//! - Target file reads and writes

use std::path::PathBuf;
use std::time::Duration;

/// Main quicken error type
#[derive(Debug, thiserror::Error)]
pub enum QuickenError {
    /// Missing or invalid command-line argument
    #[error("usage: {0}")]
    Usage(String),

    /// Search cannot start
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Test runner could not produce a usable report
    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reading or writing the target file failed
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl QuickenError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the target file is guaranteed untouched when this error surfaces
    #[inline]
    #[must_use]
    pub fn target_untouched(&self) -> bool {
        matches!(
            self,
            Self::Usage(_) | Self::Precondition(_) | Self::Config(_) | Self::Execution(_)
        )
    }

    /// Process exit code for this error
    #[inline]
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Config(_) => 3,
            Self::Precondition(_) | Self::Execution(_) | Self::Io { .. } => 1,
        }
    }
}

/// Conditions that must hold before the search mutates anything
#[derive(Debug, thiserror::Error)]
pub enum PreconditionError {
    /// Target path does not reference an existing file
    #[error("file {} doesn't exist", .path.display())]
    TargetMissing { path: PathBuf },

    /// Baseline run has at least one test not passing
    #[error("not all tests are passing ({failed} of {total} failing); make them green first")]
    BaselineFailing { failed: usize, total: usize },
}

/// Test runner failures
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Runner process could not be started
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Runner did not finish within the configured timeout
    #[error("test run exceeded {}s timeout", .0.as_secs_f64())]
    Timeout(Duration),

    /// Report contained no recognizable per-test status tokens
    #[error("no per-test results in runner output: {0}")]
    Unparseable(String),

    /// Runner command template is empty
    #[error("runner command is empty")]
    EmptyCommand,

    /// Writing or reading a candidate file failed
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExecutionError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an unparseable error with a bounded excerpt of the output
    pub fn unparseable(output: &str) -> Self {
        const EXCERPT: usize = 120;
        let excerpt: String = output.chars().take(EXCERPT).collect();
        if excerpt.is_empty() {
            Self::Unparseable("<empty>".to_string())
        } else {
            Self::Unparseable(excerpt)
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::SearchConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// User rule pattern does not compile
    #[error("rule '{name}' has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// Catalog has no rules to apply
    #[error("mutation catalog is empty")]
    EmptyCatalog,

    /// Two rules share a name
    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),

    /// Numeric setting outside its range
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}

/// Result alias for quicken operations
pub type Result<T, E = QuickenError> = std::result::Result<T, E>;
