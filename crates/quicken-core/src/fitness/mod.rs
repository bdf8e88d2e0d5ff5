//! Fitness evaluation
//!
//! [`FitnessEvaluator`] turns one fresh test run into an [`Evaluation`]:
//! ordered outcomes, wall-clock duration and the scalar fitness
//! `duration * (penalty if any test fails else 1)`.

pub mod report;
pub mod runner;

pub use report::{parse_outcomes, status_tokens};
pub use runner::{ProcessRunner, RunOutput, TestRunner};

use crate::config::SearchConfig;
use crate::error::ExecutionError;
use crate::types::Evaluation;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Prefix of candidate file names
pub const CANDIDATE_PREFIX: &str = "tc-";

/// Evaluates sources by running their tests
#[derive(Clone)]
pub struct FitnessEvaluator {
    runner: Arc<dyn TestRunner>,
    penalty: f64,
    scratch_dir: Option<PathBuf>,
    suffix: String,
}

impl std::fmt::Debug for FitnessEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitnessEvaluator")
            .field("penalty", &self.penalty)
            .field("scratch_dir", &self.scratch_dir)
            .field("suffix", &self.suffix)
            .finish_non_exhaustive()
    }
}

impl FitnessEvaluator {
    /// Create evaluator with default penalty and system temp dir
    #[must_use]
    pub fn new(runner: Arc<dyn TestRunner>) -> Self {
        let defaults = SearchConfig::default();
        Self {
            runner,
            penalty: defaults.failure_penalty,
            scratch_dir: None,
            suffix: String::new(),
        }
    }

    /// Create evaluator from search configuration
    #[must_use]
    pub fn from_config(runner: Arc<dyn TestRunner>, config: &SearchConfig) -> Self {
        Self {
            runner,
            penalty: config.failure_penalty,
            scratch_dir: config.scratch_dir.clone(),
            suffix: String::new(),
        }
    }

    /// Name candidate files like `target` (same extension)
    #[must_use]
    pub fn for_target(mut self, target: &Path) -> Self {
        self.suffix = target
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        self
    }

    /// Evaluate source text
    ///
    /// The source is written to a uniquely named candidate file that is
    /// removed before this returns, whatever the outcome.
    pub async fn evaluate(&self, source: &str) -> Result<Evaluation, ExecutionError> {
        let candidate = CandidateFile::create(self.scratch_dir.as_deref(), &self.suffix, source)?;
        self.evaluate_path(candidate.path()).await
    }

    /// Evaluate a file already on disk
    pub async fn evaluate_path(&self, path: &Path) -> Result<Evaluation, ExecutionError> {
        let output = self.runner.run(path).await?;
        let outcomes = parse_outcomes(&output.report)?;
        let evaluation = Evaluation::new(outcomes, output.elapsed, self.penalty);

        tracing::debug!(
            path = %path.display(),
            passed = evaluation.passed(),
            failed = evaluation.failed(),
            fitness = %evaluation.fitness,
            "evaluated"
        );
        Ok(evaluation)
    }
}

/// Candidate source persisted for one evaluation
///
/// Deleted when dropped.
#[derive(Debug)]
pub struct CandidateFile {
    file: NamedTempFile,
}

impl CandidateFile {
    /// Write `source` to a fresh `tc-*` file in `dir` (system temp dir if none)
    pub fn create(dir: Option<&Path>, suffix: &str, source: &str) -> Result<Self, ExecutionError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(CANDIDATE_PREFIX).suffix(suffix).rand_bytes(16);

        let scratch = dir.map_or_else(std::env::temp_dir, Path::to_path_buf);
        let mut file = builder
            .tempfile_in(&scratch)
            .map_err(|e| ExecutionError::io_error(&scratch, e))?;

        file.write_all(source.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| ExecutionError::io_error(file.path(), e))?;

        tracing::debug!(path = %file.path().display(), "wrote candidate");
        Ok(Self { file })
    }

    /// Location of the candidate
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::runner::MockTestRunner;
    use super::*;
    use std::time::Duration;

    fn mock_returning(report: &'static str, secs: f64) -> MockTestRunner {
        let mut mock = MockTestRunner::new();
        mock.expect_run()
            .returning(move |_| Ok(RunOutput::new(report, Duration::from_secs_f64(secs))));
        mock
    }

    #[tokio::test]
    async fn all_passing_fitness_is_duration() {
        let evaluator = FitnessEvaluator::new(Arc::new(mock_returning(
            "x      PASS      PASS      PASS",
            2.0,
        )));
        let eval = evaluator.evaluate("source").await.unwrap();
        assert_eq!(eval.outcomes.len(), 3);
        assert!(eval.all_passing());
        assert!((eval.fitness.value() - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failing_fitness_is_penalized() {
        let evaluator = FitnessEvaluator::new(Arc::new(mock_returning(
            "x      PASS      FAIL",
            0.001,
        )));
        let eval = evaluator.evaluate("source").await.unwrap();
        assert!(!eval.all_passing());
        assert!((eval.fitness.value() - 1000.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn unparseable_report_is_error() {
        let evaluator = FitnessEvaluator::new(Arc::new(mock_returning("LoadError", 0.1)));
        let err = evaluator.evaluate("source").await.unwrap_err();
        assert!(matches!(err, ExecutionError::Unparseable(_)));
    }

    #[tokio::test]
    async fn runner_error_propagates() {
        let mut mock = MockTestRunner::new();
        mock.expect_run()
            .returning(|_| Err(ExecutionError::Timeout(Duration::from_secs(1))));
        let evaluator = FitnessEvaluator::new(Arc::new(mock));
        assert!(matches!(
            evaluator.evaluate("source").await,
            Err(ExecutionError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn candidate_file_removed_and_named() {
        let scratch = tempfile::tempdir().unwrap();
        let mut mock = MockTestRunner::new();
        mock.expect_run()
            .withf(|path| {
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                name.starts_with(CANDIDATE_PREFIX)
                    && name.ends_with(".rb")
                    && std::fs::read_to_string(path).unwrap() == "build :user"
            })
            .times(1)
            .returning(|_| Ok(RunOutput::new("x      PASS", Duration::from_millis(5))));

        let config = SearchConfig::new().with_scratch_dir(scratch.path());
        let evaluator = FitnessEvaluator::from_config(Arc::new(mock), &config)
            .for_target(Path::new("test/user_test.rb"));
        evaluator.evaluate("build :user").await.unwrap();

        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn candidate_file_removed_on_error() {
        let scratch = tempfile::tempdir().unwrap();
        let config = SearchConfig::new().with_scratch_dir(scratch.path());
        let evaluator = FitnessEvaluator::from_config(Arc::new(mock_returning("", 0.1)), &config);
        assert!(evaluator.evaluate("anything").await.is_err());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn candidate_names_are_unique() {
        let scratch = tempfile::tempdir().unwrap();
        let a = CandidateFile::create(Some(scratch.path()), ".rb", "a").unwrap();
        let b = CandidateFile::create(Some(scratch.path()), ".rb", "b").unwrap();
        assert_ne!(a.path(), b.path());
    }
}
