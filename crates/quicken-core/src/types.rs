//! Core types for quicken
//!
//! Defines the fundamental values that flow through a search:
//! - Per-test outcomes and the scalar fitness derived from them
//! - Evaluations, candidates and the persistent search state
//! - Generation records and the final report

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Literal status token that marks a passing test
pub const PASS_TOKEN: &str = "PASS";

/// Outcome of a single test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    /// Test passed
    Pass,
    /// Test did not pass; keeps the raw status token
    NotPass(String),
}

impl TestOutcome {
    /// Classify a raw status token
    #[inline]
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        if token == PASS_TOKEN {
            Self::Pass
        } else {
            Self::NotPass(token.to_string())
        }
    }

    /// Check if this outcome is a pass
    #[inline]
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Scalar fitness; lower is better
///
/// Any run with a non-passing test is scaled by the failure penalty, so it
/// scores worse than every all-passing run of realistic duration.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct FitnessScore(pub f64);

impl FitnessScore {
    /// Score of a candidate whose evaluation could not complete
    pub const WORST: Self = Self(f64::INFINITY);

    /// Compute fitness from a run's duration and correctness
    #[inline]
    #[must_use]
    pub fn from_run(duration: Duration, all_passing: bool, penalty: f64) -> Self {
        let factor = if all_passing { 1.0 } else { penalty };
        Self(duration.as_secs_f64() * factor)
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether this score clears the acceptance margin against `best`
    ///
    /// Exactly `self * factor < best`; equality is a rejection.
    #[inline]
    #[must_use]
    pub fn improves_on(self, best: Self, factor: f64) -> bool {
        self.0 * factor < best.0
    }
}

impl fmt::Display for FitnessScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_infinite() {
            write!(f, "inf")
        } else {
            write!(f, "{:.4}", self.0)
        }
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Result of one fitness evaluation
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// Per-test outcomes in report order
    pub outcomes: Vec<TestOutcome>,
    /// Wall-clock time of the whole runner invocation
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
    /// Derived fitness
    pub fitness: FitnessScore,
}

impl Evaluation {
    /// Create evaluation, computing fitness from outcomes
    #[must_use]
    pub fn new(outcomes: Vec<TestOutcome>, duration: Duration, penalty: f64) -> Self {
        let all_passing = outcomes.iter().all(TestOutcome::is_pass);
        Self {
            fitness: FitnessScore::from_run(duration, all_passing, penalty),
            outcomes,
            duration,
        }
    }

    /// Check if every test passed
    #[inline]
    #[must_use]
    pub fn all_passing(&self) -> bool {
        self.outcomes.iter().all(TestOutcome::is_pass)
    }

    /// Number of passing tests
    #[inline]
    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_pass()).count()
    }

    /// Number of tests not passing
    #[inline]
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }
}

/// One mutated version of the source produced within a generation
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Mutated source text
    pub source: String,
    /// Fitness of the candidate (`WORST` if evaluation failed)
    pub fitness: FitnessScore,
    /// Generation that produced it
    pub generation: u32,
}

/// State persisted across generations
#[derive(Debug, Clone)]
pub struct SearchState {
    /// Best source found so far
    pub best_source: String,
    /// Evaluation of the best source
    pub best: Evaluation,
    /// Generations completed
    pub generation: u32,
    /// Baseline duration of the original source
    pub baseline_duration: Duration,
}

impl SearchState {
    /// Start from the baseline
    #[must_use]
    pub fn new(source: String, baseline: Evaluation) -> Self {
        Self {
            best_source: source,
            baseline_duration: baseline.duration,
            best: baseline,
            generation: 0,
        }
    }

    /// Best fitness so far
    #[inline]
    #[must_use]
    pub fn best_fitness(&self) -> FitnessScore {
        self.best.fitness
    }

    /// Replace best with an accepted candidate
    pub fn accept(&mut self, candidate: Candidate, evaluation: Evaluation) {
        self.best_source = candidate.source;
        self.best = evaluation;
    }
}

/// What happened in one generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRecord {
    /// Generation index (1-based)
    pub generation: u32,
    /// Rules applied, in order
    pub rules: Vec<String>,
    /// Candidate fitness
    pub fitness: FitnessScore,
    /// Candidate duration, if the run completed
    pub duration_secs: Option<f64>,
    /// Whether the candidate replaced the best source
    pub accepted: bool,
    /// Duration of the target re-measured after the generation
    pub measured_secs: f64,
}

/// Final result of a search
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    /// Target file that was optimized
    pub target: PathBuf,
    /// Baseline evaluation
    pub baseline: Evaluation,
    /// Best evaluation found
    pub best: Evaluation,
    /// Last measured duration of the target
    pub final_secs: f64,
    /// Generations run
    pub generations: u32,
    /// Candidates accepted
    pub accepted: usize,
    /// Whether the speedup threshold was reached
    pub speedup_reached: bool,
    /// Per-generation history
    pub history: Vec<GenerationRecord>,
}

impl SearchReport {
    /// Baseline duration in seconds
    #[inline]
    #[must_use]
    pub fn original_secs(&self) -> f64 {
        self.baseline.duration.as_secs_f64()
    }

    /// Whether the target file was rewritten
    #[inline]
    #[must_use]
    pub fn modified(&self) -> bool {
        self.accepted > 0
    }
}
