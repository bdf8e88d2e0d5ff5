//! Search progress reporting
//!
//! The search reports every step as a [`SearchEvent`] to an injected
//! [`SearchObserver`]. [`TracingObserver`] is the default and forwards events
//! to `tracing`; nothing here touches process-wide output.

use crate::types::{Evaluation, FitnessScore};
use std::path::PathBuf;

/// Why a candidate was not kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// At least one test stopped passing
    FailingTests { failed: usize },
    /// All tests pass but the gain is inside the acceptance margin
    InsufficientGain,
    /// Rules left the source identical to the best
    Unchanged,
    /// Runner failed; scored as worst fitness
    ExecutionFailed(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailingTests { failed } => write!(f, "{failed} failing tests"),
            Self::InsufficientGain => write!(f, "not enough improvement"),
            Self::Unchanged => write!(f, "source unchanged"),
            Self::ExecutionFailed(msg) => write!(f, "execution failed: {msg}"),
        }
    }
}

/// One step of a search
#[derive(Debug, Clone)]
pub enum SearchEvent {
    /// Original source evaluated
    BaselineMeasured { evaluation: Evaluation },
    /// A rule was applied while building a candidate
    RuleApplied {
        generation: u32,
        rule: String,
        changed: bool,
    },
    /// Candidate replaced the best source
    CandidateAccepted {
        generation: u32,
        fitness: FitnessScore,
    },
    /// Candidate discarded
    CandidateRejected {
        generation: u32,
        fitness: FitnessScore,
        reason: RejectReason,
    },
    /// Best source written over the target
    TargetWritten { path: PathBuf },
    /// Re-measuring the target failed; best duration used instead
    RemeasureFailed { generation: u32, error: String },
    /// Generation complete
    GenerationFinished {
        generation: u32,
        measured_secs: f64,
    },
    /// Search stopped
    Finished {
        generations: u32,
        accepted: usize,
        speedup_reached: bool,
    },
}

/// Receives search events
pub trait SearchObserver: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &SearchEvent);
}

/// Observer that logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SearchObserver for TracingObserver {
    fn on_event(&self, event: &SearchEvent) {
        match event {
            SearchEvent::BaselineMeasured { evaluation } => tracing::info!(
                tests = evaluation.outcomes.len(),
                failed = evaluation.failed(),
                secs = evaluation.duration.as_secs_f64(),
                "Baseline measured"
            ),
            SearchEvent::RuleApplied {
                generation,
                rule,
                changed,
            } => tracing::debug!(generation, changed, "Mutating {rule}..."),
            SearchEvent::CandidateAccepted {
                generation,
                fitness,
            } => tracing::info!(generation, "Better source code found! Tests fitness: {fitness}"),
            SearchEvent::CandidateRejected {
                generation,
                fitness,
                reason: reason @ RejectReason::ExecutionFailed(_),
            } => tracing::warn!(generation, %fitness, "Failed mutation: {reason}"),
            SearchEvent::CandidateRejected {
                generation,
                fitness,
                reason,
            } => tracing::info!(generation, %reason, "Failed mutation. Tests fitness: {fitness}"),
            SearchEvent::TargetWritten { path } => {
                tracing::info!("Writing file {}", path.display());
            }
            SearchEvent::RemeasureFailed { generation, error } => {
                tracing::warn!(generation, "Re-measuring target failed: {error}");
            }
            SearchEvent::GenerationFinished {
                generation,
                measured_secs,
            } => tracing::debug!(generation, measured_secs, "Generation finished"),
            SearchEvent::Finished {
                generations,
                accepted,
                speedup_reached,
            } => tracing::info!(generations, accepted, speedup_reached, "Search finished"),
        }
    }
}
