//! Hill-climbing mutation search
//!
//! One generation: chain random rules onto the best source, evaluate the
//! candidate, keep it only if `fitness * acceptance_factor < best`. Accepted
//! sources overwrite the target file immediately.
//!
//! A candidate identical to the best source is rejected as unchanged without
//! a test run; the generation still counts and the target is still re-measured.
//!
//! # Termination
//! After every generation the target is re-measured. The search stops once
//! that duration is at most `baseline * speedup_threshold`, or once the
//! generation counter exceeds `max_generations`.

use crate::catalog::MutationCatalog;
use crate::config::SearchConfig;
use crate::error::{ConfigError, PreconditionError, QuickenError, Result};
use crate::fitness::{FitnessEvaluator, TestRunner};
use crate::observer::{RejectReason, SearchEvent, SearchObserver, TracingObserver};
use crate::types::{
    Candidate, Evaluation, FitnessScore, GenerationRecord, SearchReport, SearchState,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Mutation search over one target file
pub struct MutationSearch<R = StdRng> {
    target: PathBuf,
    config: SearchConfig,
    catalog: MutationCatalog,
    evaluator: FitnessEvaluator,
    observer: Arc<dyn SearchObserver>,
    rng: R,
}

impl MutationSearch<StdRng> {
    /// Create search; the RNG is seeded from `config.seed` or the OS
    pub fn new(
        target: impl Into<PathBuf>,
        config: SearchConfig,
        catalog: MutationCatalog,
        runner: Arc<dyn TestRunner>,
    ) -> Self {
        let target = target.into();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let evaluator = FitnessEvaluator::from_config(runner, &config).for_target(&target);
        Self {
            target,
            config,
            catalog,
            evaluator,
            observer: Arc::new(TracingObserver),
            rng,
        }
    }
}

impl<R: Rng> MutationSearch<R> {
    /// Replace the random source
    pub fn with_rng<R2: Rng>(self, rng: R2) -> MutationSearch<R2> {
        MutationSearch {
            target: self.target,
            config: self.config,
            catalog: self.catalog,
            evaluator: self.evaluator,
            observer: self.observer,
            rng,
        }
    }

    /// Replace the observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Target file
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Run the search to termination
    ///
    /// # Errors
    /// - `Precondition` if the target is missing or its baseline fails
    /// - `Execution` if the baseline run cannot be evaluated
    /// - `Config` for invalid settings or an empty catalog
    /// - `Io` if the target cannot be read or rewritten
    pub async fn run(mut self) -> Result<SearchReport> {
        self.config.validate()?;
        if self.catalog.is_empty() {
            return Err(ConfigError::EmptyCatalog.into());
        }

        let mut state = self.initialize().await?;
        let baseline = state.best.clone();
        let mut history = Vec::new();
        let mut speedup_reached = false;

        loop {
            let record = self.generation(&mut state).await?;
            let measured = record.measured_secs;
            history.push(record);

            if measured <= state.baseline_duration.as_secs_f64() * self.config.speedup_threshold {
                speedup_reached = true;
                break;
            }
            if state.generation > self.config.max_generations {
                break;
            }
        }

        let accepted = history.iter().filter(|r| r.accepted).count();
        self.observer.on_event(&SearchEvent::Finished {
            generations: state.generation,
            accepted,
            speedup_reached,
        });

        Ok(SearchReport {
            target: self.target,
            final_secs: history
                .last()
                .map_or(baseline.duration.as_secs_f64(), |r| r.measured_secs),
            baseline,
            best: state.best,
            generations: state.generation,
            accepted,
            speedup_reached,
            history,
        })
    }

    /// Read the target and evaluate it as the baseline
    async fn initialize(&mut self) -> Result<SearchState> {
        if !self.target.is_file() {
            return Err(PreconditionError::TargetMissing {
                path: self.target.clone(),
            }
            .into());
        }
        let source = tokio::fs::read_to_string(&self.target)
            .await
            .map_err(|e| QuickenError::io_error(&self.target, e))?;

        let baseline = self.evaluator.evaluate_path(&self.target).await?;
        self.observer.on_event(&SearchEvent::BaselineMeasured {
            evaluation: baseline.clone(),
        });

        if !baseline.all_passing() {
            return Err(PreconditionError::BaselineFailing {
                failed: baseline.failed(),
                total: baseline.outcomes.len(),
            }
            .into());
        }
        Ok(SearchState::new(source, baseline))
    }

    /// Mutate, evaluate, compare and re-measure once
    async fn generation(&mut self, state: &mut SearchState) -> Result<GenerationRecord> {
        state.generation += 1;
        let generation = state.generation;

        let (source, rules) = self.mutate(&state.best_source, generation);

        let (candidate, evaluation, verdict) = if source == state.best_source {
            // Nothing changed; a re-run would only measure noise
            (
                Candidate {
                    source,
                    fitness: state.best_fitness(),
                    generation,
                },
                None,
                Err(RejectReason::Unchanged),
            )
        } else {
            match self.evaluator.evaluate(&source).await {
                Ok(evaluation) => {
                    let verdict = self.compare(&evaluation, state.best_fitness());
                    (
                        Candidate {
                            source,
                            fitness: evaluation.fitness,
                            generation,
                        },
                        Some(evaluation),
                        verdict,
                    )
                }
                Err(error) => (
                    Candidate {
                        source,
                        fitness: FitnessScore::WORST,
                        generation,
                    },
                    None,
                    Err(RejectReason::ExecutionFailed(error.to_string())),
                ),
            }
        };

        let fitness = candidate.fitness;
        let duration_secs = evaluation.as_ref().map(|e| e.duration.as_secs_f64());
        let accepted = match (verdict, evaluation) {
            (Ok(()), Some(evaluation)) => {
                self.observer.on_event(&SearchEvent::CandidateAccepted {
                    generation,
                    fitness,
                });
                state.accept(candidate, evaluation);
                self.write_target(&state.best_source).await?;
                true
            }
            (Err(reason), _) => {
                self.observer.on_event(&SearchEvent::CandidateRejected {
                    generation,
                    fitness,
                    reason,
                });
                false
            }
            (Ok(()), None) => false,
        };

        let measured_secs = self.remeasure(state).await;
        self.observer.on_event(&SearchEvent::GenerationFinished {
            generation,
            measured_secs,
        });

        Ok(GenerationRecord {
            generation,
            rules,
            fitness,
            duration_secs,
            accepted,
            measured_secs,
        })
    }

    /// Build a candidate by chaining random rules onto `source`
    ///
    /// At least one rule is applied; after each application another follows
    /// with probability `chain_continue_probability`.
    pub fn mutate(&mut self, source: &str, generation: u32) -> (String, Vec<String>) {
        let mut current = source.to_string();
        let mut applied = Vec::new();

        while let Some(rule) = self.catalog.choose(&mut self.rng) {
            let next = rule.apply(&current);
            self.observer.on_event(&SearchEvent::RuleApplied {
                generation,
                rule: rule.name().to_string(),
                changed: next != current,
            });
            applied.push(rule.name().to_string());
            current = next;

            if !self.rng.random_bool(self.config.chain_continue_probability) {
                break;
            }
        }
        (current, applied)
    }

    /// Accept iff `candidate * acceptance_factor < best`
    fn compare(
        &self,
        evaluation: &Evaluation,
        best: FitnessScore,
    ) -> std::result::Result<(), RejectReason> {
        if evaluation
            .fitness
            .improves_on(best, self.config.acceptance_factor)
        {
            Ok(())
        } else if evaluation.all_passing() {
            Err(RejectReason::InsufficientGain)
        } else {
            Err(RejectReason::FailingTests {
                failed: evaluation.failed(),
            })
        }
    }

    async fn write_target(&self, source: &str) -> Result<()> {
        tokio::fs::write(&self.target, source)
            .await
            .map_err(|e| QuickenError::io_error(&self.target, e))?;
        self.observer.on_event(&SearchEvent::TargetWritten {
            path: self.target.clone(),
        });
        Ok(())
    }

    /// Fresh duration of the target, falling back to the best evaluation
    async fn remeasure(&self, state: &SearchState) -> f64 {
        match self.evaluator.evaluate_path(&self.target).await {
            Ok(evaluation) => evaluation.duration.as_secs_f64(),
            Err(error) => {
                self.observer.on_event(&SearchEvent::RemeasureFailed {
                    generation: state.generation,
                    error: error.to_string(),
                });
                state.best.duration.as_secs_f64()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::RunOutput;
    use crate::error::ExecutionError;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct NeverRuns;

    #[async_trait]
    impl TestRunner for NeverRuns {
        async fn run(&self, _path: &Path) -> std::result::Result<RunOutput, ExecutionError> {
            Err(ExecutionError::EmptyCommand)
        }
    }

    fn search(catalog: MutationCatalog, config: SearchConfig) -> MutationSearch {
        MutationSearch::new("unused.rb", config.with_seed(11), catalog, Arc::new(NeverRuns))
    }

    #[test]
    fn mutate_applies_at_least_one_rule() {
        let mut s = search(
            MutationCatalog::with_defaults(),
            SearchConfig::new().with_chain_probability(0.0),
        );
        for _ in 0..20 {
            let (_, rules) = s.mutate("x = create :user", 1);
            assert_eq!(rules.len(), 1);
        }
    }

    #[test]
    fn mutate_chain_length_is_geometric() {
        let mut s = search(MutationCatalog::with_defaults(), SearchConfig::new());
        let samples = 10_000;
        let total: usize = (0..samples).map(|_| s.mutate("", 1).1.len()).sum();
        let mean = total as f64 / f64::from(samples);
        assert!((1.9..2.1).contains(&mean), "mean chain length {mean}");
    }

    #[test]
    fn mutate_rewrites_source() {
        let mut catalog = MutationCatalog::new();
        catalog
            .register_fn("upper", |s: &str| s.to_uppercase())
            .unwrap();
        let mut s = search(catalog, SearchConfig::new());
        let (out, rules) = s.mutate("create :user", 1);
        assert_eq!(out, "CREATE :USER");
        assert!(rules.iter().all(|r| r == "upper"));
    }

    #[tokio::test]
    async fn empty_catalog_is_config_error() {
        let s = search(MutationCatalog::new(), SearchConfig::new());
        assert!(matches!(
            s.run().await,
            Err(QuickenError::Config(ConfigError::EmptyCatalog))
        ));
    }

    #[tokio::test]
    async fn missing_target_is_precondition_error() {
        let s = search(MutationCatalog::with_defaults(), SearchConfig::new());
        assert!(matches!(
            s.run().await,
            Err(QuickenError::Precondition(PreconditionError::TargetMissing { .. }))
        ));
    }
}
