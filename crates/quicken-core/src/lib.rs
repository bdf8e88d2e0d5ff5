//! quicken core - mutation search for faster test files
//!
//! Rewrites a test source file with semantic-preserving text mutations and
//! keeps a rewrite only when every test still passes and the run gets
//! measurably faster:
//! - [`FitnessEvaluator`] scores one fresh test run
//! - [`MutationCatalog`] holds the named rewrite rules
//! - [`MutationSearch`] hill-climbs across generations
//!
//! # Example
//!
//! ```rust,ignore
//! use quicken_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), QuickenError> {
//! let config = SearchConfig::new().with_seed(42);
//! let runner = Arc::new(ProcessRunner::new(config.command.clone()));
//! let catalog = MutationCatalog::from_config(&config)?;
//!
//! let report = MutationSearch::new("test/models/user_test.rb", config, catalog, runner)
//!     .run()
//!     .await?;
//! println!("{:.3}s -> {:.3}s", report.original_secs(), report.final_secs);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod catalog;
pub mod config;
pub mod error;
pub mod fitness;
pub mod observer;
pub mod search;
pub mod types;

// Re-exports for convenience
pub use catalog::{FnRule, MutationCatalog, MutationRule, RegexRule};
pub use config::{RuleConfig, SearchConfig};
pub use error::{ConfigError, ExecutionError, PreconditionError, QuickenError};
pub use fitness::{CandidateFile, FitnessEvaluator, ProcessRunner, RunOutput, TestRunner};
pub use observer::{RejectReason, SearchEvent, SearchObserver, TracingObserver};
pub use search::MutationSearch;
pub use types::{
    Candidate, Evaluation, FitnessScore, GenerationRecord, SearchReport, SearchState, TestOutcome,
    PASS_TOKEN,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running a search
    pub use crate::{
        FitnessEvaluator, FitnessScore, MutationCatalog, MutationRule, MutationSearch,
        ProcessRunner, QuickenError, SearchConfig, SearchObserver, SearchReport, TestRunner,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn fitness_ordering_integration() {
        // One failing test outweighs any realistic all-passing duration
        let failing = Evaluation::new(
            vec![TestOutcome::Pass, TestOutcome::from_token("FAIL")],
            std::time::Duration::from_millis(1),
            SearchConfig::default().failure_penalty,
        );
        let passing = Evaluation::new(
            vec![TestOutcome::Pass, TestOutcome::Pass],
            std::time::Duration::from_secs(600),
            SearchConfig::default().failure_penalty,
        );
        assert!(failing.fitness > passing.fitness);
    }

    #[test]
    fn catalog_and_config_integration() {
        let config = SearchConfig::from_toml(
            r#"
            [[rules]]
            name = "let! to let"
            pattern = '\blet!\('
            replacement = "let("
            "#,
        )
        .unwrap();
        let catalog = MutationCatalog::from_config(&config).unwrap();
        assert!(catalog.contains("let! to let"));
        assert!(catalog.contains(catalog::CREATE_TO_BUILD));
    }
}
