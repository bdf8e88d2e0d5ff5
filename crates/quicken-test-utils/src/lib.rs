//! Testing utilities for quicken workspace
//!
//! Shared test doubles, fixtures, and assertions.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use quicken_core::{ExecutionError, RunOutput, SearchEvent, SearchObserver, TestRunner};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// One scripted runner response
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Report with these status tokens, taking `secs`
    Run { tokens: Vec<String>, secs: f64 },
    /// Runner failure
    Error(String),
}

impl Scripted {
    fn respond(&self) -> Result<RunOutput, ExecutionError> {
        match self {
            Self::Run { tokens, secs } => Ok(RunOutput::new(
                render_report(tokens),
                Duration::from_secs_f64(*secs),
            )),
            Self::Error(message) => Err(ExecutionError::Unparseable(message.clone())),
        }
    }
}

/// A call the runner received
#[derive(Debug, Clone)]
pub struct RunCall {
    pub path: PathBuf,
    /// File contents at the time of the call
    pub source: String,
}

/// Deterministic in-process runner
///
/// Answers calls from a queue in order. Once the queue is drained the last
/// response repeats.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    calls: Mutex<Vec<RunCall>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an all-passing run
    #[must_use]
    pub fn then_pass(self, tests: usize, secs: f64) -> Self {
        self.then_tokens(vec!["PASS"; tests], secs)
    }

    /// Queue a run with `failing` tests not passing
    #[must_use]
    pub fn then_fail(self, passing: usize, failing: usize, secs: f64) -> Self {
        let mut tokens = vec!["PASS"; passing];
        tokens.extend(std::iter::repeat("FAIL").take(failing));
        self.then_tokens(tokens, secs)
    }

    /// Queue a runner error
    #[must_use]
    pub fn then_error(self, message: &str) -> Self {
        self.script.lock().push_back(Scripted::Error(message.to_string()));
        self
    }

    /// Queue a run with explicit status tokens
    #[must_use]
    pub fn then_tokens(self, tokens: Vec<&str>, secs: f64) -> Self {
        self.script.lock().push_back(Scripted::Run {
            tokens: tokens.into_iter().map(str::to_string).collect(),
            secs,
        });
        self
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<RunCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl TestRunner for ScriptedRunner {
    async fn run(&self, path: &Path) -> Result<RunOutput, ExecutionError> {
        let source = std::fs::read_to_string(path).unwrap_or_default();
        self.calls.lock().push(RunCall {
            path: path.to_path_buf(),
            source,
        });

        let next = self.script.lock().pop_front();
        let response = match next {
            Some(scripted) => {
                *self.last.lock() = Some(scripted.clone());
                scripted
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Scripted::Error("script is empty".to_string())),
        };
        response.respond()
    }
}

/// Render tokens the way a column-padded reporter prints them
pub fn render_report(tokens: &[String]) -> String {
    let mut report = String::from("Started with run options --seed 1234:\n\n");
    for (i, token) in tokens.iter().enumerate() {
        report.push_str(&format!("  test_{:04}_case      {token} (0.00s)\n", i + 1));
    }
    report.push_str(&format!("\nFinished in 0.0s\n{} tests\n", tokens.len()));
    report
}

/// Observer that keeps every event
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SearchEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SearchEvent> {
        self.events.lock().clone()
    }

    /// Number of rule applications observed
    pub fn mutations(&self) -> usize {
        self.count(|e| matches!(e, SearchEvent::RuleApplied { .. }))
    }

    /// Number of accepted candidates
    pub fn accepted(&self) -> usize {
        self.count(|e| matches!(e, SearchEvent::CandidateAccepted { .. }))
    }

    /// Number of rejected candidates
    pub fn rejected(&self) -> usize {
        self.count(|e| matches!(e, SearchEvent::CandidateRejected { .. }))
    }

    /// Number of target writes
    pub fn writes(&self) -> usize {
        self.count(|e| matches!(e, SearchEvent::TargetWritten { .. }))
    }

    pub fn count(&self, pred: impl Fn(&SearchEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl SearchObserver for RecordingObserver {
    fn on_event(&self, event: &SearchEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Test file inside its own temp dir
#[derive(Debug)]
pub struct TargetFixture {
    dir: TempDir,
    path: PathBuf,
}

impl TargetFixture {
    pub fn new(file_name: &str, source: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        std::fs::write(&path, source).unwrap();
        Self { dir, path }
    }

    /// Fixture holding [`SAMPLE_TEST_SOURCE`]
    pub fn sample() -> Self {
        Self::new("user_test.rb", SAMPLE_TEST_SOURCE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch directory next to the target for candidate files
    pub fn scratch_dir(&self) -> PathBuf {
        let scratch = self.dir.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();
        scratch
    }

    pub fn read(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap()
    }
}

/// Minitest file with four factory-backed tests
pub const SAMPLE_TEST_SOURCE: &str = r#"require 'test_helper'

class UserTest < ActiveSupport::TestCase
  test "full name" do
    user = create :user, first: "Ada", last: "Lovelace"
    assert_equal "Ada Lovelace", user.full_name
  end

  test "admin flag" do
    admin = create! :admin
    assert admin.admin?
  end

  test "posts" do
    posts = create_list :post, 3
    assert_equal 3, posts.size
  end

  test "friends" do
    a, b = create_pair :user
    refute_equal a, b
  end
end
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use quicken_core::fitness::parse_outcomes;

    #[test]
    fn rendered_report_parses() {
        let tokens = vec!["PASS".to_string(), "FAIL".to_string()];
        let outcomes = parse_outcomes(&render_report(&tokens)).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_pass());
        assert!(!outcomes[1].is_pass());
    }
}
