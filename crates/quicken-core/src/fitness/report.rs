//! Status token extraction from runner reports
//!
//! Reporters print each test on its own padded line, e.g.
//! `  test_0001_creates_user      PASS (0.01s)`. Splitting on six-space
//! runs isolates the column that starts with the status word; the chunk before
//! the first run is preamble.

use crate::error::ExecutionError;
use crate::types::TestOutcome;
use regex::Regex;
use std::sync::OnceLock;

const COLUMN_GAP: &str = "      ";
const ESC: char = '\x1b';

/// ANSI SGR sequences (colour, bold, reset)
fn sgr() -> &'static Regex {
    static SGR: OnceLock<Regex> = OnceLock::new();
    SGR.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("SGR pattern compiles"))
}

/// Extract ordered per-test outcomes from a report
///
/// # Errors
/// `ExecutionError::Unparseable` if the report yields no status tokens.
pub fn parse_outcomes(report: &str) -> Result<Vec<TestOutcome>, ExecutionError> {
    let outcomes: Vec<TestOutcome> = status_tokens(report)
        .iter()
        .map(|token| TestOutcome::from_token(token))
        .collect();

    if outcomes.is_empty() {
        return Err(ExecutionError::unparseable(report));
    }
    Ok(outcomes)
}

/// Raw status tokens in report order, one per column chunk
///
/// Colour codes are stripped first and the chunk is cut at any remaining
/// escape. A chunk without a word yields an empty token, which is not a pass.
/// Trailing empty chunks are dropped.
pub fn status_tokens(report: &str) -> Vec<String> {
    let mut chunks: Vec<&str> = report.split(COLUMN_GAP).skip(1).collect();
    while chunks.last().is_some_and(|chunk| chunk.is_empty()) {
        chunks.pop();
    }

    chunks
        .into_iter()
        .map(|chunk| {
            let plain = sgr().replace_all(chunk, "");
            let before_escape = plain.split(ESC).next().unwrap_or("");
            before_escape
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_string()
        })
        .collect()
}
