//! Rule implementations
//!
//! - [`RegexRule`]: pattern + replacement, used by the built-ins and by
//!   rules declared in config
//! - [`FnRule`]: any `Fn(&str) -> String`

use crate::config::RuleConfig;
use crate::error::ConfigError;
use regex::Regex;
use std::fmt;

/// Named, deterministic text rewrite
///
/// `apply` must be total. Applying a rule to its own output must not change
/// it further.
pub trait MutationRule: Send + Sync + fmt::Debug {
    /// Rule name (unique within a catalog)
    fn name(&self) -> &str;

    /// Rewrite `source`
    fn apply(&self, source: &str) -> String;
}

/// Rule backed by a regex replacement
#[derive(Debug, Clone)]
pub struct RegexRule {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl RegexRule {
    /// Compile a rule
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }

    /// Compile a rule declared in config
    pub fn from_config(rule: &RuleConfig) -> Result<Self, ConfigError> {
        Self::new(rule.name.clone(), &rule.pattern, rule.replacement.clone()).map_err(|source| {
            ConfigError::InvalidPattern {
                name: rule.name.clone(),
                source,
            }
        })
    }

    /// Whether the rule would change `source`
    #[inline]
    #[must_use]
    pub fn matches(&self, source: &str) -> bool {
        self.pattern.is_match(source)
    }
}

impl MutationRule for RegexRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, source: &str) -> String {
        self.pattern
            .replace_all(source, self.replacement.as_str())
            .into_owned()
    }
}

/// Rule backed by a closure
pub struct FnRule {
    name: String,
    transform: Box<dyn Fn(&str) -> String + Send + Sync>,
}

impl FnRule {
    /// Wrap a transform
    pub fn new<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            transform: Box::new(transform),
        }
    }
}

impl fmt::Debug for FnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule").field("name", &self.name).finish()
    }
}

impl MutationRule for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, source: &str) -> String {
        (self.transform)(source)
    }
}

/// Name of the `create :sym` → `build :sym` rule
pub const CREATE_TO_BUILD: &str = "replace `create :sym` with `build :sym`";
/// Name of the `create_list :sym` → `build_list :sym` rule
pub const CREATE_LIST_TO_BUILD_LIST: &str = "replace `create_list :sym` with `build_list :sym`";
/// Name of the `create_pair :sym` → `build_pair :sym` rule
pub const CREATE_PAIR_TO_BUILD_PAIR: &str = "replace `create_pair :sym` with `build_pair :sym`";

// A factory call only matches when not glued to a word or symbol on the left,
// so `:create :x` and `recreate :x` are left alone.
const BUILTIN_PATTERNS: &[(&str, &str, &str)] = &[
    (CREATE_TO_BUILD, r"(^|[^:\w])create!? (:\w+)", "${1}build $2"),
    (
        CREATE_LIST_TO_BUILD_LIST,
        r"(^|[^:\w])create_list (:\w+)",
        "${1}build_list $2",
    ),
    (
        CREATE_PAIR_TO_BUILD_PAIR,
        r"(^|[^:\w])create_pair (:\w+)",
        "${1}build_pair $2",
    ),
];

/// Built-in rules: persisted factory creation rewritten to in-memory builds
#[must_use]
pub fn builtin_rules() -> Vec<RegexRule> {
    BUILTIN_PATTERNS
        .iter()
        .map(|(name, pattern, replacement)| {
            RegexRule::new(*name, pattern, *replacement).expect("built-in pattern compiles")
        })
        .collect()
}
