//! Mutation catalog
//!
//! Provides [`MutationCatalog`], an ordered registry of [`MutationRule`]s with
//! uniform random selection. The search only sees the registry, so new rules
//! never touch search logic.

mod rules;

pub use rules::{
    builtin_rules, FnRule, MutationRule, RegexRule, CREATE_LIST_TO_BUILD_LIST,
    CREATE_PAIR_TO_BUILD_PAIR, CREATE_TO_BUILD,
};

use crate::config::SearchConfig;
use crate::error::ConfigError;
use rand::Rng;
use std::sync::Arc;

/// Ordered registry of mutation rules
#[derive(Debug, Default, Clone)]
pub struct MutationCatalog {
    rules: Vec<Arc<dyn MutationRule>>,
}

impl MutationCatalog {
    /// Create new empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create catalog with built-in rules
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            rules: builtin_rules()
                .into_iter()
                .map(|rule| Arc::new(rule) as Arc<dyn MutationRule>)
                .collect(),
        }
    }

    /// Built-in rules followed by the rules declared in config
    pub fn from_config(config: &SearchConfig) -> Result<Self, ConfigError> {
        let mut catalog = Self::with_defaults();
        for rule in &config.rules {
            catalog.register(RegexRule::from_config(rule)?)?;
        }
        Ok(catalog)
    }

    /// Register a rule
    ///
    /// # Errors
    /// `ConfigError::DuplicateRule` if the name is taken.
    pub fn register(&mut self, rule: impl MutationRule + 'static) -> Result<(), ConfigError> {
        if self.contains(rule.name()) {
            return Err(ConfigError::DuplicateRule(rule.name().to_string()));
        }
        self.rules.push(Arc::new(rule));
        Ok(())
    }

    /// Register a closure as a rule
    pub fn register_fn<F>(&mut self, name: impl Into<String>, transform: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.register(FnRule::new(name, transform))
    }

    /// Check if a rule exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name() == name)
    }

    /// Look up a rule by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn MutationRule>> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// Rule names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Number of rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Pick a rule uniformly at random
    pub fn choose<R: Rng>(&self, rng: &mut R) -> Option<&Arc<dyn MutationRule>> {
        if self.rules.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.rules.len());
        self.rules.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn catalog_new_empty() {
        let catalog = MutationCatalog::new();
        assert!(catalog.is_empty());
        assert!(catalog.choose(&mut StdRng::seed_from_u64(1)).is_none());
    }

    #[test]
    fn catalog_with_defaults() {
        let catalog = MutationCatalog::with_defaults();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.names()[0], CREATE_TO_BUILD);
        assert!(catalog.contains(CREATE_LIST_TO_BUILD_LIST));
        assert!(catalog.contains(CREATE_PAIR_TO_BUILD_PAIR));
    }

    #[test]
    fn catalog_register_rejects_duplicates() {
        let mut catalog = MutationCatalog::with_defaults();
        catalog.register_fn("noop", str::to_string).unwrap();
        assert!(catalog.contains("noop"));
        assert!(matches!(
            catalog.register_fn("noop", str::to_string),
            Err(ConfigError::DuplicateRule(name)) if name == "noop"
        ));
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn catalog_from_config_appends_user_rules() {
        let mut config = SearchConfig::new();
        config.rules.push(RuleConfig {
            name: "let! to let".into(),
            pattern: r"\blet!\(".into(),
            replacement: "let(".into(),
        });
        let catalog = MutationCatalog::from_config(&config).unwrap();
        assert_eq!(catalog.len(), 4);
        let rule = catalog.get("let! to let").unwrap();
        assert_eq!(rule.apply("let!(:user) { x }"), "let(:user) { x }");
    }

    #[test]
    fn catalog_from_config_duplicate_of_builtin() {
        let mut config = SearchConfig::new();
        config.rules.push(RuleConfig {
            name: CREATE_TO_BUILD.into(),
            pattern: "x".into(),
            replacement: "y".into(),
        });
        assert!(matches!(
            MutationCatalog::from_config(&config),
            Err(ConfigError::DuplicateRule(_))
        ));
    }

    #[test]
    fn choose_covers_every_rule() {
        let catalog = MutationCatalog::with_defaults();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(catalog.choose(&mut rng).unwrap().name().to_string());
        }
        assert_eq!(seen.len(), catalog.len());
    }

    #[test]
    fn choose_is_reproducible() {
        let catalog = MutationCatalog::with_defaults();
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| catalog.choose(&mut rng).unwrap().name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(3), pick(3));
    }
}
