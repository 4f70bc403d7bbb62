//! Paths the router leaves to the host application.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// One ignore rule, tested against the in-app path.
#[derive(Clone)]
pub enum IgnoreRule {
    /// Matches paths starting with the string (`/fizz` also covers `/fizzer`).
    Prefix(String),
    Pattern(Regex),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl IgnoreRule {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        IgnoreRule::Predicate(Arc::new(f))
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            IgnoreRule::Prefix(prefix) => path.starts_with(prefix.as_str()),
            IgnoreRule::Pattern(regex) => regex.is_match(path),
            IgnoreRule::Predicate(f) => f(path),
        }
    }
}

impl fmt::Debug for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreRule::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            IgnoreRule::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            IgnoreRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    pub fn new(rules: Vec<IgnoreRule>) -> Self {
        Self { rules }
    }

    /// Rules from configuration. Patterns are checked by config validation,
    /// so an invalid one here is an error.
    pub fn from_config(
        config: &[crate::config::schema::IgnoreConfig],
    ) -> Result<Self, regex::Error> {
        use crate::config::schema::IgnoreConfig;

        let mut rules = Vec::with_capacity(config.len());
        for entry in config {
            rules.push(match entry {
                IgnoreConfig::Prefix { prefix } => IgnoreRule::Prefix(prefix.clone()),
                IgnoreConfig::Pattern { pattern } => IgnoreRule::Pattern(Regex::new(pattern)?),
            });
        }
        Ok(Self { rules })
    }

    pub fn push(&mut self, rule: IgnoreRule) {
        self.rules.push(rule);
    }

    pub fn matches(&self, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(path))
    }
}
