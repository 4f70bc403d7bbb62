//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check ignore patterns compile and the base path is well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::config::schema::{IgnoreConfig, RouterConfig};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    let base = &config.routing.base_path;
    if !base.is_empty() && !base.starts_with('/') {
        errors.push(ValidationError::new("routing.base_path", "must start with `/`"));
    }
    if base.contains(['?', '#']) {
        errors.push(ValidationError::new(
            "routing.base_path",
            "must not contain a query or fragment",
        ));
    }

    for (index, rule) in config.routing.ignore.iter().enumerate() {
        let field = format!("routing.ignore[{}]", index);
        match rule {
            IgnoreConfig::Prefix { prefix } if prefix.is_empty() => {
                errors.push(ValidationError::new(field, "empty prefix would ignore every path"));
            }
            IgnoreConfig::Pattern { pattern } => {
                if let Err(e) = Regex::new(pattern) {
                    errors.push(ValidationError::new(field, format!("invalid pattern: {}", e)));
                }
            }
            IgnoreConfig::Prefix { .. } => {}
        }
    }

    if config.render.entry_chunk.is_empty() {
        errors.push(ValidationError::new("render.entry_chunk", "must not be empty"));
    }
    if config.render.cache_control.is_empty() {
        errors.push(ValidationError::new("render.cache_control", "must not be empty"));
    }
    match Url::parse(&config.render.origin) {
        Ok(origin) if origin.cannot_be_a_base() || origin.host().is_none() => {
            errors.push(ValidationError::new("render.origin", "must be an http(s) origin"));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("render.origin", e.to_string())),
    }

    if config.navigation.max_redirects == 0 {
        errors.push(ValidationError::new("navigation.max_redirects", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    for (index, entry) in config.export.entries.iter().enumerate() {
        if !entry.starts_with('/') {
            errors.push(ValidationError::new(
                format!("export.entries[{}]", index),
                "must be an in-app path starting with `/`",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RouterConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.routing.base_path = "custom-basepath".into();
        config.routing.ignore.push(IgnoreConfig::Pattern { pattern: "(".into() });
        config.navigation.max_redirects = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "routing.base_path",
                "routing.ignore[0]",
                "navigation.max_redirects",
            ]
        );
    }
}
