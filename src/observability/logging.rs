//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Honour `RUST_LOG` when set, the configured level otherwise
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `try_init` so tests and embedders that already installed a
//!   subscriber are left alone

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Filter used when neither `RUST_LOG` nor the config say otherwise.
fn default_directives(level: &str) -> String {
    format!("page_router={level},tower_http={level}")
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_http_layer() {
        assert_eq!(
            default_directives("debug"),
            "page_router=debug,tower_http=debug"
        );
    }
}
