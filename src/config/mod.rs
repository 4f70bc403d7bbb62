//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → shared by the server, pipeline and navigator
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the template shell reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ExportConfig, IgnoreConfig, ListenerConfig, NavigationConfig, ObservabilityConfig, RenderConfig,
    RouterConfig, RoutingConfig,
};
pub use validation::{validate_config, ValidationError};
