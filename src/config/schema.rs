//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the page
//! router. All types derive Serde traits for deserialization from config
//! files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address, timeouts).
    pub listener: ListenerConfig,

    /// Base path and ignore rules.
    pub routing: RoutingConfig,

    /// Server rendering settings.
    pub render: RenderConfig,

    /// Client navigation settings.
    pub navigation: NavigationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Static export settings.
    pub export: ExportConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Largest request body accepted by server routes, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// Prefix the app is mounted under (e.g., "/custom-basepath").
    pub base_path: String,

    /// Paths passed through to the host application untouched.
    pub ignore: Vec<IgnoreConfig>,
}

/// One ignore rule.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IgnoreConfig {
    /// `{ prefix = "/fizz" }`: paths starting with the string.
    Prefix { prefix: String },
    /// `{ pattern = "foobar" }`: paths matching the regex.
    Pattern { pattern: String },
}

/// Server render configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Page template file. The built-in template is used when unset.
    pub template_path: Option<String>,

    /// Reload the template when the file changes.
    pub watch_template: bool,

    /// Directory (under the base path) client chunks are served from.
    pub client_dir: String,

    /// Entry chunk, always preloaded.
    pub entry_chunk: String,

    /// Default `Cache-Control` for successful pages.
    pub cache_control: String,

    /// Register a service worker at this path (under the base path).
    pub service_worker: Option<String>,

    /// Public origin, used when a request carries no `Host` header.
    pub origin: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            template_path: None,
            watch_template: false,
            client_dir: "client".to_string(),
            entry_chunk: "main.js".to_string(),
            cache_control: "max-age=600".to_string(),
            service_worker: None,
            origin: "http://localhost:3000".to_string(),
        }
    }
}

/// Client navigation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// How long a prefetched preload stays usable, in milliseconds.
    pub prefetch_ttl_ms: u64,

    /// Redirect hops followed by one navigation.
    pub max_redirects: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            prefetch_ttl_ms: 30_000,
            max_redirects: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Static export configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ExportConfig {
    /// Extra in-app paths to start crawling from.
    pub entries: Vec<String>,
}
