//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming path (server request or client navigation)
//!     → base_path.rs (strip prefix, resolve hrefs)
//!     → router.rs (endpoint lookup, then page lookup)
//!     → matcher.rs (segment matching, percent-decoding)
//!     → Return: page chain, endpoint, or NotFound
//!
//! Manifest Compilation (at startup):
//!     PageRoute[] + server routes
//!     → Parse patterns, validate layouts
//!     → Sort by specificity
//!     → Freeze as immutable Manifest
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by specificity)

pub mod base_path;
pub mod endpoint;
pub mod ignore;
pub mod manifest;
pub mod matcher;
pub mod params;
pub mod router;

pub use base_path::{AppUrl, BasePath};
pub use endpoint::{handler_fn, Endpoint, EndpointError, EndpointRequest, EndpointResponse};
pub use ignore::{IgnoreRule, IgnoreRules};
pub use manifest::{Manifest, ManifestBuilder, ManifestError, PageRoute, Part};
pub use params::{ParamValue, Params, Query};
pub use router::{EndpointMatch, MatchResult, Resolution, Router};
