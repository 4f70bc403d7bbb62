//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! render pipeline, navigator, prefetch cache
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP layer's trace span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
