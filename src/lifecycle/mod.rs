//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Build pipeline → Bind listener → ServerEvent::BasePath, Ready
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod events;
pub mod shutdown;
pub mod signals;

pub use events::{ServerEvent, ServerEvents};
pub use shutdown::Shutdown;
