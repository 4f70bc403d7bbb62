//! Static export.
//!
//! # Data Flow
//! ```text
//! static routes + entries
//!     → driver.rs (frontier, render via pipeline)
//!     → links.rs (in-app <a href> discovery)
//!     → ExportSink (files)
//! ```

pub mod driver;
pub mod links;

pub use driver::{ExportDriver, ExportError, ExportReport, ExportSink, ExportedFile, MemorySink};
