//! Server-side rendering.
//!
//! # Data Flow
//! ```text
//! RenderRequest
//!     → pipeline.rs (resolve, preload, render chain)
//!     → headers.rs (Cache-Control, Link preload hints)
//!     → template.rs (single-pass marker substitution)
//!     → RenderResponse
//!
//! watcher.rs: template file changed → parsed Template → pipeline swap
//! ```

pub mod headers;
pub mod pipeline;
pub mod template;
pub mod watcher;

pub use pipeline::{InternalRenderError, RenderPipeline, RenderRequest, RenderResponse};
pub use template::{Template, TemplateError, DEFAULT_TEMPLATE};
pub use watcher::TemplateWatcher;
