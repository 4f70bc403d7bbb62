//! Page router: server rendering, client navigation and static export for
//! component-based apps.

pub mod component;
pub mod config;
pub mod export;
pub mod http;
pub mod hydration;
pub mod lifecycle;
pub mod navigation;
pub mod observability;
pub mod preload;
pub mod render;
pub mod routing;

pub use config::schema::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use navigation::Navigator;
pub use render::RenderPipeline;
pub use routing::{Manifest, ManifestBuilder, Router};
