//! Client-side navigation.
//!
//! # Data Flow
//! ```text
//! click / goto / popstate (href)
//!     → coordinator.rs (ownership check, seq allocation)
//!     → prefetch.rs (reuse a pending/fresh preload) or preload executor
//!     → seq still current? commit : discard
//!     → history.rs, store, mount controller
//! ```

pub mod coordinator;
pub mod history;
pub mod prefetch;
pub mod request;

pub use coordinator::{NavigationError, Navigator, NavigatorOptions};
pub use history::{History, MemoryHistory};
pub use prefetch::PrefetchCache;
pub use request::{NavigationRequest, NavigationResult, NavigationState, Trigger};
