//! Preload subsystem.
//!
//! # Data Flow
//! ```text
//! MatchResult[] (outermost-first)
//!     → context.rs (params, query, scoped fetch, store view)
//!     → executor.rs (run hooks in order, honour cancellation)
//!     → outcome.rs (Success | Redirect | Error, normalized)
//!     → value.rs (closed value model, wire encoding)
//! ```

pub mod context;
pub mod executor;
pub mod fetch;
pub mod outcome;
pub mod store;
pub mod value;

pub use context::PreloadContext;
pub use executor::{CancelToken, PreloadExecutor};
pub use fetch::{
    Credentials, Fetch, FetchCapture, FetchError, FetchRequest, FetchResponse, HttpFetcher,
    LocalFetcher,
};
pub use outcome::{
    preload_fn, ChainOutcome, ErrorPayload, PreloadError, PreloadHook, PreloadOutcome, Preloaded,
};
pub use store::{Store, StoreFactory, StoreSnapshot};
pub use value::PreloadValue;
