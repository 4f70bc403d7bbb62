//! Preload hook contract and outcomes.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::preload::context::PreloadContext;
use crate::preload::value::PreloadValue;

/// What a hook returns when it does not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Preloaded {
    Props(PreloadValue),
    Redirect { status: u16, location: String },
}

impl Preloaded {
    pub fn props(value: impl Into<PreloadValue>) -> Self {
        Preloaded::Props(value.into())
    }
}

/// Failure raised by a hook. `status` is set by `this.error`-style
/// explicit failures; anything else counts as uncaught.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PreloadError {
    pub status: Option<u16>,
    pub message: String,
}

impl PreloadError {
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn uncaught(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl From<crate::preload::fetch::FetchError> for PreloadError {
    fn from(err: crate::preload::fetch::FetchError) -> Self {
        PreloadError::uncaught(err.to_string())
    }
}

/// Status and message shown by the error boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub status: u16,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, "Not found")
    }

    pub fn internal() -> Self {
        Self::new(500, "Internal server error")
    }
}

/// Normalized result of one level's preload.
#[derive(Debug, Clone, PartialEq)]
pub enum PreloadOutcome {
    Success(PreloadValue),
    Redirect { location: String, status: u16 },
    Error(ErrorPayload),
}

/// Result of preloading a whole layout chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// One value per level, outermost-first.
    Complete(Vec<PreloadValue>),
    Redirect { location: String, status: u16 },
    /// `completed` holds the values of the levels that ran before the failure.
    Error {
        payload: ErrorPayload,
        completed: Vec<PreloadValue>,
    },
    Cancelled,
}

pub type PreloadFuture = BoxFuture<'static, Result<Preloaded, PreloadError>>;

/// An async preload hook.
pub type PreloadHook = Arc<dyn Fn(PreloadContext) -> PreloadFuture + Send + Sync>;

/// Wrap an async closure as a [`PreloadHook`].
pub fn preload_fn<F, Fut>(f: F) -> PreloadHook
where
    F: Fn(PreloadContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Preloaded, PreloadError>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}
