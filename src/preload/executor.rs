//! Preload execution.
//!
//! # Responsibilities
//! - Run one level's hook and normalize its result
//! - Run a chain of levels outermost-first, stopping at the first
//!   redirect or error
//! - Honour cancellation by ignoring results, never by aborting hooks
//!
//! # Design Decisions
//! - Hooks run on their own task; a superseded hook keeps running detached
//!   and its result is dropped on the floor
//! - Explicit statuses outside 400..=599 and uncaught failures (including
//!   panics) become a generic 500; the original error is logged
//! - Levels run sequentially so a parent redirect stops child hooks

use std::future::pending;

use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::preload::context::PreloadContext;
use crate::preload::outcome::{ChainOutcome, ErrorPayload, PreloadError, PreloadOutcome, Preloaded};
use crate::preload::value::PreloadValue;
use crate::routing::manifest::Part;
use crate::routing::router::MatchResult;

/// Tells a preload whether its navigation is still current.
#[derive(Debug, Clone)]
pub struct CancelToken {
    seq: u64,
    current: Option<watch::Receiver<u64>>,
}

impl CancelToken {
    /// Token for `seq`, cancelled once the current seq moves on.
    pub fn new(seq: u64, current: watch::Receiver<u64>) -> Self {
        Self {
            seq,
            current: Some(current),
        }
    }

    /// Token that is never cancelled (server renders, exports).
    pub fn never() -> Self {
        Self { seq: 0, current: None }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_cancelled(&self) -> bool {
        self.current
            .as_ref()
            .map(|current| *current.borrow() != self.seq)
            .unwrap_or(false)
    }

    /// Resolves once the token is cancelled. Never resolves for `never()`.
    pub async fn cancelled(&self) {
        let Some(current) = &self.current else {
            return pending().await;
        };
        let mut current = current.clone();
        loop {
            if *current.borrow_and_update() != self.seq {
                return;
            }
            if current.changed().await.is_err() {
                // sender gone: nothing can supersede us any more
                return pending().await;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PreloadExecutor;

impl PreloadExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run one level. `None` when the token was cancelled first.
    pub async fn run(
        &self,
        part: &Part,
        ctx: &PreloadContext,
        token: &CancelToken,
    ) -> Option<PreloadOutcome> {
        let Some(hook) = &part.preload else {
            return Some(PreloadOutcome::Success(PreloadValue::Undefined));
        };
        if token.is_cancelled() {
            return None;
        }

        let task = tokio::spawn(hook(ctx.clone()));
        tokio::select! {
            joined = task => {
                let result = joined.unwrap_or_else(|join_err| {
                    Err(PreloadError::uncaught(format!("preload panicked: {}", join_err)))
                });
                Some(normalize(&part.id, &ctx.path, result))
            }
            _ = token.cancelled() => {
                debug!(part = %part.id, path = %ctx.path, seq = token.seq(), "Preload superseded, result will be ignored");
                None
            }
        }
    }

    /// Run every level of a chain, outermost-first.
    pub async fn run_chain(
        &self,
        levels: &[MatchResult],
        ctx: &PreloadContext,
        token: &CancelToken,
    ) -> ChainOutcome {
        let mut values = Vec::with_capacity(levels.len());

        for level in levels {
            match self.run(&level.part, ctx, token).await {
                None => return ChainOutcome::Cancelled,
                Some(PreloadOutcome::Success(value)) => values.push(value),
                Some(PreloadOutcome::Redirect { location, status }) => {
                    return ChainOutcome::Redirect { location, status };
                }
                Some(PreloadOutcome::Error(payload)) => {
                    return ChainOutcome::Error {
                        payload,
                        completed: values,
                    };
                }
            }
        }

        if token.is_cancelled() {
            return ChainOutcome::Cancelled;
        }
        ChainOutcome::Complete(values)
    }
}

fn normalize(part: &str, path: &str, result: Result<Preloaded, PreloadError>) -> PreloadOutcome {
    match result {
        Ok(Preloaded::Props(value)) => PreloadOutcome::Success(value),
        Ok(Preloaded::Redirect { status, location }) => {
            let status = if (300..=399).contains(&status) {
                status
            } else {
                warn!(part = %part, path = %path, status, "Redirect with non-3xx status, using 302");
                302
            };
            PreloadOutcome::Redirect { location, status }
        }
        Err(err) => match err.status {
            Some(status) if (400..=599).contains(&status) => {
                debug!(part = %part, path = %path, status, message = %err.message, "Preload failed");
                PreloadOutcome::Error(ErrorPayload::new(status, err.message))
            }
            _ => {
                error!(part = %part, path = %path, status = ?err.status, error = %err.message, "Uncaught preload failure");
                PreloadOutcome::Error(ErrorPayload::internal())
            }
        },
    }
}
