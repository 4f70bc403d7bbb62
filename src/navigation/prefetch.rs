//! Prefetch cache.
//!
//! # Responsibilities
//! - Hold in-flight or finished chain preloads keyed by normalized path
//! - Hand a pending/fresh entry to the navigation that targets it
//!
//! # Design Decisions
//! - Entries are shared futures: any number of awaiters, one execution
//! - Advisory only; a missing or stale entry just means preloading again
//! - Taking an entry for a navigation clears every other entry, since their
//!   data may be invalidated by the page being left
//! - Expired entries are swept on every insert

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};

use crate::observability::metrics;
use crate::preload::outcome::ChainOutcome;

pub type SharedOutcome = Shared<BoxFuture<'static, ChainOutcome>>;

#[derive(Clone)]
struct Entry {
    outcome: SharedOutcome,
    created: Instant,
}

#[derive(Clone)]
pub struct PrefetchCache {
    inner: Arc<DashMap<String, Entry>>,
    ttl: Duration,
}

impl PrefetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn insert(&self, key: impl Into<String>, outcome: SharedOutcome) {
        self.inner.retain(|_, entry| entry.created.elapsed() < self.ttl);
        self.inner.insert(
            key.into(),
            Entry {
                outcome,
                created: Instant::now(),
            },
        );
    }

    /// Whether a usable entry exists for `key`.
    pub fn contains_fresh(&self, key: &str) -> bool {
        self.inner
            .get(key)
            .map(|entry| entry.created.elapsed() < self.ttl)
            .unwrap_or(false)
    }

    /// Take the entry for a navigation to `key` and drop all others.
    pub fn take(&self, key: &str) -> Option<SharedOutcome> {
        let hit = self
            .inner
            .remove(key)
            .map(|(_, entry)| entry)
            .filter(|entry| entry.created.elapsed() < self.ttl)
            .map(|entry| entry.outcome);
        self.inner.clear();
        metrics::record_prefetch(hit.is_some());
        hit
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for PrefetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchCache")
            .field("entries", &self.inner.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
