//! Shared application store.
//!
//! Preload hooks and components read a snapshot; only the navigation commit
//! (or the server render, for its per-request store) writes.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::preload::value::PreloadValue;
use crate::routing::params::{ParamValue, Params, Query};

/// Store key holding the page being shown.
pub const PAGE_KEY: &str = "page";

pub type StoreSnapshot = BTreeMap<String, PreloadValue>;

/// Builds the initial store for each server render.
pub type StoreFactory = Arc<dyn Fn() -> StoreSnapshot + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<StoreSnapshot>>,
}

impl Store {
    pub fn new(initial: StoreSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.read().expect("store lock poisoned").clone()
    }

    pub fn get(&self, key: &str) -> Option<PreloadValue> {
        self.inner.read().expect("store lock poisoned").get(key).cloned()
    }

    pub(crate) fn set(&self, key: impl Into<String>, value: PreloadValue) {
        self.inner
            .write()
            .expect("store lock poisoned")
            .insert(key.into(), value);
    }

    pub(crate) fn replace(&self, snapshot: StoreSnapshot) {
        *self.inner.write().expect("store lock poisoned") = snapshot;
    }
}

/// Value recorded under [`PAGE_KEY`]: `{path, params, query}`.
pub fn page_entry(path: &str, params: &Params, query: &Query) -> PreloadValue {
    let params = PreloadValue::object(params.iter().map(|(name, value)| {
        let value = match value {
            ParamValue::One(one) => PreloadValue::from(one.as_str()),
            ParamValue::Many(many) => PreloadValue::from(many.clone()),
        };
        (name, value)
    }));
    let query = PreloadValue::object(
        query
            .iter()
            .map(|(name, value)| (name, PreloadValue::from(value))),
    );
    PreloadValue::object([
        ("path", PreloadValue::from(path)),
        ("params", params),
        ("query", query),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_detached() {
        let store = Store::new(StoreSnapshot::from([("title".to_string(), "hello world".into())]));
        let snapshot = store.snapshot();
        store.set("title", "changed".into());

        assert_eq!(snapshot["title"].as_str(), Some("hello world"));
        assert_eq!(store.get("title").unwrap().as_str(), Some("changed"));
    }

    #[test]
    fn test_page_entry() {
        let mut params = Params::new();
        params.insert("slug", ParamValue::One("what-is-sapper".into()));
        let entry = page_entry("/blog/what-is-sapper", &params, &Query::parse("flag&empty="));

        assert_eq!(entry.get("path").unwrap().as_str(), Some("/blog/what-is-sapper"));
        assert_eq!(entry.get("params").unwrap().get("slug").unwrap().as_str(), Some("what-is-sapper"));
        let query = entry.get("query").unwrap();
        assert_eq!(query.get("flag"), Some(&PreloadValue::Null));
        assert_eq!(query.get("empty").unwrap().as_str(), Some(""));
    }
}
