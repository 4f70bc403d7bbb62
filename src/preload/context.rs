//! Context handed to preload hooks.

use std::sync::Arc;

use crate::preload::fetch::{Fetch, FetchError, FetchRequest, FetchResponse};
use crate::preload::outcome::{PreloadError, Preloaded};
use crate::preload::store::StoreSnapshot;
use crate::routing::params::{Params, Query};

/// Everything a hook may read. One context serves every level of a chain.
#[derive(Clone)]
pub struct PreloadContext {
    /// In-app path being preloaded.
    pub path: String,
    pub params: Params,
    pub query: Query,
    /// Read view of the store at the start of the preload.
    pub store: StoreSnapshot,
    fetcher: Arc<dyn Fetch>,
}

impl PreloadContext {
    pub fn new(
        path: impl Into<String>,
        params: Params,
        query: Query,
        store: StoreSnapshot,
        fetcher: Arc<dyn Fetch>,
    ) -> Self {
        Self {
            path: path.into(),
            params,
            query,
            store,
            fetcher,
        }
    }

    /// `GET` with default credentials.
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.fetcher.fetch(FetchRequest::get(url)).await
    }

    pub async fn fetch_with(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        self.fetcher.fetch(request).await
    }

    /// Redirect outcome for the hook to return.
    pub fn redirect(&self, status: u16, location: impl Into<String>) -> Result<Preloaded, PreloadError> {
        Ok(Preloaded::Redirect {
            status,
            location: location.into(),
        })
    }

    /// Explicit failure for the hook to return.
    pub fn error(&self, status: u16, message: impl Into<String>) -> Result<Preloaded, PreloadError> {
        Err(PreloadError::with_status(status, message))
    }
}

impl std::fmt::Debug for PreloadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadContext")
            .field("path", &self.path)
            .field("params", &self.params)
            .field("query", &self.query)
            .finish()
    }
}
