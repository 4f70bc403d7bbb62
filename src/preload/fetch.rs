//! Scoped fetch for preload hooks.
//!
//! # Responsibilities
//! - Resolve relative URLs against the document base
//! - Forward the caller's cookies only when the request opts in
//! - Dispatch same-origin server routes in-process (`LocalFetcher`)
//! - Record same-origin fetches so exports can emit JSON companions
//!
//! # Design Decisions
//! - `Credentials::Omit` is the default; `Include` always forwards cookies,
//!   `SameOrigin` forwards them to the app's own origin only
//! - Server route failures come back as a 500 response, exactly what a
//!   remote caller would see, never as a fetch error

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::preload::value::PreloadValue;
use crate::routing::base_path::BasePath;
use crate::routing::endpoint::{EndpointRequest, EndpointResponse};
use crate::routing::params::Query;
use crate::routing::router::Router;

/// Cookie forwarding policy of a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    Omit,
    SameOrigin,
    Include,
}

impl Credentials {
    /// Parse the names used by hosts (`"include"`, `"same-origin"`, `"omit"`).
    pub fn from_name(name: &str) -> Self {
        match name {
            "include" => Credentials::Include,
            "same-origin" => Credentials::SameOrigin,
            _ => Credentials::Omit,
        }
    }

    fn forwards_to(self, origin: &Url, target: &Url) -> bool {
        match self {
            Credentials::Include => true,
            Credentials::SameOrigin => origin.origin() == target.origin(),
            Credentials::Omit => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub credentials: Credentials,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            credentials: Credentials::default(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Body decoded as plain JSON into a preload value.
    pub fn value(&self) -> Result<PreloadValue, FetchError> {
        self.json::<serde_json::Value>().map(PreloadValue::from_plain_json)
    }
}

impl From<EndpointResponse> for FetchResponse {
    fn from(response: EndpointResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("invalid fetch url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("no route to {0}")]
    Unreachable(String),
}

/// A fetch implementation handed to preload hooks.
pub trait Fetch: Send + Sync {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, FetchError>>;
}

/// Records fetched in-app URLs while active.
#[derive(Debug, Clone, Default)]
pub struct FetchCapture {
    inner: Arc<Mutex<Option<Vec<String>>>>,
}

impl FetchCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capture that is already recording.
    pub fn started() -> Self {
        let capture = Self::new();
        capture.start();
        capture
    }

    pub fn start(&self) {
        *self.inner.lock().expect("fetch capture poisoned") = Some(Vec::new());
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().expect("fetch capture poisoned").is_some()
    }

    pub fn record(&self, href: &str) {
        if let Some(seen) = self.inner.lock().expect("fetch capture poisoned").as_mut() {
            if !seen.iter().any(|s| s == href) {
                seen.push(href.to_string());
            }
        }
    }

    /// Stop recording and return everything captured, in fetch order.
    pub fn finish(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("fetch capture poisoned")
            .take()
            .unwrap_or_default()
    }
}

/// Fetch over the network with reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: Url,
    document: Url,
    cookies: Option<HeaderValue>,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, origin: Url, base: &BasePath) -> Self {
        let document = base.document_url(&origin).unwrap_or_else(|_| origin.clone());
        Self {
            client,
            origin,
            document,
            cookies: None,
        }
    }

    /// Cookies of the request being served, forwarded per `Credentials`.
    pub fn with_cookies(mut self, cookies: Option<HeaderValue>) -> Self {
        self.cookies = cookies;
        self
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, FetchError>> {
        let client = self.client.clone();
        let resolved = self.document.join(&request.url);
        let origin = self.origin.clone();
        let cookies = self.cookies.clone();

        Box::pin(async move {
            let url = resolved.map_err(|e| FetchError::InvalidUrl {
                url: request.url.clone(),
                reason: e.to_string(),
            })?;

            let mut builder = client
                .request(request.method, url.clone())
                .headers(request.headers)
                .body(request.body);
            if let Some(cookie) = cookies.filter(|_| request.credentials.forwards_to(&origin, &url)) {
                builder = builder.header(header::COOKIE, cookie);
            }

            let failed = |e: reqwest::Error| FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            };
            let response = builder.send().await.map_err(failed)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(failed)?;

            Ok(FetchResponse {
                status,
                headers,
                body,
            })
        })
    }
}

/// Serves the app's own server routes in-process and hands anything else
/// to an optional external fetcher.
#[derive(Clone)]
pub struct LocalFetcher {
    router: Router,
    base: BasePath,
    origin: Url,
    cookies: Option<HeaderValue>,
    captures: Vec<FetchCapture>,
    external: Option<Arc<dyn Fetch>>,
}

impl LocalFetcher {
    pub fn new(router: Router, base: BasePath, origin: Url) -> Self {
        Self {
            router,
            base,
            origin,
            cookies: None,
            captures: Vec::new(),
            external: None,
        }
    }

    pub fn with_cookies(mut self, cookies: Option<HeaderValue>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_capture(mut self, capture: FetchCapture) -> Self {
        self.captures.push(capture);
        self
    }

    pub fn with_external(mut self, external: Arc<dyn Fetch>) -> Self {
        self.external = Some(external);
        self
    }
}

impl Fetch for LocalFetcher {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, FetchError>> {
        let resolved = self
            .base
            .document_url(&self.origin)
            .and_then(|document| document.join(&request.url));
        let url = match resolved {
            Ok(url) => url,
            Err(e) => {
                let err = FetchError::InvalidUrl {
                    url: request.url.clone(),
                    reason: e.to_string(),
                };
                return Box::pin(async move { Err(err) });
            }
        };

        let same_origin = url.origin() == self.origin.origin();
        let app_path = if same_origin {
            self.base.strip(url.path()).map(str::to_string)
        } else {
            None
        };

        if let Some(path) = app_path {
            let href = match url.query() {
                Some(query) if !query.is_empty() => format!("{}?{}", path, query),
                _ => path.clone(),
            };
            for capture in &self.captures {
                capture.record(&href);
            }

            let query = Query::parse(url.query().unwrap_or(""));
            if let Some(found) = self.router.match_endpoint(&path, &query) {
                debug!(url = %href, method = %request.method, "Dispatching fetch in-process");

                let mut headers = request.headers.clone();
                if let Some(cookie) = self
                    .cookies
                    .clone()
                    .filter(|_| request.credentials.forwards_to(&self.origin, &url))
                {
                    headers.insert(header::COOKIE, cookie);
                }
                let endpoint_request = EndpointRequest {
                    method: request.method,
                    path,
                    params: found.params,
                    query: found.query,
                    headers,
                    body: request.body,
                };
                let response = found.endpoint.dispatch(endpoint_request);
                return Box::pin(async move { Ok(response.await.into()) });
            }
        }

        match &self.external {
            Some(external) => external.fetch(FetchRequest {
                url: url.to_string(),
                ..request
            }),
            None => {
                let target = url.to_string();
                Box::pin(async move { Err(FetchError::Unreachable(target)) })
            }
        }
    }
}
