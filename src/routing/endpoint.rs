//! Server-only routes.
//!
//! Endpoints answer raw HTTP requests (JSON companions, form handlers) and
//! never take part in client-side navigation. Their failures are not page
//! errors: they surface as internal failures of the request, not as the
//! error page.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use futures_util::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

use crate::routing::params::{Params, Query};

/// Request handed to an endpoint handler.
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    pub method: Method,
    /// In-app path (base removed), still percent-encoded.
    pub path: String,
    pub params: Params,
    pub query: Query,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Response produced by an endpoint handler.
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl EndpointResponse {
    pub fn new(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// `200 OK` JSON response.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, EndpointError> {
        let body = serde_json::to_vec(value).map_err(|e| EndpointError::new(e.to_string()))?;
        Ok(Self::new(StatusCode::OK, "application/json", body))
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, "text/plain", body.into())
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

/// Failure inside an endpoint handler.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EndpointError {
    pub message: String,
}

impl EndpointError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type EndpointFuture = BoxFuture<'static, Result<EndpointResponse, EndpointError>>;

/// Handler for one method of an endpoint.
pub type EndpointHandler = Arc<dyn Fn(EndpointRequest) -> EndpointFuture + Send + Sync>;

/// Wrap an async closure as an [`EndpointHandler`].
pub fn handler_fn<F, Fut>(f: F) -> EndpointHandler
where
    F: Fn(EndpointRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<EndpointResponse, EndpointError>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// Method table of a server route.
#[derive(Clone, Default)]
pub struct Endpoint {
    handlers: HashMap<Method, EndpointHandler>,
}

impl Endpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, method: Method, handler: EndpointHandler) -> Self {
        self.handlers.insert(method, handler);
        self
    }

    pub fn get(self, handler: EndpointHandler) -> Self {
        self.on(Method::GET, handler)
    }

    pub fn post(self, handler: EndpointHandler) -> Self {
        self.on(Method::POST, handler)
    }

    pub fn put(self, handler: EndpointHandler) -> Self {
        self.on(Method::PUT, handler)
    }

    pub fn patch(self, handler: EndpointHandler) -> Self {
        self.on(Method::PATCH, handler)
    }

    pub fn delete(self, handler: EndpointHandler) -> Self {
        self.on(Method::DELETE, handler)
    }

    /// Handler for `method`. HEAD falls back to GET.
    pub fn handler(&self, method: &Method) -> Option<&EndpointHandler> {
        self.handlers.get(method).or_else(|| {
            if *method == Method::HEAD {
                self.handlers.get(&Method::GET)
            } else {
                None
            }
        })
    }

    /// Value for an `Allow` header.
    pub fn allow_header(&self) -> String {
        let mut methods: Vec<&str> = self.handlers.keys().map(Method::as_str).collect();
        methods.sort_unstable();
        methods.join(", ")
    }

    /// Answer `request`. An unsupported method is a 405 carrying `Allow`;
    /// a handler failure is a plain-text 500 with the failure message.
    pub fn dispatch(&self, request: EndpointRequest) -> BoxFuture<'static, EndpointResponse> {
        let Some(handler) = self.handler(&request.method).cloned() else {
            let mut response = EndpointResponse::text(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
            if let Ok(allow) = HeaderValue::from_str(&self.allow_header()) {
                response.headers.insert(header::ALLOW, allow);
            }
            return Box::pin(async move { response });
        };

        Box::pin(async move {
            let path = request.path.clone();
            match handler(request).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::error!(path = %path, error = %err, "Server route failed");
                    EndpointResponse::text(StatusCode::INTERNAL_SERVER_ERROR, err.message)
                }
            }
        })
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("methods", &self.allow_header())
            .finish()
    }
}
