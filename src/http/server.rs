//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router around the render pipeline
//! - Wire up middleware (request ID, tracing, timeout)
//! - Hand ignored and out-of-base paths to the host's fallback router
//! - Turn internal render failures into plain 500 responses
//! - Swap the template shell when the watcher reports a change
//! - Announce base path and readiness, stop on the shutdown signal

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::RouterConfig;
use crate::http::request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::events::{ServerEvent, ServerEvents};
use crate::lifecycle::shutdown::signalled;
use crate::render::pipeline::{RenderPipeline, RenderRequest};
use crate::render::template::Template;
use crate::routing::ignore::IgnoreRules;

/// Application state injected into handlers.
#[derive(Clone)]
struct AppState {
    pipeline: RenderPipeline,
    ignore: IgnoreRules,
    fallback: Router,
    max_body_bytes: usize,
}

/// HTTP server hosting the app.
pub struct HttpServer {
    config: RouterConfig,
    pipeline: RenderPipeline,
    ignore: IgnoreRules,
    fallback: Router,
    events: ServerEvents,
}

impl HttpServer {
    /// `fallback` answers every request the app does not own.
    pub fn new(config: RouterConfig, pipeline: RenderPipeline, fallback: Router) -> Result<Self, regex::Error> {
        let ignore = IgnoreRules::from_config(&config.routing.ignore)?;
        Ok(Self {
            config,
            pipeline,
            ignore,
            fallback,
            events: ServerEvents::new(),
        })
    }

    /// Replace the ignore rules (e.g. to add predicates).
    pub fn with_ignore(mut self, ignore: IgnoreRules) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn events(&self) -> &ServerEvents {
        &self.events
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let state = AppState {
            pipeline: self.pipeline.clone(),
            ignore: self.ignore.clone(),
            fallback: self.fallback.clone(),
            max_body_bytes: self.config.listener.max_body_bytes,
        };

        Router::new().fallback(render_handler).with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        request_id = %request.request_id(),
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    self.config.listener.request_timeout_secs,
                ))),
        )
    }

    /// Serve until `shutdown` fires. Templates arriving on
    /// `template_updates` replace the shell for subsequent renders.
    pub async fn run(
        self,
        listener: TcpListener,
        mut template_updates: mpsc::UnboundedReceiver<Template>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, base_path = %self.pipeline.base(), "HTTP server starting");

        let pipeline = self.pipeline.clone();
        let reloads = tokio::spawn(async move {
            while let Some(template) = template_updates.recv().await {
                pipeline.swap_template(template);
            }
        });

        let app = self.router();
        self.events
            .emit(ServerEvent::BasePath(self.pipeline.base().as_str().to_string()));
        self.events.emit(ServerEvent::Ready {
            address: addr.to_string(),
        });

        axum::serve(listener, app)
            .with_graceful_shutdown(signalled(shutdown))
            .await?;

        reloads.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Render the request, or pass it to the host fallback.
async fn render_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    let owned = state
        .pipeline
        .base()
        .strip(&path)
        .map(|app_path| !state.ignore.matches(app_path))
        .unwrap_or(false);

    if !owned {
        tracing::debug!(path = %path, "Passing request to fallback");
        return match state.fallback.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
    }

    let request_id = request.request_id().to_string();
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = %path, error = %e, "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response();
        }
    };

    let render = RenderRequest {
        method: parts.method,
        path,
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    };

    match state.pipeline.handle(render).await {
        Ok(rendered) => {
            let mut response = Response::new(Body::from(rendered.body));
            *response.status_mut() = rendered.status;
            *response.headers_mut() = rendered.headers;
            response
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Render failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
                .into_response()
        }
    }
}
