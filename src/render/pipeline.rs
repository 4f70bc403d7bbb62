//! Server render pipeline.
//!
//! # Responsibilities
//! - Answer one request: server route, page, redirect or error page
//! - Run the page's preloads to completion with a request-scoped fetch
//! - Render the level chain innermost-first, each level wrapping the next
//! - Fill the template and build headers (`Cache-Control`, `Link`)
//!
//! # Data Flow
//! ```text
//! RenderRequest
//!     → base path stripped, Router::resolve
//!     → endpoint: dispatch, respond as-is
//!     → page: PreloadExecutor::run_chain (never cancelled)
//!         → Complete  → render chain, 200
//!         → Redirect  → 3xx, Location prefixed by the base path
//!         → Error     → render error chain with the payload's status
//!     → Template::render (single pass)
//!     → RenderResponse { status, headers, body, fetched }
//! ```
//!
//! # Design Decisions
//! - Failures outside preload (component render, state serialization) are
//!   `InternalRenderError`; they never reach the page error boundary
//! - Each request gets a fresh store from the factory
//! - A request accepting `application/json` gets the preload data instead
//!   of the HTML page

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::component::{ComponentError, Props, Rendered};
use crate::config::schema::RouterConfig;
use crate::hydration::state::InitialState;
use crate::observability::metrics;
use crate::preload::context::PreloadContext;
use crate::preload::executor::{CancelToken, PreloadExecutor};
use crate::preload::fetch::{FetchCapture, HttpFetcher, LocalFetcher};
use crate::preload::outcome::{ChainOutcome, ErrorPayload};
use crate::preload::store::{page_entry, Store, StoreFactory, StoreSnapshot, PAGE_KEY};
use crate::preload::value::PreloadValue;
use crate::render::headers::{link_header, page_chunks, page_headers, ChunkLocation, ERROR_CACHE_CONTROL};
use crate::render::template::{Substitutions, Template, TemplateError};
use crate::routing::base_path::BasePath;
use crate::routing::endpoint::EndpointRequest;
use crate::routing::params::Query;
use crate::routing::router::{MatchResult, Resolution, Router};

/// Hard failure of a render. Never turned into a page.
#[derive(Debug, Error)]
pub enum InternalRenderError {
    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error("cannot serialize page state: {0}")]
    State(#[from] serde_json::Error),

    #[error("{0} is outside the base path")]
    OutsideBase(String),

    #[error("invalid origin `{origin}`: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("preload of {0} was cancelled")]
    Cancelled(String),

    #[error("invalid {name} header `{value}`")]
    InvalidHeader { name: &'static str, value: String },
}

/// One incoming request.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub method: Method,
    /// Request path including the base path, still percent-encoded.
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RenderRequest {
    pub fn get(href: &str) -> Self {
        let (path, query) = match href.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (href.to_string(), None),
        };
        Self {
            method: Method::GET,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    fn wants_data(&self) -> bool {
        self.headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|accept| accept.contains("application/json"))
            .unwrap_or(false)
    }
}

/// Finished response.
#[derive(Debug, Clone)]
pub struct RenderResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// In-app hrefs fetched by this page's preloads.
    pub fetched: Vec<String>,
}

impl RenderResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn redirect(status: u16, location: &str) -> Result<Self, InternalRenderError> {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::FOUND);
        let value = HeaderValue::from_str(location).map_err(|_| InternalRenderError::InvalidHeader {
            name: "location",
            value: location.to_string(),
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, value);
        Ok(Self {
            status,
            headers,
            body: Bytes::new(),
            fetched: Vec::new(),
        })
    }
}

/// How a page's preload phase ended, ready to render.
enum PageOutcome {
    Page {
        levels: Vec<MatchResult>,
        values: Vec<PreloadValue>,
        error: Option<ErrorPayload>,
    },
    Redirect {
        location: String,
        status: u16,
    },
}

/// Renders pages. Cheap to clone; clones share the template.
#[derive(Clone)]
pub struct RenderPipeline {
    router: Router,
    base: BasePath,
    origin: Url,
    template: Arc<ArcSwap<Template>>,
    store: StoreFactory,
    chunks: ChunkLocation,
    entry_chunk: String,
    cache_control: String,
    service_worker: Option<String>,
    capture: Option<FetchCapture>,
    client: reqwest::Client,
    executor: PreloadExecutor,
}

impl RenderPipeline {
    pub fn new(router: Router, config: &RouterConfig) -> Result<Self, InternalRenderError> {
        let render = &config.render;
        let origin = Url::parse(&render.origin).map_err(|e| InternalRenderError::InvalidOrigin {
            origin: render.origin.clone(),
            reason: e.to_string(),
        })?;
        let template = match &render.template_path {
            Some(path) => Template::load(std::path::Path::new(path))?,
            None => Template::default(),
        };
        let base = BasePath::new(&config.routing.base_path);

        Ok(Self {
            router,
            chunks: ChunkLocation::new(base.clone(), &render.client_dir),
            base,
            origin,
            template: Arc::new(ArcSwap::from_pointee(template)),
            store: Arc::new(StoreSnapshot::new),
            entry_chunk: render.entry_chunk.clone(),
            cache_control: render.cache_control.clone(),
            service_worker: render.service_worker.clone(),
            capture: None,
            client: reqwest::Client::new(),
            executor: PreloadExecutor::new(),
        })
    }

    /// Seed every request's store from `factory`.
    pub fn with_store(mut self, factory: StoreFactory) -> Self {
        self.store = factory;
        self
    }

    pub fn with_template(self, template: Template) -> Self {
        self.template.store(Arc::new(template));
        self
    }

    /// Echo every in-app fetch of every render into `capture`.
    pub fn with_capture(mut self, capture: FetchCapture) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn base(&self) -> &BasePath {
        &self.base
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Swap the template shell; renders already running keep the old one.
    pub fn swap_template(&self, template: Template) {
        self.template.store(Arc::new(template));
        info!("Template reloaded");
    }

    pub async fn handle(&self, request: RenderRequest) -> Result<RenderResponse, InternalRenderError> {
        let start = Instant::now();
        let path = self
            .base
            .strip(&request.path)
            .ok_or_else(|| InternalRenderError::OutsideBase(request.path.clone()))?
            .to_string();
        let query = Query::parse(request.query.as_deref().unwrap_or(""));

        let response = match self.router.resolve(&path, &query) {
            Resolution::Endpoint(found) => {
                debug!(path = %path, method = %request.method, "Dispatching server route");
                let response = found
                    .endpoint
                    .dispatch(EndpointRequest {
                        method: request.method.clone(),
                        path: path.clone(),
                        params: found.params,
                        query: found.query,
                        headers: request.headers.clone(),
                        body: request.body.clone(),
                    })
                    .await;
                RenderResponse {
                    status: response.status,
                    headers: response.headers,
                    body: response.body,
                    fetched: Vec::new(),
                }
            }
            Resolution::Page(levels) => self.page(&request, &path, &query, levels, false).await?,
            Resolution::NotFound => {
                let levels = self.router.error_levels(&path, &query);
                self.page(&request, &path, &query, levels, true).await?
            }
        };

        metrics::record_render(response.status.as_u16(), start);
        info!(
            method = %request.method,
            path = %request.path,
            status = response.status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Rendered"
        );
        Ok(response)
    }

    async fn page(
        &self,
        request: &RenderRequest,
        path: &str,
        query: &Query,
        levels: Vec<MatchResult>,
        not_found: bool,
    ) -> Result<RenderResponse, InternalRenderError> {
        let store = Store::new((self.store)());
        let params = levels.last().map(|l| l.params.clone()).unwrap_or_default();
        store.set(PAGE_KEY, page_entry(path, &params, query));

        let capture = FetchCapture::started();
        let ctx = PreloadContext::new(path, params, query.clone(), store.snapshot(), self.fetcher(request, &capture));

        let outcome = self.preload(path, query, levels, not_found, &ctx).await?;
        let fetched = capture.finish();

        let (levels, values, error) = match outcome {
            PageOutcome::Redirect { location, status } => {
                let location = self
                    .base
                    .encoded_location(&self.origin, &location)
                    .map_err(|_| InternalRenderError::InvalidHeader {
                        name: "location",
                        value: location.clone(),
                    })?;
                debug!(path = %path, status, location = %location, "Preload redirected");
                return RenderResponse::redirect(status, &location);
            }
            PageOutcome::Page { levels, values, error } => (levels, values, error),
        };

        let status = error.as_ref().map(|e| e.status).unwrap_or(200);
        let state = InitialState {
            base_path: self.base.as_str().to_string(),
            preloaded: values,
            store: store.snapshot(),
            error,
            status,
        };
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let cache_control = match &state.error {
            Some(_) => ERROR_CACHE_CONTROL,
            None => levels
                .last()
                .and_then(|l| l.route.page())
                .and_then(|chain| chain.cache_control.as_deref())
                .unwrap_or(&self.cache_control),
        };

        if request.wants_data() {
            let body = serde_json::to_vec(&state)?;
            return Ok(RenderResponse {
                status,
                headers: page_headers("application/json", cache_control, None)?,
                body: Bytes::from(body),
                fetched,
            });
        }

        let rendered = render_chain(path, &levels, &state)?;
        let chunks = page_chunks(&self.entry_chunk, &levels);
        let (styles, scripts): (Vec<&str>, Vec<&str>) = chunks.into_iter().partition(|c| c.ends_with(".css"));
        let link = link_header(&self.chunks, &scripts);

        let body = self.template.load().render(&Substitutions {
            base: format!("<base href=\"{}/\">", self.base),
            head: rendered.head,
            styles: styles
                .iter()
                .map(|c| format!("<link rel=\"stylesheet\" href=\"{}\">", self.chunks.url(c)))
                .collect(),
            html: rendered.html,
            scripts: self.scripts(&state)?,
        });

        Ok(RenderResponse {
            status,
            headers: page_headers("text/html", cache_control, Some(&link))?,
            body: Bytes::from(body),
            fetched,
        })
    }

    async fn preload(
        &self,
        path: &str,
        query: &Query,
        levels: Vec<MatchResult>,
        not_found: bool,
        ctx: &PreloadContext,
    ) -> Result<PageOutcome, InternalRenderError> {
        let token = CancelToken::never();
        // A missing page still runs the root layout's preload.
        let run = if not_found { &levels[..1.min(levels.len())] } else { &levels[..] };

        match self.executor.run_chain(run, ctx, &token).await {
            ChainOutcome::Complete(values) if not_found => Ok(PageOutcome::Page {
                levels,
                values: error_values(values),
                error: Some(ErrorPayload::not_found()),
            }),
            ChainOutcome::Complete(values) => Ok(PageOutcome::Page {
                levels,
                values,
                error: None,
            }),
            ChainOutcome::Redirect { location, status } => Ok(PageOutcome::Redirect { location, status }),
            ChainOutcome::Error { payload, completed } => Ok(PageOutcome::Page {
                levels: if not_found {
                    levels
                } else {
                    self.router.error_levels(path, query)
                },
                values: error_values(completed),
                error: Some(payload),
            }),
            ChainOutcome::Cancelled => Err(InternalRenderError::Cancelled(path.to_string())),
        }
    }

    fn fetcher(&self, request: &RenderRequest, capture: &FetchCapture) -> Arc<LocalFetcher> {
        let origin = request
            .headers
            .get(header::HOST)
            .and_then(|host| host.to_str().ok())
            .and_then(|host| Url::parse(&format!("{}://{}", self.origin.scheme(), host)).ok())
            .unwrap_or_else(|| self.origin.clone());
        let cookies = request.headers.get(header::COOKIE).cloned();

        let external = HttpFetcher::new(self.client.clone(), origin.clone(), &self.base)
            .with_cookies(cookies.clone());
        let mut fetcher = LocalFetcher::new(self.router.clone(), self.base.clone(), origin)
            .with_cookies(cookies)
            .with_capture(capture.clone())
            .with_external(Arc::new(external));
        if let Some(global) = &self.capture {
            fetcher = fetcher.with_capture(global.clone());
        }
        Arc::new(fetcher)
    }

    fn scripts(&self, state: &InitialState) -> Result<String, InternalRenderError> {
        let mut scripts = state.to_script()?;
        scripts.push_str(&format!(
            "<script type=\"module\" src=\"{}\"></script>",
            self.chunks.url(&self.entry_chunk)
        ));
        if let Some(worker) = &self.service_worker {
            scripts.push_str(&format!(
                "<script>if ('serviceWorker' in navigator) navigator.serviceWorker.register('{}');</script>",
                self.base.prefix(worker)
            ));
        }
        Ok(scripts)
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("base", &self.base)
            .field("origin", &self.origin.as_str())
            .field("entry_chunk", &self.entry_chunk)
            .finish()
    }
}

/// Values for the error chain: the root layout's data, if it got that far,
/// and nothing for the error page itself.
fn error_values(completed: Vec<PreloadValue>) -> Vec<PreloadValue> {
    let root = completed.into_iter().next().unwrap_or_default();
    vec![root, PreloadValue::Undefined]
}

/// Render levels innermost-first; each level's markup fills its parent's
/// slot. Heads are collected outermost-first.
fn render_chain(path: &str, levels: &[MatchResult], state: &InitialState) -> Result<Rendered, ComponentError> {
    let mut slot: Option<String> = None;
    let mut heads = Vec::with_capacity(levels.len());

    for (depth, level) in levels.iter().enumerate().rev() {
        let props = Props {
            path: path.to_string(),
            params: level.params.clone(),
            query: level.query.clone(),
            data: state.preloaded.get(depth).cloned().unwrap_or_default(),
            segment: level.segment.clone(),
            store: state.store.clone(),
            error: state.error.clone(),
            slot: slot.take(),
        };
        let rendered = level.part.component.render(&props)?;
        heads.push(rendered.head);
        slot = Some(rendered.html);
    }

    heads.reverse();
    Ok(Rendered {
        html: slot.unwrap_or_default(),
        head: heads.concat(),
    })
}
