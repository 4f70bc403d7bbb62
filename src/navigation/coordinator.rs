//! Navigation coordinator.
//!
//! # Responsibilities
//! - Turn clicks, `goto` and popstate into seq-numbered navigations
//! - Run preloads and decide whether their result is still wanted
//! - Commit: history, store, mount, scroll
//! - Serve and fill the prefetch cache
//!
//! # State Machine
//! ```text
//! Idle → Preloading(seq) → Committing(seq) → Idle
//!            │
//!            └─ superseded (current seq moved on) → result discarded
//! ```
//!
//! # Design Decisions
//! - The current seq lives in a `watch` channel; preload tokens observe it
//! - Only the navigation whose seq is still current may commit; the check
//!   is repeated under the history and mount locks (always taken in that
//!   order) so two commits can never interleave
//! - Redirects re-enter navigation with the same seq, bounded by
//!   `max_redirects`
//! - Errors commit the error page and still update history, so the URL
//!   shows the failed route
//! - A commit mounts before it writes history and the store, so a failing
//!   component leaves the previous page fully in place

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::component::{ComponentError, Props};
use crate::config::schema::RouterConfig;
use crate::hydration::controller::{LevelProps, MountController, MountReport};
use crate::hydration::document::Document;
use crate::hydration::state::InitialState;
use crate::hydration::tree::IdentityKey;
use crate::navigation::history::History;
use crate::navigation::prefetch::PrefetchCache;
use crate::navigation::request::{NavigationRequest, NavigationResult, NavigationState, Trigger};
use crate::observability::metrics;
use crate::preload::context::PreloadContext;
use crate::preload::executor::{CancelToken, PreloadExecutor};
use crate::preload::fetch::Fetch;
use crate::preload::outcome::{ChainOutcome, ErrorPayload};
use crate::preload::store::{page_entry, Store, PAGE_KEY};
use crate::preload::value::PreloadValue;
use crate::routing::base_path::{AppUrl, BasePath};
use crate::routing::ignore::IgnoreRules;
use crate::routing::params::Query;
use crate::routing::router::{MatchResult, Router};

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("cannot resolve `{0}` inside the app")]
    OutsideApp(String),

    #[error("invalid navigation settings: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Client-side settings.
#[derive(Debug, Clone)]
pub struct NavigatorOptions {
    pub base: BasePath,
    pub origin: Url,
    pub prefetch_ttl: Duration,
    pub max_redirects: usize,
    pub ignore: IgnoreRules,
}

impl NavigatorOptions {
    pub fn new(base: BasePath, origin: Url) -> Self {
        Self {
            base,
            origin,
            prefetch_ttl: Duration::from_secs(30),
            max_redirects: 10,
            ignore: IgnoreRules::default(),
        }
    }

    pub fn from_config(config: &RouterConfig) -> Result<Self, NavigationError> {
        let origin = Url::parse(&config.render.origin)
            .map_err(|e| NavigationError::InvalidConfig(format!("origin: {}", e)))?;
        let ignore = IgnoreRules::from_config(&config.routing.ignore)
            .map_err(|e| NavigationError::InvalidConfig(format!("ignore pattern: {}", e)))?;
        Ok(Self {
            base: BasePath::new(&config.routing.base_path),
            origin,
            prefetch_ttl: Duration::from_millis(config.navigation.prefetch_ttl_ms),
            max_redirects: config.navigation.max_redirects,
            ignore,
        })
    }

    pub fn with_ignore(mut self, ignore: IgnoreRules) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_prefetch_ttl(mut self, ttl: Duration) -> Self {
        self.prefetch_ttl = ttl;
        self
    }
}

struct Inner {
    router: Router,
    options: NavigatorOptions,
    fetcher: Arc<dyn Fetch>,
    executor: PreloadExecutor,
    next_seq: AtomicU64,
    current_seq: watch::Sender<u64>,
    state: watch::Sender<NavigationState>,
    prefetch: PrefetchCache,
    store: Store,
    history: Mutex<Box<dyn History>>,
    mount: Mutex<MountController>,
    location: Mutex<Option<AppUrl>>,
}

/// Client router. Cheap to clone; clones drive the same session.
#[derive(Clone)]
pub struct Navigator {
    inner: Arc<Inner>,
}

impl Navigator {
    pub fn new(
        router: Router,
        options: NavigatorOptions,
        fetcher: Arc<dyn Fetch>,
        history: Box<dyn History>,
        document: Box<dyn Document>,
    ) -> Self {
        let (current_seq, _) = watch::channel(0);
        let (state, _) = watch::channel(NavigationState::Idle);
        let prefetch = PrefetchCache::new(options.prefetch_ttl);

        Self {
            inner: Arc::new(Inner {
                router,
                options,
                fetcher,
                executor: PreloadExecutor::new(),
                next_seq: AtomicU64::new(0),
                current_seq,
                state,
                prefetch,
                store: Store::default(),
                history: Mutex::new(history),
                mount: Mutex::new(MountController::new(document)),
                location: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> NavigationState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<NavigationState> {
        self.inner.state.subscribe()
    }

    pub fn current_seq(&self) -> u64 {
        *self.inner.current_seq.borrow()
    }

    pub fn store(&self) -> Store {
        self.inner.store.clone()
    }

    pub fn location(&self) -> Option<AppUrl> {
        self.inner.location.lock().expect("location lock poisoned").clone()
    }

    pub fn prefetch_cache(&self) -> &PrefetchCache {
        &self.inner.prefetch
    }

    /// Hydrate the server-rendered page at `href`.
    pub fn init(&self, href: &str, initial: InitialState) -> Result<MountReport, NavigationError> {
        let url = self.resolve(href).ok_or_else(|| NavigationError::OutsideApp(href.to_string()))?;
        let query = Query::parse(url.query.as_deref().unwrap_or(""));

        let levels = match &initial.error {
            Some(_) => self.inner.router.error_levels(&url.path, &query),
            None => {
                let levels = self.inner.router.match_page(&url.path, &query);
                if levels.is_empty() {
                    self.inner.router.error_levels(&url.path, &query)
                } else {
                    levels
                }
            }
        };

        self.inner.store.replace(initial.store.clone());
        if let Some(first) = levels.first() {
            self.inner
                .store
                .set(PAGE_KEY, page_entry(&url.path, &first.params, &query));
        }
        let store = self.inner.store.snapshot();
        let props = level_props(&url, &levels, &initial.preloaded, &store, initial.error.as_ref());

        let mut history = self.inner.history.lock().expect("history lock poisoned");
        let mut mount = self.inner.mount.lock().expect("mount lock poisoned");
        let report = mount.hydrate(props)?;
        history.replace(&url.href(&self.inner.options.base));
        *self.inner.location.lock().expect("location lock poisoned") = Some(url.clone());

        info!(path = %url.path, levels = report.mounted.len(), patched = report.patched.len(), "Hydrated");
        Ok(report)
    }

    /// Resolve an href to an in-app URL. `None` when it leaves the app.
    pub fn resolve(&self, href: &str) -> Option<AppUrl> {
        self.inner.options.base.resolve(&self.inner.options.origin, href)
    }

    /// Whether the router owns a link to `href` (vs. the host).
    pub fn owns(&self, href: &str) -> Option<AppUrl> {
        let url = self.resolve(href)?;
        if self.inner.options.ignore.matches(&url.path) {
            return None;
        }
        let query = Query::parse(url.query.as_deref().unwrap_or(""));
        if self.inner.router.match_endpoint(&url.path, &query).is_some() {
            return None;
        }
        Some(url)
    }

    /// Allocate a request with the next seq.
    pub fn request(&self, url: AppUrl, trigger: Trigger) -> NavigationRequest {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        NavigationRequest {
            url,
            seq,
            trigger,
            replace_state: false,
        }
    }

    /// Handle a link click.
    pub async fn click(&self, href: &str) -> NavigationResult {
        match self.owns(href) {
            Some(url) => {
                let request = self.request(url, Trigger::Click);
                self.navigate(request).await
            }
            None => self.external(href),
        }
    }

    /// Programmatic navigation.
    pub async fn goto(&self, href: &str) -> NavigationResult {
        match self.owns(href) {
            Some(url) => {
                let request = self.request(url, Trigger::Programmatic);
                self.navigate(request).await
            }
            None => self.external(href),
        }
    }

    /// Back/forward to `href`.
    pub async fn popstate(&self, href: &str) -> NavigationResult {
        match self.owns(href) {
            Some(url) => {
                let request = self.request(url, Trigger::Popstate);
                self.navigate(request).await
            }
            None => self.external(href),
        }
    }

    /// Preload `href` into the prefetch cache. False when there is nothing
    /// to prefetch.
    pub fn prefetch(&self, href: &str) -> bool {
        let Some(url) = self.owns(href) else {
            return false;
        };
        self.prefetch_url(&url)
    }

    fn prefetch_url(&self, url: &AppUrl) -> bool {
        let key = url.cache_key();
        if self.inner.prefetch.contains_fresh(&key) {
            debug!(key = %key, "Prefetch already cached");
            return true;
        }
        let query = Query::parse(url.query.as_deref().unwrap_or(""));
        let levels = self.inner.router.match_page(&url.path, &query);
        if levels.is_empty() {
            return false;
        }

        let ctx = self.context(&url.path, &levels, query);
        let executor = self.inner.executor;
        let task = tokio::spawn(async move {
            executor.run_chain(&levels, &ctx, &CancelToken::never()).await
        });
        let shared = async move {
            task.await.unwrap_or_else(|join_err| {
                warn!(error = %join_err, "Prefetch task failed");
                ChainOutcome::Error {
                    payload: ErrorPayload::internal(),
                    completed: Vec::new(),
                }
            })
        }
        .boxed()
        .shared();

        self.inner.prefetch.insert(key.clone(), shared);
        debug!(key = %key, "Prefetch started");
        true
    }

    /// Run a navigation to completion.
    pub async fn navigate(&self, request: NavigationRequest) -> NavigationResult {
        let result = match request.trigger {
            Trigger::PrefetchOnly => {
                if self.prefetch_url(&request.url) {
                    NavigationResult::Prefetched
                } else {
                    NavigationResult::Failed {
                        message: format!("nothing to prefetch at {}", request.url.path),
                    }
                }
            }
            _ => self.run(request, 0).await,
        };
        metrics::record_navigation(result.outcome());
        result
    }

    fn run(&self, request: NavigationRequest, redirects: usize) -> BoxFuture<'_, NavigationResult> {
        async move {
            let seq = request.seq;
            if !self.accept(seq) {
                debug!(seq, current = self.current_seq(), "Ignoring stale navigation");
                return NavigationResult::Ignored { seq };
            }
            self.inner.state.send_replace(NavigationState::Preloading { seq });

            if let Some(result) = self.same_page_fragment(&request) {
                self.inner.state.send_replace(NavigationState::Idle);
                return result;
            }

            let url = request.url.clone();
            let query = Query::parse(url.query.as_deref().unwrap_or(""));
            let levels = self.inner.router.match_page(&url.path, &query);

            let (levels, outcome) = if levels.is_empty() {
                let levels = self.inner.router.error_levels(&url.path, &query);
                let outcome = self.preload_root(&url, &levels, &query, seq).await;
                (levels, outcome)
            } else {
                let outcome = match self.inner.prefetch.take(&url.cache_key()) {
                    Some(shared) => {
                        debug!(seq, path = %url.path, "Using prefetched preload");
                        shared.await
                    }
                    None => {
                        let ctx = self.context(&url.path, &levels, query.clone());
                        let token = CancelToken::new(seq, self.inner.current_seq.subscribe());
                        self.inner.executor.run_chain(&levels, &ctx, &token).await
                    }
                };
                (levels, outcome)
            };

            if !self.is_current(seq) {
                return self.discard(seq);
            }

            match outcome {
                ChainOutcome::Cancelled => self.discard(seq),
                ChainOutcome::Redirect { location, status } => {
                    if redirects >= self.inner.options.max_redirects {
                        warn!(seq, location = %location, "Too many redirects");
                        self.finish(seq);
                        return NavigationResult::Failed {
                            message: format!("too many redirects ending at {}", location),
                        };
                    }
                    let target = self.inner.options.base.redirect_location(&location);
                    debug!(seq, status, from = %url.path, to = %target, "Following redirect");
                    match self.resolve(&target) {
                        Some(next) => {
                            // The entry the original navigation would have
                            // created names the target instead.
                            let follow = NavigationRequest {
                                url: next,
                                seq,
                                trigger: Trigger::Programmatic,
                                replace_state: request.replace_state || request.trigger == Trigger::Popstate,
                            };
                            self.run(follow, redirects + 1).await
                        }
                        None => {
                            self.finish(seq);
                            NavigationResult::External { href: target }
                        }
                    }
                }
                ChainOutcome::Error { payload, completed } => {
                    let levels = if is_error_chain(&levels, &self.inner.router) {
                        levels
                    } else {
                        self.inner.router.error_levels(&url.path, &query)
                    };
                    let root = completed.into_iter().next().unwrap_or_default();
                    self.commit(&request, &url, &levels, vec![root], Some(payload))
                }
                ChainOutcome::Complete(values) => self.commit(&request, &url, &levels, values, None),
            }
        }
        .boxed()
    }

    /// Run the root preload for a page that matched nothing.
    async fn preload_root(
        &self,
        url: &AppUrl,
        levels: &[MatchResult],
        query: &Query,
        seq: u64,
    ) -> ChainOutcome {
        let ctx = self.context(&url.path, levels, query.clone());
        let token = CancelToken::new(seq, self.inner.current_seq.subscribe());
        match self.inner.executor.run_chain(&levels[..1.min(levels.len())], &ctx, &token).await {
            ChainOutcome::Complete(values) => ChainOutcome::Error {
                payload: ErrorPayload::not_found(),
                completed: values,
            },
            other => other,
        }
    }

    /// Fragment-only change on the current page: no preload, just scroll.
    fn same_page_fragment(&self, request: &NavigationRequest) -> Option<NavigationResult> {
        let fragment = request.url.fragment.as_deref()?;
        let current = self.location()?;
        if current.path_and_query() != request.url.path_and_query() {
            return None;
        }

        let mut history = self.inner.history.lock().expect("history lock poisoned");
        let mut mount = self.inner.mount.lock().expect("mount lock poisoned");
        if !self.is_current(request.seq) {
            return Some(NavigationResult::Discarded { seq: request.seq });
        }
        if request.trigger != Trigger::Popstate {
            history.push(&request.url.href(&self.inner.options.base));
        }
        mount.scroll(Some(fragment));
        *self.inner.location.lock().expect("location lock poisoned") = Some(request.url.clone());
        Some(NavigationResult::Committed {
            url: request.url.clone(),
            status: 200,
        })
    }

    fn commit(
        &self,
        request: &NavigationRequest,
        url: &AppUrl,
        levels: &[MatchResult],
        values: Vec<PreloadValue>,
        error: Option<ErrorPayload>,
    ) -> NavigationResult {
        let seq = request.seq;
        let mut history = self.inner.history.lock().expect("history lock poisoned");
        let mut mount = self.inner.mount.lock().expect("mount lock poisoned");
        if !self.is_current(seq) {
            drop(mount);
            drop(history);
            return self.discard(seq);
        }
        self.inner.state.send_replace(NavigationState::Committing { seq });

        let mut store = self.inner.store.snapshot();
        if let Some(first) = levels.first() {
            store.insert(
                PAGE_KEY.to_string(),
                page_entry(&url.path, &first.params, &first.query),
            );
        }
        let status = error.as_ref().map(|e| e.status).unwrap_or(200);
        let props = level_props(url, levels, &values, &store, error.as_ref());

        // Mount first: a failure leaves history, store and location on the
        // page still shown.
        let result = match mount.apply(props) {
            Ok(report) => {
                match request.trigger {
                    Trigger::Popstate | Trigger::PrefetchOnly => {}
                    _ if request.replace_state => history.replace(&url.href(&self.inner.options.base)),
                    _ => history.push(&url.href(&self.inner.options.base)),
                }
                self.inner.store.replace(store);
                if request.trigger != Trigger::Popstate {
                    mount.scroll(url.fragment.as_deref());
                }
                *self.inner.location.lock().expect("location lock poisoned") = Some(url.clone());
                info!(
                    seq,
                    path = %url.path,
                    status,
                    trigger = request.trigger.as_str(),
                    reused = report.reused.len() + report.updated.len(),
                    mounted = report.mounted.len(),
                    "Navigation committed"
                );
                NavigationResult::Committed {
                    url: url.clone(),
                    status,
                }
            }
            Err(err) => {
                warn!(seq, path = %url.path, error = %err, "Mount failed, keeping current page");
                NavigationResult::Failed {
                    message: err.to_string(),
                }
            }
        };
        self.finish(seq);
        result
    }

    fn context(&self, path: &str, levels: &[MatchResult], query: Query) -> PreloadContext {
        let params = levels.last().map(|l| l.params.clone()).unwrap_or_default();
        PreloadContext::new(
            path,
            params,
            query,
            self.inner.store.snapshot(),
            self.inner.fetcher.clone(),
        )
    }

    /// Make `seq` current unless a later navigation already is.
    fn accept(&self, seq: u64) -> bool {
        let mut accepted = false;
        self.inner.current_seq.send_if_modified(|current| {
            if seq < *current {
                return false;
            }
            accepted = true;
            let changed = *current != seq;
            *current = seq;
            changed
        });
        accepted
    }

    fn is_current(&self, seq: u64) -> bool {
        *self.inner.current_seq.borrow() == seq
    }

    fn discard(&self, seq: u64) -> NavigationResult {
        debug!(seq, current = self.current_seq(), "Discarding superseded navigation");
        self.finish(seq);
        NavigationResult::Discarded { seq }
    }

    /// Back to idle, unless a later navigation owns the state.
    fn finish(&self, seq: u64) {
        self.inner.state.send_if_modified(|state| match *state {
            NavigationState::Preloading { seq: owner } | NavigationState::Committing { seq: owner }
                if owner == seq =>
            {
                *state = NavigationState::Idle;
                true
            }
            _ => false,
        });
    }

    fn external(&self, href: &str) -> NavigationResult {
        debug!(href, "Leaving navigation to the host");
        NavigationResult::External {
            href: href.to_string(),
        }
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("current_seq", &self.current_seq())
            .field("state", &self.state())
            .field("prefetch", &self.inner.prefetch)
            .finish()
    }
}

fn is_error_chain(levels: &[MatchResult], router: &Router) -> bool {
    levels
        .first()
        .map(|l| Arc::ptr_eq(&l.route, router.manifest().error_route()))
        .unwrap_or(false)
}

/// Props for every level, paired with identity keys.
fn level_props(
    url: &AppUrl,
    levels: &[MatchResult],
    values: &[PreloadValue],
    store: &crate::preload::store::StoreSnapshot,
    error: Option<&ErrorPayload>,
) -> Vec<LevelProps> {
    levels
        .iter()
        .enumerate()
        .map(|(depth, level)| LevelProps {
            part: level.part.clone(),
            key: IdentityKey::for_level(level),
            props: Props {
                path: url.path.clone(),
                params: level.params.clone(),
                query: level.query.clone(),
                data: values.get(depth).cloned().unwrap_or_default(),
                segment: level.segment.clone(),
                store: store.clone(),
                error: error.cloned(),
                slot: None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::component::{from_fn, Rendered};
    use crate::hydration::document::MemoryDocument;
    use crate::navigation::history::MemoryHistory;
    use crate::preload::fetch::LocalFetcher;
    use crate::preload::outcome::{preload_fn, Preloaded};
    use crate::routing::manifest::{ManifestBuilder, PageRoute, Part};

    struct Fixture {
        navigator: Navigator,
        history: MemoryHistory,
        document: MemoryDocument,
        blog_preloads: Arc<AtomicUsize>,
        loop_preloads: Arc<AtomicUsize>,
    }

    fn page(id: &str, html: &'static str) -> Part {
        Part::new(id, from_fn(move |_| Ok(Rendered::html(html))))
    }

    fn fixture(max_redirects: usize) -> Fixture {
        let blog_preloads = Arc::new(AtomicUsize::new(0));
        let loop_preloads = Arc::new(AtomicUsize::new(0));

        let blog_counter = blog_preloads.clone();
        let blog = page("blog", "<h1>Blog</h1>").with_preload(preload_fn(move |_ctx: PreloadContext| {
            blog_counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Preloaded::props("posts")) }
        }));
        let loop_counter = loop_preloads.clone();
        let looping = page("loop", "unreachable").with_preload(preload_fn(move |ctx: PreloadContext| {
            loop_counter.fetch_add(1, Ordering::SeqCst);
            async move { ctx.redirect(302, "/loop") }
        }));

        let manifest = ManifestBuilder::new(page("root", "<nav></nav>"), page("error", "<h1>error</h1>"))
            .page(PageRoute::new("/about", page("about", "<h1>About</h1>")))
            .page(PageRoute::new("/blog", blog))
            .page(PageRoute::new("/loop", looping))
            .build()
            .unwrap();
        let router = Router::new(manifest);

        let origin = Url::parse("http://localhost:3000").unwrap();
        let mut options = NavigatorOptions::new(BasePath::default(), origin.clone());
        options.max_redirects = max_redirects;
        let fetcher = LocalFetcher::new(router.clone(), BasePath::default(), origin);
        let history = MemoryHistory::new();
        let document = MemoryDocument::new();
        let navigator = Navigator::new(
            router,
            options,
            Arc::new(fetcher),
            Box::new(history.clone()),
            Box::new(document.clone()),
        );

        Fixture {
            navigator,
            history,
            document,
            blog_preloads,
            loop_preloads,
        }
    }

    #[tokio::test]
    async fn test_older_seq_is_ignored() {
        let fx = fixture(10);
        let about = fx.navigator.request(fx.navigator.resolve("/about").unwrap(), Trigger::Click);
        let blog = fx.navigator.request(fx.navigator.resolve("/blog").unwrap(), Trigger::Click);
        assert!(about.seq < blog.seq);

        assert!(fx.navigator.navigate(blog).await.is_committed());
        let result = fx.navigator.navigate(about.clone()).await;

        assert_eq!(result, NavigationResult::Ignored { seq: about.seq });
        assert_eq!(fx.history.entries(), vec!["/blog"]);
        assert!(fx.document.contains("<h1>Blog</h1>"));
        assert!(!fx.document.contains("<h1>About</h1>"));
        assert_eq!(fx.navigator.current_seq(), 2);
        assert_eq!(fx.navigator.state(), NavigationState::Idle);
    }

    #[tokio::test]
    async fn test_redirect_loop_is_bounded() {
        let fx = fixture(3);
        let result = fx.navigator.goto("/loop").await;

        match result {
            NavigationResult::Failed { message } => assert!(message.contains("too many redirects"), "{}", message),
            other => panic!("expected a failed navigation, got {:?}", other),
        }
        // The first attempt plus three follows.
        assert_eq!(fx.loop_preloads.load(Ordering::SeqCst), 4);
        assert!(fx.history.entries().is_empty());
        assert_eq!(fx.navigator.current_seq(), 1);
        assert_eq!(fx.navigator.state(), NavigationState::Idle);
    }

    #[tokio::test]
    async fn test_prefetch_only_never_commits() {
        let fx = fixture(10);
        let request = fx
            .navigator
            .request(fx.navigator.resolve("/blog").unwrap(), Trigger::PrefetchOnly);

        assert_eq!(fx.navigator.navigate(request).await, NavigationResult::Prefetched);
        assert!(fx.history.entries().is_empty());
        assert!(fx.navigator.location().is_none());
        assert!(fx.navigator.prefetch_cache().contains_fresh("/blog"));

        let result = fx.navigator.goto("/blog").await;
        assert!(result.is_committed());
        assert_eq!(fx.blog_preloads.load(Ordering::SeqCst), 1);
        assert_eq!(fx.history.entries(), vec!["/blog"]);
    }

    #[tokio::test]
    async fn test_prefetch_only_without_page_fails() {
        let fx = fixture(10);
        let request = fx
            .navigator
            .request(fx.navigator.resolve("/nowhere").unwrap(), Trigger::PrefetchOnly);

        let result = fx.navigator.navigate(request).await;
        assert!(matches!(result, NavigationResult::Failed { .. }));
        assert!(fx.navigator.prefetch_cache().is_empty());
    }
}
