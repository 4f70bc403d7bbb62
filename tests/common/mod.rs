//! Shared fixture app for the integration tests.
//!
//! One manifest covers every behaviour the suites poke at: nested layouts,
//! redirects, preload errors, server routes, credentials, the store and the
//! value wire format. Server render, client navigation and export all run
//! against the same `App`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use page_router::component::{from_fn, Component, ComponentError, Instance, MountTarget, Props, Rendered};
use page_router::config::{IgnoreConfig, RouterConfig};
use page_router::hydration::{InitialState, MemoryDocument};
use page_router::navigation::{MemoryHistory, Navigator, NavigatorOptions};
use page_router::preload::{
    preload_fn, Credentials, ErrorPayload, FetchRequest, LocalFetcher, PreloadContext, PreloadError, PreloadValue,
    Preloaded, StoreSnapshot,
};
use page_router::render::{RenderPipeline, RenderRequest, RenderResponse};
use page_router::routing::{
    handler_fn, Endpoint, EndpointError, EndpointResponse, IgnoreRule, IgnoreRules, Manifest, ManifestBuilder,
    PageRoute, Part, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;

pub const POSTS: [(&str, &str); 3] = [
    ("what-is-sapper", "What is Sapper?"),
    ("how-to-use-sapper", "How to use Sapper"),
    ("a-very-long-post", "A very long post with deep links"),
];

/// Mount counters of the `[x]/[y]/[z]` chain.
#[derive(Clone, Default)]
pub struct Counters {
    pub layout: Arc<AtomicUsize>,
    pub page: Arc<AtomicUsize>,
}

pub struct App {
    pub config: RouterConfig,
    pub router: Router,
    pub pipeline: RenderPipeline,
    pub counters: Counters,
    /// Times `/blog.json` was served.
    pub blog_hits: Arc<AtomicUsize>,
    /// Set by the `DELETE /api/delete/[id]` handler.
    pub deleted: Arc<AtomicBool>,
    gate: watch::Sender<bool>,
}

/// A hydrated client.
pub struct Client {
    pub navigator: Navigator,
    pub document: MemoryDocument,
    pub history: MemoryHistory,
}

impl App {
    pub fn new(base_path: &str) -> Self {
        let mut config = RouterConfig::default();
        config.routing.base_path = base_path.to_string();
        config.routing.ignore = vec![
            IgnoreConfig::Pattern {
                pattern: "^/foobar".into(),
            },
            IgnoreConfig::Prefix { prefix: "/buzz".into() },
            IgnoreConfig::Prefix { prefix: "/fizz".into() },
        ];
        config.render.service_worker = Some("service-worker.js".into());
        Self::with_config(config)
    }

    pub fn with_config(config: RouterConfig) -> Self {
        let counters = Counters::default();
        let blog_hits = Arc::new(AtomicUsize::new(0));
        let deleted = Arc::new(AtomicBool::new(false));
        let (gate, _) = watch::channel(false);

        let manifest = manifest(&counters, &blog_hits, &deleted, &gate).expect("fixture manifest is valid");
        let router = Router::new(manifest);
        let pipeline = RenderPipeline::new(router.clone(), &config)
            .expect("fixture pipeline")
            .with_store(Arc::new(|| {
                let mut store = StoreSnapshot::new();
                store.insert("title".into(), PreloadValue::from("hello world"));
                store
            }));

        Self {
            config,
            router,
            pipeline,
            counters,
            blog_hits,
            deleted,
            gate,
        }
    }

    /// Full href of an in-app path.
    pub fn href(&self, path: &str) -> String {
        self.pipeline.base().prefix(path)
    }

    pub async fn render(&self, path: &str) -> RenderResponse {
        self.pipeline
            .handle(RenderRequest::get(&self.href(path)))
            .await
            .expect("render failed")
    }

    pub async fn render_request(&self, request: RenderRequest) -> RenderResponse {
        self.pipeline.handle(request).await.expect("render failed")
    }

    /// Ignore rules from config plus the `/hello` predicate.
    pub fn ignore(&self) -> IgnoreRules {
        let mut rules = IgnoreRules::from_config(&self.config.routing.ignore).expect("ignore rules");
        rules.push(IgnoreRule::predicate(|path| path == "/hello"));
        rules
    }

    /// Let every `/slow-preload` preload finish.
    pub fn fulfil(&self) {
        self.gate.send_replace(true);
    }

    /// Unhydrated client on an empty document.
    pub fn client(&self) -> Client {
        let document = MemoryDocument::new();
        let history = MemoryHistory::new();
        let options = NavigatorOptions::from_config(&self.config)
            .expect("navigator options")
            .with_ignore(self.ignore())
            .with_prefetch_ttl(Duration::from_secs(30));
        let fetcher = LocalFetcher::new(
            self.router.clone(),
            self.pipeline.base().clone(),
            self.pipeline.origin().clone(),
        );
        let navigator = Navigator::new(
            self.router.clone(),
            options,
            Arc::new(fetcher),
            Box::new(history.clone()),
            Box::new(document.clone()),
        );
        Client {
            navigator,
            document,
            history,
        }
    }

    /// Client hydrated from the server render of `path`.
    pub async fn hydrated(&self, path: &str) -> Client {
        let response = self.render(path).await;
        let state = InitialState::extract(&response.text()).expect("page carries initial state");
        let client = self.client();
        client
            .navigator
            .init(&self.href(path), state)
            .expect("hydration failed");
        client
    }
}

/// Wait until `f` holds, polling.
pub async fn eventually<F: Fn() -> bool>(f: F) {
    for _ in 0..200 {
        if f() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

type View = fn(&Props, usize) -> String;

/// Component that counts how often it is mounted.
struct Counted {
    created: Arc<AtomicUsize>,
    view: View,
}

struct CountedInstance {
    ordinal: usize,
    view: View,
    html: String,
}

impl Component for Counted {
    fn render(&self, props: &Props) -> Result<Rendered, ComponentError> {
        let next = self.created.load(Ordering::SeqCst) + 1;
        Ok(Rendered::html((self.view)(props, next)))
    }

    fn mount(&self, _target: MountTarget, props: &Props) -> Result<Box<dyn Instance>, ComponentError> {
        let ordinal = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(CountedInstance {
            ordinal,
            view: self.view,
            html: (self.view)(props, ordinal),
        }))
    }
}

impl Instance for CountedInstance {
    fn update(&mut self, props: &Props) -> Result<(), ComponentError> {
        self.html = (self.view)(props, self.ordinal);
        Ok(())
    }

    fn html(&self) -> String {
        self.html.clone()
    }
}

/// Renders on the server, refuses to mount on the client.
struct Unmountable;

impl Component for Unmountable {
    fn render(&self, _props: &Props) -> Result<Rendered, ComponentError> {
        Ok(Rendered::html("<h1>Server only</h1>"))
    }

    fn mount(&self, _target: MountTarget, _props: &Props) -> Result<Box<dyn Instance>, ComponentError> {
        Err(ComponentError::new("unmountable", "boom"))
    }
}

#[derive(Serialize)]
struct Answer {
    answer: u32,
}

fn page(id: &str, title: &'static str) -> Part {
    Part::new(
        id,
        from_fn(move |_| Ok(Rendered::html(format!("<h1>{}</h1>", title)).with_head(format!("<title>{}</title>", title)))),
    )
}

fn text(value: Option<&PreloadValue>) -> String {
    value.and_then(PreloadValue::as_str).unwrap_or_default().to_string()
}

fn manifest(
    counters: &Counters,
    blog_hits: &Arc<AtomicUsize>,
    deleted: &Arc<AtomicBool>,
    gate: &watch::Sender<bool>,
) -> Result<Manifest, page_router::routing::ManifestError> {
    let root = Part::new(
        "layout",
        from_fn(|props| {
            let ran = props
                .data
                .get("rootPreloadFunctionRan")
                .and_then(PreloadValue::as_bool)
                .unwrap_or(false);
            Ok(Rendered::html(format!(
                "<main>{}</main><footer>root preload function ran: {}</footer>",
                props.slot.clone().unwrap_or_default(),
                ran
            )))
        }),
    )
    .with_preload(preload_fn(|_ctx: PreloadContext| async move {
        Ok(Preloaded::props(PreloadValue::object([("rootPreloadFunctionRan", true)])))
    }));

    let error = Part::new(
        "error",
        from_fn(|props| {
            let error = props.error.clone().unwrap_or_else(ErrorPayload::internal);
            Ok(Rendered::html(format!("<h1>{}</h1><p>{}</p>", error.status, error.message))
                .with_head(format!("<title>{}</title>", error.status)))
        }),
    );

    let index = Part::new(
        "index",
        from_fn(|_| {
            Ok(Rendered::html(
                "<h1>Great success!</h1>\
                 <a href=\"about\">about</a>\
                 <a href=\"blog\">blog</a>\
                 <a href=\"redirect-from\">redirect</a>\
                 <a href=\"blog/nope\">broken link</a>\
                 <a href=\"blog/throw-an-error\">error link</a>\
                 <a href=\"about#four\">deep link</a>",
            )
            .with_head("<title>Great success!</title>"))
        }),
    );

    let about = Part::new(
        "about",
        from_fn(|_| {
            Ok(Rendered::html("<h1>About this site</h1><p id=\"four\">four</p>")
                .with_head("<title>About this site</title>"))
        }),
    )
    .with_chunk("about.js");

    let slow_gate = gate.clone();
    let slow = page("slow-preload", "Slow preload").with_preload(preload_fn(move |_ctx: PreloadContext| {
        let mut open = slow_gate.subscribe();
        async move {
            open.wait_for(|open| *open)
                .await
                .map_err(|_| PreloadError::uncaught("gate dropped"))?;
            Ok(Preloaded::props(true))
        }
    }));

    let redirect_from = page("redirect-from", "unreachable")
        .with_preload(preload_fn(|ctx: PreloadContext| async move { ctx.redirect(301, "redirect-to") }));
    let redirect_to = page("redirect-to", "redirected");
    let redirect_root = page("redirect-root", "unreachable")
        .with_preload(preload_fn(|ctx: PreloadContext| async move { ctx.redirect(301, "/") }));
    let redirect_unicode = page("redirect-unicode", "unreachable")
        .with_preload(preload_fn(|ctx: PreloadContext| async move { ctx.redirect(301, "/fünke") }));

    let blog = Part::new(
        "blog",
        from_fn(|props| {
            let items: String = props
                .data
                .as_array()
                .unwrap_or_default()
                .iter()
                .map(|post| {
                    format!(
                        "<li><a href=\"blog/{}\">{}</a></li>",
                        text(post.get("slug")),
                        text(post.get("title"))
                    )
                })
                .collect();
            Ok(Rendered::html(format!("<h1>Recent posts</h1><ul>{}</ul>", items))
                .with_head("<title>Blog</title>"))
        }),
    )
    .with_chunk("blog.js")
    .with_preload(preload_fn(|ctx: PreloadContext| async move {
        let posts = ctx.fetch("blog.json").await?.value()?;
        Ok(Preloaded::props(posts))
    }));

    let post = Part::new(
        "post",
        from_fn(|props| {
            Ok(Rendered::html(format!(
                "<h1>{}</h1><a href=\"blog\">back</a>",
                text(props.data.get("title"))
            ))
            .with_head(format!("<title>{}</title>", text(props.data.get("title")))))
        }),
    )
    .with_chunk("blog_[slug].js")
    .with_preload(preload_fn(|ctx: PreloadContext| async move {
        let slug = ctx.params.get_str("slug").unwrap_or_default().to_string();
        if slug == "throw-an-error" {
            return Err(PreloadError::uncaught("nope"));
        }
        let response = ctx.fetch(&format!("blog/{}.json", slug)).await?;
        if response.ok() {
            Ok(Preloaded::props(response.value()?))
        } else {
            let message = text(response.value()?.get("message"));
            ctx.error(response.status.as_u16(), message)
        }
    }));

    let credentials = Part::new(
        "credentials",
        from_fn(|props| Ok(Rendered::html(format!("<h1>{}</h1>", text(props.data.get("message")))))),
    )
    .with_preload(preload_fn(|ctx: PreloadContext| async move {
        let creds = Credentials::from_name(ctx.query.get("creds").unwrap_or("omit"));
        let response = ctx
            .fetch_with(FetchRequest::get("credentials/test.json").credentials(creds))
            .await?;
        if response.ok() {
            Ok(Preloaded::props(response.value()?))
        } else {
            ctx.error(response.status.as_u16(), response.text())
        }
    }));

    let counted_layout = Part::new(
        "[x]/[y]/_layout",
        Arc::new(Counted {
            created: counters.layout.clone(),
            view: |props, n| {
                format!(
                    "<p>y: {} {}</p>{}<span>child segment: {}</span>",
                    props.params.get_str("y").unwrap_or_default(),
                    n,
                    props.slot.clone().unwrap_or_default(),
                    props.segment.clone().unwrap_or_default()
                )
            },
        }),
    );
    let counted_page = Part::new(
        "[x]/[y]/[z]",
        Arc::new(Counted {
            created: counters.page.clone(),
            view: |props, n| format!("<p>z: {} {}</p>", props.params.get_str("z").unwrap_or_default(), n),
        }),
    );

    let echo = Part::new(
        "echo/page/[phrase]",
        from_fn(|props| {
            let title = format!(
                "{} ({})",
                props.params.get_str("phrase").unwrap_or_default(),
                props.query.get("message").unwrap_or_default()
            );
            Ok(Rendered::html(format!("<h1>{}</h1>", title)).with_head(format!("<title>{}</title>", title)))
        }),
    );

    let set = Part::new(
        "preload-values/set",
        from_fn(|props| {
            let has_x = props
                .data
                .get("set")
                .and_then(PreloadValue::as_set)
                .map(|set| set.contains(&PreloadValue::from("x")))
                .unwrap_or(false);
            Ok(Rendered::html(format!("<h1>{}</h1>", has_x)))
        }),
    )
    .with_preload(preload_fn(|_ctx: PreloadContext| async move {
        Ok(Preloaded::props(PreloadValue::object([("set", PreloadValue::set(["x"]))])))
    }));

    let custom = Part::new(
        "preload-values/custom-class",
        from_fn(|props| {
            let answer = props.data.get("answer").and_then(PreloadValue::as_f64).unwrap_or_default();
            Ok(Rendered::html(format!("<h1>answer: {}</h1>", answer)))
        }),
    )
    .with_preload(preload_fn(|_ctx: PreloadContext| async move {
        Ok(Preloaded::props(PreloadValue::from_custom(&Answer { answer: 42 })))
    }));

    let store = Part::new(
        "store",
        from_fn(|props| Ok(Rendered::html(format!("<h1>{}</h1>", text(props.store.get("title")))))),
    );

    let unsafe_replacement = Part::new(
        "unsafe-replacement",
        from_fn(|_| Ok(Rendered::html("<p>%router.html%</p>"))),
    );

    let hits = blog_hits.clone();
    let posts = Endpoint::new().get(handler_fn(move |_| {
        hits.fetch_add(1, Ordering::SeqCst);
        async move {
            let list: Vec<_> = POSTS
                .iter()
                .map(|(slug, title)| json!({ "slug": slug, "title": title }))
                .collect();
            EndpointResponse::json(&list)
        }
    }));

    let post_json = Endpoint::new().get(handler_fn(|request| async move {
        let slug = request.params.get_str("slug").unwrap_or_default().to_string();
        match POSTS.iter().find(|(s, _)| *s == slug) {
            Some((slug, title)) => EndpointResponse::json(&json!({
                "slug": slug,
                "title": title,
                "html": format!("<p>{}</p>", title),
            })),
            None => Ok(EndpointResponse::json(&json!({ "message": "Not found" }))?.with_status(StatusCode::NOT_FOUND)),
        }
    }));

    let throws = Endpoint::new().get(handler_fn(|_| async { Err::<EndpointResponse, _>(EndpointError::new("nope")) }));

    let credentials_json = Endpoint::new().get(handler_fn(|request| async move {
        let cookie = request
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let cookies: Vec<(&str, &str)> = cookie
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .collect();
        let find = |name: &str| cookies.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);
        match (find("a"), find("b")) {
            (Some(a), Some(b)) => EndpointResponse::json(&json!({
                "message": format!("a: {}, b: {}, max-age: {}", a, b, find("max-age").unwrap_or("undefined")),
            })),
            _ => Ok(EndpointResponse::text(StatusCode::FORBIDDEN, "unauthorized")),
        }
    }));

    let echo_route = Endpoint::new().get(handler_fn(|request| async move {
        let slug = request.params.get_str("slug").unwrap_or_default().to_string();
        Ok(EndpointResponse::new(
            StatusCode::OK,
            "text/html",
            format!("<title>{}</title>", slug),
        ))
    }));

    let flag = deleted.clone();
    let delete = Endpoint::new().delete(handler_fn(move |request| {
        flag.store(true, Ordering::SeqCst);
        async move {
            EndpointResponse::json(&json!({ "id": request.params.get_str("id").unwrap_or_default() }))
        }
    }));

    ManifestBuilder::new(root, error)
        .page(PageRoute::new("/", index))
        .page(PageRoute::new("/about", about))
        .page(PageRoute::new("/slow-preload", slow))
        .page(PageRoute::new("/redirect-from", redirect_from))
        .page(PageRoute::new("/redirect-to", redirect_to))
        .page(PageRoute::new("/redirect-root", redirect_root))
        .page(PageRoute::new("/redirect-unicode", redirect_unicode))
        .page(PageRoute::new("/blog", blog))
        .page(PageRoute::new("/blog/[slug]", post))
        .page(PageRoute::new("/credentials", credentials))
        .page(PageRoute::new("/[x]/[y]/[z]", counted_page).layout(2, counted_layout))
        .page(PageRoute::new("/echo/page/[phrase]", echo))
        .page(PageRoute::new("/fünke", page("fünke", "I'm afraid I just blue myself")))
        .page(PageRoute::new("/preload-values/set", set))
        .page(PageRoute::new("/preload-values/custom-class", custom))
        .page(PageRoute::new("/store", store))
        .page(PageRoute::new("/unsafe-replacement", unsafe_replacement))
        .page(PageRoute::new("/unmountable", Part::new("unmountable", Arc::new(Unmountable))))
        .page(PageRoute::new("/no-cache", page("no-cache", "Fresh every time")).cache_control("no-store"))
        .server("/blog.json", posts)
        .server("/blog/[slug].json", post_json)
        .server("/throw-an-error", throws)
        .server("/credentials/test.json", credentials_json)
        .server("/echo/server-route/[slug]", echo_route)
        .server("/api/delete/[id]", delete)
        .build()
}
