//! Page router server.
//!
//! Serves a small demo site through the render pipeline, or crawls it the
//! way a static export would.
//!
//! # Architecture Overview
//!
//! ```text
//!     Request ──▶ http::server ──▶ render::pipeline ──▶ routing::router
//!                     │                  │
//!                     │                  ├──▶ preload::executor (hooks, fetch)
//!                     │                  └──▶ render::template (shell)
//!                     │
//!                     └── ignored / outside base ──▶ host fallback
//!
//!     Browser ──▶ navigation::coordinator ──▶ preload::executor
//!                          └──▶ hydration::controller ──▶ Document
//! ```

use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use clap::{Parser, Subcommand};
use page_router::component::{from_fn, Rendered};
use page_router::config::{load_config, RouterConfig};
use page_router::export::{ExportDriver, MemorySink};
use page_router::lifecycle::{signals, Shutdown};
use page_router::observability::{logging, metrics};
use page_router::preload::{preload_fn, ErrorPayload, PreloadContext, PreloadError, Preloaded};
use page_router::render::{RenderPipeline, TemplateWatcher};
use page_router::routing::{
    handler_fn, Endpoint, EndpointResponse, Manifest, ManifestBuilder, ManifestError, PageRoute, Part,
    Router,
};
use page_router::HttpServer;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "page-router")]
#[command(about = "Server-rendering page router", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the site (default)
    Serve,
    /// Crawl the site and list the files an export would produce
    Export,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("page-router v{} starting", env!("CARGO_PKG_VERSION"));

    let router = Router::new(demo_manifest()?);
    let pipeline = RenderPipeline::new(router, &config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, pipeline).await,
        Commands::Export => export(&config, pipeline).await,
    }
}

async fn serve(config: RouterConfig, pipeline: RenderPipeline) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher must outlive the server.
    let (_watcher, template_updates) = match (&config.render.template_path, config.render.watch_template) {
        (Some(path), true) => {
            let (watcher, updates) = TemplateWatcher::new(Path::new(path));
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        base_path = %config.routing.base_path,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let fallback = axum::Router::new().fallback(|| async { (StatusCode::NOT_FOUND, "Not found") });
    let server = HttpServer::new(config, pipeline, fallback)?;
    server.run(listener, template_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn export(config: &RouterConfig, pipeline: RenderPipeline) -> Result<(), Box<dyn std::error::Error>> {
    let mut sink = MemorySink::new();
    let report = ExportDriver::new(pipeline)
        .with_entries(config.export.entries.iter().cloned())
        .run(&mut sink)
        .await?;

    for path in sink.paths() {
        println!("{}", path);
    }
    println!(
        "{} pages, {} data files, {} redirects, {} skipped",
        report.pages,
        report.data,
        report.redirects,
        report.skipped.len()
    );
    Ok(())
}

fn demo_manifest() -> Result<Manifest, ManifestError> {
    let layout = Part::new(
        "layout",
        from_fn(|props| {
            Ok(Rendered::html(format!(
                "<nav><a href=\".\">home</a> <a href=\"about\">about</a> <a href=\"blog\">blog</a></nav><main>{}</main>",
                props.slot.clone().unwrap_or_default()
            )))
        }),
    );
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
        from_fn(|_| Ok(Rendered::html("<h1>Great success!</h1>").with_head("<title>Home</title>"))),
    );
    let about = Part::new(
        "about",
        from_fn(|_| Ok(Rendered::html("<h1>About this site</h1>").with_head("<title>About</title>"))),
    );
    let blog = Part::new(
        "blog",
        from_fn(|props| {
            let items: String = props
                .data
                .as_array()
                .unwrap_or_default()
                .iter()
                .map(|slug| format!("<li><a href=\"blog/{0}\">{0}</a></li>", slug))
                .collect();
            Ok(Rendered::html(format!("<h1>Blog</h1><ul>{}</ul>", items)))
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
                "<h1>{}</h1><p><a href=\"blog\">back</a></p>",
                props.params.get_str("slug").unwrap_or_default()
            )))
        }),
    )
    .with_chunk("blog_[slug].js")
    .with_preload(preload_fn(|ctx: PreloadContext| async move {
        match ctx.params.get_str("slug") {
            Some("hello-world") | Some("why-rust") => Ok(Preloaded::props(true)),
            _ => Err(PreloadError::with_status(404, "Not found")),
        }
    }));

    let posts = Endpoint::new().get(handler_fn(|_| async {
        EndpointResponse::json(&json!(["hello-world", "why-rust"]))
    }));

    ManifestBuilder::new(layout, error)
        .page(PageRoute::new("/", index))
        .page(PageRoute::new("/about", about))
        .page(PageRoute::new("/blog", blog))
        .page(PageRoute::new("/blog/[slug]", post))
        .server("/blog.json", posts)
        .build()
}
