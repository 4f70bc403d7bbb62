//! Static export crawl.
//!
//! # Responsibilities
//! - Seed the frontier with every static page route plus configured entries
//! - Render each path through the pipeline, breadth-first
//! - Follow in-app links, redirect targets and the JSON data each page
//!   fetched while preloading
//! - Hand every produced file to an `ExportSink`
//!
//! # Design Decisions
//! - Deduplication is by normalized in-app path; query strings and
//!   fragments never produce separate files
//! - Error pages are skipped with a warning, they are not exported
//! - Redirects become a tiny document that forwards the browser

use std::collections::{BTreeMap, HashSet, VecDeque};

use axum::body::Bytes;
use axum::http::header;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::export::links::internal_links;
use crate::render::pipeline::{InternalRenderError, RenderPipeline, RenderRequest, RenderResponse};
use crate::routing::base_path::AppUrl;
use crate::routing::params::{decode_segment, split_segments};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to render {path}: {source}")]
    Render {
        path: String,
        #[source]
        source: InternalRenderError,
    },

    #[error("failed to write {path}: {reason}")]
    Sink { path: String, reason: String },
}

/// One output file. `path` is relative to the export root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: String,
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

impl ExportedFile {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Receives exported files.
pub trait ExportSink: Send {
    fn write(&mut self, file: ExportedFile) -> Result<(), ExportError>;
}

/// Keeps exported files in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: BTreeMap<String, ExportedFile>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&ExportedFile> {
        self.files.get(path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ExportSink for MemorySink {
    fn write(&mut self, file: ExportedFile) -> Result<(), ExportError> {
        self.files.insert(file.path.clone(), file);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub pages: usize,
    pub data: usize,
    pub redirects: usize,
    /// Paths not exported, with the status they rendered with.
    pub skipped: Vec<(String, u16)>,
}

pub struct ExportDriver {
    pipeline: RenderPipeline,
    entries: Vec<String>,
}

impl ExportDriver {
    pub fn new(pipeline: RenderPipeline) -> Self {
        Self {
            pipeline,
            entries: Vec::new(),
        }
    }

    /// Extra in-app paths to crawl from.
    pub fn with_entries<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.extend(entries.into_iter().map(Into::into));
        self
    }

    pub async fn run(&self, sink: &mut dyn ExportSink) -> Result<ExportReport, ExportError> {
        let mut report = ExportReport::default();
        let mut seen = HashSet::new();
        let mut frontier = VecDeque::new();

        let seeds = self
            .pipeline
            .router()
            .manifest()
            .static_paths()
            .into_iter()
            .chain(self.entries.iter().cloned());
        for seed in seeds {
            enqueue(&mut frontier, &mut seen, AppUrl::parse(&seed));
        }

        while let Some(url) = frontier.pop_front() {
            let href = url.href(self.pipeline.base());
            let response = self
                .pipeline
                .handle(RenderRequest::get(&href))
                .await
                .map_err(|source| ExportError::Render {
                    path: url.path.clone(),
                    source,
                })?;
            let status = response.status.as_u16();

            if response.status.is_redirection() {
                let Some(location) = response.header(header::LOCATION).map(str::to_string) else {
                    warn!(path = %url.path, status, "Redirect without Location, skipping");
                    report.skipped.push((url.path.clone(), status));
                    continue;
                };
                debug!(path = %url.path, location = %location, "Exporting redirect");
                sink.write(ExportedFile {
                    path: self.file_path(&url.path, true),
                    status,
                    content_type: "text/html".to_string(),
                    body: Bytes::from(redirect_document(&location)),
                })?;
                report.redirects += 1;
                if let Some(target) = self.pipeline.base().resolve(self.pipeline.origin(), &location) {
                    enqueue(&mut frontier, &mut seen, target);
                }
                continue;
            }

            if !response.status.is_success() {
                warn!(path = %url.path, status, "Not exporting error response");
                report.skipped.push((url.path.clone(), status));
                continue;
            }

            let is_html = content_type(&response).starts_with("text/html");
            if is_html {
                let html = response.text();
                for link in internal_links(&html, self.pipeline.base(), self.pipeline.origin()) {
                    enqueue(&mut frontier, &mut seen, link);
                }
                for fetched in &response.fetched {
                    enqueue(&mut frontier, &mut seen, AppUrl::parse(fetched));
                }
                report.pages += 1;
            } else {
                report.data += 1;
            }

            debug!(path = %url.path, status, "Exported");
            sink.write(ExportedFile {
                path: self.file_path(&url.path, is_html),
                status,
                content_type: content_type(&response).to_string(),
                body: response.body,
            })?;
        }

        info!(
            pages = report.pages,
            data = report.data,
            redirects = report.redirects,
            skipped = report.skipped.len(),
            "Export finished"
        );
        Ok(report)
    }

    /// `/blog/hello` → `blog/hello/index.html`, `/blog.json` → `blog.json`,
    /// both under the base path's directory.
    fn file_path(&self, path: &str, html: bool) -> String {
        let mut parts: Vec<String> = split_segments(self.pipeline.base().as_str())
            .into_iter()
            .chain(split_segments(path))
            .map(decode_segment)
            .collect();
        if html {
            parts.push("index.html".to_string());
        }
        parts.join("/")
    }
}

impl std::fmt::Debug for ExportDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportDriver")
            .field("pipeline", &self.pipeline)
            .field("entries", &self.entries)
            .finish()
    }
}

fn enqueue(frontier: &mut VecDeque<AppUrl>, seen: &mut HashSet<String>, mut url: AppUrl) {
    url.fragment = None;
    url.query = None;
    // Seeds are decoded, discovered links are percent-encoded.
    let key: Vec<String> = split_segments(&url.path).into_iter().map(decode_segment).collect();
    if seen.insert(format!("/{}", key.join("/"))) {
        frontier.push_back(url);
    }
}

fn content_type(response: &RenderResponse) -> &str {
    response.header(header::CONTENT_TYPE).unwrap_or("application/octet-stream")
}

fn redirect_document(location: &str) -> String {
    let escaped = location.replace('&', "&amp;").replace('"', "&quot;");
    format!(
        "<!doctype html><meta http-equiv=\"refresh\" content=\"0;url={0}\"><a href=\"{0}\">{0}</a>",
        escaped
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_document_escapes_target() {
        let doc = redirect_document("/search?a=1&b=\"2\"");
        assert!(doc.contains("url=/search?a=1&amp;b=&quot;2&quot;"));
    }

    #[test]
    fn test_enqueue_dedups_by_path() {
        let mut frontier = VecDeque::new();
        let mut seen = HashSet::new();
        enqueue(&mut frontier, &mut seen, AppUrl::parse("/blog?page=1"));
        enqueue(&mut frontier, &mut seen, AppUrl::parse("/blog#top"));
        enqueue(&mut frontier, &mut seen, AppUrl::parse("/blog/"));
        assert_eq!(frontier.len(), 1);
    }
}
