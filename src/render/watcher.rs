//! Template hot reload.
//!
//! # Responsibilities
//! - Watch the template file and re-parse it when its content changes
//! - Forward templates that parse to the server, which swaps them in
//! - Report templates that do not parse and keep serving the last good one
//!
//! # Design Decisions
//! - The parent directory is watched, not the file: editors that save by
//!   writing a new file and renaming it over the old one replace the inode
//! - Events for other files in that directory are ignored
//! - A reload whose source equals the last one seen is dropped; one save
//!   usually produces several events

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::observability::metrics;
use crate::render::template::{Template, TemplateError};

/// Watches one template file.
pub struct TemplateWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<Template>,
}

impl TemplateWatcher {
    /// Returns the watcher and the receiving end for reloaded templates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<Template>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Keep the returned watcher alive for as long as
    /// updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut reload = Reload::new(self.path.clone());
        let tx = self.update_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !reload.concerns(&event) {
                        return;
                    }
                    if let Some(template) = reload.attempt() {
                        if tx.send(template).is_err() {
                            debug!("Template receiver dropped");
                        }
                    }
                }
                Err(e) => error!(error = %e, "Template watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(path = %self.path.display(), "Template watcher started");
        Ok(watcher)
    }
}

/// Reload state: the file and the last source seen.
struct Reload {
    path: PathBuf,
    file_name: Option<std::ffi::OsString>,
    last: Option<String>,
}

impl Reload {
    fn new(path: PathBuf) -> Self {
        let last = std::fs::read_to_string(&path).ok();
        Self {
            file_name: path.file_name().map(|n| n.to_os_string()),
            path,
            last,
        }
    }

    /// Whether `event` may have changed the template file.
    fn concerns(&self, event: &Event) -> bool {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return false;
        }
        event
            .paths
            .iter()
            .any(|p| p.file_name().map(|n| n.to_os_string()) == self.file_name)
    }

    /// Read and parse the file. `Some` only for a changed template that
    /// parses.
    fn attempt(&mut self) -> Option<Template> {
        let source = match std::fs::read_to_string(&self.path) {
            Ok(source) => source,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Template not readable yet");
                return None;
            }
        };
        if self.last.as_deref() == Some(source.as_str()) {
            return None;
        }
        self.last = Some(source.clone());

        match Template::parse(&source) {
            Ok(template) => {
                info!(path = %self.path.display(), "Template reloaded");
                metrics::record_template_reload(true);
                Some(template)
            }
            Err(TemplateError::MissingMarker(marker)) => {
                warn!(
                    path = %self.path.display(),
                    marker = %marker,
                    "Template rejected, keeping the current one"
                );
                metrics::record_template_reload(false);
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Template rejected, keeping the current one");
                metrics::record_template_reload(false);
                None
            }
        }
    }
}
