//! Route manifest.
//!
//! # Responsibilities
//! - Describe every page (layout chain + leaf) and server route
//! - Validate patterns and layout nesting once, at build time
//! - Freeze routes in specificity order
//!
//! # Design Decisions
//! - Immutable after `build()`; shared behind `Arc`
//! - The root layout is implicit and wraps every page, including the
//!   error page
//! - A layout is placed by the number of path segments its directory
//!   covers, so `/[x]/[y]/_layout` covers 2 segments of `/[x]/[y]/[z]`

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::component::Component;
use crate::preload::outcome::PreloadHook;
use crate::routing::endpoint::Endpoint;
use crate::routing::matcher::RoutePattern;

/// Errors detected while building a manifest.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route pattern `{pattern}` declares parameter `{name}` twice")]
    DuplicateParam { pattern: String, name: String },

    #[error("route pattern `{pattern}` is declared twice")]
    DuplicateRoute { pattern: String },

    #[error("layout `{layout}` in `{pattern}` covers {covers} segments: {reason}")]
    InvalidLayout {
        pattern: String,
        layout: String,
        covers: usize,
        reason: String,
    },
}

/// One component of a page chain: a layout, a page, the root or the error
/// page.
#[derive(Clone)]
pub struct Part {
    pub id: Arc<str>,
    pub component: Arc<dyn Component>,
    pub preload: Option<PreloadHook>,
    /// Client chunk carrying this part's code.
    pub chunk: Option<String>,
}

impl Part {
    pub fn new(id: impl Into<Arc<str>>, component: Arc<dyn Component>) -> Self {
        Self {
            id: id.into(),
            component,
            preload: None,
            chunk: None,
        }
    }

    pub fn with_preload(mut self, hook: PreloadHook) -> Self {
        self.preload = Some(hook);
        self
    }

    pub fn with_chunk(mut self, chunk: impl Into<String>) -> Self {
        self.chunk = Some(chunk.into());
        self
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("id", &self.id)
            .field("preload", &self.preload.is_some())
            .field("chunk", &self.chunk)
            .finish()
    }
}

/// A level of a page chain.
#[derive(Debug, Clone)]
pub struct Level {
    pub part: Part,
    /// Number of leading path segments in this level's scope.
    pub covers: usize,
}

#[derive(Debug, Clone)]
pub struct PageChain {
    /// Outermost-first; the root is always first, the page always last.
    pub levels: Vec<Level>,
    pub cache_control: Option<String>,
}

#[derive(Debug, Clone)]
pub enum RouteKind {
    Page(PageChain),
    Server(Endpoint),
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct RouteRecord {
    pub pattern: RoutePattern,
    pub kind: RouteKind,
}

impl RouteRecord {
    pub fn page(&self) -> Option<&PageChain> {
        match &self.kind {
            RouteKind::Page(chain) => Some(chain),
            RouteKind::Server(_) => None,
        }
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        match &self.kind {
            RouteKind::Server(endpoint) => Some(endpoint),
            RouteKind::Page(_) => None,
        }
    }

    /// Whether any level of the chain has a preload hook.
    pub fn has_preload(&self) -> bool {
        self.page()
            .map(|chain| chain.levels.iter().any(|l| l.part.preload.is_some()))
            .unwrap_or(false)
    }
}

/// Declaration of a page route.
pub struct PageRoute {
    pattern: String,
    layouts: Vec<(usize, Part)>,
    page: Part,
    cache_control: Option<String>,
}

impl PageRoute {
    pub fn new(pattern: impl Into<String>, page: Part) -> Self {
        Self {
            pattern: pattern.into(),
            layouts: Vec::new(),
            page,
            cache_control: None,
        }
    }

    /// Add a layout whose directory covers the first `covers` segments.
    pub fn layout(mut self, covers: usize, part: Part) -> Self {
        self.layouts.push((covers, part));
        self
    }

    /// Per-route `Cache-Control` policy.
    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }
}

/// Builds a [`Manifest`].
pub struct ManifestBuilder {
    root: Part,
    error: Part,
    pages: Vec<PageRoute>,
    servers: Vec<(String, Endpoint)>,
}

impl ManifestBuilder {
    pub fn new(root: Part, error: Part) -> Self {
        Self {
            root,
            error,
            pages: Vec::new(),
            servers: Vec::new(),
        }
    }

    pub fn page(mut self, route: PageRoute) -> Self {
        self.pages.push(route);
        self
    }

    pub fn server(mut self, pattern: impl Into<String>, endpoint: Endpoint) -> Self {
        self.servers.push((pattern.into(), endpoint));
        self
    }

    pub fn build(self) -> Result<Manifest, ManifestError> {
        let mut routes = Vec::with_capacity(self.pages.len() + self.servers.len());
        let mut seen_pages: Vec<String> = Vec::new();
        let mut seen_servers: Vec<String> = Vec::new();

        for declared in self.pages {
            let pattern = RoutePattern::parse(&declared.pattern)?;
            check_unique(&mut seen_pages, &pattern)?;
            let depth = pattern.segments().len();

            let mut levels = vec![Level {
                part: self.root.clone(),
                covers: 0,
            }];
            let mut layouts = declared.layouts;
            layouts.sort_by_key(|(covers, _)| *covers);
            let mut previous = 0;
            for (covers, part) in layouts {
                let reason = if covers == 0 {
                    Some("only the root layout covers no segments")
                } else if covers > depth {
                    Some("more segments than the route has")
                } else if covers == previous {
                    Some("another layout covers the same segments")
                } else {
                    None
                };
                if let Some(reason) = reason {
                    return Err(ManifestError::InvalidLayout {
                        pattern: declared.pattern.clone(),
                        layout: part.id.to_string(),
                        covers,
                        reason: reason.to_string(),
                    });
                }
                previous = covers;
                levels.push(Level { part, covers });
            }
            levels.push(Level {
                part: declared.page,
                covers: depth,
            });

            routes.push(Arc::new(RouteRecord {
                pattern,
                kind: RouteKind::Page(PageChain {
                    levels,
                    cache_control: declared.cache_control,
                }),
            }));
        }

        for (source, endpoint) in self.servers {
            let pattern = RoutePattern::parse(&source)?;
            check_unique(&mut seen_servers, &pattern)?;
            routes.push(Arc::new(RouteRecord {
                pattern,
                kind: RouteKind::Server(endpoint),
            }));
        }

        routes.sort_by(|a, b| a.pattern.specificity_cmp(&b.pattern));

        let error_route = Arc::new(RouteRecord {
            pattern: RoutePattern::parse("/_error")?,
            kind: RouteKind::Page(PageChain {
                levels: vec![
                    Level {
                        part: self.root.clone(),
                        covers: 0,
                    },
                    Level {
                        part: self.error.clone(),
                        covers: 0,
                    },
                ],
                cache_control: None,
            }),
        });

        Ok(Manifest {
            root: self.root,
            error: self.error,
            routes,
            error_route,
        })
    }
}

fn check_unique(seen: &mut Vec<String>, pattern: &RoutePattern) -> Result<(), ManifestError> {
    let key = pattern.source().trim_end_matches('/').to_string();
    if seen.contains(&key) {
        return Err(ManifestError::DuplicateRoute {
            pattern: pattern.source().to_string(),
        });
    }
    seen.push(key);
    Ok(())
}

/// Frozen route table.
#[derive(Debug)]
pub struct Manifest {
    root: Part,
    error: Part,
    routes: Vec<Arc<RouteRecord>>,
    error_route: Arc<RouteRecord>,
}

impl Manifest {
    pub fn root(&self) -> &Part {
        &self.root
    }

    pub fn error(&self) -> &Part {
        &self.error
    }

    /// All routes, most specific first.
    pub fn routes(&self) -> &[Arc<RouteRecord>] {
        &self.routes
    }

    pub fn pages(&self) -> impl Iterator<Item = &Arc<RouteRecord>> {
        self.routes.iter().filter(|r| r.page().is_some())
    }

    pub fn servers(&self) -> impl Iterator<Item = &Arc<RouteRecord>> {
        self.routes.iter().filter(|r| r.endpoint().is_some())
    }

    /// Route used to render the error boundary.
    pub fn error_route(&self) -> &Arc<RouteRecord> {
        &self.error_route
    }

    /// Concrete paths of page routes without dynamic segments.
    pub fn static_paths(&self) -> Vec<String> {
        self.pages().filter_map(|r| r.pattern.static_path()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{from_fn, Rendered};

    fn part(id: &str) -> Part {
        Part::new(id, from_fn(|_| Ok(Rendered::default())))
    }

    fn builder() -> ManifestBuilder {
        ManifestBuilder::new(part("root"), part("error"))
    }

    #[test]
    fn test_chain_levels() {
        let manifest = builder()
            .page(PageRoute::new("/[x]/[y]/[z]", part("z")).layout(2, part("y")))
            .build()
            .unwrap();

        let chain = manifest.routes()[0].page().unwrap();
        let covers: Vec<usize> = chain.levels.iter().map(|l| l.covers).collect();
        assert_eq!(covers, vec![0, 2, 3]);
        assert_eq!(&*chain.levels[0].part.id, "root");
        assert_eq!(&*chain.levels[2].part.id, "z");
    }

    #[test]
    fn test_invalid_layout() {
        let err = builder()
            .page(PageRoute::new("/about", part("about")).layout(3, part("deep")))
            .build()
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidLayout { covers: 3, .. }));
    }

    #[test]
    fn test_duplicate_route() {
        let err = builder()
            .page(PageRoute::new("/about", part("a")))
            .page(PageRoute::new("/about/", part("b")))
            .build()
            .unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateRoute { .. }));
    }

    #[test]
    fn test_static_paths_and_order() {
        let manifest = builder()
            .page(PageRoute::new("/blog/[slug]", part("post")))
            .page(PageRoute::new("/", part("index")))
            .page(PageRoute::new("/blog", part("blog")))
            .server("/blog.json", Endpoint::new())
            .build()
            .unwrap();

        let mut paths = manifest.static_paths();
        paths.sort();
        assert_eq!(paths, vec!["/", "/blog"]);
        assert_eq!(manifest.servers().count(), 1);
        assert!(!manifest.routes()[0].has_preload());
    }
}
