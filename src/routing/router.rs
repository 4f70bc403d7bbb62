//! Route lookup.
//!
//! # Responsibilities
//! - Resolve an in-app path to a page chain, a server route or no-match
//! - Produce one [`MatchResult`] per layout level, outermost-first
//! - Compute the identity material (captured values, child segment) the
//!   mount controller needs
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over routes in specificity order; first match wins
//! - Server routes are looked up separately from pages, so client
//!   navigation can never target them
//! - Explicit `NotFound` rather than silent default

use std::sync::Arc;

use crate::routing::endpoint::Endpoint;
use crate::routing::manifest::{Manifest, Part, RouteRecord};
use crate::routing::matcher::Segment;
use crate::routing::params::{decode_segment, split_segments, ParamValue, Params, Query};

/// Match of one layout level.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub route: Arc<RouteRecord>,
    /// Position in the chain (root = 0).
    pub depth: usize,
    pub part: Part,
    pub params: Params,
    pub query: Query,
    /// Decoded path segment directly below this level's scope.
    pub segment: Option<String>,
    /// Parameter values captured inside this level's scope.
    pub captured: Vec<String>,
}

/// Match of a server route.
#[derive(Debug, Clone)]
pub struct EndpointMatch {
    pub route: Arc<RouteRecord>,
    pub endpoint: Endpoint,
    pub params: Params,
    pub query: Query,
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Page(Vec<MatchResult>),
    Endpoint(EndpointMatch),
    NotFound,
}

/// Resolves paths against a frozen [`Manifest`].
#[derive(Debug, Clone)]
pub struct Router {
    manifest: Arc<Manifest>,
}

impl Router {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest: Arc::new(manifest),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Resolve a request. Server routes win over pages.
    pub fn resolve(&self, path: &str, query: &Query) -> Resolution {
        if let Some(found) = self.match_endpoint(path, query) {
            return Resolution::Endpoint(found);
        }
        let levels = self.match_page(path, query);
        if levels.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::Page(levels)
        }
    }

    /// Look up a server route.
    pub fn match_endpoint(&self, path: &str, query: &Query) -> Option<EndpointMatch> {
        let segments = decoded_segments(path);
        self.manifest.servers().find_map(|route| {
            let endpoint = route.endpoint()?.clone();
            let captured = route.pattern.match_segments(&segments)?;
            Some(EndpointMatch {
                route: route.clone(),
                endpoint,
                params: into_params(captured),
                query: query.clone(),
            })
        })
    }

    /// Match a page route. Empty when nothing matches.
    pub fn match_page(&self, path: &str, query: &Query) -> Vec<MatchResult> {
        let segments = decoded_segments(path);
        for route in self.manifest.pages() {
            if let Some(captured) = route.pattern.match_segments(&segments) {
                let params = into_params(captured);
                return levels_for(route, &segments, params, query);
            }
        }
        Vec::new()
    }

    /// Levels rendering the error boundary (root layout + error page).
    pub fn error_levels(&self, path: &str, query: &Query) -> Vec<MatchResult> {
        let segments = decoded_segments(path);
        levels_for(self.manifest.error_route(), &segments, Params::new(), query)
    }
}

fn decoded_segments(path: &str) -> Vec<String> {
    split_segments(path).into_iter().map(decode_segment).collect()
}

fn into_params(captured: Vec<(String, ParamValue)>) -> Params {
    let mut params = Params::new();
    for (name, value) in captured {
        params.insert(name, value);
    }
    params
}

fn levels_for(
    route: &Arc<RouteRecord>,
    segments: &[String],
    params: Params,
    query: &Query,
) -> Vec<MatchResult> {
    let Some(chain) = route.page() else {
        return Vec::new();
    };

    chain
        .levels
        .iter()
        .enumerate()
        .map(|(depth, level)| {
            let is_leaf = depth + 1 == chain.levels.len();
            let segment = if is_leaf {
                None
            } else {
                segments.get(level.covers).cloned()
            };
            let captured = route
                .pattern
                .segments()
                .iter()
                .take(level.covers)
                .filter_map(|s| match s {
                    Segment::Dynamic { name, .. } | Segment::Rest(name) => {
                        params.get(name).map(|v| v.as_string())
                    }
                    Segment::Literal(_) => None,
                })
                .collect();

            MatchResult {
                route: route.clone(),
                depth,
                part: level.part.clone(),
                params: params.clone(),
                query: query.clone(),
                segment,
                captured,
            }
        })
        .collect()
}
