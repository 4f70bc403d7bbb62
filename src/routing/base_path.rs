//! Base path handling and in-app URLs.
//!
//! # Responsibilities
//! - Normalize the configured base path prefix
//! - Strip it from incoming request paths
//! - Apply it to links, assets, history entries and redirect targets
//! - Resolve hrefs the way a document with `<base href="{base}/">` would
//!
//! # Design Decisions
//! - The stored prefix never ends with `/` (`""` means mounted at root)
//! - Absolute URLs in redirects pass through untouched
//! - Hrefs leaving the origin or the base path resolve to `None`

use std::fmt;

use url::Url;

/// Normalized base path prefix (e.g. `""` or `"/custom-basepath"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BasePath(String);

impl BasePath {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            Self(String::new())
        } else {
            Self(format!("/{}", trimmed))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove the prefix from a request path. `None` when the path lies
    /// outside the base.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.0.is_empty() {
            return Some(if path.is_empty() { "/" } else { path });
        }
        let rest = path.strip_prefix(self.0.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Prefix an in-app path.
    pub fn prefix(&self, app_path: &str) -> String {
        format!("{}/{}", self.0, app_path.trim_start_matches('/'))
    }

    /// Rewrite a redirect target. Relative and root-relative targets are
    /// placed under the base; absolute URLs are left alone.
    pub fn redirect_location(&self, location: &str) -> String {
        if location.contains("://") || location.starts_with("//") {
            location.to_string()
        } else {
            self.prefix(location)
        }
    }

    /// [`redirect_location`](Self::redirect_location), percent-encoded so it
    /// fits a `Location` header. Same-origin targets keep the
    /// root-relative form.
    pub fn encoded_location(&self, origin: &Url, location: &str) -> Result<String, url::ParseError> {
        let target = origin.join(&self.redirect_location(location))?;
        if target.origin() != origin.origin() {
            return Ok(target.to_string());
        }
        let mut encoded = target.path().to_string();
        if let Some(query) = target.query() {
            encoded.push('?');
            encoded.push_str(query);
        }
        if let Some(fragment) = target.fragment() {
            encoded.push('#');
            encoded.push_str(fragment);
        }
        Ok(encoded)
    }

    /// The URL a document under this base resolves relative hrefs against.
    pub fn document_url(&self, origin: &Url) -> Result<Url, url::ParseError> {
        origin.join(&format!("{}/", self.0))
    }

    /// Resolve an href as a link inside the app. `None` for other origins
    /// or paths outside the base.
    pub fn resolve(&self, origin: &Url, href: &str) -> Option<AppUrl> {
        let document = self.document_url(origin).ok()?;
        let target = document.join(href).ok()?;
        if target.origin() != origin.origin() {
            return None;
        }
        let path = self.strip(target.path())?.to_string();
        Some(AppUrl {
            path,
            query: target.query().map(str::to_string),
            fragment: target.fragment().map(str::to_string),
        })
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A location inside the app, with the base path removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppUrl {
    /// Path starting with `/`, still percent-encoded.
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl AppUrl {
    /// Split an in-app `path?query#fragment` string.
    pub fn parse(raw: &str) -> Self {
        let (rest, fragment) = match raw.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (raw, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self { path, query, fragment }
    }

    /// `path?query` without the fragment.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) if !query.is_empty() => format!("{}?{}", self.path, query),
            _ => self.path.clone(),
        }
    }

    /// Full href under `base`, including query and fragment.
    pub fn href(&self, base: &BasePath) -> String {
        let mut href = base.prefix(&self.path_and_query());
        if let Some(fragment) = &self.fragment {
            href.push('#');
            href.push_str(fragment);
        }
        href
    }

    /// Key used for prefetch lookups and export deduplication.
    pub fn cache_key(&self) -> String {
        let path = super::params::normalize_path(&self.path);
        match &self.query {
            Some(query) if !query.is_empty() => format!("{}?{}", path, query),
            _ => path,
        }
    }
}
