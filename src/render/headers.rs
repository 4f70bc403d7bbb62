//! Response headers of rendered pages.

use axum::http::{header, HeaderMap, HeaderValue};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::render::pipeline::InternalRenderError;
use crate::routing::base_path::BasePath;
use crate::routing::router::MatchResult;

/// Bytes escaped in chunk URLs; everything non-ASCII is escaped too.
const CHUNK_PATH: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`').add(b'#').add(b'?');

/// `Cache-Control` for error pages.
pub const ERROR_CACHE_CONTROL: &str = "no-cache";

/// Where client chunks are served from.
#[derive(Debug, Clone)]
pub struct ChunkLocation {
    base: BasePath,
    client_dir: String,
}

impl ChunkLocation {
    pub fn new(base: BasePath, client_dir: &str) -> Self {
        Self {
            base,
            client_dir: client_dir.trim_matches('/').to_string(),
        }
    }

    pub fn url(&self, chunk: &str) -> String {
        let path = self
            .base
            .prefix(&format!("{}/{}", self.client_dir, chunk.trim_start_matches('/')));
        utf8_percent_encode(&path, CHUNK_PATH).to_string()
    }
}

/// Chunks a page needs: the entry first, then each level's own, without
/// repeats.
pub fn page_chunks<'a>(entry: &'a str, levels: &'a [MatchResult]) -> Vec<&'a str> {
    let mut chunks = vec![entry];
    for chunk in levels.iter().filter_map(|l| l.part.chunk.as_deref()) {
        if !chunks.contains(&chunk) {
            chunks.push(chunk);
        }
    }
    chunks
}

/// `Link` header value preloading every chunk.
pub fn link_header(location: &ChunkLocation, chunks: &[&str]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("<{}>;rel=\"preload\";as=\"script\"", location.url(chunk)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Headers shared by every rendered page.
pub fn page_headers(
    content_type: &'static str,
    cache_control: &str,
    link: Option<&str>,
) -> Result<HeaderMap, InternalRenderError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, header_value("cache-control", cache_control)?);
    if let Some(link) = link {
        headers.insert(header::LINK, header_value("link", link)?);
    }
    Ok(headers)
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, InternalRenderError> {
    HeaderValue::from_str(value).map_err(|_| InternalRenderError::InvalidHeader {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_header_uses_base_path() {
        let location = ChunkLocation::new(BasePath::new("/custom-basepath"), "client");
        let link = link_header(&location, &["main.js", "blog_[slug].js"]);
        assert_eq!(
            link,
            "</custom-basepath/client/main.js>;rel=\"preload\";as=\"script\", \
             </custom-basepath/client/blog_[slug].js>;rel=\"preload\";as=\"script\""
        );
    }

    #[test]
    fn test_root_base_path() {
        let location = ChunkLocation::new(BasePath::default(), "/client/");
        assert_eq!(location.url("main.js"), "/client/main.js");
    }

    #[test]
    fn test_non_ascii_chunk_is_encoded() {
        let location = ChunkLocation::new(BasePath::default(), "client");
        let link = link_header(&location, &["fünke.js"]);
        assert_eq!(link, "</client/f%C3%BCnke.js>;rel=\"preload\";as=\"script\"");

        let headers = page_headers("text/html", "max-age=600", Some(&link)).unwrap();
        assert_eq!(headers[header::LINK], link.as_str());
    }

    #[test]
    fn test_invalid_header_is_an_error() {
        let err = page_headers("text/html", "max-age=600\n", None).unwrap_err();
        assert!(matches!(err, InternalRenderError::InvalidHeader { name: "cache-control", .. }));
    }
}
