//! Link discovery in rendered pages.

use std::sync::OnceLock;

use regex::Regex;

use crate::routing::base_path::{AppUrl, BasePath};

fn anchor_href() -> &'static Regex {
    static HREF: OnceLock<Regex> = OnceLock::new();
    HREF.get_or_init(|| {
        Regex::new(r#"<a\s[^>]*?href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
            .unwrap_or_else(|e| unreachable!("anchor pattern is valid: {}", e))
    })
}

/// Raw `href` values of every `<a>` in `html`, entity-decoded.
pub fn hrefs(html: &str) -> Vec<String> {
    anchor_href()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| unescape(m.as_str()))
        .collect()
}

/// In-app links of a page, resolved the way the page's `<base>` tag
/// resolves them. Fragments are dropped.
pub fn internal_links(html: &str, base: &BasePath, origin: &url::Url) -> Vec<AppUrl> {
    hrefs(html)
        .iter()
        .filter(|href| !href.starts_with('#'))
        .filter_map(|href| base.resolve(origin, href))
        .map(|mut url| {
            url.fragment = None;
            url
        })
        .collect()
}

fn unescape(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}
