//! Server → client handoff.
//!
//! The server embeds everything the client needs to hydrate without
//! re-running preloads: base path, per-level preload values, the store and
//! the error payload of error pages.

use serde::{Deserialize, Serialize};

use crate::preload::outcome::ErrorPayload;
use crate::preload::store::StoreSnapshot;
use crate::preload::value::PreloadValue;

const GLOBAL: &str = "__ROUTER__";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub base_path: String,
    /// Preload values, outermost-first.
    pub preloaded: Vec<PreloadValue>,
    #[serde(default)]
    pub store: StoreSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
    pub status: u16,
}

impl InitialState {
    /// `<script>` tag assigning the state to the global. `<` is escaped so
    /// embedded data can never close the tag.
    pub fn to_script(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        let escaped = json
            .replace('<', "\\u003c")
            .replace('\u{2028}', "\\u2028")
            .replace('\u{2029}', "\\u2029");
        Ok(format!("<script>{}={};</script>", GLOBAL, escaped))
    }

    /// Read the state back out of a rendered page.
    pub fn extract(html: &str) -> Option<Self> {
        let marker = format!("{}=", GLOBAL);
        let start = html.find(&marker)? + marker.len();
        let rest = &html[start..];
        let end = rest.find(";</script>")?;
        serde_json::from_str(&rest[..end]).ok()
    }
}
