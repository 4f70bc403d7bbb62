//! Document abstraction the mount controller drives.
//!
//! # Responsibilities
//! - Hand out one node per layout depth (claimed or created)
//! - Patch node content only when it differs
//! - Scroll to fragments or to the top
//!
//! # Design Decisions
//! - The real DOM is a host concern; `MemoryDocument` is the in-process
//!   implementation used by headless hosts and tests
//! - `MemoryDocument` is a cheap clonable handle so a host can keep
//!   inspecting the document it gave away

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub type NodeId = usize;

pub trait Document: Send {
    /// Take the server-rendered node for `depth`, if one exists.
    fn claim(&mut self, depth: usize) -> Option<NodeId>;

    /// Create an empty node for `depth`.
    fn create(&mut self, depth: usize) -> NodeId;

    /// Make `node` hold `html`. Returns false when it already did.
    fn reconcile(&mut self, node: NodeId, html: &str) -> bool;

    fn remove(&mut self, node: NodeId);

    /// Scroll the element with this id into view. False when absent.
    fn scroll_into_view(&mut self, element_id: &str) -> bool;

    fn scroll_to_top(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollPosition {
    Top,
    Element(String),
}

#[derive(Debug, Clone)]
struct Node {
    depth: usize,
    html: String,
    patches: usize,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: NodeId,
    nodes: BTreeMap<NodeId, Node>,
    unclaimed: BTreeMap<usize, NodeId>,
    scroll: Option<ScrollPosition>,
}

impl Inner {
    fn insert(&mut self, depth: usize, html: String) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, Node { depth, html, patches: 0 });
        id
    }
}

/// In-memory document: an ordered stack of per-depth nodes.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document holding server-rendered markup, one entry per depth.
    pub fn prerendered<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let document = Self::new();
        {
            let mut inner = document.inner.lock().expect("document lock poisoned");
            for (depth, html) in levels.into_iter().enumerate() {
                let id = inner.insert(depth, html.into());
                inner.unclaimed.insert(depth, id);
            }
        }
        document
    }

    /// Markup of every node, outermost first.
    pub fn html(&self) -> String {
        let inner = self.inner.lock().expect("document lock poisoned");
        let mut nodes: Vec<&Node> = inner.nodes.values().collect();
        nodes.sort_by_key(|n| n.depth);
        nodes.iter().map(|n| n.html.as_str()).collect::<Vec<_>>().join("")
    }

    pub fn contains(&self, text: &str) -> bool {
        self.html().contains(text)
    }

    /// Node currently placed at `depth`.
    pub fn node_at(&self, depth: usize) -> Option<NodeId> {
        let inner = self.inner.lock().expect("document lock poisoned");
        inner
            .nodes
            .iter()
            .find(|(_, n)| n.depth == depth)
            .map(|(id, _)| *id)
    }

    pub fn node_html(&self, node: NodeId) -> Option<String> {
        let inner = self.inner.lock().expect("document lock poisoned");
        inner.nodes.get(&node).map(|n| n.html.clone())
    }

    /// How many times `node` was rewritten.
    pub fn patches(&self, node: NodeId) -> usize {
        let inner = self.inner.lock().expect("document lock poisoned");
        inner.nodes.get(&node).map(|n| n.patches).unwrap_or(0)
    }

    pub fn scroll(&self) -> Option<ScrollPosition> {
        self.inner.lock().expect("document lock poisoned").scroll.clone()
    }
}

impl Document for MemoryDocument {
    fn claim(&mut self, depth: usize) -> Option<NodeId> {
        self.inner
            .lock()
            .expect("document lock poisoned")
            .unclaimed
            .remove(&depth)
    }

    fn create(&mut self, depth: usize) -> NodeId {
        self.inner
            .lock()
            .expect("document lock poisoned")
            .insert(depth, String::new())
    }

    fn reconcile(&mut self, node: NodeId, html: &str) -> bool {
        let mut inner = self.inner.lock().expect("document lock poisoned");
        match inner.nodes.get_mut(&node) {
            Some(existing) if existing.html != html => {
                existing.html = html.to_string();
                existing.patches += 1;
                true
            }
            _ => false,
        }
    }

    fn remove(&mut self, node: NodeId) {
        self.inner
            .lock()
            .expect("document lock poisoned")
            .nodes
            .remove(&node);
    }

    fn scroll_into_view(&mut self, element_id: &str) -> bool {
        let mut inner = self.inner.lock().expect("document lock poisoned");
        let needle = format!("id=\"{}\"", element_id);
        if inner.nodes.values().any(|n| n.html.contains(&needle)) {
            inner.scroll = Some(ScrollPosition::Element(element_id.to_string()));
            true
        } else {
            false
        }
    }

    fn scroll_to_top(&mut self) {
        self.inner.lock().expect("document lock poisoned").scroll = Some(ScrollPosition::Top);
    }
}
