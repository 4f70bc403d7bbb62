//! Mount controller.
//!
//! # Responsibilities
//! - Hydrate: adopt server-rendered nodes on first load
//! - Apply a new page tree: reuse, update or remount per depth
//! - Scroll after a commit
//!
//! # Design Decisions
//! - Reuse is decided per depth by comparing identity keys; the first
//!   differing depth and everything inside it is destroyed and remounted
//! - A reused instance is only updated when its props changed
//! - Adopted nodes are patched only where client markup differs, so node
//!   identity survives hydration

use tracing::{debug, trace};

use crate::component::{ComponentError, MountTarget, Props};
use crate::hydration::document::Document;
use crate::hydration::tree::{IdentityKey, LiveComponentTree, Mounted};
use crate::routing::manifest::Part;

/// What to show at one depth.
#[derive(Debug, Clone)]
pub struct LevelProps {
    pub part: Part,
    pub key: IdentityKey,
    pub props: Props,
}

/// Per-depth effects of a mount pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountReport {
    /// Kept with identical props.
    pub reused: Vec<usize>,
    /// Kept, props updated.
    pub updated: Vec<usize>,
    /// Freshly mounted (or adopted, on hydration).
    pub mounted: Vec<usize>,
    /// Instances destroyed.
    pub destroyed: usize,
    /// Adopted nodes whose markup had to be patched.
    pub patched: Vec<usize>,
}

pub struct MountController {
    document: Box<dyn Document>,
    tree: LiveComponentTree,
}

impl MountController {
    pub fn new(document: Box<dyn Document>) -> Self {
        Self {
            document,
            tree: LiveComponentTree::new(),
        }
    }

    pub fn tree(&self) -> &LiveComponentTree {
        &self.tree
    }

    /// First mount over server-rendered markup.
    pub fn hydrate(&mut self, levels: Vec<LevelProps>) -> Result<MountReport, ComponentError> {
        let mut report = MountReport::default();
        let removed = self.tree.split_off(0);
        report.destroyed += self.destroy(removed);

        for (depth, level) in levels.into_iter().enumerate() {
            let (node, adopted) = match self.document.claim(depth) {
                Some(node) => (node, true),
                None => (self.document.create(depth), false),
            };
            let target = MountTarget {
                node,
                depth,
                hydrate: adopted,
            };
            let instance = level.part.component.mount(target, &level.props)?;
            if self.document.reconcile(node, &instance.html()) && adopted {
                debug!(depth, component = %level.key, "Hydration patched server markup");
                report.patched.push(depth);
            }
            report.mounted.push(depth);
            self.tree.push(Mounted {
                key: level.key,
                node,
                props: level.props,
                instance,
            });
        }

        Ok(report)
    }

    /// Move the live tree to a new page.
    ///
    /// Replacement instances are mounted before anything is torn down; a
    /// failing mount or update leaves the current page in place.
    pub fn apply(&mut self, levels: Vec<LevelProps>) -> Result<MountReport, ComponentError> {
        let mut report = MountReport::default();

        let diverge = levels
            .iter()
            .enumerate()
            .find(|(depth, level)| {
                self.tree
                    .get(*depth)
                    .map(|mounted| mounted.key != level.key)
                    .unwrap_or(true)
            })
            .map(|(depth, _)| depth)
            .unwrap_or(levels.len());

        let mut kept = Vec::new();
        let mut staged = Vec::new();
        for (depth, level) in levels.into_iter().enumerate() {
            if depth < diverge {
                kept.push(level);
                continue;
            }
            let node = self.document.create(depth);
            let target = MountTarget {
                node,
                depth,
                hydrate: false,
            };
            match level.part.component.mount(target, &level.props) {
                Ok(instance) => staged.push(Mounted {
                    key: level.key,
                    node,
                    props: level.props,
                    instance,
                }),
                Err(err) => {
                    self.document.remove(node);
                    self.destroy(staged);
                    return Err(err);
                }
            }
        }

        let mut updated = Vec::new();
        for (depth, level) in kept.into_iter().enumerate() {
            let Some(mounted) = self.tree.get_mut(depth) else {
                continue;
            };
            if mounted.props == level.props {
                report.reused.push(depth);
                continue;
            }
            if let Err(err) = mounted.instance.update(&level.props) {
                self.destroy(staged);
                return Err(err);
            }
            updated.push((depth, level.props, mounted.instance.html()));
            report.updated.push(depth);
        }

        // Nothing below can fail.
        for (depth, props, html) in updated {
            if let Some(mounted) = self.tree.get_mut(depth) {
                mounted.props = props;
                self.document.reconcile(mounted.node, &html);
            }
        }
        let removed = self.tree.split_off(diverge);
        report.destroyed += self.destroy(removed);
        for mounted in staged {
            self.document.reconcile(mounted.node, &mounted.instance.html());
            trace!(depth = self.tree.len(), component = %mounted.key, "Mounted");
            report.mounted.push(self.tree.len());
            self.tree.push(mounted);
        }

        Ok(report)
    }

    /// Scroll to the fragment's element, or to the top without one.
    pub fn scroll(&mut self, fragment: Option<&str>) {
        match fragment.filter(|f| !f.is_empty()) {
            Some(fragment) => {
                if !self.document.scroll_into_view(fragment) {
                    trace!(fragment, "No element for fragment");
                }
            }
            None => self.document.scroll_to_top(),
        }
    }

    fn destroy(&mut self, removed: Vec<Mounted>) -> usize {
        let count = removed.len();
        for mut mounted in removed {
            mounted.instance.destroy();
            self.document.remove(mounted.node);
        }
        count
    }
}

impl std::fmt::Debug for MountController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountController").field("tree", &self.tree).finish()
    }
}
