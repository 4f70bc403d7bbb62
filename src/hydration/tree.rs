//! Live component tree.

use std::fmt;
use std::sync::Arc;

use crate::component::{Instance, Props};
use crate::hydration::document::NodeId;
use crate::routing::router::MatchResult;

/// Identity of a level: component id plus the parameter values its scope
/// captured. Equal keys mean the instance may be kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    component: Arc<str>,
    values: Vec<String>,
}

impl IdentityKey {
    pub fn new(component: Arc<str>, values: Vec<String>) -> Self {
        Self { component, values }
    }

    pub fn for_level(level: &MatchResult) -> Self {
        Self::new(level.part.id.clone(), level.captured.clone())
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.component, self.values.join(","))
    }
}

pub struct Mounted {
    pub key: IdentityKey,
    pub node: NodeId,
    pub props: Props,
    pub instance: Box<dyn Instance>,
}

/// Mounted instances, outermost first.
#[derive(Default)]
pub struct LiveComponentTree {
    levels: Vec<Mounted>,
}

impl LiveComponentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, depth: usize) -> Option<&Mounted> {
        self.levels.get(depth)
    }

    pub fn get_mut(&mut self, depth: usize) -> Option<&mut Mounted> {
        self.levels.get_mut(depth)
    }

    pub fn keys(&self) -> Vec<IdentityKey> {
        self.levels.iter().map(|m| m.key.clone()).collect()
    }

    pub fn push(&mut self, mounted: Mounted) {
        self.levels.push(mounted);
    }

    /// Detach everything from `depth` inward, innermost first.
    pub fn split_off(&mut self, depth: usize) -> Vec<Mounted> {
        if depth >= self.levels.len() {
            return Vec::new();
        }
        let mut removed = self.levels.split_off(depth);
        removed.reverse();
        removed
    }
}

impl fmt::Debug for LiveComponentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.levels.iter().map(|m| m.key.to_string()))
            .finish()
    }
}
