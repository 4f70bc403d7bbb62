//! Session history.

use std::sync::{Arc, Mutex};

pub trait History: Send {
    fn push(&mut self, href: &str);
    fn replace(&mut self, href: &str);
    fn current(&self) -> Option<String>;
}

#[derive(Debug, Default)]
struct Entries {
    stack: Vec<String>,
    index: usize,
}

/// In-memory history with back/forward, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    inner: Arc<Mutex<Entries>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().expect("history lock poisoned").stack.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("history lock poisoned").stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Step back; returns the href now current.
    pub fn back(&self) -> Option<String> {
        let mut entries = self.inner.lock().expect("history lock poisoned");
        if entries.index == 0 {
            return None;
        }
        entries.index -= 1;
        entries.stack.get(entries.index).cloned()
    }

    pub fn forward(&self) -> Option<String> {
        let mut entries = self.inner.lock().expect("history lock poisoned");
        if entries.index + 1 >= entries.stack.len() {
            return None;
        }
        entries.index += 1;
        entries.stack.get(entries.index).cloned()
    }
}

impl History for MemoryHistory {
    fn push(&mut self, href: &str) {
        let mut entries = self.inner.lock().expect("history lock poisoned");
        if entries.stack.is_empty() {
            entries.stack.push(href.to_string());
            entries.index = 0;
            return;
        }
        let keep = entries.index + 1;
        entries.stack.truncate(keep);
        entries.stack.push(href.to_string());
        entries.index = keep;
    }

    fn replace(&mut self, href: &str) {
        let mut entries = self.inner.lock().expect("history lock poisoned");
        let index = entries.index;
        match entries.stack.get_mut(index) {
            Some(slot) => *slot = href.to_string(),
            None => {
                entries.stack.push(href.to_string());
                entries.index = entries.stack.len() - 1;
            }
        }
    }

    fn current(&self) -> Option<String> {
        let entries = self.inner.lock().expect("history lock poisoned");
        entries.stack.get(entries.index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_back_forward() {
        let mut history = MemoryHistory::new();
        history.replace("/");
        history.push("/about");
        history.push("/blog");
        assert_eq!(history.back().as_deref(), Some("/about"));

        history.push("/redirect-to");
        assert_eq!(history.entries(), vec!["/", "/about", "/redirect-to"]);
        assert_eq!(history.forward(), None);
        assert_eq!(history.current().as_deref(), Some("/redirect-to"));
    }
}
