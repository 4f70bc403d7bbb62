//! Navigation requests and results.

use crate::routing::base_path::AppUrl;

/// What started a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Click,
    Programmatic,
    /// Back/forward: history is already at the target, nothing is pushed.
    Popstate,
    /// Preload only; never commits.
    PrefetchOnly,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Click => "click",
            Trigger::Programmatic => "programmatic",
            Trigger::Popstate => "popstate",
            Trigger::PrefetchOnly => "prefetch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub url: AppUrl,
    /// Monotonic; a later seq always wins.
    pub seq: u64,
    pub trigger: Trigger,
    /// Replace the current history entry instead of pushing.
    pub replace_state: bool,
}

/// How a navigation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    /// The page (or error page) was shown.
    Committed { url: AppUrl, status: u16 },
    /// Superseded by a later navigation while preloading.
    Discarded { seq: u64 },
    /// Arrived with a seq older than the current one.
    Ignored { seq: u64 },
    /// Not the router's to handle; the host should load `href` itself.
    External { href: String },
    /// Preloaded into the prefetch cache.
    Prefetched,
    Failed { message: String },
}

impl NavigationResult {
    pub fn outcome(&self) -> &'static str {
        match self {
            NavigationResult::Committed { .. } => "committed",
            NavigationResult::Discarded { .. } => "discarded",
            NavigationResult::Ignored { .. } => "ignored",
            NavigationResult::External { .. } => "external",
            NavigationResult::Prefetched => "prefetched",
            NavigationResult::Failed { .. } => "failed",
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, NavigationResult::Committed { .. })
    }
}

/// Observable coordinator state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NavigationState {
    #[default]
    Idle,
    Preloading { seq: u64 },
    Committing { seq: u64 },
}

impl NavigationState {
    /// True while a preload is in flight (progress indicators).
    pub fn is_preloading(&self) -> bool {
        matches!(self, NavigationState::Preloading { .. })
    }
}
