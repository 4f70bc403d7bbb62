//! Client-side hydration and mounting.
//!
//! # Data Flow
//! ```text
//! First load:  InitialState (state.rs) → MountController::hydrate → claim nodes
//! Navigation:  MatchResult[] → IdentityKey per depth (tree.rs)
//!              → MountController::apply → reuse | update | remount
//!              → scroll (fragment or top)
//! ```

pub mod controller;
pub mod document;
pub mod state;
pub mod tree;

pub use controller::{LevelProps, MountController, MountReport};
pub use document::{Document, MemoryDocument, NodeId, ScrollPosition};
pub use state::InitialState;
pub use tree::{IdentityKey, LiveComponentTree};
