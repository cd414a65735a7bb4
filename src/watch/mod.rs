//! Source watching for the dev server
//!
//! Changes under the project root are coalesced, matched against the watch
//! rules, and each hit rule re-runs its leaf task before signalling the
//! live-reload hub.

pub mod patterns;
pub mod watcher;

pub use patterns::{CompiledRule, WatchRules};
pub use watcher::{changed_paths, WatchService};
