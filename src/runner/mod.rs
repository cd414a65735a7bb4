//! Task execution engine
//!
//! This module handles running tools, gating tasks on their environment,
//! and walking the composite task graph.

pub mod command;
pub mod context;
pub mod gate;
pub mod interpolate;
pub mod registry;
pub mod task;

// Re-export main types
pub use command::*;
pub use context::*;
pub use interpolate::*;
pub use registry::*;
pub use task::*;
