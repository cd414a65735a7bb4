//! CLI interface and argument parsing
//!
//! This module handles command-line parsing, the task table, and shell
//! completion.

pub mod app;

// Re-export main types
pub use app::*;
