//! assetpipe - a frontend asset build pipeline
//!
//! Compiles stylesheets, bundles scripts, optimizes images and rewrites
//! markup into a build directory, serves it with live reload, and packages
//! or uploads the result.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod runner;
pub mod server;
pub mod tasks;
pub mod ui;
pub mod utils;
pub mod watch;

// Re-export commonly used types
pub use error::{PipelineError, Result};

/// Current version of assetpipe
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
