//! Execution context for task running
//!
//! The context holds everything a leaf task reads: the project root, the
//! configuration, an environment snapshot, and the seams to the outside world
//! (object store, live-reload hub).

use crate::config::PipelineConfig;
use crate::runner::shell_quote;
use crate::server::ReloadHub;
use crate::tasks::{CommandStore, ObjectStore};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Execution context shared by every task of a run
pub struct Context {
    /// Project root; all source globs are relative to it
    pub root: PathBuf,

    /// Pipeline configuration
    pub config: PipelineConfig,

    /// Environment snapshot (`.env` merged under the process environment)
    pub env: HashMap<String, String>,

    /// Interpreter for tool commands (e.g., ["sh", "-c"])
    pub interpreter: Vec<String>,

    /// Verbosity level
    pub verbosity: Verbosity,

    /// Upload backend for the deploy task
    pub store: Arc<dyn ObjectStore>,

    /// Live-reload broadcast used by the watcher and dev server
    pub reload: ReloadHub,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Context {
    /// Create a context for `root`, snapshotting the process environment
    pub fn new(root: PathBuf, config: PipelineConfig) -> Self {
        let interpreter = config
            .interpreter
            .clone()
            .filter(|i| !i.is_empty())
            .unwrap_or_else(default_interpreter);

        Context {
            root,
            config,
            env: env::vars().collect(),
            interpreter,
            verbosity: Verbosity::Normal,
            store: Arc::new(CommandStore),
            reload: ReloadHub::new(),
        }
    }

    /// Replace the environment snapshot
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the upload backend
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = store;
        self
    }

    /// Look up an environment value
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Build output root
    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.build)
    }

    /// Resolve a path relative to the project root
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Variables visible to command templates: the environment plus `extra`.
    /// `root` and the `extra` bindings are shell-quoted; environment values
    /// are used verbatim.
    pub fn command_vars(&self, extra: &[(&str, String)]) -> HashMap<String, String> {
        let mut vars = self.env.clone();
        vars.insert("root".to_string(), shell_quote(&self.root.display().to_string()));
        for (key, value) in extra {
            vars.insert(key.to_string(), shell_quote(value));
        }
        vars
    }
}

fn default_interpreter() -> Vec<String> {
    if cfg!(windows) {
        vec!["cmd".to_string(), "/C".to_string()]
    } else {
        vec!["sh".to_string(), "-c".to_string()]
    }
}
