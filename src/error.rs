//! Error types for assetpipe

use std::io;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for assetpipe
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task failures (missing preconditions or transform failures)
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Variable interpolation errors
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Server and watcher wiring errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Task '{0}' is not defined")]
    TaskNotFound(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Invalid glob pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    #[error("Composite '{0}' has the same name as a built-in task")]
    ShadowsLeaf(String),
}

/// Terminal task failures. Neither kind is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A required environment value is absent; nothing was written
    #[error("{}", missing_message(.missing))]
    MissingPrecondition { task: String, missing: Vec<String> },

    /// The underlying transform failed at the named stage
    #[error("{message}")]
    Transform {
        task: String,
        stage: String,
        message: String,
    },
}

impl TaskError {
    /// Build a transform failure
    pub fn transform(
        task: impl Into<String>,
        stage: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        TaskError::Transform {
            task: task.into(),
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// Name of the task that raised the error
    pub fn task(&self) -> &str {
        match self {
            TaskError::MissingPrecondition { task, .. } => task,
            TaskError::Transform { task, .. } => task,
        }
    }

    /// Pipe stage that failed, if any
    pub fn stage(&self) -> Option<&str> {
        match self {
            TaskError::MissingPrecondition { .. } => None,
            TaskError::Transform { stage, .. } => Some(stage),
        }
    }

    pub fn is_missing_precondition(&self) -> bool {
        matches!(self, TaskError::MissingPrecondition { .. })
    }
}

fn missing_message(missing: &[String]) -> String {
    match missing {
        [one] => format!("{} is not declared.", one),
        many => format!("{} are not declared.", many.join(", ")),
    }
}

/// Variable interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Variable '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("Recursive interpolation detected")]
    RecursiveInterpolation,
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for task operations
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;
