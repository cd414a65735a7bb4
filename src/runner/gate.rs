//! Environment precondition gate
//!
//! Tasks that talk to a CDN or an object store declare the environment
//! values they need. The gate reports every missing value at once and the
//! task does not run.

use crate::error::{TaskError, TaskResult};
use std::collections::HashMap;

/// Base URL prepended to local asset references in production markup
pub const CDN_URL: &str = "S3_CDN_URL";
pub const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const BUCKET: &str = "S3_BUCKET";
/// Key prefix inside the bucket; may be empty for the bucket root
pub const BUCKET_PATH: &str = "S3_BUCKET_PATH";

/// A required environment value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precondition {
    pub var: &'static str,
    /// Whether a declared-but-empty value satisfies the requirement
    pub allow_empty: bool,
}

impl Precondition {
    pub const fn non_empty(var: &'static str) -> Self {
        Precondition {
            var,
            allow_empty: false,
        }
    }

    pub const fn declared(var: &'static str) -> Self {
        Precondition {
            var,
            allow_empty: true,
        }
    }

    /// Check this requirement against an environment snapshot
    pub fn is_satisfied(&self, env: &HashMap<String, String>) -> bool {
        match env.get(self.var) {
            Some(value) => self.allow_empty || !value.is_empty(),
            None => false,
        }
    }
}

/// Names of the unsatisfied requirements, in declaration order
pub fn missing(requirements: &[Precondition], env: &HashMap<String, String>) -> Vec<String> {
    requirements
        .iter()
        .filter(|p| !p.is_satisfied(env))
        .map(|p| p.var.to_string())
        .collect()
}

/// Fail with `MissingPrecondition` unless every requirement is satisfied
pub fn check(task: &str, requirements: &[Precondition], env: &HashMap<String, String>) -> TaskResult<()> {
    let missing = missing(requirements, env);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(TaskError::MissingPrecondition {
            task: task.to_string(),
            missing,
        })
    }
}
