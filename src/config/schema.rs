//! Configuration validation
//!
//! This module provides validation logic for configuration files.

use crate::config::types::{PipelineConfig, Replacement, WatchRule};
use crate::error::{ConfigError, ConfigResult};
use crate::runner::{CompositeTask, TaskRegistry};
use crate::tasks::LeafTask;
use crate::utils::compile_glob;
use std::collections::{BTreeMap, HashSet};

/// Subcommand names the CLI keeps for itself
const RESERVED_NAMES: &[&str] = &["list", "completions", "help"];

/// Validate a complete configuration
pub fn validate_config(config: &PipelineConfig) -> ConfigResult<()> {
    validate_paths(config)?;
    validate_replacements(&config.replacements)?;
    validate_watch_rules(&config.watch)?;

    // Building the registry checks composite members and cycles
    TaskRegistry::from_config(config)?;

    Ok(())
}

/// Every source glob must compile
fn validate_paths(config: &PipelineConfig) -> ConfigResult<()> {
    let paths = &config.paths;
    if paths.build.trim().is_empty() {
        return Err(ConfigError::Invalid("paths.build must not be empty".to_string()));
    }

    for pattern in [
        &paths.styles,
        &paths.css,
        &paths.fonts,
        &paths.vendor_scripts,
        &paths.script,
        &paths.images,
        &paths.html,
    ]
    .into_iter()
    .chain(paths.archive_exclude.iter())
    {
        compile_glob(pattern)?;
    }

    Ok(())
}

/// Patterns must be non-empty. Shadowed patterns are allowed but logged,
/// because an earlier match rewrites part of a later one.
pub fn validate_replacements(table: &[Replacement]) -> ConfigResult<()> {
    for (i, entry) in table.iter().enumerate() {
        if entry.pattern.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "replacement #{} has an empty match",
                i + 1
            )));
        }
    }

    for (earlier, later) in shadowed_replacements(table) {
        tracing::warn!(
            earlier = %earlier.pattern,
            later = %later.pattern,
            "replacement is shadowed by an earlier, shorter match"
        );
    }

    Ok(())
}

/// Pairs where an earlier pattern occurs inside a later one
pub fn shadowed_replacements(table: &[Replacement]) -> Vec<(&Replacement, &Replacement)> {
    let mut pairs = Vec::new();
    for (i, earlier) in table.iter().enumerate() {
        for later in &table[i + 1..] {
            if !earlier.pattern.is_empty() && later.pattern.contains(&earlier.pattern) {
                pairs.push((earlier, later));
            }
        }
    }
    pairs
}

/// Each rule must name a leaf task and carry valid patterns
fn validate_watch_rules(rules: &[WatchRule]) -> ConfigResult<()> {
    for rule in rules {
        if LeafTask::from_name(&rule.task).is_none() {
            return Err(ConfigError::TaskNotFound(rule.task.clone()));
        }
        if rule.patterns.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "watch rule for '{}' has no patterns",
                rule.task
            )));
        }
        for pattern in &rule.patterns {
            compile_glob(pattern)?;
        }
    }
    Ok(())
}

/// Check every composite's members exist and that no composite reaches itself
pub fn validate_composites(composites: &BTreeMap<String, CompositeTask>) -> ConfigResult<()> {
    for (name, composite) in composites {
        if LeafTask::from_name(name).is_some() {
            return Err(ConfigError::ShadowsLeaf(name.clone()));
        }
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "'{}' is reserved and cannot name a composite",
                name
            )));
        }
        if composite.members().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "composite '{}' has no members",
                name
            )));
        }
        for member in composite.members() {
            if LeafTask::from_name(member).is_none() && !composites.contains_key(member) {
                return Err(ConfigError::TaskNotFound(member.clone()));
            }
        }
    }

    detect_circular_dependencies(composites)
}

/// Detect circular dependencies between composites
fn detect_circular_dependencies(composites: &BTreeMap<String, CompositeTask>) -> ConfigResult<()> {
    let mut visited = HashSet::new();
    for name in composites.keys() {
        let mut stack = Vec::new();
        check_cycle(composites, name, &mut visited, &mut stack)?;
    }
    Ok(())
}

/// Recursively check for cycles in composite membership
fn check_cycle(
    composites: &BTreeMap<String, CompositeTask>,
    name: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) -> ConfigResult<()> {
    if stack.iter().any(|s| s == name) {
        stack.push(name.to_string());
        return Err(ConfigError::CircularDependency(stack.join(" -> ")));
    }

    if visited.contains(name) {
        return Ok(());
    }

    // Leaves terminate the walk
    let composite = match composites.get(name) {
        Some(composite) => composite,
        None => return Ok(()),
    };

    stack.push(name.to_string());
    for member in composite.members() {
        check_cycle(composites, member, visited, stack)?;
    }
    stack.pop();
    visited.insert(name.to_string());

    Ok(())
}
