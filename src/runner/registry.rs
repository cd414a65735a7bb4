//! Task registry
//!
//! Leaf tasks are built in; composites come from the defaults below,
//! overridden or extended by the `composites:` section of the config.

use crate::config::{validate_composites, CompositeSpec, PipelineConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::tasks::LeafTask;
use std::collections::BTreeMap;

/// How a composite runs its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    /// Each step completes before the next starts; a failure halts the rest
    Sequence(Vec<String>),
    /// Members start together; the first failure cancels the others
    Parallel(Vec<String>),
}

/// A named grouping of tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeTask {
    pub name: String,
    pub usage: Option<String>,
    pub composition: Composition,
}

impl CompositeTask {
    fn new(name: &str, usage: &str, composition: Composition) -> Self {
        CompositeTask {
            name: name.to_string(),
            usage: Some(usage.to_string()),
            composition,
        }
    }

    /// Build from a config entry; exactly one of sequence/parallel must be set
    pub fn from_spec(name: &str, spec: &CompositeSpec) -> ConfigResult<Self> {
        let composition = match (spec.sequence.is_empty(), spec.parallel.is_empty()) {
            (false, true) => Composition::Sequence(spec.sequence.clone()),
            (true, false) => Composition::Parallel(spec.parallel.clone()),
            (false, false) => {
                return Err(ConfigError::Invalid(format!(
                    "composite '{}' sets both sequence and parallel",
                    name
                )))
            }
            (true, true) => {
                return Err(ConfigError::Invalid(format!(
                    "composite '{}' has no members",
                    name
                )))
            }
        };

        Ok(CompositeTask {
            name: name.to_string(),
            usage: spec.usage.clone(),
            composition,
        })
    }

    pub fn members(&self) -> &[String] {
        match &self.composition {
            Composition::Sequence(steps) => steps,
            Composition::Parallel(members) => members,
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Composites available without any configuration
pub fn default_composites() -> Vec<CompositeTask> {
    vec![
        CompositeTask::new(
            "build:dev",
            "Compile files for development",
            Composition::Parallel(names(&[
                "sass:dev",
                "css",
                "vendorscripts",
                "js:dev",
                "images",
                "fonts",
                "html:dev",
            ])),
        ),
        CompositeTask::new(
            "build:prod",
            "Compile files for production",
            Composition::Parallel(names(&[
                "sass:prod",
                "css",
                "vendorscripts",
                "js:prod",
                "images",
                "fonts",
                "html:prod",
            ])),
        ),
        CompositeTask::new(
            "serve",
            "Compile and serve with live reload",
            Composition::Sequence(names(&["build:dev", "dev-server"])),
        ),
        CompositeTask::new(
            "default",
            "Clean, then compile and serve",
            Composition::Sequence(names(&["clean", "serve"])),
        ),
        CompositeTask::new(
            "deploy",
            "Clean, build for production and upload",
            Composition::Sequence(names(&["clean", "build:prod", "s3"])),
        ),
    ]
}

/// A resolved task name
#[derive(Debug, Clone, Copy)]
pub enum TaskRef<'a> {
    Leaf(LeafTask),
    Composite(&'a CompositeTask),
}

/// Every task the pipeline knows about
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    composites: BTreeMap<String, CompositeTask>,
}

impl TaskRegistry {
    /// Merge the default composites with the configured ones and validate
    pub fn from_config(config: &PipelineConfig) -> ConfigResult<Self> {
        let mut composites: BTreeMap<String, CompositeTask> = default_composites()
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();

        for (name, spec) in &config.composites {
            composites.insert(name.clone(), CompositeTask::from_spec(name, spec)?);
        }

        validate_composites(&composites)?;

        Ok(TaskRegistry { composites })
    }

    /// Resolve a task name
    pub fn resolve(&self, name: &str) -> ConfigResult<TaskRef<'_>> {
        if let Some(leaf) = LeafTask::from_name(name) {
            return Ok(TaskRef::Leaf(leaf));
        }
        self.composites
            .get(name)
            .map(TaskRef::Composite)
            .ok_or_else(|| ConfigError::TaskNotFound(name.to_string()))
    }

    /// All composites, sorted by name
    pub fn composites(&self) -> impl Iterator<Item = &CompositeTask> {
        self.composites.values()
    }

    /// Leaves reachable from `name`, each listed once in first-visit order
    pub fn leaves_of(&self, name: &str) -> ConfigResult<Vec<LeafTask>> {
        let mut leaves = Vec::new();
        self.collect_leaves(name, &mut leaves)?;
        Ok(leaves)
    }

    fn collect_leaves(&self, name: &str, leaves: &mut Vec<LeafTask>) -> ConfigResult<()> {
        match self.resolve(name)? {
            TaskRef::Leaf(leaf) => {
                if !leaves.contains(&leaf) {
                    leaves.push(leaf);
                }
            }
            TaskRef::Composite(composite) => {
                for member in composite.members() {
                    self.collect_leaves(member, leaves)?;
                }
            }
        }
        Ok(())
    }
}
