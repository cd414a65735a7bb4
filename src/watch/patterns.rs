use crate::config::{ReloadKind, WatchRule};
use crate::error::{ConfigError, ConfigResult};
use crate::tasks::LeafTask;
use crate::utils::compile_glob_set;
use globset::GlobSet;
use std::fmt;

/// A watch rule with its patterns compiled
#[derive(Clone)]
pub struct CompiledRule {
    pub task: LeafTask,
    pub reload: ReloadKind,
    set: GlobSet,
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("task", &self.task)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl CompiledRule {
    /// Whether a root-relative, `/`-separated path belongs to this rule
    pub fn matches(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

/// The ordered rule list the watcher dispatches on
#[derive(Debug, Clone, Default)]
pub struct WatchRules {
    rules: Vec<CompiledRule>,
}

impl WatchRules {
    pub fn compile(rules: &[WatchRule]) -> ConfigResult<Self> {
        let rules = rules
            .iter()
            .map(|rule| -> ConfigResult<CompiledRule> {
                let task = LeafTask::from_name(&rule.task)
                    .ok_or_else(|| ConfigError::TaskNotFound(rule.task.clone()))?;
                Ok(CompiledRule {
                    task,
                    reload: rule.reload,
                    set: compile_glob_set(&rule.patterns)?,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(WatchRules { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules hit by any of `paths`, each once, in rule order
    pub fn triggered<S: AsRef<str>>(&self, paths: &[S]) -> Vec<&CompiledRule> {
        self.rules
            .iter()
            .filter(|rule| paths.iter().any(|p| rule.matches(p.as_ref())))
            .collect()
    }
}
