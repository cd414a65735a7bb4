//! Console output: failure notifications and the task table

use crate::error::TaskError;
use crate::runner::{Composition, TaskRegistry, Verbosity};
use crate::tasks::LeafTask;
use colored::Colorize;
use std::fmt::Write as _;

/// A user-facing failure notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn from_error(err: &TaskError) -> Self {
        let title = match err.stage() {
            Some(stage) => format!("Error running {} task [{}]", err.task(), stage),
            None => format!("Error running {} task", err.task()),
        };
        Notification {
            title,
            message: format!("Error: {}", err),
        }
    }
}

/// Receives task failure notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Prints notifications to stderr
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier {
    verbosity: Verbosity,
}

impl ConsoleNotifier {
    pub fn new(verbosity: Verbosity) -> Self {
        ConsoleNotifier { verbosity }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        if self.verbosity == Verbosity::Silent {
            return;
        }
        eprintln!("{}", notification.title.red().bold());
        eprintln!("{}", notification.message);
    }
}

/// Render every runnable task with its usage line
pub fn render_task_list(registry: &TaskRegistry) -> String {
    let mut rows: Vec<(String, String)> = registry
        .composites()
        .map(|c| {
            let members = c.members().join(", ");
            let usage = match (&c.usage, &c.composition) {
                (Some(usage), _) => usage.clone(),
                (None, Composition::Sequence(_)) => format!("Runs {} in order", members),
                (None, Composition::Parallel(_)) => format!("Runs {} together", members),
            };
            (c.name.clone(), usage)
        })
        .collect();
    rows.extend(
        LeafTask::ALL
            .iter()
            .map(|leaf| (leaf.name().to_string(), leaf.usage().to_string())),
    );

    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Tasks:".bold());
    for (name, usage) in rows {
        let _ = writeln!(out, "  {}  {}", format!("{:<width$}", name).cyan(), usage);
    }
    out
}
