//! Task execution
//!
//! The runner walks the task graph: composites fan out into sequences or
//! parallel groups, leaves are gated and then executed. Failures are
//! notified once, at the leaf that raised them.

use crate::error::{Result, TaskError, TaskResult};
use crate::runner::{gate, Composition, Context, TaskRef, TaskRegistry};
use crate::tasks::{LeafTask, TaskOutput};
use crate::ui::{ConsoleNotifier, Notification, Notifier};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Instant;

/// Executes tasks against a shared context
#[derive(Clone)]
pub struct Runner {
    registry: Arc<TaskRegistry>,
    ctx: Arc<Context>,
    notifier: Arc<dyn Notifier>,
}

impl Runner {
    pub fn new(registry: TaskRegistry, ctx: Context) -> Self {
        let notifier = Arc::new(ConsoleNotifier::new(ctx.verbosity));
        Runner {
            registry: Arc::new(registry),
            ctx: Arc::new(ctx),
            notifier,
        }
    }

    /// Replace the failure notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Run a task by name after checking the gates of every leaf it reaches
    pub async fn run(&self, name: &str) -> Result<()> {
        self.preflight(name)?;
        self.run_task(name).await
    }

    /// Fail before anything runs if a reachable leaf is missing environment values
    pub fn preflight(&self, name: &str) -> Result<()> {
        let mut missing: Vec<String> = Vec::new();
        for leaf in self.registry.leaves_of(name)? {
            for var in gate::missing(leaf.preconditions(), &self.ctx.env) {
                if !missing.contains(&var) {
                    missing.push(var);
                }
            }
        }

        if missing.is_empty() {
            return Ok(());
        }

        let err = TaskError::MissingPrecondition {
            task: name.to_string(),
            missing,
        };
        self.notify(&err);
        Err(err.into())
    }

    /// Run a task without preflight. Sequences stop at the first failing
    /// step; parallel groups drop their remaining members on the first failure.
    pub fn run_task<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            match self.registry.resolve(name)? {
                TaskRef::Leaf(leaf) => {
                    self.run_leaf(leaf).await?;
                }
                TaskRef::Composite(composite) => {
                    tracing::debug!(task = %name, "starting composite");
                    match &composite.composition {
                        Composition::Sequence(steps) => {
                            for step in steps {
                                self.run_task(step).await?;
                            }
                        }
                        Composition::Parallel(members) => {
                            try_join_all(members.iter().map(|m| self.run_task(m))).await?;
                        }
                    }
                    tracing::debug!(task = %name, "finished composite");
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Gate and execute one leaf, notifying on failure
    pub fn run_leaf(&self, leaf: LeafTask) -> BoxFuture<'_, TaskResult<TaskOutput>> {
        async move {
            let started = Instant::now();
            tracing::info!(task = %leaf, "starting");

            let result = match gate::check(leaf.name(), leaf.preconditions(), &self.ctx.env) {
                Ok(()) => leaf.run(self).await,
                Err(err) => Err(err),
            };

            match &result {
                Ok(output) => tracing::info!(
                    task = %leaf,
                    files = output.files.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "finished"
                ),
                Err(err) => {
                    tracing::debug!(task = %leaf, error = %err, "failed");
                    self.notify(err);
                }
            }
            result
        }
        .boxed()
    }

    fn notify(&self, err: &TaskError) {
        self.notifier.notify(&Notification::from_error(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompositeSpec, PipelineConfig};
    use crate::error::PipelineError;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    impl Notifier for Recorder {
        fn notify(&self, notification: &Notification) {
            self.0.lock().unwrap().push(notification.clone());
        }
    }

    fn runner(
        root: &std::path::Path,
        config: PipelineConfig,
        env: HashMap<String, String>,
    ) -> (Runner, Arc<Recorder>) {
        let registry = TaskRegistry::from_config(&config).unwrap();
        let ctx = Context::new(root.to_path_buf(), config).with_env(env);
        let recorder = Arc::new(Recorder::default());
        let runner = Runner::new(registry, ctx).with_notifier(recorder.clone());
        (runner, recorder)
    }

    #[tokio::test]
    async fn test_sequence_runs_in_order() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("index.html"), "<p>hi</p>").unwrap();
        fs::create_dir_all(temp_dir.path().join("build")).unwrap();
        fs::write(temp_dir.path().join("build/stale.txt"), "old").unwrap();

        let mut config = PipelineConfig::default();
        config.composites.insert(
            "fresh".to_string(),
            CompositeSpec {
                sequence: vec!["clean".to_string(), "html:dev".to_string()],
                ..Default::default()
            },
        );
        let (runner, recorder) = runner(temp_dir.path(), config, HashMap::new());

        runner.run("fresh").await.unwrap();
        assert!(!temp_dir.path().join("build/stale.txt").exists());
        assert!(temp_dir.path().join("build/index.html").exists());
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preflight_blocks_before_clean() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("build")).unwrap();
        fs::write(temp_dir.path().join("build/keep.txt"), "previous build").unwrap();

        let (runner, recorder) = runner(temp_dir.path(), PipelineConfig::default(), HashMap::new());

        let err = runner.run("deploy").await.unwrap_err();
        match err {
            PipelineError::Task(TaskError::MissingPrecondition { task, missing }) => {
                assert_eq!(task, "deploy");
                assert_eq!(
                    missing,
                    vec![
                        "S3_CDN_URL",
                        "AWS_ACCESS_KEY_ID",
                        "AWS_SECRET_ACCESS_KEY",
                        "S3_BUCKET",
                        "S3_BUCKET_PATH"
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(temp_dir.path().join("build/keep.txt").exists());

        let notes = recorder.0.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Error running deploy task");
    }

    #[tokio::test]
    async fn test_failing_leaf_notified_once() {
        let temp_dir = TempDir::new().unwrap();
        let (runner, recorder) = runner(temp_dir.path(), PipelineConfig::default(), HashMap::new());

        let err = runner.run_leaf(LeafTask::HtmlProd).await.unwrap_err();
        assert!(err.is_missing_precondition());

        let notes = recorder.0.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "Error: S3_CDN_URL is not declared.");
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let temp_dir = TempDir::new().unwrap();
        let (runner, _) = runner(temp_dir.path(), PipelineConfig::default(), HashMap::new());
        let err = runner.run("styles").await.unwrap_err();
        assert!(err.to_string().contains("'styles' is not defined"));
    }
}
