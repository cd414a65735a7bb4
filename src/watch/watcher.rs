use crate::config::WatchRule;
use crate::runner::Runner;
use crate::utils::to_slash;
use crate::watch::patterns::WatchRules;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running file watcher. Dropping the notify handle ends the event loop.
pub struct WatchService {
    watcher: RecommendedWatcher,
    event_loop: JoinHandle<()>,
}

impl std::fmt::Debug for WatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchService").finish_non_exhaustive()
    }
}

impl WatchService {
    /// Watch `root` recursively and re-run the leaf of every rule a change
    /// batch hits. Must be called inside a tokio runtime.
    pub fn start(
        root: PathBuf,
        rules: &[WatchRule],
        runner: Runner,
        debounce: Duration,
    ) -> anyhow::Result<Self> {
        let rules = WatchRules::compile(rules)?;
        let root = root.canonicalize().unwrap_or(root);
        let ignored = root.join(&runner.context().config.paths.build);

        // Channel from the blocking notify callback into the async world
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(err) => warn!(error = %err, "file watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        info!(root = %root.display(), rules = rules.len(), "watching for changes");

        let event_loop = tokio::spawn(run_event_loop(root, ignored, rules, runner, debounce, event_rx));
        Ok(WatchService {
            watcher,
            event_loop,
        })
    }

    /// Stop watching. A task still running is cancelled.
    pub async fn stop(self) {
        drop(self.watcher);
        self.event_loop.abort();
        let _ = self.event_loop.await;
        debug!("watcher stopped");
    }
}

async fn run_event_loop(
    root: PathBuf,
    ignored: PathBuf,
    rules: WatchRules,
    runner: Runner,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<Event>,
) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];

        // Coalesce the burst that usually follows a save
        let window = tokio::time::sleep(debounce);
        tokio::pin!(window);
        loop {
            tokio::select! {
                _ = &mut window => break,
                next = rx.recv() => match next {
                    Some(event) => batch.push(event),
                    None => break,
                },
            }
        }

        let changed = changed_paths(&root, &ignored, &batch);
        if changed.is_empty() {
            continue;
        }
        debug!(?changed, "change batch");

        let ctx = runner.context();
        for rule in rules.triggered(&changed) {
            // Failures are notified by the runner; keep watching
            if let Ok(output) = runner.run_leaf(rule.task).await {
                ctx.reload.task_finished(rule.reload, &ctx.build_dir(), &output.files);
            }
        }
    }
    debug!("watcher event loop finished");
}

/// Root-relative `/`-separated paths touched by `events`, skipping reads
/// and anything under `ignored`
pub fn changed_paths(root: &Path, ignored: &Path, events: &[Event]) -> Vec<String> {
    let paths: BTreeSet<String> = events
        .iter()
        .filter(|event| !matches!(event.kind, EventKind::Access(_)))
        .flat_map(|event| event.paths.iter())
        .filter(|path| !path.starts_with(ignored))
        .filter_map(|path| path.strip_prefix(root).ok())
        .map(to_slash)
        .filter(|rel| !rel.is_empty())
        .collect();
    paths.into_iter().collect()
}
