//! Pass-through copies into the build directory

use crate::error::{TaskError, TaskResult};
use crate::runner::Context;
use crate::tasks::TaskOutput;
use crate::utils::{expand_glob, SourceFile};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Resolve a glob against the project root, tagging failures as the `src` stage
pub(crate) fn sources(task: &str, pattern: &str, ctx: &Context) -> TaskResult<Vec<SourceFile>> {
    expand_glob(&ctx.root, pattern).map_err(|e| TaskError::transform(task, "src", e))
}

/// Write `contents` to `dest`, creating parent directories
pub(crate) async fn write_dest(task: &str, dest: &Path, contents: &[u8]) -> TaskResult<()> {
    ensure_parent(task, dest).await?;
    fs::write(dest, contents)
        .await
        .map_err(|e| TaskError::transform(task, "dest", e))
}

pub(crate) async fn ensure_parent(task: &str, dest: &Path) -> TaskResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| TaskError::transform(task, "dest", e))?;
    }
    Ok(())
}

/// Copy every file matching `pattern` to `<build>/<dest_subdir>`, keeping
/// paths relative to the glob's base directory
pub async fn copy_files(
    task: &str,
    pattern: &str,
    dest_subdir: &str,
    ctx: &Context,
) -> TaskResult<TaskOutput> {
    let dest_root = ctx.build_dir().join(dest_subdir);
    let mut written: Vec<PathBuf> = Vec::new();

    for source in sources(task, pattern, ctx)? {
        let dest = dest_root.join(&source.relative);
        ensure_parent(task, &dest).await?;
        fs::copy(&source.path, &dest)
            .await
            .map_err(|e| TaskError::transform(task, "dest", e))?;
        written.push(dest);
    }

    tracing::debug!(task, files = written.len(), "copied");
    Ok(TaskOutput::new(written))
}
