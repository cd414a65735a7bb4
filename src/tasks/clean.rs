//! Empty the build output root

use crate::error::{TaskError, TaskResult};
use crate::runner::Context;
use crate::tasks::TaskOutput;
use std::io::ErrorKind;
use tokio::fs;

const TASK: &str = "clean";

/// Remove everything inside the build directory, keeping the directory itself
pub async fn clean(ctx: &Context) -> TaskResult<TaskOutput> {
    let build = ctx.build_dir();
    let fail = |e: std::io::Error| TaskError::transform(TASK, "del", e);

    let mut entries = match fs::read_dir(&build).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TaskOutput::default()),
        Err(e) => return Err(fail(e)),
    };

    while let Some(entry) = entries.next_entry().await.map_err(fail)? {
        let path = entry.path();
        if entry.file_type().await.map_err(fail)?.is_dir() {
            fs::remove_dir_all(&path).await.map_err(fail)?;
        } else {
            fs::remove_file(&path).await.map_err(fail)?;
        }
        tracing::debug!(path = %path.display(), "removed");
    }

    Ok(TaskOutput::default())
}
