//! Build upload to the object store

use crate::error::{TaskError, TaskResult};
use crate::runner::{gate, run_command, Context};
use crate::tasks::TaskOutput;
use crate::utils::{list_files, to_slash};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// One object to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub file: PathBuf,
    pub acl: String,
}

/// Destination for uploaded build files
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload one file; the error is the backend's message
    async fn put(&self, ctx: &Context, object: &PutObject) -> Result<(), String>;
}

/// Uploads by running the configured upload command once per file
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandStore;

#[async_trait]
impl ObjectStore for CommandStore {
    async fn put(&self, ctx: &Context, object: &PutObject) -> Result<(), String> {
        let vars = ctx.command_vars(&[
            ("file", object.file.display().to_string()),
            ("bucket", object.bucket.clone()),
            ("key", object.key.clone()),
            ("acl", object.acl.clone()),
        ]);
        run_command(&ctx.config.tools.upload, &vars, ctx).await
    }
}

/// Object key for a build file: `<prefix>/<relative>`, or just the relative
/// path when the prefix is empty
pub fn object_key(prefix: &str, relative: &Path) -> String {
    let prefix = prefix.trim_matches('/');
    let relative = to_slash(relative);
    if prefix.is_empty() {
        relative
    } else {
        format!("{}/{}", prefix, relative)
    }
}

/// Upload every build file except the markup, one at a time
pub async fn upload_build(task: &str, ctx: &Context) -> TaskResult<TaskOutput> {
    gate::check(task, crate::tasks::LeafTask::S3.preconditions(), &ctx.env)?;

    let bucket = ctx.env_value(gate::BUCKET).unwrap_or_default().to_string();
    let prefix = ctx.env_value(gate::BUCKET_PATH).unwrap_or_default();

    let build_dir = ctx.build_dir();
    // The markup is served by the host page, not the CDN
    let markup = Path::new(&ctx.config.paths.html)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_default();

    let files = list_files(&build_dir).map_err(|e| TaskError::transform(task, "s3", e))?;

    let mut uploaded = Vec::new();
    for relative in files {
        if relative == markup {
            continue;
        }

        let object = PutObject {
            bucket: bucket.clone(),
            key: object_key(prefix, &relative),
            file: build_dir.join(&relative),
            acl: ctx.config.deploy.acl.clone(),
        };

        tracing::info!(task, key = %object.key, "uploading");
        ctx.store
            .put(ctx, &object)
            .await
            .map_err(|message| TaskError::transform(task, "s3", message))?;
        uploaded.push(object.file);
    }

    Ok(TaskOutput::new(uploaded))
}
