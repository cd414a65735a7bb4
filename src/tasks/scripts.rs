//! Script bundling and minification

use crate::error::{TaskError, TaskResult};
use crate::runner::{run_stages, Context};
use crate::tasks::copy::{ensure_parent, sources, write_dest};
use crate::tasks::TaskOutput;
use tokio::fs;

/// Bundle name for the concatenated vendor scripts
const VENDOR_BUNDLE: &str = "vendor.js";

/// Concatenate vendor scripts, in name order, into `<build>/js/vendor.js`.
///
/// Vendor scripts are expected to be production-ready and are not minified.
pub async fn concat_vendor(task: &str, ctx: &Context) -> TaskResult<TaskOutput> {
    let files = sources(task, &ctx.config.paths.vendor_scripts, ctx)?;
    if files.is_empty() {
        return Ok(TaskOutput::default());
    }

    let mut parts = Vec::with_capacity(files.len());
    for file in &files {
        let contents = fs::read_to_string(&file.path)
            .await
            .map_err(|e| TaskError::transform(task, "concat", e))?;
        parts.push(contents);
    }

    let bundle = ctx.build_dir().join("js").join(VENDOR_BUNDLE);
    write_dest(task, &bundle, parts.join("\n").as_bytes()).await?;

    Ok(TaskOutput::new(vec![bundle]))
}

/// Minify the application script into `<build>/js/`
pub async fn minify(task: &str, ctx: &Context) -> TaskResult<TaskOutput> {
    let js_dir = ctx.build_dir().join("js");
    let mut written = Vec::new();

    for source in sources(task, &ctx.config.paths.script, ctx)? {
        let output = js_dir.join(&source.relative);
        ensure_parent(task, &output).await?;

        let output_dir = output.parent().unwrap_or(&js_dir).display().to_string();
        let vars = ctx.command_vars(&[
            ("input", source.path.display().to_string()),
            ("output", output.display().to_string()),
            ("output_dir", output_dir),
        ]);
        run_stages(task, &ctx.config.tools.js_prod, &vars, ctx).await?;
        written.push(output);
    }

    Ok(TaskOutput::new(written))
}
