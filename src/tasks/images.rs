//! Image optimization

use crate::error::TaskResult;
use crate::runner::{run_stages, Context};
use crate::tasks::copy::{ensure_parent, sources};
use crate::tasks::TaskOutput;

/// Run the image optimizer on each source image, writing into `<build>/images/`
pub async fn optimize(task: &str, ctx: &Context) -> TaskResult<TaskOutput> {
    let images_dir = ctx.build_dir().join("images");
    let mut written = Vec::new();

    for source in sources(task, &ctx.config.paths.images, ctx)? {
        let output = images_dir.join(&source.relative);
        ensure_parent(task, &output).await?;

        let output_dir = output.parent().unwrap_or(&images_dir).display().to_string();
        let vars = ctx.command_vars(&[
            ("input", source.path.display().to_string()),
            ("output", output.display().to_string()),
            ("output_dir", output_dir),
        ]);
        run_stages(task, &ctx.config.tools.images, &vars, ctx).await?;
        written.push(output);
    }

    tracing::debug!(task, images = written.len(), "optimized");
    Ok(TaskOutput::new(written))
}
