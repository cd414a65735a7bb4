//! Stylesheet compilation

use crate::config::Stage;
use crate::error::TaskResult;
use crate::runner::{run_stages, Context};
use crate::tasks::copy::{ensure_parent, sources};
use crate::tasks::TaskOutput;

/// Compile each stylesheet entry point into `<build>/css/<name>.css`
/// through the given tool stages. Partials (`_name.scss`) are skipped.
pub async fn compile(task: &str, stages: &[Stage], ctx: &Context) -> TaskResult<TaskOutput> {
    let css_dir = ctx.build_dir().join("css");
    let mut written = Vec::new();

    for source in sources(task, &ctx.config.paths.styles, ctx)? {
        let file_name = source
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if file_name.starts_with('_') {
            continue;
        }

        let output = css_dir.join(&source.relative).with_extension("css");
        ensure_parent(task, &output).await?;

        let output_dir = output.parent().unwrap_or(&css_dir).display().to_string();
        let vars = ctx.command_vars(&[
            ("input", source.path.display().to_string()),
            ("output", output.display().to_string()),
            ("output_dir", output_dir),
        ]);
        run_stages(task, stages, &vars, ctx).await?;
        written.push(output);
    }

    Ok(TaskOutput::new(written))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn context(root: &std::path::Path) -> Context {
        let mut env = HashMap::new();
        env.insert("PATH".to_string(), std::env::var("PATH").unwrap_or_default());
        Context::new(root.to_path_buf(), PipelineConfig::default()).with_env(env)
    }

    #[tokio::test]
    async fn test_compile_runs_stages_in_order() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("scss")).unwrap();
        fs::write(temp_dir.path().join("scss/styles.scss"), "body{}").unwrap();

        let ctx = context(temp_dir.path());
        let stages = vec![
            Stage::new("sass", "cp ${input} ${output}"),
            Stage::new("autoprefixer", "echo '/* prefixed */' >> ${output}"),
        ];

        let output = compile("sass:dev", &stages, &ctx).await.unwrap();
        let css = temp_dir.path().join("build/css/styles.css");
        assert_eq!(output.files, vec![css.clone()]);
        assert_eq!(fs::read_to_string(css).unwrap(), "body{}/* prefixed */\n");
    }

    #[tokio::test]
    async fn test_compile_failure_names_stage() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("scss")).unwrap();
        fs::write(temp_dir.path().join("scss/styles.scss"), "body{").unwrap();

        let ctx = context(temp_dir.path());
        let stages = vec![Stage::new("sass", "echo 'expected \"}\"' >&2; exit 65")];

        let err = compile("sass:prod", &stages, &ctx).await.unwrap_err();
        assert_eq!(err.task(), "sass:prod");
        assert_eq!(err.stage(), Some("sass"));
        assert_eq!(err.to_string(), "expected \"}\"");
    }
}
