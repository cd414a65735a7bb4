//! Command execution
//!
//! Tool invocations run through the configured interpreter with the
//! context's environment snapshot. Output is captured so a failure can be
//! reported with the tool's own message.

use crate::config::Stage;
use crate::error::{TaskError, TaskResult};
use crate::runner::{interpolate_strict, Context};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;

/// Environment variable autoprefixer-style tools read their targets from
const BROWSERSLIST_VAR: &str = "BROWSERSLIST";

/// Quote a value for the command interpreter. Plain paths pass through
/// unchanged; anything else is single-quoted (double-quoted under `cmd`).
pub fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars().all(|c| {
            c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ',' | ':' | '@' | '+' | '=')
        });
    if plain {
        s.to_string()
    } else if cfg!(windows) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}

/// Run one command template. On failure the error is the tool's stderr
/// (or a description of the exit status when stderr is empty).
pub async fn run_command(
    template: &str,
    vars: &HashMap<String, String>,
    ctx: &Context,
) -> Result<(), String> {
    let exec_str = interpolate_strict(template, vars).map_err(|e| e.to_string())?;

    tracing::debug!(command = %exec_str, "running command");

    let (program, interpreter_args) = ctx
        .interpreter
        .split_first()
        .ok_or_else(|| "no interpreter configured".to_string())?;

    let mut command = Command::new(program);
    command
        .args(interpreter_args)
        .arg(&exec_str)
        .current_dir(&ctx.root)
        .env_clear()
        .envs(&ctx.env)
        .env(BROWSERSLIST_VAR, ctx.config.tools.browsers.join(", "))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = command
        .output()
        .await
        .map_err(|e| format!("failed to start '{}': {}", exec_str, e))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        tracing::debug!(command = %exec_str, "{}", stdout.trim_end());
    }

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        Err(match output.status.code() {
            Some(code) => format!("'{}' exited with code {}", exec_str, code),
            None => format!("'{}' was terminated by a signal", exec_str),
        })
    } else {
        Err(stderr)
    }
}

/// Run a tool stage on behalf of `task`, tagging failures with the stage name
pub async fn run_stage(
    task: &str,
    stage: &Stage,
    vars: &HashMap<String, String>,
    ctx: &Context,
) -> TaskResult<()> {
    run_command(&stage.run, vars, ctx)
        .await
        .map_err(|message| TaskError::transform(task, &stage.name, message))
}

/// Run stages in order; the first failure stops the pipe
pub async fn run_stages(
    task: &str,
    stages: &[Stage],
    vars: &HashMap<String, String>,
    ctx: &Context,
) -> TaskResult<()> {
    for stage in stages {
        run_stage(task, stage, vars, ctx).await?;
    }
    Ok(())
}
