//! Runs a phase's stored hook commands as one shell invocation.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::environment::Environment;
use crate::error::{GraduateError, Result};
use crate::hooks::{self, HookPhase};

#[allow(async_fn_in_trait)]
pub trait HookRunner {
    /// Run every hook of `phase`. `Ok(false)` means the hooks ran and failed;
    /// `Err(HookFailure)` means they could not be started.
    async fn run_phase(&self, phase: HookPhase, env: &Environment) -> Result<bool>;
}

/// Executes hooks with `sh -c` from the repository root. Hook stdout is
/// sent to stderr.
pub struct ShellHookRunner {
    root: PathBuf,
    shell: String,
}

impl ShellHookRunner {
    pub fn new(root: impl Into<PathBuf>, shell: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            shell: shell.into(),
        }
    }
}

impl HookRunner for ShellHookRunner {
    async fn run_phase(&self, phase: HookPhase, env: &Environment) -> Result<bool> {
        let commands = hooks::commands(&self.root, phase)?;
        let Some(script) = build_script(&commands) else {
            tracing::debug!(%phase, "no hooks registered");
            return Ok(true);
        };

        tracing::info!(%phase, count = commands.len(), "running hooks");
        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(&script)
            .current_dir(&self.root)
            .env("GRADUATE_ENV", &env.name)
            .env("GRADUATE_PHASE", phase.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::from(std::io::stderr()))
            .status()
            .await
            .map_err(|e| {
                tracing::error!(%phase, shell = %self.shell, "failed to run hooks: {e}");
                GraduateError::HookFailure(phase)
            })?;

        if !status.success() {
            tracing::warn!(%phase, code = ?status.code(), "hooks exited non-zero");
        }
        Ok(status.success())
    }
}

/// Concatenate stored commands into one script. Each command already ends
/// in a terminator; a dangling `&&`/`||` on the last one is dropped.
pub(crate) fn build_script(commands: &[String]) -> Option<String> {
    if commands.is_empty() {
        return None;
    }
    let mut script = commands.join("\n");
    let trimmed = script.trim_end();
    if let Some(stripped) = trimmed
        .strip_suffix("&&")
        .or_else(|| trimmed.strip_suffix("||"))
    {
        script = stripped.trim_end().to_string();
    }
    Some(script)
}
