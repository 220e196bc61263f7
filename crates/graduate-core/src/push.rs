//! Push channel: transfers one unit and watches its output for the sentinel.
//!
//! A real push is spawned with stdout and stderr piped. Both streams feed a
//! single reader task which logs every line and fires a one-shot signal on
//! the first sentinel line, or on process exit if the sentinel never showed
//! up. The caller resumes as soon as the signal fires; the reader task keeps
//! draining the transfer in the background until the process exits, which
//! only happens once the remote barrier is released.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::environment::Environment;
use crate::units::Unit;

/// Printed by `git push --dry-run` when the remote already has the ref.
const UP_TO_DATE: &str = "Everything up-to-date";

#[derive(Debug)]
pub enum PushOutcome {
    /// The remote already matches; no build was triggered.
    UpToDate,
    /// The remote reached its barrier. The transfer is still running.
    AtBarrier(Transfer),
    Failed(String),
}

#[allow(async_fn_in_trait)]
pub trait PushChannel {
    async fn push(&self, unit: &Unit, env: &Environment) -> PushOutcome;
}

// ─── Transfer ─────────────────────────────────────────────────────────────

/// How a background transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEnd {
    Exited(i32),
    /// Killed by a signal, or the exit status could not be read.
    Terminated,
    TimedOut,
}

/// An in-flight transfer whose remote side is parked at its barrier.
#[derive(Debug)]
pub struct Transfer {
    unit: String,
    handle: JoinHandle<Option<i32>>,
}

impl Transfer {
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// A transfer that has already exited with `code`.
    #[cfg(test)]
    pub(crate) fn finished(unit: &str, code: i32) -> Self {
        Self {
            unit: unit.to_string(),
            handle: tokio::spawn(async move { Some(code) }),
        }
    }

    /// Wait for the transfer process to exit, at most `limit`.
    pub async fn wait(self, limit: Duration) -> TransferEnd {
        match tokio::time::timeout(limit, self.handle).await {
            Err(_) => TransferEnd::TimedOut,
            Ok(Ok(Some(code))) => TransferEnd::Exited(code),
            Ok(Ok(None)) | Ok(Err(_)) => TransferEnd::Terminated,
        }
    }
}

enum Signal {
    Sentinel,
    Exited(Option<i32>),
}

/// Spawn `cmd` and block until its output contains `sentinel` or it exits.
pub async fn stream_until_sentinel(mut cmd: Command, unit: &str, sentinel: &str) -> PushOutcome {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => return PushOutcome::Failed(format!("failed to spawn transfer: {e}")),
    };

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, line_tx.clone());
    }
    drop(line_tx);

    let (signal_tx, signal_rx) = oneshot::channel();
    let unit_name = unit.to_string();
    let sentinel = sentinel.to_string();

    let handle = tokio::spawn(async move {
        let mut signal_tx = Some(signal_tx);
        while let Some(line) = line_rx.recv().await {
            tracing::info!(unit = %unit_name, "{line}");
            if line.contains(&sentinel) {
                if let Some(tx) = signal_tx.take() {
                    let _ = tx.send(Signal::Sentinel);
                }
            }
        }

        let code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                tracing::warn!(unit = %unit_name, "failed to wait for transfer: {e}");
                None
            }
        };
        if let Some(tx) = signal_tx.take() {
            let _ = tx.send(Signal::Exited(code));
        }
        code
    });

    match signal_rx.await {
        Ok(Signal::Sentinel) => PushOutcome::AtBarrier(Transfer {
            unit: unit.to_string(),
            handle,
        }),
        Ok(Signal::Exited(Some(0))) => {
            PushOutcome::Failed("transfer finished without reaching the release barrier".into())
        }
        Ok(Signal::Exited(Some(code))) => {
            PushOutcome::Failed(format!("transfer exited with code {code}"))
        }
        Ok(Signal::Exited(None)) => PushOutcome::Failed("transfer terminated by signal".into()),
        Err(_) => PushOutcome::Failed("transfer reader stopped unexpectedly".into()),
    }
}

fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

// ─── Git push channel ─────────────────────────────────────────────────────

/// Pushes each unit's own history with `git push <remote> <rev>:<ref>`,
/// after a `--dry-run` push to detect units that are already current.
///
/// A unit that is the top of its own repository pushes `HEAD`. A unit that
/// is a subdirectory of a larger repository pushes the synthetic history
/// from `git subtree split`, which only changes when that subdirectory
/// does.
pub struct GitPushChannel {
    config: Config,
}

impl GitPushChannel {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> std::result::Result<String, String> {
        let output = Command::new(&self.config.git)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| format!("failed to run git {}: {e}", args.join(" ")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Revision holding exactly this unit's files.
    async fn source_rev(&self, unit: &Unit) -> std::result::Result<String, String> {
        let prefix = self.git(&unit.path, &["rev-parse", "--show-prefix"]).await?;
        let prefix = prefix.trim().trim_end_matches('/');
        if prefix.is_empty() {
            return Ok("HEAD".to_string());
        }

        let toplevel = self.git(&unit.path, &["rev-parse", "--show-toplevel"]).await?;
        let toplevel = PathBuf::from(toplevel.trim());
        let prefix_arg = format!("--prefix={prefix}");
        let split = self
            .git(&toplevel, &["subtree", "split", "-q", &prefix_arg, "HEAD"])
            .await?;
        split
            .lines()
            .map(str::trim)
            .rfind(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| format!("git subtree split produced no revision for {prefix}"))
    }

    fn command(&self, unit: &Unit, remote: &str, refspec: &str, dry_run: bool) -> Command {
        let mut cmd = Command::new(&self.config.git);
        cmd.arg("push");
        if dry_run {
            cmd.arg("--dry-run");
        }
        cmd.args([remote, refspec]).current_dir(&unit.path);
        cmd
    }

    /// `Ok(true)` when the dry run reports nothing to send.
    async fn dry_run(
        &self,
        unit: &Unit,
        remote: &str,
        refspec: &str,
    ) -> std::result::Result<bool, String> {
        let output = self
            .command(unit, remote, refspec, true)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| format!("failed to run dry-run push: {e}"))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(format!("dry-run push failed: {}", stderr.trim()));
        }
        Ok(stdout.contains(UP_TO_DATE) || stderr.contains(UP_TO_DATE))
    }
}

impl PushChannel for GitPushChannel {
    async fn push(&self, unit: &Unit, env: &Environment) -> PushOutcome {
        let remote = self.config.push_url_for(&env.url, &unit.name);
        let rev = match self.source_rev(unit).await {
            Ok(rev) => rev,
            Err(reason) => return PushOutcome::Failed(reason),
        };
        let refspec = format!("{rev}:{}", self.config.push_ref);

        match self.dry_run(unit, &remote, &refspec).await {
            Ok(true) => return PushOutcome::UpToDate,
            Ok(false) => {}
            Err(reason) => return PushOutcome::Failed(reason),
        }
        tracing::debug!(unit = %unit.name, %remote, %refspec, "pushing");
        let cmd = self.command(unit, &remote, &refspec, false);
        stream_until_sentinel(cmd, &unit.name, &self.config.sentinel).await
    }
}
