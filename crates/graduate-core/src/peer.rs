//! Remote side of the barrier.
//!
//! Directives arrive as `graduate remote <verb>` over ssh and overwrite a
//! single status file. A unit's receive hook runs `graduate remote wait
//! <unit>`, which prints the sentinel and then waits for that unit's
//! decision.
//!
//! Per-unit decisions are also kept as marker files in `<status>.d/`,
//! cleared by `clean`. Waiters watch their own marker, so back-to-back
//! `continue` directives for different units cannot overwrite each other
//! before a waiter has seen its own.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::directive::{Directive, StatusToken};
use crate::error::{GraduateError, Result};
use crate::io;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const CONTINUE_MARK: &str = "continue";
const ABORT_MARK: &str = "abort";

/// How a barrier wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Continue,
    Abort,
    TimedOut,
}

impl Release {
    pub fn is_continue(&self) -> bool {
        matches!(self, Release::Continue)
    }
}

fn decisions_dir(status_file: &Path) -> PathBuf {
    let mut name = status_file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".d");
    status_file.with_file_name(name)
}

fn decision_path(status_file: &Path, unit: &str) -> Result<PathBuf> {
    if unit.is_empty() || unit.starts_with('.') || unit.contains(['/', '\\']) {
        return Err(GraduateError::InvalidUnitName(unit.to_string()));
    }
    Ok(decisions_dir(status_file).join(unit))
}

/// Apply a directive: overwrite the status record with its token and, for
/// per-unit directives, record the unit's decision.
pub fn apply(status_file: &Path, directive: &Directive) -> Result<StatusToken> {
    match directive {
        Directive::Clean => {
            let dir = decisions_dir(status_file);
            if dir.exists() {
                std::fs::remove_dir_all(&dir)?;
            }
        }
        Directive::Continue(unit) => {
            io::atomic_write(&decision_path(status_file, unit)?, CONTINUE_MARK.as_bytes())?
        }
        Directive::Abort(unit) => {
            io::atomic_write(&decision_path(status_file, unit)?, ABORT_MARK.as_bytes())?
        }
        Directive::Start | Directive::Finish => {}
    }

    let token = directive.status_token();
    io::atomic_write(status_file, format!("{token}\n").as_bytes())?;
    tracing::debug!(%token, "status updated");
    Ok(token)
}

/// Current status token, or `None` if no directive has been applied yet.
pub fn read_status(status_file: &Path) -> Result<Option<StatusToken>> {
    if !status_file.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(status_file)?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    content.parse().map(Some)
}

fn read_decision(status_file: &Path, unit: &str) -> Result<Option<Release>> {
    let path = decision_path(status_file, unit)?;
    if !path.exists() {
        return Ok(None);
    }
    Ok(match std::fs::read_to_string(&path)?.trim() {
        CONTINUE_MARK => Some(Release::Continue),
        ABORT_MARK => Some(Release::Abort),
        _ => None,
    })
}

/// Announce the barrier with `sentinel` on stdout, then wait for this
/// unit's decision. An invalid unit name fails before anything is printed.
pub async fn wait_for_release(
    status_file: &Path,
    unit: &str,
    sentinel: &str,
    poll: Duration,
    timeout: Duration,
) -> Result<Release> {
    decision_path(status_file, unit)?;

    {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{sentinel}")?;
        stdout.flush()?;
    }

    let deadline = Instant::now() + timeout;
    loop {
        match read_decision(status_file, unit) {
            Ok(Some(release)) => return Ok(release),
            Ok(None) => {}
            Err(e) => tracing::warn!(%unit, "unreadable decision record: {e}"),
        }
        if Instant::now() >= deadline {
            return Ok(Release::TimedOut);
        }
        tokio::time::sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn wait(status: &Path, unit: &str, timeout: Duration) -> Release {
        wait_for_release(
            status,
            unit,
            "SENTINEL",
            Duration::from_millis(10),
            timeout,
        )
        .await
        .unwrap()
    }

    #[test]
    fn apply_overwrites_previous_token() {
        let dir = TempDir::new().unwrap();
        let status = dir.path().join(".graduate/status");
        apply(&status, &Directive::Clean).unwrap();
        apply(&status, &Directive::Start).unwrap();
        assert_eq!(read_status(&status).unwrap(), Some(StatusToken::Deploying));
        apply(&status, &Directive::Continue("web".into())).unwrap();
        assert_eq!(std::fs::read_to_string(&status).unwrap(), "web:continue\n");
    }

    #[test]
    fn missing_status_reads_as_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_status(&dir.path().join("status")).unwrap(), None);
    }

    #[test]
    fn decisions_live_next_to_status_file() {
        assert_eq!(
            decisions_dir(Path::new("/home/deploy/.graduate/status")),
            PathBuf::from("/home/deploy/.graduate/status.d")
        );
    }

    #[test]
    fn clean_forgets_previous_decisions() {
        let dir = TempDir::new().unwrap();
        let status = dir.path().join("status");
        apply(&status, &Directive::Continue("web".into())).unwrap();
        assert_eq!(
            read_decision(&status, "web").unwrap(),
            Some(Release::Continue)
        );
        apply(&status, &Directive::Clean).unwrap();
        assert_eq!(read_decision(&status, "web").unwrap(), None);
        assert_eq!(read_status(&status).unwrap(), Some(StatusToken::Cleaning));
    }

    #[test]
    fn unit_names_cannot_escape_decision_dir() {
        let dir = TempDir::new().unwrap();
        let status = dir.path().join("status");
        for unit in ["../status", ".hidden", ""] {
            assert!(matches!(
                apply(&status, &Directive::Continue(unit.into())),
                Err(GraduateError::InvalidUnitName(_))
            ));
        }
        assert!(!status.exists());
    }

    #[tokio::test]
    async fn wait_rejects_invalid_unit_name() {
        let dir = TempDir::new().unwrap();
        let result = wait_for_release(
            &dir.path().join("status"),
            "../web",
            "SENTINEL",
            Duration::from_millis(10),
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(GraduateError::InvalidUnitName(_))));
    }

    #[tokio::test]
    async fn wait_releases_on_own_continue() {
        let dir = TempDir::new().unwrap();
        let status = dir.path().join("status");
        apply(&status, &Directive::Start).unwrap();

        let writer_status = status.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            apply(&writer_status, &Directive::Continue("web".into())).unwrap();
        });

        let release = wait(&status, "web", Duration::from_secs(5)).await;
        writer.await.unwrap();
        assert_eq!(release, Release::Continue);
    }

    #[tokio::test]
    async fn later_directive_does_not_hide_earlier_one() {
        let dir = TempDir::new().unwrap();
        let status = dir.path().join("status");
        apply(&status, &Directive::Continue("worker".into())).unwrap();
        apply(&status, &Directive::Continue("web".into())).unwrap();
        assert_eq!(
            wait(&status, "worker", Duration::from_secs(5)).await,
            Release::Continue
        );
        assert_eq!(
            wait(&status, "web", Duration::from_secs(5)).await,
            Release::Continue
        );
    }

    #[tokio::test]
    async fn wait_releases_on_own_abort() {
        let dir = TempDir::new().unwrap();
        let status = dir.path().join("status");
        apply(&status, &Directive::Abort("web".into())).unwrap();
        let release = wait(&status, "web", Duration::from_secs(5)).await;
        assert_eq!(release, Release::Abort);
        assert!(!release.is_continue());
    }

    #[tokio::test]
    async fn wait_times_out_without_own_decision() {
        let dir = TempDir::new().unwrap();
        let status = dir.path().join("status");
        apply(&status, &Directive::Continue("other".into())).unwrap();
        assert_eq!(
            wait(&status, "web", Duration::from_millis(50)).await,
            Release::TimedOut
        );
    }
}
