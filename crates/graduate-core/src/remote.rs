//! Remote peer controller: one ssh session per directive.

use std::process::Stdio;

use tokio::process::Command;

use crate::directive::Directive;
use crate::environment::Environment;
use crate::error::{GraduateError, Result};

#[allow(async_fn_in_trait)]
pub trait RemoteController {
    /// Deliver exactly one directive and wait for the remote command to exit.
    /// No retries.
    async fn send(&self, env: &Environment, directive: &Directive) -> Result<()>;
}

/// Delivers directives as `ssh <url> <remote_command> <verb> [unit]`.
pub struct SshRemote {
    ssh: String,
    remote_command: String,
}

impl SshRemote {
    pub fn new(ssh: impl Into<String>, remote_command: impl Into<String>) -> Self {
        Self {
            ssh: ssh.into(),
            remote_command: remote_command.into(),
        }
    }

    /// The command string executed on the remote host.
    pub fn remote_line(&self, directive: &Directive) -> String {
        match directive.unit() {
            Some(unit) => format!(
                "{} {} {}",
                self.remote_command,
                directive.verb(),
                shell_quote(unit)
            ),
            None => format!("{} {}", self.remote_command, directive.verb()),
        }
    }
}

impl RemoteController for SshRemote {
    async fn send(&self, env: &Environment, directive: &Directive) -> Result<()> {
        let line = self.remote_line(directive);
        tracing::debug!(env = %env.name, %directive, "ssh {} {line}", env.url);

        let output = Command::new(&self.ssh)
            .args(["-o", "BatchMode=yes", &env.url, &line])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| GraduateError::DirectiveFailure {
                directive: directive.to_string(),
                reason: format!("failed to spawn '{}': {e}", self.ssh),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match output.status.code() {
            Some(code) if stderr.trim().is_empty() => format!("exited with code {code}"),
            Some(code) => format!("exited with code {code}: {}", stderr.trim()),
            None => "terminated by signal".to_string(),
        };
        Err(GraduateError::DirectiveFailure {
            directive: directive.to_string(),
            reason,
        })
    }
}

/// Single-quote `s` for a POSIX shell.
pub(crate) fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment {
            name: "production".into(),
            url: "deploy@prod".into(),
        }
    }

    #[test]
    fn remote_line_quotes_unit() {
        let remote = SshRemote::new("ssh", "graduate remote");
        assert_eq!(remote.remote_line(&Directive::Clean), "graduate remote clean");
        assert_eq!(
            remote.remote_line(&Directive::Continue("web".into())),
            "graduate remote continue-unit 'web'"
        );
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        // `true` ignores its arguments, standing in for ssh.
        let remote = SshRemote::new("true", "graduate remote");
        remote.send(&env(), &Directive::Start).await.unwrap();
    }

    #[tokio::test]
    async fn nonzero_exit_is_directive_failure() {
        let remote = SshRemote::new("false", "graduate remote");
        let err = remote
            .send(&env(), &Directive::Abort("web".into()))
            .await
            .unwrap_err();
        match err {
            GraduateError::DirectiveFailure { directive, reason } => {
                assert_eq!(directive, "abort-unit web");
                assert!(reason.contains("code 1"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_ssh_binary_is_directive_failure() {
        let remote = SshRemote::new("__no_such_ssh__", "graduate remote");
        assert!(matches!(
            remote.send(&env(), &Directive::Finish).await,
            Err(GraduateError::DirectiveFailure { .. })
        ));
    }
}
