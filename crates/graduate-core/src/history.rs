//! Graduation bookkeeping in the local git history.
//!
//! Each successful graduation leaves a lightweight tag
//! `<environment>/<YYYYMMDDHHMMSS>` at HEAD. The next run diffs against the
//! newest such tag to decide whether there is anything to graduate.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;

use crate::error::{GraduateError, Result};

const TAG_TIMESTAMP: &str = "%Y%m%d%H%M%S";

pub struct History {
    git: PathBuf,
    root: PathBuf,
}

impl History {
    pub fn new(root: &Path, git: &str) -> Result<Self> {
        let git =
            which::which(git).map_err(|_| GraduateError::ProgramNotFound(git.to_string()))?;
        Ok(Self {
            git,
            root: root.to_path_buf(),
        })
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.git)
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| GraduateError::Git(format!("failed to run git: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GraduateError::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Refuse to graduate with uncommitted changes to tracked files.
    pub fn ensure_clean(&self) -> Result<()> {
        let status = self.run(&["status", "--porcelain", "--untracked-files=no"])?;
        if !status.trim().is_empty() {
            return Err(GraduateError::DirtyWorkingTree);
        }
        Ok(())
    }

    /// Newest graduation tag for `env`, if any.
    pub fn latest_tag(&self, env: &str) -> Result<Option<String>> {
        let pattern = format!("{env}/*");
        let out = self.run(&["tag", "--list", &pattern])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .max()
            .map(str::to_string))
    }

    /// One-line log entries for commits in `tag..HEAD`.
    pub fn changes_since(&self, tag: &str) -> Result<Vec<String>> {
        let range = format!("{tag}..HEAD");
        let out = self.run(&["log", "--oneline", &range])?;
        Ok(out
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Tag HEAD as graduated to `env` and return the tag name.
    ///
    /// A second graduation within the same second gets a `.N` suffix so
    /// tags never collide and still sort after the first.
    pub fn record_graduation(&self, env: &str) -> Result<String> {
        let base = format!("{env}/{}", Utc::now().format(TAG_TIMESTAMP));
        let mut tag = base.clone();
        let mut n = 1;
        while self.tag_exists(&tag)? {
            tag = format!("{base}.{n}");
            n += 1;
        }
        self.run(&["tag", &tag, "HEAD"])?;
        Ok(tag)
    }

    fn tag_exists(&self, tag: &str) -> Result<bool> {
        let out = self.run(&["tag", "--list", tag])?;
        Ok(!out.trim().is_empty())
    }
}

/// What changed since the last graduation to an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Changeset {
    /// No previous graduation to this environment.
    FirstGraduation,
    Since { tag: String, commits: Vec<String> },
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        matches!(self, Changeset::Since { commits, .. } if commits.is_empty())
    }
}

pub fn changeset(history: &History, env: &str) -> Result<Changeset> {
    match history.latest_tag(env)? {
        None => Ok(Changeset::FirstGraduation),
        Some(tag) => {
            let commits = history.changes_since(&tag)?;
            Ok(Changeset::Since { tag, commits })
        }
    }
}
