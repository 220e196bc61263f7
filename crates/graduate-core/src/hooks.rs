//! Pre/post hook lists: `.graduate/hooks/{pre,post}`, one shell command per
//! line. Entries are appended and removed by 1-based position.

use crate::error::{GraduateError, Result};
use crate::io;
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Statement terminators a stored command may already end with.
const TERMINATORS: [&str; 3] = [";", "&&", "||"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    Pre,
    Post,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Pre => "pre",
            HookPhase::Post => "post",
        }
    }

    pub fn path(&self, root: &Path) -> PathBuf {
        paths::hook_path(root, self.as_str())
    }
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HookPhase {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pre" => Ok(HookPhase::Pre),
            "post" => Ok(HookPhase::Post),
            other => Err(format!("unknown hook phase '{other}' (expected pre or post)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hook {
    /// 1-based position in the list.
    pub index: usize,
    pub command: String,
}

pub(crate) fn ends_with_terminator(command: &str) -> bool {
    let trimmed = command.trim_end();
    TERMINATORS.iter().any(|t| trimmed.ends_with(t))
}

pub fn list(root: &Path, phase: HookPhase) -> Result<Vec<Hook>> {
    Ok(commands(root, phase)?
        .into_iter()
        .enumerate()
        .map(|(i, command)| Hook {
            index: i + 1,
            command,
        })
        .collect())
}

/// Raw stored commands in order.
pub fn commands(root: &Path, phase: HookPhase) -> Result<Vec<String>> {
    io::read_lines(&phase.path(root))
}

/// Append a command and return its 1-based index. A `;` is added unless the
/// command already ends with a terminator.
pub fn add(root: &Path, phase: HookPhase, command: &str) -> Result<usize> {
    let command = command.trim();
    if command.is_empty() {
        return Err(GraduateError::EmptyHook);
    }
    if command.contains(['\n', '\r']) {
        return Err(GraduateError::MultilineHook);
    }
    let stored = if ends_with_terminator(command) {
        command.to_string()
    } else {
        format!("{command};")
    };
    io::append_line(&phase.path(root), &stored)?;
    Ok(commands(root, phase)?.len())
}

pub fn remove(root: &Path, phase: HookPhase, index: usize) -> Result<String> {
    let mut cmds = commands(root, phase)?;
    if index == 0 || index > cmds.len() {
        return Err(GraduateError::HookIndexOutOfRange {
            phase,
            index,
            len: cmds.len(),
        });
    }
    let removed = cmds.remove(index - 1);
    io::write_lines(&phase.path(root), &cmds)?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn phase_parses_case_insensitively() {
        assert_eq!("PRE".parse::<HookPhase>().unwrap(), HookPhase::Pre);
        assert_eq!("post".parse::<HookPhase>().unwrap(), HookPhase::Post);
        assert!("during".parse::<HookPhase>().is_err());
    }

    #[test]
    fn add_appends_terminator() {
        let dir = TempDir::new().unwrap();
        add(dir.path(), HookPhase::Pre, "make test").unwrap();
        add(dir.path(), HookPhase::Pre, "make lint &&").unwrap();
        add(dir.path(), HookPhase::Pre, "echo done;").unwrap();
        assert_eq!(
            commands(dir.path(), HookPhase::Pre).unwrap(),
            vec!["make test;", "make lint &&", "echo done;"]
        );
    }

    #[test]
    fn add_returns_stable_one_based_index() {
        let dir = TempDir::new().unwrap();
        assert_eq!(add(dir.path(), HookPhase::Post, "a").unwrap(), 1);
        assert_eq!(add(dir.path(), HookPhase::Post, "b").unwrap(), 2);
        let hooks = list(dir.path(), HookPhase::Post).unwrap();
        assert_eq!(hooks[1].index, 2);
        assert_eq!(hooks[1].command, "b;");
    }

    #[test]
    fn add_empty_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            add(dir.path(), HookPhase::Pre, "   "),
            Err(GraduateError::EmptyHook)
        ));
    }

    #[test]
    fn add_rejects_embedded_line_breaks() {
        let dir = TempDir::new().unwrap();
        add(dir.path(), HookPhase::Pre, "make test").unwrap();
        for command in ["echo a\necho b", "echo a\r\necho b"] {
            assert!(matches!(
                add(dir.path(), HookPhase::Pre, command),
                Err(GraduateError::MultilineHook)
            ));
        }
        assert_eq!(
            commands(dir.path(), HookPhase::Pre).unwrap(),
            vec!["make test;"]
        );
    }

    #[test]
    fn phases_are_independent() {
        let dir = TempDir::new().unwrap();
        add(dir.path(), HookPhase::Pre, "pre-only").unwrap();
        assert!(list(dir.path(), HookPhase::Post).unwrap().is_empty());
    }

    #[test]
    fn remove_renumbers_contiguously() {
        let dir = TempDir::new().unwrap();
        for c in ["one", "two", "three"] {
            add(dir.path(), HookPhase::Pre, c).unwrap();
        }
        let removed = remove(dir.path(), HookPhase::Pre, 2).unwrap();
        assert_eq!(removed, "two;");
        let hooks = list(dir.path(), HookPhase::Pre).unwrap();
        assert_eq!(
            hooks,
            vec![
                Hook {
                    index: 1,
                    command: "one;".into()
                },
                Hook {
                    index: 2,
                    command: "three;".into()
                },
            ]
        );
    }

    #[test]
    fn remove_out_of_range_fails() {
        let dir = TempDir::new().unwrap();
        add(dir.path(), HookPhase::Pre, "one").unwrap();
        assert!(matches!(
            remove(dir.path(), HookPhase::Pre, 0),
            Err(GraduateError::HookIndexOutOfRange { index: 0, .. })
        ));
        assert!(matches!(
            remove(dir.path(), HookPhase::Pre, 2),
            Err(GraduateError::HookIndexOutOfRange { len: 1, .. })
        ));
    }
}
