//! Environment registry: `.graduate/environments`, one `name=url` per line.
//!
//! The URL is the ssh address (`user@host`) used both for directives and
//! as the base of each unit's push remote.

use crate::error::{GraduateError, Result};
use crate::io;
use crate::paths;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub name: String,
    pub url: String,
}

impl Environment {
    fn parse(line: &str) -> Option<Self> {
        let (name, url) = line.split_once('=')?;
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() || url.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            url: url.to_string(),
        })
    }

    fn to_line(&self) -> String {
        format!("{}={}", self.name, self.url)
    }
}

pub fn list(root: &Path) -> Result<Vec<Environment>> {
    let lines = io::read_lines(&paths::environments_path(root))?;
    Ok(lines.iter().filter_map(|l| Environment::parse(l)).collect())
}

pub fn lookup(root: &Path, name: &str) -> Result<Environment> {
    list(root)?
        .into_iter()
        .find(|e| e.name == name)
        .ok_or_else(|| GraduateError::UnknownEnvironment(name.to_string()))
}

pub fn register(root: &Path, name: &str, url: &str) -> Result<Environment> {
    paths::validate_name(name)?;
    let url = url.trim();
    if url.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(GraduateError::InvalidUrl(url.to_string()));
    }
    if list(root)?.iter().any(|e| e.name == name) {
        return Err(GraduateError::EnvironmentExists(name.to_string()));
    }
    let env = Environment {
        name: name.to_string(),
        url: url.to_string(),
    };
    io::append_line(&paths::environments_path(root), &env.to_line())?;
    Ok(env)
}

pub fn remove(root: &Path, name: &str) -> Result<()> {
    let mut envs = list(root)?;
    let before = envs.len();
    envs.retain(|e| e.name != name);
    if envs.len() == before {
        return Err(GraduateError::UnknownEnvironment(name.to_string()));
    }
    let lines: Vec<String> = envs.iter().map(Environment::to_line).collect();
    io::write_lines(&paths::environments_path(root), &lines)
}
