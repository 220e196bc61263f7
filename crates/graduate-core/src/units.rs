use crate::error::{GraduateError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One application being promoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub name: String,
    pub path: PathBuf,
}

/// Enumerate the units under `<root>/<apps_dir>`: immediate, non-hidden
/// subdirectories sorted by name. The order fixes both push order and
/// unwind order.
pub fn discover(root: &Path, apps_dir: &str) -> Result<Vec<Unit>> {
    let dir = root.join(apps_dir);
    if !dir.is_dir() {
        return Err(GraduateError::NoUnits(apps_dir.to_string()));
    }

    let mut units = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        units.push(Unit {
            name,
            path: entry.path(),
        });
    }

    if units.is_empty() {
        return Err(GraduateError::NoUnits(apps_dir.to_string()));
    }
    units.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(units)
}
