use crate::error::{GraduateError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const GRADUATE_DIR: &str = ".graduate";
pub const HOOKS_DIR: &str = ".graduate/hooks";

pub const CONFIG_FILE: &str = ".graduate/config.yaml";
pub const ENVIRONMENTS_FILE: &str = ".graduate/environments";

/// Remote-side status record, relative to the peer's home directory.
pub const REMOTE_STATUS_FILE: &str = ".graduate/status";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn environments_path(root: &Path) -> PathBuf {
    root.join(ENVIRONMENTS_FILE)
}

pub fn hook_path(root: &Path, phase_file: &str) -> PathBuf {
    root.join(HOOKS_DIR).join(phase_file)
}

pub fn default_status_file() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(GraduateError::HomeNotFound)?;
    Ok(home.join(REMOTE_STATUS_FILE))
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]*$").unwrap())
}

/// Environment names double as tag prefixes (`<env>/<timestamp>`), so they
/// are kept to a ref-safe alphabet.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !name_re().is_match(name) {
        return Err(GraduateError::InvalidName(name.to_string()));
    }
    Ok(())
}
