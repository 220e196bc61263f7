use crate::error::Result;
use crate::paths;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SENTINEL: &str = "graduate: waiting for release";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Project settings from `.graduate/config.yaml`. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory whose immediate subdirectories are the applications.
    #[serde(default = "default_apps_dir")]
    pub apps_dir: String,

    /// Line the remote peer prints once it is parked at its barrier.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,

    /// Command prefix run over ssh to deliver directives.
    #[serde(default = "default_remote_command")]
    pub remote_command: String,

    /// Git remote template; `{url}` and `{unit}` are substituted.
    #[serde(default = "default_push_url")]
    pub push_url: String,

    /// Ref updated on each unit's remote.
    #[serde(default = "default_push_ref")]
    pub push_ref: String,

    #[serde(default = "default_ssh")]
    pub ssh: String,

    #[serde(default = "default_git")]
    pub git: String,

    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,
}

fn default_apps_dir() -> String {
    "apps".to_string()
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.to_string()
}

fn default_remote_command() -> String {
    "graduate remote".to_string()
}

fn default_push_url() -> String {
    "{url}:{unit}".to_string()
}

fn default_push_ref() -> String {
    "refs/heads/master".to_string()
}

fn default_ssh() -> String {
    "ssh".to_string()
}

fn default_git() -> String {
    "git".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_drain_timeout() -> u64 {
    600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apps_dir: default_apps_dir(),
            sentinel: default_sentinel(),
            remote_command: default_remote_command(),
            push_url: default_push_url(),
            push_ref: default_push_ref(),
            ssh: default_ssh(),
            git: default_git(),
            shell: default_shell(),
            drain_timeout_secs: default_drain_timeout(),
        }
    }
}

impl Config {
    /// Load the project config. A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Git remote for one unit in one environment.
    pub fn push_url_for(&self, env_url: &str, unit: &str) -> String {
        self.push_url
            .replace("{url}", env_url)
            .replace("{unit}", unit)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}
