use crate::hooks::HookPhase;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraduateError {
    #[error("unknown environment: {0} (run 'graduate env list')")]
    UnknownEnvironment(String),

    #[error("environment already registered: {0}")]
    EnvironmentExists(String),

    #[error("invalid environment name '{0}': must be lowercase alphanumeric, '-' or '_'")]
    InvalidName(String),

    #[error("invalid unit name '{0}'")]
    InvalidUnitName(String),

    #[error("invalid environment url '{0}': must be non-empty without whitespace")]
    InvalidUrl(String),

    #[error("{0} hooks failed")]
    HookFailure(HookPhase),

    #[error("hook command cannot be empty")]
    EmptyHook,

    #[error("hook command must be a single line; add each line as its own hook")]
    MultilineHook,

    #[error("no {phase} hook at index {index} ({len} registered)")]
    HookIndexOutOfRange {
        phase: HookPhase,
        index: usize,
        len: usize,
    },

    #[error("directive '{directive}' failed: {reason}")]
    DirectiveFailure { directive: String, reason: String },

    #[error("no applications to graduate in '{0}'")]
    NoUnits(String),

    #[error("working tree has uncommitted changes; commit or stash them first")]
    DirtyWorkingTree,

    #[error("git error: {0}")]
    Git(String),

    #[error("{0} not found on PATH")]
    ProgramNotFound(String),

    #[error("invalid remote status token: {0}")]
    InvalidStatus(String),

    #[error("no public key found (tried ~/.ssh/id_ed25519.pub and ~/.ssh/id_rsa.pub)")]
    PublicKeyNotFound,

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, GraduateError>;
