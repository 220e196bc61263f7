//! Directive vocabulary shared by the coordinator and the remote peer.
//!
//! Every directive overwrites the single remote status record with one
//! [`StatusToken`]; there is no history.

use crate::error::GraduateError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "directive", content = "unit", rename_all = "snake_case")]
pub enum Directive {
    Clean,
    Start,
    Finish,
    Continue(String),
    Abort(String),
}

impl Directive {
    /// Verb understood by `graduate remote`.
    pub fn verb(&self) -> &'static str {
        match self {
            Directive::Clean => "clean",
            Directive::Start => "start",
            Directive::Finish => "finish",
            Directive::Continue(_) => "continue-unit",
            Directive::Abort(_) => "abort-unit",
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            Directive::Continue(u) | Directive::Abort(u) => Some(u),
            _ => None,
        }
    }

    /// Lifecycle directives are best-effort; per-unit ones drive a barrier.
    pub fn is_lifecycle(&self) -> bool {
        self.unit().is_none()
    }

    pub fn status_token(&self) -> StatusToken {
        match self {
            Directive::Clean => StatusToken::Cleaning,
            Directive::Start => StatusToken::Deploying,
            Directive::Finish => StatusToken::Finished,
            Directive::Continue(u) => StatusToken::Continue(u.clone()),
            Directive::Abort(u) => StatusToken::Abort(u.clone()),
        }
    }
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unit() {
            Some(unit) => write!(f, "{} {unit}", self.verb()),
            None => f.write_str(self.verb()),
        }
    }
}

/// Current-state token held in the remote status record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusToken {
    Cleaning,
    Deploying,
    Continue(String),
    Abort(String),
    Finished,
}

impl std::fmt::Display for StatusToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusToken::Cleaning => f.write_str("cleaning"),
            StatusToken::Deploying => f.write_str("deploying"),
            StatusToken::Continue(u) => write!(f, "{u}:continue"),
            StatusToken::Abort(u) => write!(f, "{u}:abort"),
            StatusToken::Finished => f.write_str("finished"),
        }
    }
}

impl std::str::FromStr for StatusToken {
    type Err = GraduateError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "cleaning" => return Ok(StatusToken::Cleaning),
            "deploying" => return Ok(StatusToken::Deploying),
            "finished" => return Ok(StatusToken::Finished),
            _ => {}
        }
        match s.rsplit_once(':') {
            Some((unit, "continue")) if !unit.is_empty() => {
                Ok(StatusToken::Continue(unit.to_string()))
            }
            Some((unit, "abort")) if !unit.is_empty() => Ok(StatusToken::Abort(unit.to_string())),
            _ => Err(GraduateError::InvalidStatus(s.to_string())),
        }
    }
}
