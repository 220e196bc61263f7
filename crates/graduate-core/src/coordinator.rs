//! Graduation coordinator.
//!
//! Drives every unit to its remote barrier in order, then delivers one
//! global decision back down the stack:
//!
//! ```text
//! pre hooks ─► clean ─► start ─► push 0 … push N-1 ─► post hooks
//!                                   │ (failure at k)        │
//!                                   ▼                       ▼
//!                      abort k-1 … abort 0     continue N-1 … continue 0
//!                                   └──────────► finish ◄───┘
//! ```
//!
//! Pushing resumes with the next unit as soon as the current one reports
//! its sentinel; the transfer itself is still running and is only awaited
//! after the decision has been delivered.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::directive::Directive;
use crate::environment::Environment;
use crate::error::{GraduateError, Result};
use crate::hook_runner::HookRunner;
use crate::hooks::HookPhase;
use crate::push::{PushChannel, PushOutcome, Transfer, TransferEnd};
use crate::remote::RemoteController;
use crate::units::Unit;

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(600);

// ---------------------------------------------------------------------------
// GraduationRun
// ---------------------------------------------------------------------------

/// What happened to one unit during the forward phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum UnitOutcome {
    /// Never reached because an earlier unit failed.
    Skipped,
    UpToDate,
    /// Reached its remote barrier.
    Deployed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    PushFailed { unit: String, reason: String },
    PostHooksFailed,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::PushFailed { unit, reason } => write!(f, "push of '{unit}' failed: {reason}"),
            AbortReason::PostHooksFailed => f.write_str("post hooks failed"),
        }
    }
}

/// In-memory state of one graduation. Never persisted.
///
/// `cursor` stays within `[-1, len]`: `-1` before the first unit, `len`
/// once every unit has been traversed. Once `aborting` is set the cursor
/// never moves forward again.
#[derive(Debug)]
pub struct GraduationRun {
    environment: Environment,
    units: Vec<Unit>,
    cursor: isize,
    aborting: Option<AbortReason>,
    outcomes: Vec<UnitOutcome>,
}

impl GraduationRun {
    pub fn new(environment: Environment, units: Vec<Unit>) -> Result<Self> {
        if units.is_empty() {
            return Err(GraduateError::NoUnits(environment.name));
        }
        let outcomes = vec![UnitOutcome::Skipped; units.len()];
        Ok(Self {
            environment,
            units,
            cursor: -1,
            aborting: None,
            outcomes,
        })
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }

    pub fn is_aborting(&self) -> bool {
        self.aborting.is_some()
    }

    /// Move to the next unit. `None` once all units are traversed, or when
    /// the run is aborting.
    fn advance(&mut self) -> Option<usize> {
        if self.is_aborting() || self.cursor >= self.units.len() as isize {
            return None;
        }
        self.cursor += 1;
        if self.cursor == self.units.len() as isize {
            None
        } else {
            Some(self.cursor as usize)
        }
    }

    fn abort(&mut self, reason: AbortReason) {
        if self.aborting.is_none() {
            self.aborting = Some(reason);
        }
    }

    /// Highest index that reached the forward phase without failing; every
    /// unit at or below it is owed a decision.
    fn last_waiting(&self) -> isize {
        self.cursor - 1
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Committed,
    Aborted { reason: AbortReason },
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub outcome: UnitOutcome,
    /// The directive sent during unwind, if the unit was owed one.
    pub release: Option<String>,
    /// Whether that directive was delivered.
    pub release_delivered: Option<bool>,
    /// Exit code of the background transfer, once drained.
    pub transfer_exit: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraduationReport {
    pub environment: String,
    pub decision: Decision,
    pub units: Vec<UnitReport>,
}

impl GraduationReport {
    pub fn committed(&self) -> bool {
        self.decision == Decision::Committed
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

pub struct Coordinator<R, P, H> {
    remote: R,
    push: P,
    hooks: H,
    drain_timeout: Duration,
}

impl<R, P, H> Coordinator<R, P, H>
where
    R: RemoteController,
    P: PushChannel,
    H: HookRunner,
{
    pub fn new(remote: R, push: P, hooks: H) -> Self {
        Self {
            remote,
            push,
            hooks,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Run one graduation to completion.
    ///
    /// Returns `Err(HookFailure(Pre))` without contacting the remote if the
    /// pre hooks fail. Every later failure is folded into the report's
    /// [`Decision`].
    pub async fn run(&mut self, mut run: GraduationRun) -> Result<GraduationReport> {
        let env = run.environment.clone();

        if !self.hooks.run_phase(HookPhase::Pre, &env).await? {
            return Err(GraduateError::HookFailure(HookPhase::Pre));
        }

        self.lifecycle(&env, Directive::Clean).await;
        self.lifecycle(&env, Directive::Start).await;

        let transfers = self.deploy_all(&mut run, &env).await;

        if !run.is_aborting() {
            match self.hooks.run_phase(HookPhase::Post, &env).await {
                Ok(true) => {}
                Ok(false) => run.abort(AbortReason::PostHooksFailed),
                Err(e) => {
                    tracing::warn!("post hooks could not run: {e}");
                    run.abort(AbortReason::PostHooksFailed);
                }
            }
        }

        let releases = self.unwind(&run, &env).await;
        self.lifecycle(&env, Directive::Finish).await;
        let exits = self.drain(transfers).await;

        let decision = match run.aborting.clone() {
            None => Decision::Committed,
            Some(reason) => Decision::Aborted { reason },
        };
        let units = run
            .units
            .iter()
            .zip(run.outcomes.iter())
            .enumerate()
            .map(|(i, (unit, outcome))| {
                let release = releases.iter().find(|(idx, ..)| *idx == i);
                UnitReport {
                    name: unit.name.clone(),
                    outcome: outcome.clone(),
                    release: release.map(|(_, d, _)| d.verb().to_string()),
                    release_delivered: release.map(|(.., ok)| *ok),
                    transfer_exit: exits
                        .iter()
                        .find(|(name, _)| *name == unit.name)
                        .and_then(|(_, code)| *code),
                }
            })
            .collect();

        Ok(GraduationReport {
            environment: env.name,
            decision,
            units,
        })
    }

    /// Forward phase: push units in order until all are traversed or one
    /// fails.
    async fn deploy_all(&self, run: &mut GraduationRun, env: &Environment) -> Vec<Transfer> {
        let mut transfers = Vec::new();
        while let Some(i) = run.advance() {
            let unit = &run.units[i];
            tracing::info!(unit = %unit.name, "[{}/{}] pushing", i + 1, run.units.len());

            match self.push.push(unit, env).await {
                PushOutcome::UpToDate => {
                    tracing::info!(unit = %unit.name, "already up to date");
                    run.outcomes[i] = UnitOutcome::UpToDate;
                }
                PushOutcome::AtBarrier(transfer) => {
                    tracing::info!(unit = %unit.name, "waiting at barrier");
                    run.outcomes[i] = UnitOutcome::Deployed;
                    transfers.push(transfer);
                }
                PushOutcome::Failed(reason) => {
                    tracing::error!(unit = %unit.name, "push failed: {reason}");
                    let name = unit.name.clone();
                    run.outcomes[i] = UnitOutcome::Failed(reason.clone());
                    run.abort(AbortReason::PushFailed { unit: name, reason });
                }
            }
        }
        transfers
    }

    /// Deliver the decision to every waiting unit, highest index first.
    async fn unwind(
        &self,
        run: &GraduationRun,
        env: &Environment,
    ) -> Vec<(usize, Directive, bool)> {
        let mut releases = Vec::new();
        let mut i = run.last_waiting();
        while i >= 0 {
            let idx = i as usize;
            let unit = run.units[idx].name.clone();
            let directive = if run.is_aborting() {
                Directive::Abort(unit)
            } else {
                Directive::Continue(unit)
            };
            let delivered = match self.remote.send(env, &directive).await {
                Ok(()) => {
                    tracing::info!(%directive, "delivered");
                    true
                }
                Err(e) => {
                    tracing::error!(%directive, "{e}");
                    false
                }
            };
            releases.push((idx, directive, delivered));
            i -= 1;
        }
        releases
    }

    /// Best-effort lifecycle directive; failures are logged and ignored.
    async fn lifecycle(&self, env: &Environment, directive: Directive) {
        debug_assert!(directive.is_lifecycle());
        if let Err(e) = self.remote.send(env, &directive).await {
            tracing::warn!(%directive, "{e}");
        }
    }

    /// Wait for background transfers to exit, sharing one deadline.
    async fn drain(&self, transfers: Vec<Transfer>) -> Vec<(String, Option<i32>)> {
        let deadline = Instant::now() + self.drain_timeout;
        let mut exits = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            let unit = transfer.unit().to_string();
            let remaining = deadline.saturating_duration_since(Instant::now());
            let code = match transfer.wait(remaining).await {
                TransferEnd::Exited(code) => {
                    tracing::debug!(%unit, code, "transfer exited");
                    Some(code)
                }
                TransferEnd::Terminated => {
                    tracing::warn!(%unit, "transfer terminated abnormally");
                    None
                }
                TransferEnd::TimedOut => {
                    tracing::warn!(%unit, "transfer still running; leaving it in the background");
                    None
                }
            };
            exits.push((unit, code));
        }
        exits
    }
}
