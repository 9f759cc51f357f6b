//! The action execution protocol.
//!
//! [`ActionExecutor`] is the one path from an intent (player input or AI
//! decision) to a resolver call. For every request it:
//!
//! 1. takes the turn engine's execution lock,
//! 2. checks the request's legality and rolls back at zero cost if it fails,
//! 3. runs the resolver, pausing at suspension points where the host has to
//!    answer (movement finishing, a reaction prompt),
//! 4. releases the lock exactly once, spending the action cost on commit.
//!
//! Suspensions are keyed by the [`RunToken`] of the request that opened
//! them. [`cancel`](ActionExecutor::cancel) and [`reset`](ActionExecutor::reset)
//! invalidate the run so that late answers from the host are ignored.
//!
//! # Example
//!
//! ```
//! use skirmish_core::config::EngineConfig;
//! use skirmish_core::context::Encounter;
//! use skirmish_core::dice::ScriptedDice;
//! use skirmish_core::entity::{EntityData, Team};
//! use skirmish_core::executor::{ActionExecutor, ActionOutcome, ActionRequest};
//! use skirmish_core::turn::TurnEngine;
//! use tessera::{Bounds, Cell, GridMap};
//!
//! let mut enc = Encounter::new(GridMap::new(Bounds::new(8, 8)), ScriptedDice::new([20, 1]));
//! let hero = enc.spawn(EntityData::new("hero", Team::Party, Cell::new(1, 1, 0)).player_controlled());
//! enc.spawn(EntityData::new("goblin", Team::Adversary, Cell::new(5, 5, 0)));
//!
//! let config = EngineConfig::default();
//! let mut engine = TurnEngine::new(&config);
//! let mut executor = ActionExecutor::new(&config);
//! engine.start_combat(&mut enc.context()).unwrap();
//!
//! let outcome = executor.execute(
//!     &mut engine,
//!     &mut enc.context(),
//!     hero,
//!     ActionRequest::Stride { destination: Cell::new(1, 4, 0) },
//! );
//! assert!(matches!(outcome, ActionOutcome::Resolved(_)));
//! assert!(!engine.is_locked());
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera::Cell;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::actions::support::{pending_aid, take_aid};
use crate::actions::{
    self, ActionKind, ResolvedStrike, ShieldBlockResult, StridePlan, StrikePhaseResult,
    TargetingFailure,
};
use crate::check::DegreeOfSuccess;
use crate::config::EngineConfig;
use crate::context::CombatContext;
use crate::entity::EntityHandle;
use crate::error::EngineError;
use crate::reaction::{
    ReactionArbiter, ReactionChoice, ReactionDecision, ReactionOption, ReactionPolicy,
    StandardReactionPolicy, TriggerPhase,
};
use crate::suspend::{
    RunToken, RunTracker, Suspension, SuspensionId, SuspensionKind, SuspensionTable,
};
use crate::turn::TurnEngine;

// =============================================================================
// Requests and Outcomes
// =============================================================================

/// An intent to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ActionRequest {
    Strike { target: EntityHandle },
    Trip { target: EntityHandle },
    Shove { target: EntityHandle },
    Grapple { target: EntityHandle },
    /// `destination` is a preferred cell; the farthest legal cell is used otherwise
    Reposition {
        target: EntityHandle,
        destination: Option<Cell>,
    },
    Demoralize { target: EntityHandle },
    Escape { grappler: EntityHandle },
    RaiseShield,
    Aid { ally: EntityHandle },
    Stand,
    Stride { destination: Cell },
}

impl ActionRequest {
    /// The action requested.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Strike { .. } => ActionKind::Strike,
            Self::Trip { .. } => ActionKind::Trip,
            Self::Shove { .. } => ActionKind::Shove,
            Self::Grapple { .. } => ActionKind::Grapple,
            Self::Reposition { .. } => ActionKind::Reposition,
            Self::Demoralize { .. } => ActionKind::Demoralize,
            Self::Escape { .. } => ActionKind::Escape,
            Self::RaiseShield => ActionKind::RaiseShield,
            Self::Aid { .. } => ActionKind::Aid,
            Self::Stand => ActionKind::Stand,
            Self::Stride { .. } => ActionKind::Stride,
        }
    }

    /// Strikes and Athletics maneuvers consume a pending Aid.
    const fn takes_aid(&self) -> bool {
        matches!(
            self,
            Self::Strike { .. }
                | Self::Trip { .. }
                | Self::Shove { .. }
                | Self::Grapple { .. }
                | Self::Reposition { .. }
        )
    }
}

/// Why a request was refused before anything was committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The turn engine refused the lock
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The action is not legal right now
    #[error("illegal action: {0}")]
    Illegal(TargetingFailure),
    /// The actor has no actions left
    #[error("no actions remaining")]
    NoActions,
}

/// Why a suspended action ended without committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbandonReason {
    /// The host never answered in time
    TimedOut,
    /// The run was cancelled
    Cancelled,
    /// The world changed while waiting and the action no longer applies
    Refused,
}

/// What a committed action did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReport {
    /// Acting combatant
    pub actor: EntityHandle,
    /// Action taken
    pub action: ActionKind,
    /// Degree of success, `None` for actions without a check result
    pub degree: Option<DegreeOfSuccess>,
    /// Actions spent
    pub cost: u8,
    /// Full Strike breakdown
    pub strike: Option<ResolvedStrike>,
    /// Reaction taken against the action
    pub shield_block: Option<ShieldBlockResult>,
}

impl ActionReport {
    fn new(actor: EntityHandle, action: ActionKind, degree: Option<DegreeOfSuccess>, cost: u8) -> Self {
        Self {
            actor,
            action,
            degree,
            cost,
            strike: None,
            shield_block: None,
        }
    }
}

/// Result of driving a request or a resumption.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Nothing was committed; the lock was released at zero cost
    Rejected(Rejection),
    /// The action committed and the lock was released
    Resolved(ActionReport),
    /// The action is waiting on the host; the lock is still held
    Suspended {
        /// Pass this back to resume
        id: SuspensionId,
        /// What the host must do
        kind: SuspensionKind,
    },
    /// A suspended action ended without committing; zero cost
    Abandoned {
        /// Acting combatant
        actor: EntityHandle,
        /// Action that was waiting
        action: ActionKind,
        /// Why
        reason: AbandonReason,
    },
}

impl ActionOutcome {
    /// The report, if the action committed.
    #[must_use]
    pub const fn report(&self) -> Option<&ActionReport> {
        match self {
            Self::Resolved(report) => Some(report),
            _ => None,
        }
    }
}

// =============================================================================
// Movement
// =============================================================================

/// Whether a movement finished immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementStart {
    /// Apply the position change now
    Completed,
    /// The host reports completion later through
    /// [`ActionExecutor::complete_movement`]
    InProgress,
}

/// Host hook that plays out a movement.
pub trait MovementDriver {
    /// Starts playing `plan`.
    fn begin_movement(&mut self, plan: &StridePlan) -> MovementStart;
}

/// Movement with no playback: always completes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantMovement;

impl MovementDriver for InstantMovement {
    fn begin_movement(&mut self, _plan: &StridePlan) -> MovementStart {
        MovementStart::Completed
    }
}

// =============================================================================
// Executor
// =============================================================================

#[derive(Debug, Clone)]
enum Pending {
    Stride {
        plan: StridePlan,
    },
    Reaction {
        actor: EntityHandle,
        option: ReactionOption,
        phase: StrikePhaseResult,
    },
}

/// Drives requests through the execution lock, reactions and movement.
pub struct ActionExecutor {
    arbiter: ReactionArbiter,
    movement: Box<dyn MovementDriver>,
    stride_timeout: Duration,
    runs: RunTracker,
    suspensions: SuspensionTable<Pending>,
    timed_out: BTreeSet<SuspensionId>,
}

impl fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("arbiter", &self.arbiter)
            .field("stride_timeout", &self.stride_timeout)
            .field("run", &self.runs.current())
            .field("suspensions", &self.suspensions.len())
            .finish_non_exhaustive()
    }
}

impl ActionExecutor {
    /// Creates an executor with instant movement and the standard reaction policy.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let policy = StandardReactionPolicy::new(config.reactions.player_preference);
        Self {
            arbiter: ReactionArbiter::new(Box::new(policy), config.timeouts.reaction()),
            movement: Box::new(InstantMovement),
            stride_timeout: config.timeouts.stride(),
            runs: RunTracker::new(),
            suspensions: SuspensionTable::new(),
            timed_out: BTreeSet::new(),
        }
    }

    /// Replaces the movement driver.
    #[must_use]
    pub fn with_movement(mut self, movement: Box<dyn MovementDriver>) -> Self {
        self.movement = movement;
        self
    }

    /// Replaces the reaction policy, keeping the prompt budget.
    #[must_use]
    pub fn with_reaction_policy(mut self, policy: Box<dyn ReactionPolicy>) -> Self {
        self.arbiter = ReactionArbiter::new(policy, self.arbiter.prompt_timeout());
        self
    }

    /// The reaction arbiter, e.g. to suppress someone's reactions.
    pub fn arbiter_mut(&mut self) -> &mut ReactionArbiter {
        &mut self.arbiter
    }

    /// Token of the newest run.
    #[must_use]
    pub const fn run_token(&self) -> RunToken {
        self.runs.current()
    }

    /// True while `id` waits for the host.
    #[must_use]
    pub fn is_pending(&self, id: SuspensionId) -> bool {
        self.suspensions.contains(id)
    }

    /// True if anything waits for the host.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.suspensions.is_empty()
    }

    /// What `id` waits for.
    #[must_use]
    pub fn pending_kind(&self, id: SuspensionId) -> Option<SuspensionKind> {
        self.suspensions.get(id).map(|s| s.kind)
    }

    /// The reaction an open prompt is asking about.
    #[must_use]
    pub fn reaction_prompt(&self, id: SuspensionId) -> Option<&ReactionOption> {
        match &self.suspensions.get(id)?.payload {
            Pending::Reaction { option, .. } => Some(option),
            Pending::Stride { .. } => None,
        }
    }

    /// True once if `id` ended by timing out; the record is consumed.
    pub fn take_timed_out(&mut self, id: SuspensionId) -> bool {
        self.timed_out.remove(&id)
    }

    // -------------------------------------------------------------------------
    // Entry Points
    // -------------------------------------------------------------------------

    /// Runs one request for `actor`.
    pub fn execute(
        &mut self,
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        actor: EntityHandle,
        request: ActionRequest,
    ) -> ActionOutcome {
        let action = request.kind();
        if let Err(err) = engine.begin_action_execution(actor, action.label()) {
            return ActionOutcome::Rejected(err.into());
        }
        let token = self.runs.begin();
        for stale in self.suspensions.drain_stale(token) {
            warn!(id = %stale.id, kind = ?stale.kind, token = %stale.token, "dropping suspension from an earlier run");
        }

        let remaining = ctx.store.get(actor).map_or(0, |d| d.turn.actions_remaining);
        if remaining == 0 {
            return Self::roll_back(engine, ctx, Rejection::NoActions);
        }
        if let Some(failure) = legality(ctx, actor, &request, remaining) {
            actions::rejected(action, actor, failure);
            return Self::roll_back(engine, ctx, Rejection::Illegal(failure));
        }

        match request {
            ActionRequest::Strike { target } => self.run_strike(engine, ctx, token, actor, target),
            ActionRequest::Stride { destination } => {
                self.run_stride(engine, ctx, token, actor, destination, remaining)
            }
            other => Self::run_simple(engine, ctx, actor, other),
        }
    }

    /// Answers an open reaction prompt and finishes the Strike.
    ///
    /// Returns `None` for unknown, already answered or stale prompts.
    pub fn answer_reaction(
        &mut self,
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        id: SuspensionId,
        choice: ReactionChoice,
    ) -> Option<ActionOutcome> {
        let suspension = self.resume(id, SuspensionKind::ReactionPrompt)?;
        let Pending::Reaction {
            actor,
            option,
            phase,
        } = suspension.payload
        else {
            return None;
        };
        let block = self.arbiter.resolve(ctx, &option, choice);
        Some(Self::finish_strike(engine, ctx, actor, &phase, block))
    }

    /// Reports that a movement finished and commits it.
    ///
    /// Returns `None` for unknown, already completed or stale movements.
    pub fn complete_movement(
        &mut self,
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        id: SuspensionId,
    ) -> Option<ActionOutcome> {
        let suspension = self.resume(id, SuspensionKind::Stride)?;
        let Pending::Stride { plan } = suspension.payload else {
            return None;
        };
        Some(Self::finish_stride(engine, ctx, &plan))
    }

    /// Advances time: expires suspensions, then runs the lock watchdog.
    ///
    /// A timed out reaction prompt is declined and the Strike lands; a timed
    /// out movement is abandoned at zero cost.
    pub fn advance(
        &mut self,
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        dt: Duration,
    ) -> Vec<ActionOutcome> {
        let now = engine.clock() + dt;
        let mut outcomes = Vec::new();
        for suspension in self.suspensions.expired(now) {
            if !self.runs.is_current(suspension.token) {
                debug!(id = %suspension.id, "stale suspension expired");
                continue;
            }
            error!(
                id = %suspension.id,
                kind = ?suspension.kind,
                waited_ms = u64::try_from(now.saturating_sub(suspension.opened_at).as_millis()).unwrap_or(u64::MAX),
                "suspension timed out"
            );
            self.timed_out.insert(suspension.id);
            outcomes.push(Self::force_close(engine, ctx, suspension, AbandonReason::TimedOut));
        }
        // close what the run still waits on while the lock is held, so a
        // late answer cannot commit after the watchdog releases it
        if engine.watchdog_due(dt) {
            let token = self.runs.current();
            self.runs.invalidate();
            for suspension in self.suspensions.drain_run(token) {
                error!(id = %suspension.id, kind = ?suspension.kind, "lock watchdog closing suspension");
                self.timed_out.insert(suspension.id);
                outcomes.push(Self::force_close(engine, ctx, suspension, AbandonReason::TimedOut));
            }
        }
        engine.advance_clock(ctx, dt);
        outcomes
    }

    /// Invalidates the current run, closing its suspensions.
    ///
    /// Open prompts count as declined; unfinished movements are rolled back.
    pub fn cancel(&mut self, engine: &mut TurnEngine, ctx: &mut CombatContext<'_>) -> Vec<ActionOutcome> {
        let token = self.runs.current();
        self.runs.invalidate();
        let open = self.suspensions.drain_run(token);
        if !open.is_empty() {
            debug!(%token, count = open.len(), "run cancelled");
        }
        open.into_iter()
            .map(|s| Self::force_close(engine, ctx, s, AbandonReason::Cancelled))
            .collect()
    }

    /// Forgets every suspension without touching the engine.
    pub fn reset(&mut self) {
        self.runs.invalidate();
        self.suspensions.clear();
        self.timed_out.clear();
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    fn run_simple(
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        actor: EntityHandle,
        request: ActionRequest,
    ) -> ActionOutcome {
        let action = request.kind();
        let aid = if request.takes_aid() {
            pending_aid(ctx, actor)
        } else {
            0
        };
        let round = engine.round();
        let degree = match request {
            ActionRequest::Trip { target } => actions::try_trip(ctx, actor, target, aid),
            ActionRequest::Shove { target } => actions::try_shove(ctx, actor, target, aid),
            ActionRequest::Grapple { target } => {
                actions::try_grapple(ctx, actor, target, aid, round)
            }
            ActionRequest::Reposition {
                target,
                destination,
            } => actions::try_reposition(ctx, actor, target, destination, aid),
            ActionRequest::Demoralize { target } => actions::try_demoralize(ctx, actor, target),
            ActionRequest::Escape { grappler } => actions::try_escape(ctx, actor, grappler),
            ActionRequest::RaiseShield => actions::try_raise_shield(ctx, actor),
            ActionRequest::Aid { ally } => actions::try_aid(ctx, actor, ally),
            ActionRequest::Stand => actions::try_stand(ctx, actor),
            ActionRequest::Strike { .. } | ActionRequest::Stride { .. } => None,
        };
        let Some(degree) = degree else {
            return Self::roll_back(engine, ctx, Rejection::Illegal(TargetingFailure::InvalidState));
        };
        if aid > 0 {
            take_aid(ctx, actor);
        }
        Self::commit(engine, ctx, ActionReport::new(actor, action, Some(degree), 1))
    }

    fn run_strike(
        &mut self,
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        token: RunToken,
        actor: EntityHandle,
        target: EntityHandle,
    ) -> ActionOutcome {
        let aid = pending_aid(ctx, actor);
        let Some(rolled) = actions::resolve_attack_roll(ctx, actor, target, aid) else {
            return Self::roll_back(engine, ctx, Rejection::Illegal(TargetingFailure::InvalidState));
        };
        if aid > 0 {
            take_aid(ctx, actor);
        }
        // the attack is rolled, so the action is spent from here on
        let Some(decided) = actions::determine_hit_and_damage(ctx, &rolled) else {
            return Self::commit(engine, ctx, ActionReport::new(actor, ActionKind::Strike, None, 1));
        };

        if decided.is_hit() {
            let participants = engine.participants();
            let option = self
                .arbiter
                .collect_eligible_reactions(
                    ctx,
                    TriggerPhase::StrikeHitBeforeDamage,
                    actor,
                    target,
                    decided.damage,
                    &participants,
                )
                .into_iter()
                .next();
            if let Some(option) = option {
                match self.arbiter.decide(ctx, &option) {
                    ReactionDecision::Immediate(choice) => {
                        let block = self.arbiter.resolve(ctx, &option, choice);
                        return Self::finish_strike(engine, ctx, actor, &decided, block);
                    }
                    ReactionDecision::Prompt { timeout } => {
                        let id = self.suspensions.open(
                            SuspensionKind::ReactionPrompt,
                            token,
                            engine.clock(),
                            timeout,
                            Pending::Reaction {
                                actor,
                                option,
                                phase: decided,
                            },
                        );
                        debug!(%id, reactor = %option.reactor, "strike waiting on a reaction prompt");
                        return ActionOutcome::Suspended {
                            id,
                            kind: SuspensionKind::ReactionPrompt,
                        };
                    }
                }
            }
        }
        Self::finish_strike(engine, ctx, actor, &decided, None)
    }

    fn finish_strike(
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        actor: EntityHandle,
        phase: &StrikePhaseResult,
        block: Option<ShieldBlockResult>,
    ) -> ActionOutcome {
        let reduction = block.map_or(0, |b| b.reduction);
        let strike = actions::apply_strike_damage(ctx, phase, reduction);
        let mut report = ActionReport::new(actor, ActionKind::Strike, phase.degree, 1);
        report.strike = strike;
        report.shield_block = block;
        Self::commit(engine, ctx, report)
    }

    fn run_stride(
        &mut self,
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        token: RunToken,
        actor: EntityHandle,
        destination: Cell,
        budget: u8,
    ) -> ActionOutcome {
        let plan = match actions::plan_stride(ctx, actor, destination, budget) {
            Ok(plan) => plan,
            Err(failure) => return Self::roll_back(engine, ctx, Rejection::Illegal(failure)),
        };
        match self.movement.begin_movement(&plan) {
            MovementStart::Completed => Self::finish_stride(engine, ctx, &plan),
            MovementStart::InProgress => {
                let id = self.suspensions.open(
                    SuspensionKind::Stride,
                    token,
                    engine.clock(),
                    self.stride_timeout,
                    Pending::Stride { plan },
                );
                debug!(%id, actor = %actor, "stride waiting on movement");
                ActionOutcome::Suspended {
                    id,
                    kind: SuspensionKind::Stride,
                }
            }
        }
    }

    fn finish_stride(
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        plan: &StridePlan,
    ) -> ActionOutcome {
        if actions::commit_stride(ctx, plan) {
            Self::commit(
                engine,
                ctx,
                ActionReport::new(plan.actor, ActionKind::Stride, None, plan.cost()),
            )
        } else {
            Self::abandon(engine, ctx, plan.actor, ActionKind::Stride, AbandonReason::Refused)
        }
    }

    // -------------------------------------------------------------------------
    // Lock Exits
    // -------------------------------------------------------------------------

    fn resume(&mut self, id: SuspensionId, kind: SuspensionKind) -> Option<Suspension<Pending>> {
        match self.suspensions.get(id) {
            None => {
                warn!(%id, ?kind, "resumption of an unknown or closed suspension");
                return None;
            }
            Some(open) if open.kind != kind => {
                warn!(%id, expected = ?kind, found = ?open.kind, "resumption of the wrong kind");
                return None;
            }
            Some(_) => {}
        }
        let suspension = self.suspensions.take(id)?;
        if !self.runs.is_current(suspension.token) {
            warn!(%id, token = %suspension.token, "stale resumption ignored");
            return None;
        }
        Some(suspension)
    }

    fn force_close(
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        suspension: Suspension<Pending>,
        reason: AbandonReason,
    ) -> ActionOutcome {
        match suspension.payload {
            Pending::Reaction { actor, phase, .. } => {
                debug!(id = %suspension.id, ?reason, "reaction prompt closed as declined");
                Self::finish_strike(engine, ctx, actor, &phase, None)
            }
            Pending::Stride { plan } => {
                Self::abandon(engine, ctx, plan.actor, ActionKind::Stride, reason)
            }
        }
    }

    fn commit(
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        report: ActionReport,
    ) -> ActionOutcome {
        if let Err(err) = engine.complete_action_with_cost(ctx, report.cost) {
            error!(%err, actor = %report.actor, action = %report.action, "commit could not release the lock");
        }
        ActionOutcome::Resolved(report)
    }

    fn roll_back(
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        rejection: Rejection,
    ) -> ActionOutcome {
        if let Err(err) = engine.action_completed(ctx) {
            error!(%err, "rollback could not release the lock");
        }
        ActionOutcome::Rejected(rejection)
    }

    fn abandon(
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        actor: EntityHandle,
        action: ActionKind,
        reason: AbandonReason,
    ) -> ActionOutcome {
        if let Err(err) = engine.action_completed(ctx) {
            error!(%err, "abandon could not release the lock");
        }
        ActionOutcome::Abandoned {
            actor,
            action,
            reason,
        }
    }
}

/// The legality predicate matching a request.
fn legality(
    ctx: &CombatContext<'_>,
    actor: EntityHandle,
    request: &ActionRequest,
    budget: u8,
) -> Option<TargetingFailure> {
    match *request {
        ActionRequest::Strike { target } => actions::strike_target_failure(ctx, actor, target),
        ActionRequest::Trip { target } => actions::trip_target_failure(ctx, actor, target),
        ActionRequest::Shove { target } => actions::shove_target_failure(ctx, actor, target),
        ActionRequest::Grapple { target } => actions::grapple_target_failure(ctx, actor, target),
        ActionRequest::Reposition { target, .. } => {
            actions::reposition_target_failure(ctx, actor, target)
        }
        ActionRequest::Demoralize { target } => {
            actions::demoralize_target_failure(ctx, actor, target)
        }
        ActionRequest::Escape { grappler } => actions::escape_target_failure(ctx, actor, grappler),
        ActionRequest::RaiseShield => actions::raise_shield_failure(ctx, actor),
        ActionRequest::Aid { ally } => actions::aid_target_failure(ctx, actor, ally),
        ActionRequest::Stand => actions::stand_failure(ctx, actor),
        ActionRequest::Stride { destination } => {
            actions::stride_failure(ctx, actor, destination, budget)
        }
    }
}
