//! Sequencing one AI turn.
//!
//! The controller is stepped by the host. Each step issues at most one
//! request through the [`ActionExecutor`]. When a request suspends, the step
//! reports [`AiProgress::Waiting`] and the host resumes the executor; the
//! next step picks up from there. Steps carrying an old [`RunToken`] are
//! ignored, so a reset controller never acts on a previous turn's behalf.
//!
//! Per turn the controller stands up if prone, tries once to escape a
//! grapple, then alternates Strike and Stride against its target until the
//! actions run out, the attempt cap is hit or the [`ProgressGuard`] trips.

use std::fmt;

use tessera::Cell;
use tracing::{debug, error, info, warn};

use super::policy::{AiPolicy, NearestFoePolicy};
use crate::actions;
use crate::condition::ConditionType;
use crate::config::AiConfig;
use crate::context::CombatContext;
use crate::entity::EntityHandle;
use crate::executor::{ActionExecutor, ActionOutcome, ActionRequest};
use crate::suspend::{RunToken, RunTracker, SuspensionId};
use crate::turn::{TurnEngine, TurnState};

// =============================================================================
// Progress Guard
// =============================================================================

/// Detects a turn that keeps observing the same situation.
///
/// # Example
///
/// ```
/// use skirmish_core::ai::ProgressGuard;
/// use skirmish_core::entity::EntityHandle;
/// use tessera::Cell;
///
/// let mut guard = ProgressGuard::new(2);
/// let seen = (Cell::new(0, 0, 0), 2, Some(EntityHandle::new(1)));
/// assert!(!guard.observe(seen));
/// assert!(!guard.observe(seen));
/// assert!(guard.observe(seen));
/// ```
#[derive(Debug, Clone)]
pub struct ProgressGuard {
    limit: u32,
    last: Option<(Cell, u8, Option<EntityHandle>)>,
    repeats: u32,
}

impl ProgressGuard {
    /// Trips once the same observation repeats `limit` times in a row.
    #[must_use]
    pub const fn new(limit: u32) -> Self {
        Self {
            limit,
            last: None,
            repeats: 0,
        }
    }

    /// Records `(position, actions remaining, target)`; true when stalled.
    pub fn observe(&mut self, seen: (Cell, u8, Option<EntityHandle>)) -> bool {
        if self.last == Some(seen) {
            self.repeats += 1;
        } else {
            self.last = Some(seen);
            self.repeats = 0;
        }
        self.repeats >= self.limit
    }
}

// =============================================================================
// Progress Reports
// =============================================================================

/// Why the controller stopped driving a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTurnEnd {
    /// Every action was spent
    NoActions,
    /// No living foe to pursue
    NoTarget,
    /// The attempt cap was reached
    AttemptCap,
    /// Nothing changed across consecutive steps
    NoProgress,
    /// Out of reach and unable to move closer
    Stuck,
    /// A suspended step was never answered
    TimedOut,
    /// The engine moved on to another turn
    TurnOver,
    /// Combat ended
    CombatOver,
}

/// Result of one [`AiTurnController::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum AiProgress {
    /// A request was issued
    Acted(ActionOutcome),
    /// A request is suspended; resume it through the executor, then step again
    Waiting(SuspensionId),
    /// The controller is done with this turn
    Finished(AiTurnEnd),
    /// The token does not belong to the active turn
    Stale,
}

#[derive(Debug, Clone)]
struct ActiveTurn {
    token: RunToken,
    actor: EntityHandle,
    turn_serial: u64,
    attempts: u32,
    guard: ProgressGuard,
    waiting: Option<SuspensionId>,
    stood: bool,
    escape_tried: bool,
}

// =============================================================================
// Controller
// =============================================================================

/// Drives turns of computer-controlled combatants.
pub struct AiTurnController {
    policy: Box<dyn AiPolicy>,
    config: AiConfig,
    runs: RunTracker,
    active: Option<ActiveTurn>,
}

impl fmt::Debug for AiTurnController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiTurnController")
            .field("config", &self.config)
            .field("run", &self.runs.current())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl AiTurnController {
    /// Creates a controller using [`NearestFoePolicy`].
    #[must_use]
    pub fn new(config: AiConfig) -> Self {
        Self::with_policy(config, Box::new(NearestFoePolicy::new()))
    }

    /// Creates a controller with a custom policy.
    #[must_use]
    pub fn with_policy(config: AiConfig, policy: Box<dyn AiPolicy>) -> Self {
        Self {
            policy,
            config,
            runs: RunTracker::new(),
            active: None,
        }
    }

    /// The combatant whose turn is being driven.
    #[must_use]
    pub fn active_actor(&self) -> Option<EntityHandle> {
        self.active.as_ref().map(|a| a.actor)
    }

    /// Takes over the open turn if it belongs to a computer-controlled combatant.
    ///
    /// Returns the token every [`step`](Self::step) of this turn must carry.
    pub fn begin_turn(&mut self, engine: &TurnEngine, ctx: &CombatContext<'_>) -> Option<RunToken> {
        if !engine.state().is_turn() || engine.is_locked() {
            return None;
        }
        let actor = engine.current_actor()?;
        let data = ctx.store.get(actor)?;
        if data.player_controlled || !data.is_alive() {
            return None;
        }
        let token = self.runs.begin();
        debug!(actor = %actor, %token, round = engine.round(), "ai turn begins");
        self.active = Some(ActiveTurn {
            token,
            actor,
            turn_serial: engine.turn_serial(),
            attempts: 0,
            guard: ProgressGuard::new(self.config.no_progress_limit),
            waiting: None,
            stood: false,
            escape_tried: false,
        });
        Some(token)
    }

    /// Abandons the active turn; pending steps become stale.
    pub fn reset(&mut self) {
        self.runs.invalidate();
        self.active = None;
        self.policy.reset();
    }

    /// Begins the open turn and steps it until it finishes or has to wait.
    ///
    /// Returns `None` if the open turn is not the controller's to drive.
    pub fn run_turn(
        &mut self,
        engine: &mut TurnEngine,
        executor: &mut ActionExecutor,
        ctx: &mut CombatContext<'_>,
    ) -> Option<AiProgress> {
        let token = self.begin_turn(engine, ctx)?;
        Some(self.run_until_blocked(token, engine, executor, ctx))
    }

    /// Steps until the turn finishes or waits on the host.
    pub fn run_until_blocked(
        &mut self,
        token: RunToken,
        engine: &mut TurnEngine,
        executor: &mut ActionExecutor,
        ctx: &mut CombatContext<'_>,
    ) -> AiProgress {
        loop {
            match self.step(token, engine, executor, ctx) {
                AiProgress::Acted(_) => {}
                other => return other,
            }
        }
    }

    /// Takes the next decision of the turn `token` belongs to.
    pub fn step(
        &mut self,
        token: RunToken,
        engine: &mut TurnEngine,
        executor: &mut ActionExecutor,
        ctx: &mut CombatContext<'_>,
    ) -> AiProgress {
        if !self.runs.is_current(token) {
            debug!(%token, "stale ai step ignored");
            return AiProgress::Stale;
        }
        let Some(turn) = self.active.as_mut().filter(|t| t.token == token) else {
            return AiProgress::Stale;
        };
        let actor = turn.actor;

        if engine.state() == TurnState::CombatOver {
            return self.finish(engine, ctx, AiTurnEnd::CombatOver);
        }
        if engine.turn_serial() != turn.turn_serial || engine.current_actor() != Some(actor) {
            return self.finish(engine, ctx, AiTurnEnd::TurnOver);
        }

        if let Some(id) = turn.waiting {
            if executor.is_pending(id) {
                return AiProgress::Waiting(id);
            }
            turn.waiting = None;
            if executor.take_timed_out(id) {
                error!(actor = %actor, %id, "ai step timed out, abandoning the turn");
                return self.finish(engine, ctx, AiTurnEnd::TimedOut);
            }
        }

        let Some(data) = ctx.store.get(actor) else {
            return self.finish(engine, ctx, AiTurnEnd::TurnOver);
        };
        let remaining = data.turn.actions_remaining;
        let position = data.position;
        let prone = data.has_condition(ConditionType::Prone);
        let grappler = data.links.grappled_by;

        if remaining == 0 {
            return self.finish(engine, ctx, AiTurnEnd::NoActions);
        }
        if turn.attempts >= self.config.max_attempts {
            warn!(actor = %actor, attempts = turn.attempts, "ai attempt cap reached");
            return self.finish(engine, ctx, AiTurnEnd::AttemptCap);
        }

        if prone && !turn.stood {
            turn.stood = true;
            return self.issue(engine, executor, ctx, ActionRequest::Stand);
        }
        if let Some(grappler) = grappler.filter(|_| !turn.escape_tried) {
            turn.escape_tried = true;
            return self.issue(engine, executor, ctx, ActionRequest::Escape { grappler });
        }

        let candidates = engine.participants();
        let Some(target) = self.policy.select_target(ctx, actor, &candidates) else {
            return self.finish(engine, ctx, AiTurnEnd::NoTarget);
        };
        let stalled = self
            .active
            .as_mut()
            .is_some_and(|t| t.guard.observe((position, remaining, Some(target))));
        if stalled {
            warn!(actor = %actor, target = %target, "ai made no progress");
            return self.finish(engine, ctx, AiTurnEnd::NoProgress);
        }

        if actions::can_strike(ctx, actor, target) {
            return self.issue(engine, executor, ctx, ActionRequest::Strike { target });
        }
        match self.policy.stride_destination(ctx, actor, target) {
            Some(destination) => {
                self.issue(engine, executor, ctx, ActionRequest::Stride { destination })
            }
            None => {
                debug!(actor = %actor, target = %target, "no way towards the target");
                self.finish(engine, ctx, AiTurnEnd::Stuck)
            }
        }
    }

    fn issue(
        &mut self,
        engine: &mut TurnEngine,
        executor: &mut ActionExecutor,
        ctx: &mut CombatContext<'_>,
        request: ActionRequest,
    ) -> AiProgress {
        let Some(turn) = self.active.as_mut() else {
            return AiProgress::Stale;
        };
        turn.attempts += 1;
        let outcome = executor.execute(engine, ctx, turn.actor, request);
        debug!(actor = %turn.actor, action = %request.kind(), ?outcome, "ai request");
        if let ActionOutcome::Suspended { id, .. } = outcome {
            turn.waiting = Some(id);
            return AiProgress::Waiting(id);
        }
        AiProgress::Acted(outcome)
    }

    /// Ends the controller's involvement, closing the turn if it is still open.
    fn finish(
        &mut self,
        engine: &mut TurnEngine,
        ctx: &mut CombatContext<'_>,
        reason: AiTurnEnd,
    ) -> AiProgress {
        if let Some(turn) = self.active.take() {
            let still_open = engine.state().is_turn()
                && !engine.is_locked()
                && engine.turn_serial() == turn.turn_serial
                && engine.current_actor() == Some(turn.actor);
            if still_open {
                if let Err(err) = engine.end_turn(ctx) {
                    warn!(%err, actor = %turn.actor, "ai could not end its turn");
                }
            }
            info!(actor = %turn.actor, ?reason, attempts = turn.attempts, "ai turn finished");
        }
        self.runs.invalidate();
        AiProgress::Finished(reason)
    }
}
