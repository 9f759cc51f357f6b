//! The execution lock protocol.
//!
//! Every action that can mutate combat state runs between
//! [`TurnEngine::begin_action_execution`] and exactly one of
//! [`TurnEngine::complete_action_with_cost`] or
//! [`TurnEngine::action_completed`]. The lock records who took it, why,
//! and when, so a watchdog can force it open if a collaborator never
//! reports back.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::{TurnEngine, TurnState};
use crate::context::CombatContext;
use crate::entity::EntityHandle;
use crate::error::{EngineError, Result};
use crate::event::CombatEvent;

/// The held execution lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLock {
    /// Acting combatant
    pub actor: EntityHandle,
    /// Diagnostic label, usually the action name
    pub tag: String,
    /// State to restore on release
    pub prior_state: TurnState,
    /// Engine clock when the lock was taken
    pub started_at: Duration,
}

impl TurnEngine {
    /// Takes the execution lock for `actor`.
    ///
    /// # Errors
    ///
    /// [`EngineError::LockHeld`] if another action holds it (nothing
    /// changes), [`EngineError::WrongState`] when no turn is open and
    /// [`EngineError::NotCurrentActor`] if it is someone else's turn.
    pub fn begin_action_execution(&mut self, actor: EntityHandle, tag: &str) -> Result<()> {
        if let Some(lock) = &self.lock {
            warn!(
                holder = %lock.actor,
                held_for = %lock.tag,
                requested = tag,
                "execution lock already held"
            );
            return Err(EngineError::LockHeld {
                holder: lock.actor,
                tag: lock.tag.clone(),
            });
        }
        if !self.state.is_turn() {
            warn!(state = ?self.state, actor = %actor, tag, "action requested with no open turn");
            return Err(EngineError::WrongState(self.state));
        }
        if actor != self.current_actor {
            warn!(actor = %actor, current = %self.current_actor, tag, "action requested out of turn");
            return Err(EngineError::NotCurrentActor(actor));
        }

        self.lock = Some(ExecutionLock {
            actor,
            tag: tag.to_owned(),
            prior_state: self.state,
            started_at: self.clock,
        });
        self.state = TurnState::ExecutingAction;
        debug!(actor = %actor, tag, "execution lock taken");
        Ok(())
    }

    /// Releases the lock and spends `cost` actions.
    ///
    /// A cost larger than the remaining actions is clamped. Ends combat if
    /// one side is defeated, and ends the turn if the actor has no actions
    /// left or died.
    ///
    /// # Errors
    ///
    /// [`EngineError::LockNotHeld`] if no action is executing.
    pub fn complete_action_with_cost(&mut self, ctx: &mut CombatContext<'_>, cost: u8) -> Result<()> {
        let Some(lock) = self.lock.take() else {
            warn!(cost, "action completion with no action executing");
            return Err(EngineError::LockNotHeld);
        };
        self.state = lock.prior_state;
        let actor = lock.actor;

        let remaining = match ctx.store.get_mut(actor) {
            Some(data) => {
                if cost > data.turn.actions_remaining {
                    warn!(
                        actor = %actor,
                        cost,
                        remaining = data.turn.actions_remaining,
                        "action cost exceeds remaining actions"
                    );
                }
                data.turn.actions_remaining = data.turn.actions_remaining.saturating_sub(cost);
                data.turn.actions_remaining
            }
            None => 0,
        };
        if cost > 0 {
            ctx.events.push(CombatEvent::ActionsChanged { actor, remaining });
        }
        debug!(actor = %actor, tag = %lock.tag, cost, remaining, "execution lock released");

        if self.check_victory(ctx) {
            return Ok(());
        }
        if actor == self.current_actor
            && self.state.is_turn()
            && (remaining == 0 || !ctx.is_alive(actor))
        {
            self.end_turn(ctx)?;
        }
        Ok(())
    }

    /// Releases the lock with zero cost. A no-op when the lock is not held.
    ///
    /// # Errors
    ///
    /// Only propagates errors from an automatic turn end.
    pub fn action_completed(&mut self, ctx: &mut CombatContext<'_>) -> Result<()> {
        if self.lock.is_none() {
            debug!("action_completed with no lock held");
            return Ok(());
        }
        self.complete_action_with_cost(ctx, 0)
    }

    /// True if advancing the clock by `dt` would trip the watchdog.
    #[must_use]
    pub fn watchdog_due(&self, dt: Duration) -> bool {
        self.lock.as_ref().is_some_and(|lock| {
            (self.clock + dt).saturating_sub(lock.started_at) >= self.lock_watchdog
        })
    }

    /// Advances the engine clock and runs the stuck-lock watchdog.
    ///
    /// Returns true if the watchdog force-released the lock.
    pub fn advance_clock(&mut self, ctx: &mut CombatContext<'_>, dt: Duration) -> bool {
        self.clock += dt;
        let stuck = self
            .lock
            .as_ref()
            .filter(|lock| self.clock.saturating_sub(lock.started_at) >= self.lock_watchdog)
            .map(|lock| (lock.actor, lock.tag.clone()));
        let Some((actor, tag)) = stuck else {
            return false;
        };
        error!(
            actor = %actor,
            tag = %tag,
            watchdog_ms = u64::try_from(self.lock_watchdog.as_millis()).unwrap_or(u64::MAX),
            "execution lock stuck, forcing release"
        );
        if let Err(err) = self.complete_action_with_cost(ctx, 0) {
            error!(%err, "forced release failed");
        }
        true
    }
}
