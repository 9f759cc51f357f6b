//! Delayed turns and post-turn sequencing.
//!
//! A delaying combatant leaves the active order and is parked in a
//! [`DelayedTurnRecord`]. After every turn the engine settles delayed
//! combatants in a fixed priority:
//!
//! 1. Records that waited a full round expire and are reinserted after the
//!    neighbour they originally followed, with a fresh turn.
//! 2. Records planned to return after the combatant that just finished
//!    resume with the actions they had left. Several records sharing an
//!    anchor resume one after another in handle order.
//! 3. If a delayed player has no plan, a [`DelayWindow`] opens so they can
//!    choose to return now.
//! 4. Otherwise the next living entry starts its turn.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{InitiativeEntry, TurnEngine, TurnState};
use crate::context::CombatContext;
use crate::entity::EntityHandle;
use crate::error::{DelayRejection, EngineError, Result};
use crate::event::CombatEvent;
use crate::store::EntityStore;

/// A parked initiative entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedTurnRecord {
    /// Delaying combatant
    pub actor: EntityHandle,
    /// Round the delay started in
    pub delayed_round: u32,
    /// A return anchor was chosen when delaying
    pub planned: bool,
    /// Combatant to resume after
    pub planned_anchor: Option<EntityHandle>,
    /// Entry the actor followed in the order; `None` when it was first
    pub expiry_anchor: Option<EntityHandle>,
    /// The original entry, reinserted unchanged
    pub entry: InitiativeEntry,
}

/// An open chance for delayed players to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayWindow {
    /// Combatant whose turn just ended
    pub after: EntityHandle,
    /// Order index a returning combatant is inserted at
    pub insert_at: usize,
    /// Delayed players who may return
    pub eligible: Vec<EntityHandle>,
}

impl TurnEngine {
    // =========================================================================
    // Delay Requests
    // =========================================================================

    /// Checks whether `actor` may delay right now.
    ///
    /// # Errors
    ///
    /// The [`DelayRejection`] explaining why not.
    pub fn can_delay(
        &self,
        store: &dyn EntityStore,
        actor: EntityHandle,
    ) -> std::result::Result<(), DelayRejection> {
        if self.lock.is_some() {
            return Err(DelayRejection::Busy);
        }
        if !self.state.is_turn() || actor != self.current_actor {
            return Err(DelayRejection::NotActing);
        }
        let Some(data) = store.get(actor) else {
            return Err(DelayRejection::NotActing);
        };
        if !data.player_controlled {
            return Err(DelayRejection::NotPlayerControlled);
        }
        if self.resumed_turn {
            return Err(DelayRejection::AlreadyResumed);
        }
        if data.turn.actions_remaining < data.turn.actions_at_turn_start {
            return Err(DelayRejection::ActionsSpent);
        }
        Ok(())
    }

    fn validate_anchor(
        &self,
        store: &dyn EntityStore,
        actor: EntityHandle,
        anchor: EntityHandle,
    ) -> std::result::Result<(), DelayRejection> {
        let active = self.order.iter().any(|e| e.handle == anchor);
        if anchor == actor || !active || !store.is_alive(anchor) {
            return Err(DelayRejection::InvalidAnchor);
        }
        Ok(())
    }

    /// Stages a return anchor for the acting player before delaying.
    ///
    /// # Errors
    ///
    /// [`EngineError::Delay`] if the actor may not delay or the anchor is invalid.
    pub fn set_delay_anchor(
        &mut self,
        ctx: &mut CombatContext<'_>,
        anchor: Option<EntityHandle>,
    ) -> Result<()> {
        let actor = self.current_actor;
        self.can_delay(&*ctx.store, actor)?;
        if let Some(anchor) = anchor {
            self.validate_anchor(&*ctx.store, actor, anchor)?;
        }
        self.delay_anchor = anchor;
        ctx.events
            .push(CombatEvent::DelayPlacementSelectionChanged { actor, anchor });
        Ok(())
    }

    /// The staged return anchor.
    #[must_use]
    pub const fn selected_delay_anchor(&self) -> Option<EntityHandle> {
        self.delay_anchor
    }

    /// Delays the acting player's turn.
    ///
    /// End-of-turn effects apply immediately. With an `anchor`, the actor
    /// resumes automatically right after the anchor's turn ends; without
    /// one, it may return through a [`DelayWindow`].
    ///
    /// # Errors
    ///
    /// [`EngineError::Delay`] with the reason the delay was refused.
    pub fn delay_turn(
        &mut self,
        ctx: &mut CombatContext<'_>,
        actor: EntityHandle,
        anchor: Option<EntityHandle>,
    ) -> Result<()> {
        if let Err(reason) = self.can_delay(&*ctx.store, actor) {
            warn!(actor = %actor, %reason, "delay refused");
            return Err(reason.into());
        }
        if let Some(anchor) = anchor {
            if let Err(reason) = self.validate_anchor(&*ctx.store, actor, anchor) {
                warn!(actor = %actor, anchor = %anchor, %reason, "delay refused");
                return Err(reason.into());
            }
        }
        let index = self.current_index;
        if index >= self.order.len() || self.order[index].handle != actor {
            tracing::error!(index, actor = %actor, "current index disagrees with initiative order");
            return Err(EngineError::NotCurrentActor(actor));
        }

        self.apply_end_of_turn(ctx, actor);

        let expiry_anchor = index
            .checked_sub(1)
            .and_then(|i| self.order.get(i))
            .map(|e| e.handle);
        let entry = self.order.remove(index);
        self.delayed.insert(
            actor,
            DelayedTurnRecord {
                actor,
                delayed_round: self.round,
                planned: anchor.is_some(),
                planned_anchor: anchor,
                expiry_anchor,
                entry,
            },
        );
        self.delay_anchor = None;
        debug!(actor = %actor, anchor = ?anchor, round = self.round, "turn delayed");
        ctx.events.push(CombatEvent::DelayedTurnEntered {
            actor,
            planned_anchor: anchor,
        });

        self.finish_turn(ctx, actor, index);
        Ok(())
    }

    /// Returns a delayed player through the open window.
    ///
    /// The actor is inserted right after the combatant whose turn just
    /// ended and resumes with the actions it had when it delayed.
    ///
    /// # Errors
    ///
    /// [`EngineError::WrongState`] with no open window and
    /// [`EngineError::Delay`] if the actor is not eligible.
    pub fn try_return_delayed_actor(
        &mut self,
        ctx: &mut CombatContext<'_>,
        actor: EntityHandle,
    ) -> Result<()> {
        let eligible = self
            .window
            .as_ref()
            .is_some_and(|w| w.eligible.contains(&actor));
        if self.state != TurnState::DelayReturnWindow {
            warn!(state = ?self.state, actor = %actor, "return requested with no window open");
            return Err(EngineError::WrongState(self.state));
        }
        if !eligible {
            warn!(actor = %actor, "return requested by ineligible actor");
            return Err(EngineError::Delay(DelayRejection::NotEligible));
        }
        let (Some(window), Some(record)) = (self.window.take(), self.delayed.remove(&actor)) else {
            return Err(EngineError::UnknownCombatant(actor));
        };

        let at = window.insert_at.min(self.order.len());
        self.order.insert(at, record.entry);
        ctx.events.push(CombatEvent::DelayReturnWindowClosed {
            returned: Some(actor),
        });
        ctx.events.push(CombatEvent::DelayedTurnResumed {
            actor,
            after: window.after,
        });
        self.resume_turn_at(ctx, at);
        Ok(())
    }

    /// Closes the window without anyone returning and moves on.
    ///
    /// # Errors
    ///
    /// [`EngineError::WrongState`] with no open window.
    pub fn decline_delay_return(&mut self, ctx: &mut CombatContext<'_>) -> Result<()> {
        let Some(window) = self.window.take().filter(|_| self.state == TurnState::DelayReturnWindow)
        else {
            warn!(state = ?self.state, "decline with no window open");
            return Err(EngineError::WrongState(self.state));
        };
        ctx.events
            .push(CombatEvent::DelayReturnWindowClosed { returned: None });
        self.advance_from(ctx, window.insert_at);
        Ok(())
    }

    // =========================================================================
    // Sequencing
    // =========================================================================

    /// Everything that happens once `finished`'s turn is over.
    pub(super) fn finish_turn(
        &mut self,
        ctx: &mut CombatContext<'_>,
        finished: EntityHandle,
        next_index: usize,
    ) {
        if self.check_victory(ctx) {
            return;
        }

        let expired = self.take_expired(|r| r.expiry_anchor == Some(finished));
        if !expired.is_empty() {
            let at = next_index.min(self.order.len());
            self.reinsert_expired(ctx, at, expired, Some(finished));
            self.begin_turn_at(ctx, at);
            return;
        }

        if let Some(record) = self.take_planned_after(finished) {
            let at = next_index.min(self.order.len());
            let actor = record.actor;
            if record.delayed_round < self.round {
                // The planned slot came around only after a full round
                self.reinsert_expired(ctx, at, vec![record], Some(finished));
                self.begin_turn_at(ctx, at);
            } else {
                self.order.insert(at, record.entry);
                ctx.events.push(CombatEvent::DelayedTurnResumed {
                    actor,
                    after: finished,
                });
                self.resume_turn_at(ctx, at);
            }
            return;
        }

        let eligible: Vec<EntityHandle> = self
            .delayed
            .values()
            .filter(|r| {
                r.planned_anchor.is_none()
                    && r.entry.is_player
                    && r.actor != finished
                    && ctx.store.is_alive(r.actor)
            })
            .map(|r| r.actor)
            .collect();
        if !eligible.is_empty() {
            debug!(after = %finished, ?eligible, "delay return window opened");
            ctx.events.push(CombatEvent::DelayReturnWindowOpened {
                after: finished,
                eligible: eligible.clone(),
            });
            self.window = Some(DelayWindow {
                after: finished,
                insert_at: next_index,
                eligible,
            });
            self.state = TurnState::DelayReturnWindow;
            return;
        }

        self.advance_from(ctx, next_index);
    }

    /// Starts the next living entry at or after `index`, rolling rounds over.
    pub(super) fn advance_from(&mut self, ctx: &mut CombatContext<'_>, mut index: usize) {
        let limit = 2 * (self.order.len() + self.delayed.len() + 2);
        for _ in 0..limit {
            if index >= self.order.len() {
                self.start_round(ctx, self.round + 1);
                index = 0;
                if self.order.is_empty() {
                    continue;
                }
            }
            let handle = self.order[index].handle;
            if ctx.store.is_alive(handle) {
                self.begin_turn_at(ctx, index);
                return;
            }

            debug!(entity = %handle, "skipping defeated combatant");
            // A fallen anchor can no longer be waited on
            for record in self.delayed.values_mut() {
                if record.planned_anchor == Some(handle) {
                    record.planned_anchor = None;
                }
            }
            let expired = self.take_expired(|r| r.expiry_anchor == Some(handle));
            if !expired.is_empty() {
                self.reinsert_expired(ctx, index + 1, expired, Some(handle));
            }
            index += 1;
        }
        tracing::error!(round = self.round, "no living combatant found in initiative order");
        self.end_combat(ctx, super::CombatResult::Aborted);
    }

    /// Opens a round and brings back delays that reached the top of the order.
    pub(super) fn start_round(&mut self, ctx: &mut CombatContext<'_>, round: u32) {
        self.round = round;
        tracing::info!(round, "round started");
        ctx.events.push(CombatEvent::RoundStarted { round });

        let expired =
            self.take_expired(|r| r.expiry_anchor.is_none() || r.delayed_round + 1 < round);
        if !expired.is_empty() {
            self.reinsert_expired(ctx, 0, expired, None);
        }
    }

    /// Removes records from earlier rounds that satisfy `pred`, in handle order.
    fn take_expired(
        &mut self,
        pred: impl Fn(&DelayedTurnRecord) -> bool,
    ) -> Vec<DelayedTurnRecord> {
        let round = self.round;
        let keys: Vec<EntityHandle> = self
            .delayed
            .values()
            .filter(|r| r.delayed_round < round && pred(r))
            .map(|r| r.actor)
            .collect();
        keys.into_iter()
            .filter_map(|k| self.delayed.remove(&k))
            .collect()
    }

    /// Removes the first record planned after `anchor`; the rest chain onto it.
    fn take_planned_after(&mut self, anchor: EntityHandle) -> Option<DelayedTurnRecord> {
        let chained: Vec<EntityHandle> = self
            .delayed
            .values()
            .filter(|r| r.planned_anchor == Some(anchor))
            .map(|r| r.actor)
            .collect();
        let (&first, rest) = chained.split_first()?;
        for other in rest {
            if let Some(record) = self.delayed.get_mut(other) {
                record.planned_anchor = Some(first);
            }
        }
        self.delayed.remove(&first)
    }

    fn reinsert_expired(
        &mut self,
        ctx: &mut CombatContext<'_>,
        at: usize,
        records: Vec<DelayedTurnRecord>,
        after: Option<EntityHandle>,
    ) {
        for (offset, record) in records.into_iter().enumerate() {
            let actor = record.actor;
            let slot = (at + offset).min(self.order.len());
            self.order.insert(slot, record.entry);
            debug!(actor = %actor, after = ?after, "delayed turn expired");
            ctx.events
                .push(CombatEvent::DelayedTurnExpired { actor, after });
        }
    }
}
