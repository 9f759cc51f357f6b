//! The turn engine.
//!
//! [`TurnEngine`] owns initiative, the round counter, the current-turn
//! pointer, the execution lock and the delayed-turn records. It is a plain
//! state machine: every operation takes a [`CombatContext`] for the
//! collaborators it touches and returns synchronously.
//!
//! # States
//!
//! ```text
//! Inactive -> RollingInitiative -> PlayerTurn | EnemyTurn
//! PlayerTurn | EnemyTurn <-> ExecutingAction
//! (turn ends) -> DelayReturnWindow -> PlayerTurn | EnemyTurn
//! (one side defeated) -> CombatOver
//! ```
//!
//! # Invariants
//!
//! - Every participant is in exactly one of the active order and the
//!   delayed records.
//! - The lock is held by at most one action; while held the state is
//!   `ExecutingAction`.
//! - `actions_remaining` of the acting combatant stays within `0..=3`.

mod delay;
mod initiative;
mod lock;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actions;
use crate::condition::{ConditionService, ConditionType};
use crate::config::EngineConfig;
use crate::context::CombatContext;
use crate::entity::{EntityHandle, InitiativeStat, Team, TurnBudget};
use crate::error::{EngineError, Result};
use crate::event::CombatEvent;
use crate::store::EntityStore;

pub use delay::{DelayWindow, DelayedTurnRecord};
pub use initiative::{sort_initiative, InitiativeEntry};
pub use lock::ExecutionLock;

/// Turn engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    /// No combat
    Inactive,
    /// Initiative is being rolled
    RollingInitiative,
    /// A player-controlled combatant is acting
    PlayerTurn,
    /// A computer-controlled combatant is acting
    EnemyTurn,
    /// An action holds the execution lock
    ExecutingAction,
    /// Delayed players may return before the next turn starts
    DelayReturnWindow,
    /// Combat has ended
    CombatOver,
}

impl TurnState {
    /// True while a combatant's turn is open for actions.
    #[must_use]
    pub const fn is_turn(self) -> bool {
        matches!(self, Self::PlayerTurn | Self::EnemyTurn)
    }
}

/// How combat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatResult {
    /// Every adversary was defeated
    Victory,
    /// Every party member was defeated
    Defeat,
    /// Combat was stopped from outside, or the order became unusable
    Aborted,
}

/// Initiative, turn sequencing and the action economy.
#[derive(Debug, Clone)]
pub struct TurnEngine {
    actions_per_turn: u8,
    initiative_stat: InitiativeStat,
    lock_watchdog: Duration,

    state: TurnState,
    round: u32,
    order: Vec<InitiativeEntry>,
    current_index: usize,
    current_actor: EntityHandle,
    resumed_turn: bool,
    lock: Option<ExecutionLock>,
    delayed: BTreeMap<EntityHandle, DelayedTurnRecord>,
    window: Option<DelayWindow>,
    delay_anchor: Option<EntityHandle>,
    clock: Duration,
    turn_serial: u64,
    result: Option<CombatResult>,
}

impl TurnEngine {
    /// Creates an inactive engine.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            actions_per_turn: config.actions_per_turn.min(3),
            initiative_stat: config.initiative_stat,
            lock_watchdog: config.timeouts.lock_watchdog(),
            state: TurnState::Inactive,
            round: 0,
            order: Vec::new(),
            current_index: 0,
            current_actor: EntityHandle::NONE,
            resumed_turn: false,
            lock: None,
            delayed: BTreeMap::new(),
            window: None,
            delay_anchor: None,
            clock: Duration::ZERO,
            turn_serial: 0,
            result: None,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.state
    }

    /// Current round, 0 before combat.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// The active initiative order.
    #[must_use]
    pub fn initiative_order(&self) -> &[InitiativeEntry] {
        &self.order
    }

    /// Index of the current turn in the active order.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// The combatant whose turn is open (including while an action executes).
    #[must_use]
    pub fn current_actor(&self) -> Option<EntityHandle> {
        match self.state {
            TurnState::PlayerTurn | TurnState::EnemyTurn | TurnState::ExecutingAction => {
                Some(self.current_actor)
            }
            _ => None,
        }
    }

    /// True when the open turn is a resumed delayed turn.
    #[must_use]
    pub const fn is_resumed_turn(&self) -> bool {
        self.resumed_turn
    }

    /// Delayed-turn records in handle order.
    pub fn delayed_turns(&self) -> impl Iterator<Item = &DelayedTurnRecord> {
        self.delayed.values()
    }

    /// True if the combatant is currently delaying.
    #[must_use]
    pub fn is_delayed(&self, handle: EntityHandle) -> bool {
        self.delayed.contains_key(&handle)
    }

    /// The open return window, if any.
    #[must_use]
    pub const fn delay_window(&self) -> Option<&DelayWindow> {
        self.window.as_ref()
    }

    /// The held execution lock, if any.
    #[must_use]
    pub const fn lock(&self) -> Option<&ExecutionLock> {
        self.lock.as_ref()
    }

    /// True while an action holds the execution lock.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Increments every time a turn starts or resumes.
    ///
    /// Continuations capture this to detect that the turn they belong to is over.
    #[must_use]
    pub const fn turn_serial(&self) -> u64 {
        self.turn_serial
    }

    /// Abstract engine clock advanced by [`advance_clock`](Self::advance_clock).
    #[must_use]
    pub const fn clock(&self) -> Duration {
        self.clock
    }

    /// Outcome once combat is over.
    #[must_use]
    pub const fn result(&self) -> Option<CombatResult> {
        self.result
    }

    /// Actions granted at the start of a turn.
    #[must_use]
    pub const fn actions_per_turn(&self) -> u8 {
        self.actions_per_turn
    }

    /// Every combatant in the encounter: the active order followed by delayed ones.
    #[must_use]
    pub fn participants(&self) -> Vec<EntityHandle> {
        self.order
            .iter()
            .map(|e| e.handle)
            .chain(self.delayed.keys().copied())
            .collect()
    }

    /// True if `actor` may start an action right now.
    #[must_use]
    pub fn can_act(&self, store: &dyn EntityStore, actor: EntityHandle) -> bool {
        self.state.is_turn()
            && actor == self.current_actor
            && store
                .get(actor)
                .is_some_and(|d| d.is_alive() && d.turn.actions_remaining > 0)
    }

    // =========================================================================
    // Combat Lifecycle
    // =========================================================================

    /// Rolls initiative and begins round 1.
    ///
    /// # Errors
    ///
    /// [`EngineError::WrongState`] unless inactive, and
    /// [`EngineError::NoLivingCombatants`] if nobody can fight.
    pub fn start_combat(&mut self, ctx: &mut CombatContext<'_>) -> Result<()> {
        if self.state != TurnState::Inactive {
            warn!(state = ?self.state, "start_combat outside Inactive");
            return Err(EngineError::WrongState(self.state));
        }
        self.state = TurnState::RollingInitiative;

        let order = initiative::roll_initiative(ctx, self.initiative_stat);
        if order.is_empty() {
            warn!("start_combat with no living combatants");
            self.state = TurnState::Inactive;
            return Err(EngineError::NoLivingCombatants);
        }

        self.order = order;
        self.round = 0;
        self.current_index = 0;
        self.current_actor = EntityHandle::NONE;
        self.lock = None;
        self.delayed.clear();
        self.window = None;
        self.delay_anchor = None;
        self.result = None;

        for entry in &self.order {
            if let Some(data) = ctx.store.get_mut(entry.handle) {
                data.turn = TurnBudget::default();
            }
        }

        ctx.events.push(CombatEvent::InitiativeRolled {
            order: self.order.clone(),
        });
        ctx.events.push(CombatEvent::CombatStarted);
        info!(combatants = self.order.len(), "combat started");

        if self.check_victory(ctx) {
            return Ok(());
        }
        self.start_round(ctx, 1);
        self.advance_from(ctx, 0);
        Ok(())
    }

    /// Stops combat from outside.
    pub fn abort_combat(&mut self, ctx: &mut CombatContext<'_>) {
        if matches!(self.state, TurnState::Inactive | TurnState::CombatOver) {
            return;
        }
        self.end_combat(ctx, CombatResult::Aborted);
    }

    /// Ends the open turn.
    ///
    /// Applies end-of-turn condition ticks and grapple expiry, checks for
    /// victory, then resolves delayed returns or advances to the next
    /// living combatant.
    ///
    /// # Errors
    ///
    /// [`EngineError::LockHeld`] while an action executes and
    /// [`EngineError::WrongState`] when no turn is open.
    pub fn end_turn(&mut self, ctx: &mut CombatContext<'_>) -> Result<()> {
        match self.state {
            TurnState::PlayerTurn | TurnState::EnemyTurn => {}
            TurnState::ExecutingAction => {
                if let Some(lock) = &self.lock {
                    warn!(holder = %lock.actor, tag = %lock.tag, "end_turn while an action executes");
                    return Err(EngineError::LockHeld {
                        holder: lock.actor,
                        tag: lock.tag.clone(),
                    });
                }
                return Err(EngineError::WrongState(self.state));
            }
            other => {
                warn!(state = ?other, "end_turn with no open turn");
                return Err(EngineError::WrongState(other));
            }
        }

        let actor = self.current_actor;
        self.apply_end_of_turn(ctx, actor);
        ctx.events.push(CombatEvent::TurnEnded { actor });
        debug!(actor = %actor, round = self.round, "turn ended");

        let next = self.current_index + 1;
        self.finish_turn(ctx, actor, next);
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Condition ticks and grapple expiry for `actor`.
    fn apply_end_of_turn(&mut self, ctx: &mut CombatContext<'_>, actor: EntityHandle) {
        if let Some(data) = ctx.store.get_mut(actor) {
            let ticks = ConditionService::tick_end_of_turn(data, ctx.events);
            if !ticks.is_empty() {
                ctx.events.push(CombatEvent::ConditionsTicked { actor, ticks });
            }
        }

        let hold = ctx.store.get(actor).and_then(|d| d.links.grappling);
        if let Some(hold) = hold {
            if hold.established_round < self.round {
                debug!(grappler = %actor, target = %hold.target, "grapple lapsed");
                actions::release_grapple(ctx, actor);
            }
        }
    }

    /// Starts a fresh turn for the entry at `index`.
    fn begin_turn_at(&mut self, ctx: &mut CombatContext<'_>, index: usize) {
        let Some(entry) = self.order.get(index).cloned() else {
            tracing::error!(index, len = self.order.len(), "turn index outside initiative order");
            self.end_combat(ctx, CombatResult::Aborted);
            return;
        };
        let actor = entry.handle;
        self.current_index = index;
        self.current_actor = actor;
        self.resumed_turn = false;
        self.delay_anchor = None;
        self.turn_serial += 1;

        // Aid prepared by this actor lapses now
        for handle in ctx.store.handles() {
            if let Some(data) = ctx.store.get_mut(handle) {
                if data.links.aid.is_some_and(|aid| aid.aider == actor) {
                    data.links.aid = None;
                }
            }
        }

        let actions = match ctx.store.get_mut(actor) {
            Some(data) => {
                let slowed = data.condition_value(ConditionType::Slowed).unwrap_or(0);
                let actions = self.actions_per_turn.saturating_sub(slowed);
                data.turn = TurnBudget {
                    actions_remaining: actions,
                    actions_at_turn_start: actions,
                    map_count: 0,
                    reaction_available: true,
                };
                if let Some(shield) = data.shield_mut() {
                    shield.raised = false;
                }
                actions
            }
            None => 0,
        };

        self.state = if entry.is_player {
            TurnState::PlayerTurn
        } else {
            TurnState::EnemyTurn
        };
        debug!(actor = %actor, round = self.round, actions, "turn started");
        ctx.events.push(CombatEvent::TurnStarted {
            actor,
            actions,
            resumed: false,
        });
        ctx.events.push(CombatEvent::ActionsChanged {
            actor,
            remaining: actions,
        });
        let can_delay = self.can_delay(&*ctx.store, actor).is_ok();
        ctx.events
            .push(CombatEvent::DelayTurnBeginTriggerChanged { actor, can_delay });
    }

    /// Reopens a delayed turn for the entry at `index`, keeping its actions.
    fn resume_turn_at(&mut self, ctx: &mut CombatContext<'_>, index: usize) {
        let Some(entry) = self.order.get(index).cloned() else {
            tracing::error!(index, len = self.order.len(), "resume index outside initiative order");
            self.end_combat(ctx, CombatResult::Aborted);
            return;
        };
        let actor = entry.handle;
        self.current_index = index;
        self.current_actor = actor;
        self.resumed_turn = true;
        self.delay_anchor = None;
        self.turn_serial += 1;
        self.state = if entry.is_player {
            TurnState::PlayerTurn
        } else {
            TurnState::EnemyTurn
        };

        let actions = ctx
            .store
            .get(actor)
            .map_or(0, |d| d.turn.actions_remaining);
        debug!(actor = %actor, round = self.round, actions, "delayed turn resumed");
        ctx.events.push(CombatEvent::TurnStarted {
            actor,
            actions,
            resumed: true,
        });
        ctx.events.push(CombatEvent::DelayTurnBeginTriggerChanged {
            actor,
            can_delay: false,
        });
    }

    /// Ends combat if one side has nobody left standing.
    fn check_victory(&mut self, ctx: &mut CombatContext<'_>) -> bool {
        let mut party = 0usize;
        let mut adversaries = 0usize;
        for handle in self.participants() {
            match ctx.store.get(handle) {
                Some(d) if d.is_alive() => match d.team {
                    Team::Party => party += 1,
                    Team::Adversary => adversaries += 1,
                },
                _ => {}
            }
        }
        let result = if party == 0 {
            CombatResult::Defeat
        } else if adversaries == 0 {
            CombatResult::Victory
        } else {
            return false;
        };
        self.end_combat(ctx, result);
        true
    }

    fn end_combat(&mut self, ctx: &mut CombatContext<'_>, result: CombatResult) {
        self.state = TurnState::CombatOver;
        self.result = Some(result);
        self.lock = None;
        self.window = None;
        self.delay_anchor = None;
        self.current_actor = EntityHandle::NONE;
        info!(?result, round = self.round, "combat ended");
        ctx.events.push(CombatEvent::CombatEnded { result });
    }
}
