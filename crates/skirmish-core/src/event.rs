//! Combat notifications.
//!
//! The engine never calls into a presentation layer. Instead every
//! observable change is appended to an [`EventLog`], which the host drains
//! with [`EventLog::take_events`] after each call into the engine.

use serde::{Deserialize, Serialize};
use tessera::Cell;
use tracing::debug;

use crate::actions::strike::{ResolvedStrike, StrikePhaseResult};
use crate::actions::ActionKind;
use crate::check::CheckOutcome;
use crate::condition::ConditionDelta;
use crate::entity::EntityHandle;
use crate::turn::{CombatResult, InitiativeEntry};

/// Something observable happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// Initiative was rolled and sorted
    InitiativeRolled {
        /// Sorted order, highest first
        order: Vec<InitiativeEntry>,
    },
    /// Combat began
    CombatStarted,
    /// Combat finished
    CombatEnded {
        /// Outcome
        result: CombatResult,
    },
    /// A new round began
    RoundStarted {
        /// Round number, starting at 1
        round: u32,
    },
    /// A combatant's turn began or a delayed turn resumed
    TurnStarted {
        /// Acting combatant
        actor: EntityHandle,
        /// Actions available
        actions: u8,
        /// True when resuming a delayed turn
        resumed: bool,
    },
    /// A combatant's turn ended
    TurnEnded {
        /// Combatant whose turn ended
        actor: EntityHandle,
    },
    /// Remaining actions changed
    ActionsChanged {
        /// Acting combatant
        actor: EntityHandle,
        /// Actions left
        remaining: u8,
    },
    /// A condition changed
    ConditionChanged(ConditionDelta),
    /// End-of-turn condition processing finished
    ConditionsTicked {
        /// Bearer
        actor: EntityHandle,
        /// Every change made
        ticks: Vec<ConditionDelta>,
    },
    /// A strike hit and is about to deal damage
    StrikePreDamage(StrikePhaseResult),
    /// A strike finished
    StrikeResolved(ResolvedStrike),
    /// A skill-based action rolled its check
    SkillCheckResolved {
        /// Action
        action: ActionKind,
        /// Acting combatant
        actor: EntityHandle,
        /// Target, if the action had one
        target: Option<EntityHandle>,
        /// Roll breakdown and degree
        outcome: CheckOutcome,
    },
    /// A shield absorbed damage
    ShieldBlocked {
        /// Shield bearer
        reactor: EntityHandle,
        /// Damage prevented
        reduction: i32,
        /// Damage dealt to the shield
        shield_damage: i32,
        /// The shield is now broken
        broken: bool,
    },
    /// A combatant was moved by someone else's action
    ForcedMovement {
        /// Moved combatant
        entity: EntityHandle,
        /// Cell before
        from: Cell,
        /// Cell after
        to: Cell,
    },
    /// A combatant moved under its own power
    Moved {
        /// Mover
        entity: EntityHandle,
        /// Cell before
        from: Cell,
        /// Cell after
        to: Cell,
    },
    /// A grapple ended
    GrappleReleased {
        /// Former grappler
        grappler: EntityHandle,
        /// Former target
        target: EntityHandle,
    },
    /// A combatant dropped to zero HP
    Defeated {
        /// Defeated combatant
        entity: EntityHandle,
    },
    /// Whether the acting combatant may delay changed
    DelayTurnBeginTriggerChanged {
        /// Acting combatant
        actor: EntityHandle,
        /// Delay is currently allowed
        can_delay: bool,
    },
    /// The staged return anchor for a delay changed
    DelayPlacementSelectionChanged {
        /// Acting combatant
        actor: EntityHandle,
        /// Anchor, `None` to return manually
        anchor: Option<EntityHandle>,
    },
    /// A combatant left the order to delay
    DelayedTurnEntered {
        /// Delaying combatant
        actor: EntityHandle,
        /// Planned return anchor
        planned_anchor: Option<EntityHandle>,
    },
    /// A delayed combatant re-entered the order with its remaining actions
    DelayedTurnResumed {
        /// Returning combatant
        actor: EntityHandle,
        /// The combatant it now follows
        after: EntityHandle,
    },
    /// A delayed combatant waited a full round and takes a fresh turn
    DelayedTurnExpired {
        /// Returning combatant
        actor: EntityHandle,
        /// The combatant it now follows, `None` at the top of the round
        after: Option<EntityHandle>,
    },
    /// Delayed players may choose to return now
    DelayReturnWindowOpened {
        /// The combatant whose turn just ended
        after: EntityHandle,
        /// Delayed players who may return
        eligible: Vec<EntityHandle>,
    },
    /// The return window closed
    DelayReturnWindowClosed {
        /// The combatant that returned, if any
        returned: Option<EntityHandle>,
    },
}

/// Ordered buffer of combat events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<CombatEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&mut self, event: CombatEvent) {
        debug!(?event, "combat event");
        self.events.push(event);
    }

    /// Drains every buffered event, oldest first.
    pub fn take_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Buffered events.
    pub fn iter(&self) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter()
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
