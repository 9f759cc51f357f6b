//! Conditions and the service that mutates them.
//!
//! All condition changes go through [`ConditionService`]. Each change is
//! returned as a [`ConditionDelta`] and also pushed to the event log, so a
//! presentation layer never has to diff condition lists itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::{EntityData, EntityHandle};
use crate::event::{CombatEvent, EventLog};

/// Condition kinds the engine models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    /// Lying on the ground: -2 to attacks, off-guard
    Prone,
    /// Status penalty equal to the value on all checks and DCs; decays each turn
    Frightened,
    /// Held by a grapple: off-guard, immobilized
    Grabbed,
    /// Pinned by a grapple: as grabbed, and no attack actions except Escape
    Restrained,
    /// Ranged attackers must pass a DC 5 flat check to hit
    Concealed,
    /// Loses actions equal to the value at the start of each turn
    Slowed,
}

impl ConditionType {
    /// Conditions that carry a numeric value.
    #[must_use]
    pub const fn is_valued(self) -> bool {
        matches!(self, Self::Frightened | Self::Slowed)
    }

    /// Conditions whose value drops by one at the end of the bearer's turn.
    #[must_use]
    pub const fn decays_each_turn(self) -> bool {
        matches!(self, Self::Frightened)
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Prone => "prone",
            Self::Frightened => "frightened",
            Self::Grabbed => "grabbed",
            Self::Restrained => "restrained",
            Self::Concealed => "concealed",
            Self::Slowed => "slowed",
        };
        f.write_str(name)
    }
}

/// How long a condition lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Remaining {
    /// Until removed (or, for decaying conditions, until the value reaches zero)
    Indefinite,
    /// Ends when this many of the bearer's turns have ended
    Rounds(u32),
}

impl Remaining {
    /// The longer of two durations.
    #[must_use]
    pub fn longer(self, other: Self) -> Self {
        match (self, other) {
            (Self::Indefinite, _) | (_, Self::Indefinite) => Self::Indefinite,
            (Self::Rounds(a), Self::Rounds(b)) => Self::Rounds(a.max(b)),
        }
    }
}

/// A condition on a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCondition {
    /// Kind
    pub kind: ConditionType,
    /// Value for valued conditions, 0 otherwise
    pub value: u8,
    /// Duration left
    pub remaining: Remaining,
}

/// What happened to a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Newly applied
    Applied,
    /// Re-applied over an existing instance
    Refreshed,
    /// Decayed or counted down but still active
    Ticked,
    /// No longer active
    Removed,
}

/// A single condition change, before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDelta {
    /// Bearer
    pub entity: EntityHandle,
    /// Condition kind
    pub kind: ConditionType,
    /// Kind of change
    pub change: ChangeKind,
    /// State before, `None` if it was inactive
    pub before: Option<ActiveCondition>,
    /// State after, `None` if it is now inactive
    pub after: Option<ActiveCondition>,
}

/// The sole mutator of combatant conditions.
///
/// # Example
///
/// ```
/// use skirmish_core::condition::{ConditionService, ConditionType, Remaining};
/// use skirmish_core::entity::{EntityData, Team};
/// use skirmish_core::event::EventLog;
/// use tessera::Cell;
///
/// let mut goblin = EntityData::new("goblin", Team::Adversary, Cell::new(0, 0, 0));
/// let mut events = EventLog::new();
///
/// ConditionService::apply(&mut goblin, ConditionType::Frightened, 2, Remaining::Indefinite, &mut events);
/// ConditionService::tick_end_of_turn(&mut goblin, &mut events);
/// assert_eq!(goblin.condition_value(ConditionType::Frightened), Some(1));
/// ```
pub struct ConditionService;

impl ConditionService {
    /// Applies a condition, or refreshes it if already active.
    ///
    /// A refresh keeps the higher value and the longer duration. Returns
    /// `None` if nothing changed. A duration of `Rounds(0)` is refused.
    pub fn apply(
        entity: &mut EntityData,
        kind: ConditionType,
        value: u8,
        remaining: Remaining,
        events: &mut EventLog,
    ) -> Option<ConditionDelta> {
        let handle = entity.handle();
        if remaining == Remaining::Rounds(0) {
            warn!(entity = %handle, condition = %kind, "zero-round condition refused");
            return None;
        }
        let value = if kind.is_valued() { value.max(1) } else { 0 };
        let conditions = entity.conditions_mut();

        let delta = if let Some(existing) = conditions.iter_mut().find(|c| c.kind == kind) {
            let before = *existing;
            existing.value = existing.value.max(value);
            existing.remaining = existing.remaining.longer(remaining);
            if *existing == before {
                return None;
            }
            ConditionDelta {
                entity: handle,
                kind,
                change: ChangeKind::Refreshed,
                before: Some(before),
                after: Some(*existing),
            }
        } else {
            let fresh = ActiveCondition {
                kind,
                value,
                remaining,
            };
            conditions.push(fresh);
            ConditionDelta {
                entity: handle,
                kind,
                change: ChangeKind::Applied,
                before: None,
                after: Some(fresh),
            }
        };

        debug!(entity = %handle, condition = %kind, value, "condition applied");
        events.push(CombatEvent::ConditionChanged(delta));
        Some(delta)
    }

    /// Removes a condition. Returns `None` if it was not active.
    pub fn remove(
        entity: &mut EntityData,
        kind: ConditionType,
        events: &mut EventLog,
    ) -> Option<ConditionDelta> {
        let handle = entity.handle();
        let conditions = entity.conditions_mut();
        let index = conditions.iter().position(|c| c.kind == kind)?;
        let before = conditions.remove(index);
        let delta = ConditionDelta {
            entity: handle,
            kind,
            change: ChangeKind::Removed,
            before: Some(before),
            after: None,
        };
        debug!(entity = %handle, condition = %kind, "condition removed");
        events.push(CombatEvent::ConditionChanged(delta));
        Some(delta)
    }

    /// End-of-turn processing for the bearer.
    ///
    /// Decaying conditions lose one value; timed conditions lose one round.
    /// A condition is dropped when its rounds run out, or when a decaying
    /// indefinite condition reaches zero. A timed decaying condition stays
    /// at zero until it expires. Returns every tick in the order the
    /// conditions were applied.
    pub fn tick_end_of_turn(entity: &mut EntityData, events: &mut EventLog) -> Vec<ConditionDelta> {
        let handle = entity.handle();
        let conditions = entity.conditions_mut();
        let mut ticks = Vec::new();

        conditions.retain_mut(|c| {
            let before = *c;
            if c.kind.decays_each_turn() {
                c.value = c.value.saturating_sub(1);
            }
            if let Remaining::Rounds(r) = c.remaining {
                c.remaining = Remaining::Rounds(r.saturating_sub(1));
            }
            let expired = match c.remaining {
                Remaining::Rounds(r) => r == 0,
                Remaining::Indefinite => c.kind.decays_each_turn() && c.value == 0,
            };
            if !expired && *c == before {
                return true;
            }
            ticks.push(ConditionDelta {
                entity: handle,
                kind: c.kind,
                change: if expired {
                    ChangeKind::Removed
                } else {
                    ChangeKind::Ticked
                },
                before: Some(before),
                after: if expired { None } else { Some(*c) },
            });
            !expired
        });

        for delta in &ticks {
            events.push(CombatEvent::ConditionChanged(*delta));
        }
        ticks
    }
}
