//! AI decision policy.
//!
//! A policy answers two questions for an acting combatant: whom to fight, and
//! where one Stride should end to get at them. It only reads the context.

use std::collections::BTreeMap;

use tessera::{Cell, MoveProfile};
use tracing::debug;

use crate::context::CombatContext;
use crate::entity::{EntityData, EntityHandle};

// =============================================================================
// Policy Trait
// =============================================================================

/// Decision hooks used by the [`AiTurnController`](super::AiTurnController).
pub trait AiPolicy {
    /// Picks the target `actor` should pursue among `candidates`.
    fn select_target(
        &mut self,
        ctx: &CombatContext<'_>,
        actor: EntityHandle,
        candidates: &[EntityHandle],
    ) -> Option<EntityHandle>;

    /// Picks where a single-action Stride should take `actor` towards `target`.
    fn stride_destination(
        &self,
        ctx: &CombatContext<'_>,
        actor: EntityHandle,
        target: EntityHandle,
    ) -> Option<Cell>;

    /// Forgets everything remembered between turns.
    fn reset(&mut self) {}
}

// =============================================================================
// Target Memory
// =============================================================================

/// Sticky target locks, one per actor.
#[derive(Debug, Clone, Default)]
pub struct TargetMemory {
    locks: BTreeMap<EntityHandle, EntityHandle>,
}

impl TargetMemory {
    /// Creates empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The remembered target of `actor`.
    #[must_use]
    pub fn locked(&self, actor: EntityHandle) -> Option<EntityHandle> {
        self.locks.get(&actor).copied()
    }

    /// Remembers `target` for `actor`.
    pub fn lock(&mut self, actor: EntityHandle, target: EntityHandle) {
        self.locks.insert(actor, target);
    }

    /// Drops the lock of `actor`.
    pub fn release(&mut self, actor: EntityHandle) {
        self.locks.remove(&actor);
    }

    /// Drops every lock.
    pub fn clear(&mut self) {
        self.locks.clear();
    }
}

// =============================================================================
// Nearest Foe
// =============================================================================

/// Pursues the nearest living foe and sticks with it while it stays valid.
///
/// Ties on distance go to the lower HP, then to the lower handle. Foes on
/// the actor's own level are preferred over any others.
///
/// # Example
///
/// ```
/// use skirmish_core::ai::{AiPolicy, NearestFoePolicy};
/// use skirmish_core::context::Encounter;
/// use skirmish_core::dice::SeededDice;
/// use skirmish_core::entity::{EntityData, Team};
/// use tessera::{Bounds, Cell, GridMap};
///
/// let mut enc = Encounter::new(GridMap::new(Bounds::new(10, 10)), SeededDice::new(1));
/// let orc = enc.spawn(EntityData::new("orc", Team::Adversary, Cell::new(0, 0, 0)));
/// let near = enc.spawn(EntityData::new("near", Team::Party, Cell::new(2, 0, 0)));
/// let far = enc.spawn(EntityData::new("far", Team::Party, Cell::new(8, 0, 0)));
///
/// let mut policy = NearestFoePolicy::new();
/// let ctx = enc.context();
/// assert_eq!(policy.select_target(&ctx, orc, &[orc, near, far]), Some(near));
/// ```
#[derive(Debug, Clone, Default)]
pub struct NearestFoePolicy {
    memory: TargetMemory,
}

impl NearestFoePolicy {
    /// Creates the policy with no locks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sticky locks held so far.
    #[must_use]
    pub const fn memory(&self) -> &TargetMemory {
        &self.memory
    }
}

fn is_valid_foe(actor: &EntityData, candidate: &EntityData) -> bool {
    candidate.is_alive() && actor.team.opposes(candidate.team)
}

fn nearest<'a>(me: &EntityData, pool: impl Iterator<Item = &'a EntityData>) -> Option<EntityHandle> {
    pool.min_by_key(|t| (me.position.distance_feet(t.position), t.hp, t.handle()))
        .map(EntityData::handle)
}

impl AiPolicy for NearestFoePolicy {
    fn select_target(
        &mut self,
        ctx: &CombatContext<'_>,
        actor: EntityHandle,
        candidates: &[EntityHandle],
    ) -> Option<EntityHandle> {
        let me = ctx.store.get(actor)?;

        if let Some(locked) = self.memory.locked(actor) {
            let still_valid = candidates.contains(&locked)
                && ctx.store.get(locked).is_some_and(|t| is_valid_foe(me, t));
            if still_valid {
                return Some(locked);
            }
            debug!(actor = %actor, target = %locked, "target lock dropped");
        }

        let foes: Vec<&EntityData> = candidates
            .iter()
            .filter_map(|&h| ctx.store.get(h))
            .filter(|t| t.handle() != actor && is_valid_foe(me, t))
            .collect();
        let level = me.position.level;
        let chosen = nearest(me, foes.iter().copied().filter(|t| t.position.level == level))
            .or_else(|| nearest(me, foes.iter().copied()));

        match chosen {
            Some(target) => {
                debug!(actor = %actor, target = %target, "target locked");
                self.memory.lock(actor, target);
            }
            None => self.memory.release(actor),
        }
        chosen
    }

    fn stride_destination(
        &self,
        ctx: &CombatContext<'_>,
        actor: EntityHandle,
        target: EntityHandle,
    ) -> Option<Cell> {
        let me = ctx.store.get(actor)?;
        let goal = ctx.store.get(target)?.position;
        let profile = MoveProfile::walker(me.speed_feet);
        let zone = ctx
            .battlefield
            .movement_zone_by_actions(me.position, &profile, actor, 1);

        let reach = me.strike_weapon().reach_feet().unwrap_or(0);
        let in_reach = zone
            .iter()
            .filter(|(cell, _)| cell.level == goal.level && cell.distance_feet(goal) <= reach)
            .filter(|(cell, _)| ctx.battlefield.can_occupy(**cell, actor))
            .min_by_key(|(cell, cost)| (**cost, **cell))
            .map(|(cell, _)| *cell);
        if in_reach.is_some() {
            return in_reach;
        }

        // nothing in reach this action: close the distance instead
        let here = me.position.distance_feet(goal);
        zone.iter()
            .filter(|(cell, _)| ctx.battlefield.can_occupy(**cell, actor))
            .map(|(cell, cost)| (cell.distance_feet(goal), *cost, *cell))
            .filter(|(distance, _, _)| *distance < here)
            .min()
            .map(|(_, _, cell)| cell)
    }

    fn reset(&mut self) {
        self.memory.clear();
    }
}
