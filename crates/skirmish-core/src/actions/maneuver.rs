//! Athletics maneuvers: Trip, Shove, Grapple and Reposition.
//!
//! All four share one legality ladder and one check shape: the actor's
//! Athletics plus MAP (and the item bonus of a trait weapon, if one is used)
//! against a save DC of the target.

use std::collections::BTreeMap;

use tessera::Cell;
use tracing::debug;

use super::strike::roll_damage;
use super::{
    count_attack, hostile_pair, map_penalty, mark_defeated, rejected, release_grapple, ActionKind,
    TargetingFailure,
};
use crate::battlefield::Battlefield;
use crate::check::{self, CheckOutcome, CheckSource, DegreeOfSuccess};
use crate::condition::{ConditionService, ConditionType, Remaining};
use crate::context::CombatContext;
use crate::entity::{
    DamageDice, EntityData, EntityHandle, GrappleHold, Save, Skill, Weapon, WeaponTraits,
};
use crate::event::CombatEvent;

/// Reach of an unarmed maneuver.
const UNARMED_REACH_FEET: u32 = 5;

/// Bonus damage dealt by a critical Trip.
const TRIP_CRIT_DAMAGE: DamageDice = DamageDice::new(1, 6);

/// The weapon trait each maneuver needs when no hand is free.
const fn required_trait(kind: ActionKind) -> WeaponTraits {
    match kind {
        ActionKind::Trip => WeaponTraits::TRIP,
        ActionKind::Grapple => WeaponTraits::GRAPPLE,
        _ => WeaponTraits::SHOVE,
    }
}

const fn defending_save(kind: ActionKind) -> Save {
    match kind {
        ActionKind::Trip => Save::Reflex,
        _ => Save::Fortitude,
    }
}

/// The weapon a maneuver is made with, or `None` for a free hand.
fn maneuver_weapon(
    actor: &EntityData,
    needed: WeaponTraits,
) -> Result<Option<Weapon>, TargetingFailure> {
    match &actor.weapon {
        Some(w) if w.is_melee() && w.traits.contains(needed) => Ok(Some(w.clone())),
        _ if actor.has_free_hand() => Ok(None),
        Some(w) if !w.is_melee() => Err(TargetingFailure::RequiresMeleeWeapon),
        _ => Err(TargetingFailure::MissingRequiredWeaponTrait),
    }
}

// =============================================================================
// Legality
// =============================================================================

fn maneuver_failure(
    ctx: &CombatContext<'_>,
    kind: ActionKind,
    actor: EntityHandle,
    target: EntityHandle,
) -> Option<TargetingFailure> {
    let (a, t) = match hostile_pair(ctx, actor, target) {
        Ok(pair) => pair,
        Err(failure) => return Some(failure),
    };
    if a.derived().attacks_forbidden {
        return Some(TargetingFailure::InvalidState);
    }
    let weapon = match maneuver_weapon(a, required_trait(kind)) {
        Ok(weapon) => weapon,
        Err(failure) => return Some(failure),
    };
    if t.size.steps_above(a.size) > 1 {
        return Some(TargetingFailure::TargetTooLarge);
    }
    if a.position.level != t.position.level {
        return Some(TargetingFailure::WrongElevation);
    }
    let reach = weapon
        .and_then(|w| w.reach_feet())
        .unwrap_or(UNARMED_REACH_FEET);
    if a.position.distance_feet(t.position) > reach {
        return Some(TargetingFailure::OutOfRange);
    }
    None
}

/// Why `actor` cannot Trip `target`.
#[must_use]
pub fn trip_target_failure(
    ctx: &CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
) -> Option<TargetingFailure> {
    maneuver_failure(ctx, ActionKind::Trip, actor, target)
}

/// True if `actor` may Trip `target`.
#[must_use]
pub fn can_trip(ctx: &CombatContext<'_>, actor: EntityHandle, target: EntityHandle) -> bool {
    trip_target_failure(ctx, actor, target).is_none()
}

/// Why `actor` cannot Shove `target`.
#[must_use]
pub fn shove_target_failure(
    ctx: &CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
) -> Option<TargetingFailure> {
    maneuver_failure(ctx, ActionKind::Shove, actor, target)
}

/// True if `actor` may Shove `target`.
#[must_use]
pub fn can_shove(ctx: &CombatContext<'_>, actor: EntityHandle, target: EntityHandle) -> bool {
    shove_target_failure(ctx, actor, target).is_none()
}

/// Why `actor` cannot Grapple `target`.
#[must_use]
pub fn grapple_target_failure(
    ctx: &CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
) -> Option<TargetingFailure> {
    maneuver_failure(ctx, ActionKind::Grapple, actor, target)
}

/// True if `actor` may Grapple `target`.
#[must_use]
pub fn can_grapple(ctx: &CombatContext<'_>, actor: EntityHandle, target: EntityHandle) -> bool {
    grapple_target_failure(ctx, actor, target).is_none()
}

/// Why `actor` cannot Reposition `target`.
#[must_use]
pub fn reposition_target_failure(
    ctx: &CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
) -> Option<TargetingFailure> {
    maneuver_failure(ctx, ActionKind::Reposition, actor, target)
}

/// True if `actor` may Reposition `target`.
#[must_use]
pub fn can_reposition(ctx: &CombatContext<'_>, actor: EntityHandle, target: EntityHandle) -> bool {
    reposition_target_failure(ctx, actor, target).is_none()
}

// =============================================================================
// Shared Check
// =============================================================================

/// Rolls the maneuver check and reports it. Assumes legality was verified.
fn roll_maneuver(
    ctx: &mut CombatContext<'_>,
    kind: ActionKind,
    actor: EntityHandle,
    target: EntityHandle,
    circumstance: i32,
) -> Option<CheckOutcome> {
    let a = ctx.store.get(actor)?;
    let t = ctx.store.get(target)?;
    let weapon = maneuver_weapon(a, required_trait(kind)).ok()?;
    let agile = weapon
        .as_ref()
        .is_some_and(|w| w.traits.contains(WeaponTraits::AGILE));
    let modifier = a.skill_modifier(Skill::Athletics)
        + map_penalty(a.turn.map_count, agile)
        + weapon.as_ref().map_or(0, |w| w.item_bonus)
        + circumstance;
    let dc = t.save_dc(defending_save(kind));

    let outcome = check::roll_check(
        modifier,
        dc,
        CheckSource::Skill(Skill::Athletics),
        ctx.rng,
    );
    count_attack(ctx, actor);
    ctx.events.push(CombatEvent::SkillCheckResolved {
        action: kind,
        actor,
        target: Some(target),
        outcome: outcome.clone(),
    });
    Some(outcome)
}

fn knock_prone(ctx: &mut CombatContext<'_>, entity: EntityHandle) {
    if let Some(data) = ctx.store.get_mut(entity) {
        ConditionService::apply(data, ConditionType::Prone, 0, Remaining::Indefinite, ctx.events);
    }
}

// =============================================================================
// Trip
// =============================================================================

/// Trips `target`.
///
/// Success knocks the target prone; a critical success also deals 1d6.
/// A critical failure knocks the actor prone.
pub fn try_trip(
    ctx: &mut CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
    circumstance: i32,
) -> Option<DegreeOfSuccess> {
    if let Some(failure) = trip_target_failure(ctx, actor, target) {
        rejected(ActionKind::Trip, actor, failure);
        return None;
    }
    let degree = roll_maneuver(ctx, ActionKind::Trip, actor, target, circumstance)?.degree;
    match degree {
        DegreeOfSuccess::CriticalSuccess => {
            knock_prone(ctx, target);
            let damage = roll_damage(TRIP_CRIT_DAMAGE, 0, ctx.rng);
            let defeated = match ctx.store.get_mut(target) {
                Some(data) => {
                    data.hp = (data.hp - damage).max(0);
                    data.hp == 0
                }
                None => false,
            };
            debug!(target = %target, damage, "critical trip damage");
            if defeated {
                mark_defeated(ctx, target);
            }
        }
        DegreeOfSuccess::Success => knock_prone(ctx, target),
        DegreeOfSuccess::Failure => {}
        DegreeOfSuccess::CriticalFailure => knock_prone(ctx, actor),
    }
    Some(degree)
}

// =============================================================================
// Shove
// =============================================================================

/// Shoves `target` directly away: 5 feet on a success, 10 on a critical.
///
/// The push stops early at the first blocked cell. A critical failure
/// knocks the actor prone.
pub fn try_shove(
    ctx: &mut CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
    circumstance: i32,
) -> Option<DegreeOfSuccess> {
    if let Some(failure) = shove_target_failure(ctx, actor, target) {
        rejected(ActionKind::Shove, actor, failure);
        return None;
    }
    let degree = roll_maneuver(ctx, ActionKind::Shove, actor, target, circumstance)?.degree;
    match degree {
        DegreeOfSuccess::CriticalSuccess => push_away(ctx, actor, target, 2),
        DegreeOfSuccess::Success => push_away(ctx, actor, target, 1),
        DegreeOfSuccess::Failure => {}
        DegreeOfSuccess::CriticalFailure => knock_prone(ctx, actor),
    }
    Some(degree)
}

fn push_away(ctx: &mut CombatContext<'_>, actor: EntityHandle, target: EntityHandle, cells: u32) {
    let (Some(origin), Some(start)) = (
        ctx.store.get(actor).map(|d| d.position),
        ctx.store.get(target).map(|d| d.position),
    ) else {
        return;
    };
    let direction = start.direction_from(origin);
    let mut end = start;
    for _ in 0..cells {
        let next = end.offset(direction);
        match ctx.battlefield.standing_cell(next.x, next.y) {
            Some(next) if next.level == end.level && ctx.battlefield.can_occupy(next, target) => {
                end = next;
            }
            _ => break,
        }
    }
    if end == start {
        debug!(target = %target, "shove blocked");
        return;
    }
    ctx.force_move(target, end);
}

// =============================================================================
// Grapple
// =============================================================================

/// Grapples `target`.
///
/// A critical success restrains and a success grabs; either records the
/// relation on both combatants, established in `round`. Grappling someone
/// new releases the previous hold. Failing against the current target
/// releases it; a critical failure also knocks the actor prone.
pub fn try_grapple(
    ctx: &mut CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
    circumstance: i32,
    round: u32,
) -> Option<DegreeOfSuccess> {
    if let Some(failure) = grapple_target_failure(ctx, actor, target) {
        rejected(ActionKind::Grapple, actor, failure);
        return None;
    }
    let degree = roll_maneuver(ctx, ActionKind::Grapple, actor, target, circumstance)?.degree;
    let holding_target = ctx
        .store
        .get(actor)
        .and_then(|d| d.links.grappling)
        .is_some_and(|hold| hold.target == target);

    match degree {
        DegreeOfSuccess::CriticalSuccess | DegreeOfSuccess::Success => {
            if !holding_target {
                release_grapple(ctx, actor);
            }
            let previous_holder = ctx
                .store
                .get(target)
                .and_then(|d| d.links.grappled_by)
                .filter(|&holder| holder != actor);
            if let Some(holder) = previous_holder {
                release_grapple(ctx, holder);
            }

            let (applied, cleared) = if degree == DegreeOfSuccess::CriticalSuccess {
                (ConditionType::Restrained, ConditionType::Grabbed)
            } else {
                (ConditionType::Grabbed, ConditionType::Restrained)
            };
            if let Some(data) = ctx.store.get_mut(target) {
                ConditionService::remove(data, cleared, ctx.events);
                ConditionService::apply(data, applied, 0, Remaining::Indefinite, ctx.events);
                data.links.grappled_by = Some(actor);
            }
            if let Some(data) = ctx.store.get_mut(actor) {
                data.links.grappling = Some(GrappleHold {
                    target,
                    established_round: round,
                });
            }
            debug!(grappler = %actor, target = %target, condition = %applied, "grapple established");
        }
        DegreeOfSuccess::Failure => {
            if holding_target {
                release_grapple(ctx, actor);
            }
        }
        DegreeOfSuccess::CriticalFailure => {
            if holding_target {
                release_grapple(ctx, actor);
            }
            knock_prone(ctx, actor);
        }
    }
    Some(degree)
}

// =============================================================================
// Reposition
// =============================================================================

/// Cells `mover` can be forced into by `controller`, up to `max_feet` away.
///
/// Breadth-first from the mover's cell, admitting only cells the mover may
/// occupy that stay within the controller's reach on the controller's level.
/// Values are the step count from the mover's cell.
#[must_use]
pub fn reposition_destinations(
    ctx: &CombatContext<'_>,
    controller: EntityHandle,
    mover: EntityHandle,
    max_feet: u32,
) -> BTreeMap<Cell, u32> {
    let (Some(c), Some(m)) = (ctx.store.get(controller), ctx.store.get(mover)) else {
        return BTreeMap::new();
    };
    let anchor = c.position;
    let reach = maneuver_weapon(c, WeaponTraits::SHOVE)
        .ok()
        .flatten()
        .and_then(|w| w.reach_feet())
        .unwrap_or(UNARMED_REACH_FEET);
    let field: &dyn Battlefield = &*ctx.battlefield;
    field.reachable_cells(m.position, max_feet / tessera::FEET_PER_CELL, &mut |cell| {
        cell.level == anchor.level
            && anchor.distance_feet(cell) <= reach
            && field.can_occupy(cell, mover)
    })
}

/// Farthest cell, ties to the lowest cell.
fn farthest(cells: &BTreeMap<Cell, u32>) -> Option<Cell> {
    cells
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(&cell, _)| cell)
}

/// Repositions `target`: up to 5 feet on a success, 10 on a critical.
///
/// `destination` is used when it is a legal cell for the degree rolled;
/// otherwise the farthest legal cell is chosen. On a critical failure the
/// target moves the actor 5 feet instead.
pub fn try_reposition(
    ctx: &mut CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
    destination: Option<Cell>,
    circumstance: i32,
) -> Option<DegreeOfSuccess> {
    if let Some(failure) = reposition_target_failure(ctx, actor, target) {
        rejected(ActionKind::Reposition, actor, failure);
        return None;
    }
    let degree = roll_maneuver(ctx, ActionKind::Reposition, actor, target, circumstance)?.degree;
    let (controller, mover, max_feet, requested) = match degree {
        DegreeOfSuccess::CriticalSuccess => (actor, target, 10, destination),
        DegreeOfSuccess::Success => (actor, target, 5, destination),
        DegreeOfSuccess::Failure => return Some(degree),
        DegreeOfSuccess::CriticalFailure => (target, actor, 5, None),
    };

    let options = reposition_destinations(ctx, controller, mover, max_feet);
    let chosen = requested
        .filter(|cell| options.contains_key(cell))
        .or_else(|| farthest(&options));
    match chosen {
        Some(cell) => {
            ctx.force_move(mover, cell);
        }
        None => debug!(mover = %mover, "no reposition destination"),
    }
    Some(degree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Size;
    use crate::store::EntityStore;
    use crate::tests::helpers::duel;

    mod legality_tests {
        use super::*;

        #[test]
        fn unarmed_maneuvers_are_legal() {
            let (mut enc, hero, goblin) = duel([]);
            let ctx = enc.context();
            assert!(can_trip(&ctx, hero, goblin));
            assert!(can_shove(&ctx, hero, goblin));
            assert!(can_grapple(&ctx, hero, goblin));
            assert!(can_reposition(&ctx, hero, goblin));
        }

        #[test]
        fn two_handed_weapon_needs_the_trait() {
            let (mut enc, hero, goblin) = duel([]);
            enc.roster.get_mut(hero).unwrap().weapon = Some(Weapon::melee(
                "greatsword",
                DamageDice::new(1, 12),
                WeaponTraits::TWO_HAND,
            ));
            assert_eq!(
                trip_target_failure(&enc.context(), hero, goblin),
                Some(TargetingFailure::MissingRequiredWeaponTrait)
            );

            enc.roster.get_mut(hero).unwrap().weapon = Some(Weapon::melee(
                "guisarme",
                DamageDice::new(1, 10),
                WeaponTraits::TWO_HAND | WeaponTraits::TRIP,
            ));
            assert_eq!(trip_target_failure(&enc.context(), hero, goblin), None);
        }

        #[test]
        fn ranged_weapon_without_free_hand() {
            let (mut enc, hero, goblin) = duel([]);
            let mut bow = Weapon::ranged("longbow", DamageDice::new(1, 8), 100);
            bow.traits = WeaponTraits::TWO_HAND;
            enc.roster.get_mut(hero).unwrap().weapon = Some(bow);
            assert_eq!(
                shove_target_failure(&enc.context(), hero, goblin),
                Some(TargetingFailure::RequiresMeleeWeapon)
            );
        }

        #[test]
        fn huge_target_is_too_large() {
            let (mut enc, hero, goblin) = duel([]);
            enc.roster.get_mut(goblin).unwrap().size = Size::Huge;
            assert_eq!(
                grapple_target_failure(&enc.context(), hero, goblin),
                Some(TargetingFailure::TargetTooLarge)
            );
            enc.roster.get_mut(goblin).unwrap().size = Size::Large;
            assert_eq!(grapple_target_failure(&enc.context(), hero, goblin), None);
        }

        #[test]
        fn distance_and_elevation() {
            let (mut enc, hero, goblin) = duel([]);
            enc.roster.get_mut(goblin).unwrap().position = Cell::new(3, 1, 0);
            assert_eq!(
                trip_target_failure(&enc.context(), hero, goblin),
                Some(TargetingFailure::OutOfRange)
            );
            enc.roster.get_mut(goblin).unwrap().position = Cell::new(2, 1, 1);
            assert_eq!(
                trip_target_failure(&enc.context(), hero, goblin),
                Some(TargetingFailure::WrongElevation)
            );
        }

        #[test]
        fn illegal_attempt_rolls_nothing() {
            let (mut enc, hero, _) = duel([20]);
            assert_eq!(try_trip(&mut enc.context(), hero, hero, 0), None);
            assert_eq!(enc.dice.remaining(), 1);
            assert_eq!(enc.roster.get(hero).unwrap().turn.map_count, 0);
        }
    }

    mod effect_tests {
        use super::*;

        #[test]
        fn trip_success_knocks_prone() {
            // 12 + 3 = 15 vs Reflex DC 13
            let (mut enc, hero, goblin) = duel([12]);
            assert_eq!(
                try_trip(&mut enc.context(), hero, goblin, 0),
                Some(DegreeOfSuccess::Success)
            );
            assert!(enc.roster.get(goblin).unwrap().has_condition(ConditionType::Prone));
            assert_eq!(enc.roster.get(hero).unwrap().turn.map_count, 1);
        }

        #[test]
        fn trip_critical_failure_drops_actor() {
            let (mut enc, hero, goblin) = duel([1]);
            assert_eq!(
                try_trip(&mut enc.context(), hero, goblin, 0),
                Some(DegreeOfSuccess::CriticalFailure)
            );
            assert!(enc.roster.get(hero).unwrap().has_condition(ConditionType::Prone));
            assert!(!enc.roster.get(goblin).unwrap().has_condition(ConditionType::Prone));
        }

        #[test]
        fn shove_pushes_directly_away() {
            let (mut enc, hero, goblin) = duel([20]);
            assert_eq!(
                try_shove(&mut enc.context(), hero, goblin, 0),
                Some(DegreeOfSuccess::CriticalSuccess)
            );
            assert_eq!(enc.roster.get(goblin).unwrap().position, Cell::new(4, 1, 0));
            assert_eq!(enc.board.position_of(goblin), Some(Cell::new(4, 1, 0)));
        }

        #[test]
        fn shove_stops_at_walls() {
            let (mut enc, hero, goblin) = duel([20]);
            enc.board.map_mut().set_flags(4, 1, tessera::TerrainFlags::WALL);
            try_shove(&mut enc.context(), hero, goblin, 0);
            assert_eq!(enc.roster.get(goblin).unwrap().position, Cell::new(3, 1, 0));
        }

        #[test]
        fn grapple_records_relation() {
            let (mut enc, hero, goblin) = duel([12]);
            assert_eq!(
                try_grapple(&mut enc.context(), hero, goblin, 0, 1),
                Some(DegreeOfSuccess::Success)
            );
            let hold = enc.roster.get(hero).unwrap().links.grappling.unwrap();
            assert_eq!(hold.target, goblin);
            assert_eq!(hold.established_round, 1);
            let target = enc.roster.get(goblin).unwrap();
            assert_eq!(target.links.grappled_by, Some(hero));
            assert!(target.has_condition(ConditionType::Grabbed));
            assert!(target.derived().off_guard);
        }

        #[test]
        fn critical_grapple_upgrades_to_restrained() {
            let (mut enc, hero, goblin) = duel([12, 20]);
            try_grapple(&mut enc.context(), hero, goblin, 0, 1);
            // free-hand maneuvers take the non-agile -5
            try_grapple(&mut enc.context(), hero, goblin, 0, 1);
            let target = enc.roster.get(goblin).unwrap();
            assert!(target.has_condition(ConditionType::Restrained));
            assert!(!target.has_condition(ConditionType::Grabbed));
        }

        #[test]
        fn failed_regrapple_releases() {
            let (mut enc, hero, goblin) = duel([12, 14]);
            try_grapple(&mut enc.context(), hero, goblin, 0, 1);
            assert_eq!(
                try_grapple(&mut enc.context(), hero, goblin, 0, 1),
                Some(DegreeOfSuccess::Failure)
            );
            assert!(enc.roster.get(hero).unwrap().links.grappling.is_none());
            assert!(!enc.roster.get(goblin).unwrap().has_condition(ConditionType::Grabbed));
        }

        #[test]
        fn reposition_stays_within_reach() {
            let (mut enc, hero, goblin) = duel([]);
            let options = reposition_destinations(&enc.context(), hero, goblin, 10);
            assert!(!options.is_empty());
            let hero_cell = Cell::new(1, 1, 0);
            for cell in options.keys() {
                assert!(hero_cell.distance_feet(*cell) <= 5);
                assert_ne!(*cell, hero_cell);
            }
        }

        #[test]
        fn reposition_uses_requested_cell() {
            let (mut enc, hero, goblin) = duel([12]);
            let wanted = Cell::new(1, 2, 0);
            assert_eq!(
                try_reposition(&mut enc.context(), hero, goblin, Some(wanted), 0),
                Some(DegreeOfSuccess::Success)
            );
            assert_eq!(enc.roster.get(goblin).unwrap().position, wanted);
        }

        #[test]
        fn aid_bonus_shifts_the_degree() {
            // 10 + 3 = 13 meets DC 13 only with the bonus
            let (mut enc, hero, goblin) = duel([9]);
            assert_eq!(
                try_trip(&mut enc.context(), hero, goblin, 1),
                Some(DegreeOfSuccess::Success)
            );
        }
    }
}
