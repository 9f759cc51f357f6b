//! The Strike pipeline.
//!
//! A Strike resolves in three phases so a reaction can be interposed after
//! the hit is known and before damage lands:
//!
//! 1. [`resolve_attack_roll`] checks legality, rolls the d20 and sums every
//!    attack modifier. Counts towards MAP.
//! 2. [`determine_hit_and_damage`] re-reads both combatants, compares the
//!    total against AC and cover, runs the concealment flat check and rolls
//!    damage on a hit. Never touches HP.
//! 3. [`apply_strike_damage`] subtracts damage minus any reaction reduction
//!    and publishes the final record.
//!
//! Each phase returns a fresh [`StrikePhaseResult`] rather than mutating the
//! previous one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    count_attack, hostile_pair, map_penalty, mark_defeated, rejected, ActionKind, TargetingFailure,
};
use crate::check::{degree_of_success, flat_check, DegreeOfSuccess};
use crate::condition::ConditionType;
use crate::context::CombatContext;
use crate::dice::RandomSource;
use crate::entity::{DamageDice, EntityHandle, WeaponRange, WeaponTraits};
use crate::event::CombatEvent;

/// Range increments beyond which a ranged Strike is impossible.
const MAX_RANGE_INCREMENTS: u32 = 6;

/// Concealed targets are missed unless a flat check meets this DC.
const CONCEALED_FLAT_DC: i32 = 5;

/// Snapshot of a Strike between phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikePhaseResult {
    /// Attacking combatant
    pub attacker: EntityHandle,
    /// Struck combatant
    pub target: EntityHandle,
    /// Weapon name
    pub weapon: String,
    /// Ranged Strike
    pub ranged: bool,
    /// Distance at the time of the roll
    pub distance_feet: u32,
    /// The d20
    pub natural: u8,
    /// Attacker's modifier with the weapon
    pub attack_modifier: i32,
    /// Multiple attack penalty
    pub map_penalty: i32,
    /// Range increment penalty
    pub range_penalty: i32,
    /// Volley penalty
    pub volley_penalty: i32,
    /// Externally supplied circumstance bonus
    pub circumstance: i32,
    /// Attack total
    pub total: i32,
    /// Target AC, known from phase 2
    pub target_ac: i32,
    /// Cover bonus added to AC, known from phase 2
    pub cover_bonus: i32,
    /// Degree of success, known from phase 2
    pub degree: Option<DegreeOfSuccess>,
    /// Concealment flat check die, if one was rolled
    pub concealment_roll: Option<u8>,
    /// Sight was lost between the roll and the hit
    pub sight_lost: bool,
    /// Damage rolled, zero on a miss
    pub damage: i32,
}

impl StrikePhaseResult {
    /// True once phase 2 decided the Strike hit.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.degree.is_some_and(DegreeOfSuccess::is_success)
    }
}

/// The final record of a Strike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStrike {
    /// The phase 2 snapshot
    pub phase: StrikePhaseResult,
    /// Damage prevented by a reaction
    pub reduction: i32,
    /// HP actually removed
    pub damage_applied: i32,
    /// Target HP before
    pub hp_before: i32,
    /// Target HP after
    pub hp_after: i32,
    /// The target dropped to zero HP
    pub defeated: bool,
}

// =============================================================================
// Legality
// =============================================================================

/// Why `attacker` cannot Strike `target` right now.
#[must_use]
pub fn strike_target_failure(
    ctx: &CombatContext<'_>,
    attacker: EntityHandle,
    target: EntityHandle,
) -> Option<TargetingFailure> {
    let (a, t) = match hostile_pair(ctx, attacker, target) {
        Ok(pair) => pair,
        Err(failure) => return Some(failure),
    };
    if a.derived().attacks_forbidden {
        return Some(TargetingFailure::InvalidState);
    }
    let weapon = a.strike_weapon();
    let distance = a.position.distance_feet(t.position);
    match weapon.range {
        WeaponRange::Melee { reach_feet } => {
            if a.position.level != t.position.level {
                return Some(TargetingFailure::WrongElevation);
            }
            if distance > reach_feet {
                return Some(TargetingFailure::OutOfRange);
            }
        }
        WeaponRange::Ranged { increment_feet, .. } => {
            if distance > increment_feet.saturating_mul(MAX_RANGE_INCREMENTS) {
                return Some(TargetingFailure::OutOfRange);
            }
            if !ctx.battlefield.has_line_of_sight(a.position, t.position) {
                return Some(TargetingFailure::NoLineOfSight);
            }
        }
    }
    None
}

/// True if [`strike_target_failure`] finds nothing wrong.
#[must_use]
pub fn can_strike(ctx: &CombatContext<'_>, attacker: EntityHandle, target: EntityHandle) -> bool {
    strike_target_failure(ctx, attacker, target).is_none()
}

// =============================================================================
// Phases
// =============================================================================

/// Phase 1: roll the attack.
///
/// `circumstance` carries bonuses supplied by the caller, such as a pending
/// Aid. Returns `None` without mutating anything if the Strike is illegal.
pub fn resolve_attack_roll(
    ctx: &mut CombatContext<'_>,
    attacker: EntityHandle,
    target: EntityHandle,
    circumstance: i32,
) -> Option<StrikePhaseResult> {
    if let Some(failure) = strike_target_failure(ctx, attacker, target) {
        rejected(ActionKind::Strike, attacker, failure);
        return None;
    }
    let a = ctx.store.get(attacker)?;
    let t = ctx.store.get(target)?;

    let weapon = a.strike_weapon();
    let distance_feet = a.position.distance_feet(t.position);
    let (range_penalty, volley_penalty) = match weapon.range {
        WeaponRange::Melee { .. } => (0, 0),
        WeaponRange::Ranged {
            increment_feet,
            volley_feet,
        } => (
            range_increment_penalty(distance_feet, increment_feet),
            match volley_feet {
                Some(minimum) if distance_feet <= minimum => -2,
                _ => 0,
            },
        ),
    };
    let attack_modifier = a.attack_modifier(&weapon);
    let map = map_penalty(a.turn.map_count, weapon.traits.contains(WeaponTraits::AGILE));

    let natural = ctx.rng.roll_d20();
    let total =
        i32::from(natural) + attack_modifier + map + range_penalty + volley_penalty + circumstance;
    count_attack(ctx, attacker);

    debug!(
        attacker = %attacker,
        target = %target,
        weapon = %weapon.name,
        natural,
        total,
        "attack rolled"
    );
    let ranged = !weapon.is_melee();
    Some(StrikePhaseResult {
        attacker,
        target,
        weapon: weapon.name,
        ranged,
        distance_feet,
        natural,
        attack_modifier,
        map_penalty: map,
        range_penalty,
        volley_penalty,
        circumstance,
        total,
        target_ac: 0,
        cover_bonus: 0,
        degree: None,
        concealment_roll: None,
        sight_lost: false,
        damage: 0,
    })
}

/// Phase 2: decide the hit and roll damage.
///
/// Returns `None` if either combatant disappeared or died since phase 1.
/// Emits [`CombatEvent::StrikePreDamage`] on a hit.
pub fn determine_hit_and_damage(
    ctx: &mut CombatContext<'_>,
    phase: &StrikePhaseResult,
) -> Option<StrikePhaseResult> {
    let a = ctx.store.get(phase.attacker).filter(|d| d.is_alive())?;
    let t = ctx.store.get(phase.target).filter(|d| d.is_alive())?;
    let (from, to) = (a.position, t.position);
    let target_ac = t.armor_class();
    let concealed = t.has_condition(ConditionType::Concealed);
    let weapon = a.strike_weapon();
    let damage_bonus = a.damage_bonus(&weapon);

    if phase.ranged && !ctx.battlefield.has_line_of_sight(from, to) {
        debug!(attacker = %phase.attacker, target = %phase.target, "sight lost before the hit");
        return Some(StrikePhaseResult {
            target_ac,
            degree: Some(DegreeOfSuccess::CriticalFailure),
            sight_lost: true,
            ..phase.clone()
        });
    }

    let cover_bonus = if phase.ranged {
        ctx.battlefield.cover_between(from, to).ac_bonus()
    } else {
        0
    };
    let mut degree = degree_of_success(phase.natural, phase.total, target_ac + cover_bonus);

    let mut concealment_roll = None;
    if concealed && phase.ranged && degree.is_success() {
        let (die, passed) = flat_check(CONCEALED_FLAT_DC, ctx.rng);
        concealment_roll = Some(die);
        if !passed {
            debug!(target = %phase.target, die, "concealment flat check failed");
            degree = DegreeOfSuccess::Failure;
        }
    }

    let damage = if degree.is_success() {
        let rolled = roll_damage(weapon.damage, damage_bonus, ctx.rng);
        if degree == DegreeOfSuccess::CriticalSuccess {
            rolled * 2
        } else {
            rolled
        }
    } else {
        0
    };

    let next = StrikePhaseResult {
        target_ac,
        cover_bonus,
        degree: Some(degree),
        concealment_roll,
        damage,
        ..phase.clone()
    };
    debug!(
        attacker = %next.attacker,
        target = %next.target,
        %degree,
        damage,
        "strike hit determined"
    );
    if next.is_hit() {
        ctx.events.push(CombatEvent::StrikePreDamage(next.clone()));
    }
    Some(next)
}

/// Phase 3: apply damage less `reduction` and publish the result.
///
/// Returns `None` if phase 2 never ran or either combatant is gone.
pub fn apply_strike_damage(
    ctx: &mut CombatContext<'_>,
    phase: &StrikePhaseResult,
    reduction: i32,
) -> Option<ResolvedStrike> {
    phase.degree?;
    if !ctx.is_alive(phase.attacker) {
        return None;
    }
    let target = ctx.store.get_mut(phase.target).filter(|d| d.is_alive())?;

    let reduction = reduction.max(0);
    let damage_applied = if phase.is_hit() {
        (phase.damage - reduction).max(0)
    } else {
        0
    };
    let hp_before = target.hp;
    target.hp = (target.hp - damage_applied).max(0);
    let hp_after = target.hp;
    let defeated = hp_after == 0;

    if defeated {
        mark_defeated(ctx, phase.target);
    }
    let resolved = ResolvedStrike {
        phase: phase.clone(),
        reduction,
        damage_applied,
        hp_before,
        hp_after,
        defeated,
    };
    debug!(
        target = %phase.target,
        damage_applied,
        hp_after,
        defeated,
        "strike resolved"
    );
    ctx.events.push(CombatEvent::StrikeResolved(resolved.clone()));
    Some(resolved)
}

/// All three phases with no reaction in between.
pub fn try_strike(
    ctx: &mut CombatContext<'_>,
    attacker: EntityHandle,
    target: EntityHandle,
    circumstance: i32,
) -> Option<ResolvedStrike> {
    let rolled = resolve_attack_roll(ctx, attacker, target, circumstance)?;
    let decided = determine_hit_and_damage(ctx, &rolled)?;
    apply_strike_damage(ctx, &decided, 0)
}

// =============================================================================
// Helpers
// =============================================================================

/// -2 per range increment beyond the first.
fn range_increment_penalty(distance_feet: u32, increment_feet: u32) -> i32 {
    if increment_feet == 0 || distance_feet <= increment_feet {
        return 0;
    }
    let increments = distance_feet.div_ceil(increment_feet);
    -2 * i32::try_from(increments - 1).unwrap_or(0)
}

/// Rolls weapon dice plus the flat bonus; at least 1.
pub(crate) fn roll_damage(dice: DamageDice, bonus: i32, rng: &mut dyn RandomSource) -> i32 {
    let rolled: i32 = (0..dice.count)
        .map(|_| i32::from(rng.roll_die(dice.sides)))
        .sum();
    (rolled + bonus).max(1)
}
