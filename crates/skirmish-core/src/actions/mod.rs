//! Action resolvers.
//!
//! Every resolver has the same three-part shape:
//!
//! - `<action>_target_failure(ctx, ..) -> Option<TargetingFailure>` is a
//!   pure legality predicate. It never mutates anything.
//! - `can_<action>(ctx, ..) -> bool` is the predicate with no failure.
//! - `try_<action>(ctx, ..)` re-validates, rolls at most one check, applies
//!   the effects and returns the degree of success. It returns `None`
//!   without touching state when the action is illegal.
//!
//! Resolvers do not spend actions or take the execution lock. That is the
//! caller's job, see [`ActionExecutor`](crate::executor::ActionExecutor).
//!
//! # Resolvers
//!
//! - [`strike`]: three-phase Strike pipeline
//! - [`maneuver`]: Trip, Shove, Grapple and Reposition
//! - [`demoralize`]: Intimidation against Will
//! - [`escape`]: breaking a grapple
//! - [`support`]: Aid, Stand and Raise a Shield
//! - [`shield_block`]: the Shield Block reaction
//! - [`stride`]: movement legality and commit

pub mod demoralize;
pub mod escape;
pub mod maneuver;
pub mod shield_block;
pub mod strike;
pub mod stride;
pub mod support;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::condition::{ConditionService, ConditionType};
use crate::context::CombatContext;
use crate::entity::{EntityData, EntityHandle};
use crate::event::CombatEvent;

pub use demoralize::{can_demoralize, demoralize_target_failure, try_demoralize};
pub use escape::{can_escape, escape_target_failure, try_escape};
pub use maneuver::{
    can_grapple, can_reposition, can_shove, can_trip, grapple_target_failure,
    reposition_destinations, reposition_target_failure, shove_target_failure,
    trip_target_failure, try_grapple, try_reposition, try_shove, try_trip,
};
pub use shield_block::{
    can_shield_block, shield_block_failure, try_shield_block, ShieldBlockResult,
};
pub use strike::{
    apply_strike_damage, can_strike, determine_hit_and_damage, resolve_attack_roll,
    strike_target_failure, try_strike, ResolvedStrike, StrikePhaseResult,
};
pub use stride::{commit_stride, plan_stride, stride_failure, StridePlan};
pub use support::{
    aid_target_failure, can_aid, can_raise_shield, can_stand, raise_shield_failure,
    stand_failure, try_aid, try_raise_shield, try_stand,
};

// =============================================================================
// Shared Types
// =============================================================================

/// Why an action cannot be taken against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetingFailure {
    /// The target handle is unknown
    InvalidTarget,
    /// The actor or target is defeated
    NotAlive,
    /// The action cannot target its own user
    SelfTarget,
    /// The target is on the wrong side for this action
    WrongTeam,
    /// Too far away
    OutOfRange,
    /// Sight is blocked
    NoLineOfSight,
    /// The target stands on another level
    WrongElevation,
    /// More than one size larger than the actor
    TargetTooLarge,
    /// The wielded weapon is ranged
    RequiresMeleeWeapon,
    /// The wielded weapon lacks the trait the maneuver needs and no hand is free
    MissingRequiredWeaponTrait,
    /// The grapple relation the action relies on does not exist
    NoGrappleRelation,
    /// A condition or equipment state forbids the action
    InvalidState,
}

impl fmt::Display for TargetingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidTarget => "invalid target",
            Self::NotAlive => "not alive",
            Self::SelfTarget => "cannot target self",
            Self::WrongTeam => "wrong team",
            Self::OutOfRange => "out of range",
            Self::NoLineOfSight => "no line of sight",
            Self::WrongElevation => "wrong elevation",
            Self::TargetTooLarge => "target too large",
            Self::RequiresMeleeWeapon => "requires a melee weapon",
            Self::MissingRequiredWeaponTrait => "missing required weapon trait",
            Self::NoGrappleRelation => "no grapple relation",
            Self::InvalidState => "invalid state",
        };
        f.write_str(text)
    }
}

/// Every action the engine resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ActionKind {
    Strike,
    Trip,
    Shove,
    Grapple,
    Reposition,
    Demoralize,
    Escape,
    RaiseShield,
    Aid,
    Stand,
    Stride,
    ShieldBlock,
}

impl ActionKind {
    /// Actions with the attack trait count towards the multiple attack penalty.
    #[must_use]
    pub const fn has_attack_trait(self) -> bool {
        matches!(
            self,
            Self::Strike | Self::Trip | Self::Shove | Self::Grapple | Self::Reposition | Self::Escape
        )
    }

    /// Lowercase label, used as the execution lock tag.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Strike => "strike",
            Self::Trip => "trip",
            Self::Shove => "shove",
            Self::Grapple => "grapple",
            Self::Reposition => "reposition",
            Self::Demoralize => "demoralize",
            Self::Escape => "escape",
            Self::RaiseShield => "raise_shield",
            Self::Aid => "aid",
            Self::Stand => "stand",
            Self::Stride => "stride",
            Self::ShieldBlock => "shield_block",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Multiple attack penalty for the next attack-trait action.
#[must_use]
pub const fn map_penalty(map_count: u8, agile: bool) -> i32 {
    match (map_count, agile) {
        (0, _) => 0,
        (1, true) => -4,
        (1, false) => -5,
        (_, true) => -8,
        (_, false) => -10,
    }
}

// =============================================================================
// Shared Legality
// =============================================================================

/// Checks the common actor/target preconditions of hostile actions.
///
/// Returns both combatants when the target exists, is alive, is not the
/// actor and is on the opposing side.
pub(crate) fn hostile_pair<'s>(
    ctx: &'s CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
) -> Result<(&'s EntityData, &'s EntityData), TargetingFailure> {
    let (attacker, defender) = known_pair(ctx, actor, target)?;
    if !attacker.team.opposes(defender.team) {
        return Err(TargetingFailure::WrongTeam);
    }
    Ok((attacker, defender))
}

/// Like [`hostile_pair`] without the team check.
pub(crate) fn known_pair<'s>(
    ctx: &'s CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
) -> Result<(&'s EntityData, &'s EntityData), TargetingFailure> {
    let store: &'s dyn crate::store::EntityStore = &*ctx.store;
    let attacker = store.get(actor).ok_or(TargetingFailure::InvalidTarget)?;
    let defender = store.get(target).ok_or(TargetingFailure::InvalidTarget)?;
    if !attacker.is_alive() || !defender.is_alive() {
        return Err(TargetingFailure::NotAlive);
    }
    if actor == target {
        return Err(TargetingFailure::SelfTarget);
    }
    Ok((attacker, defender))
}

/// Logs a legality rejection and passes it through.
pub(crate) fn rejected(
    action: ActionKind,
    actor: EntityHandle,
    failure: TargetingFailure,
) -> TargetingFailure {
    debug!(%action, actor = %actor, %failure, "action rejected");
    failure
}

/// Counts an attack-trait action towards the actor's MAP.
pub(crate) fn count_attack(ctx: &mut CombatContext<'_>, actor: EntityHandle) {
    if let Some(data) = ctx.store.get_mut(actor) {
        data.turn.map_count = data.turn.map_count.saturating_add(1);
    }
}

// =============================================================================
// Shared Effects
// =============================================================================

/// Ends the grapple `grappler` is maintaining, clearing both sides.
pub(crate) fn release_grapple(ctx: &mut CombatContext<'_>, grappler: EntityHandle) {
    let Some(hold) = ctx
        .store
        .get_mut(grappler)
        .and_then(|d| d.links.grappling.take())
    else {
        return;
    };
    if let Some(target) = ctx.store.get_mut(hold.target) {
        if target.links.grappled_by == Some(grappler) {
            target.links.grappled_by = None;
        }
        ConditionService::remove(target, ConditionType::Grabbed, ctx.events);
        ConditionService::remove(target, ConditionType::Restrained, ctx.events);
    }
    debug!(grappler = %grappler, target = %hold.target, "grapple released");
    ctx.events.push(CombatEvent::GrappleReleased {
        grappler,
        target: hold.target,
    });
}

/// Removes a combatant that dropped to zero HP from the grid and its grapples.
pub(crate) fn mark_defeated(ctx: &mut CombatContext<'_>, entity: EntityHandle) {
    ctx.battlefield.vacate(entity);
    release_grapple(ctx, entity);
    let holder = ctx.store.get(entity).and_then(|d| d.links.grappled_by);
    if let Some(holder) = holder {
        release_grapple(ctx, holder);
    }
    debug!(entity = %entity, "defeated");
    ctx.events.push(CombatEvent::Defeated { entity });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::GrappleHold;
    use crate::store::EntityStore;
    use crate::tests::helpers::duel;

    #[test]
    fn map_ladder() {
        assert_eq!(map_penalty(0, false), 0);
        assert_eq!(map_penalty(1, false), -5);
        assert_eq!(map_penalty(2, false), -10);
        assert_eq!(map_penalty(5, false), -10);
        assert_eq!(map_penalty(1, true), -4);
        assert_eq!(map_penalty(2, true), -8);
    }

    #[test]
    fn attack_trait_membership() {
        assert!(ActionKind::Escape.has_attack_trait());
        assert!(ActionKind::Reposition.has_attack_trait());
        assert!(!ActionKind::Demoralize.has_attack_trait());
        assert!(!ActionKind::Stride.has_attack_trait());
    }

    #[test]
    fn hostile_pair_reasons() {
        let (mut enc, hero, goblin) = duel([]);
        let ctx = enc.context();
        assert!(hostile_pair(&ctx, hero, goblin).is_ok());
        assert_eq!(
            hostile_pair(&ctx, hero, hero).unwrap_err(),
            TargetingFailure::SelfTarget
        );
        assert_eq!(
            hostile_pair(&ctx, hero, EntityHandle::new(99)).unwrap_err(),
            TargetingFailure::InvalidTarget
        );
    }

    #[test]
    fn defeat_releases_holds_both_ways() {
        let (mut enc, hero, goblin) = duel([]);
        enc.roster.get_mut(hero).unwrap().links.grappling = Some(GrappleHold {
            target: goblin,
            established_round: 1,
        });
        enc.roster.get_mut(goblin).unwrap().links.grappled_by = Some(hero);

        mark_defeated(&mut enc.context(), goblin);
        assert!(enc.roster.get(hero).unwrap().links.grappling.is_none());
        assert!(enc.roster.get(goblin).unwrap().links.grappled_by.is_none());
        assert_eq!(enc.board.position_of(goblin), None);
        assert!(enc
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::Defeated { entity } if *entity == goblin)));
    }
}
