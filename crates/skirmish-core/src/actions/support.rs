//! Actions without a check: Aid, Stand and Raise a Shield.
//!
//! These always succeed once legal, so their `try_` functions return
//! [`DegreeOfSuccess::Success`] or `None`.

use tracing::debug;

use super::{known_pair, rejected, ActionKind, TargetingFailure};
use crate::check::DegreeOfSuccess;
use crate::condition::{ConditionService, ConditionType};
use crate::context::CombatContext;
use crate::entity::{EntityData, EntityHandle, PendingAid};

/// Circumstance bonus a prepared Aid grants.
pub const AID_BONUS: i32 = 1;

fn living<'s>(
    ctx: &'s CombatContext<'_>,
    actor: EntityHandle,
) -> Result<&'s EntityData, TargetingFailure> {
    let data = ctx
        .store
        .get(actor)
        .ok_or(TargetingFailure::InvalidTarget)?;
    if data.is_alive() {
        Ok(data)
    } else {
        Err(TargetingFailure::NotAlive)
    }
}

// =============================================================================
// Aid
// =============================================================================

/// Why `aider` cannot prepare to Aid `ally`.
#[must_use]
pub fn aid_target_failure(
    ctx: &CombatContext<'_>,
    aider: EntityHandle,
    ally: EntityHandle,
) -> Option<TargetingFailure> {
    let (a, b) = match known_pair(ctx, aider, ally) {
        Ok(pair) => pair,
        Err(failure) => return Some(failure),
    };
    if a.team != b.team {
        return Some(TargetingFailure::WrongTeam);
    }
    if a.position.level != b.position.level || !a.position.is_adjacent(b.position) {
        return Some(TargetingFailure::OutOfRange);
    }
    None
}

/// True if `aider` may Aid `ally`.
#[must_use]
pub fn can_aid(ctx: &CombatContext<'_>, aider: EntityHandle, ally: EntityHandle) -> bool {
    aid_target_failure(ctx, aider, ally).is_none()
}

/// Prepares a bonus for `ally`'s next Strike or Athletics maneuver.
///
/// The bonus replaces any earlier pending Aid and lapses when the aider's
/// next turn starts.
pub fn try_aid(
    ctx: &mut CombatContext<'_>,
    aider: EntityHandle,
    ally: EntityHandle,
) -> Option<DegreeOfSuccess> {
    if let Some(failure) = aid_target_failure(ctx, aider, ally) {
        rejected(ActionKind::Aid, aider, failure);
        return None;
    }
    let data = ctx.store.get_mut(ally)?;
    data.links.aid = Some(PendingAid {
        aider,
        bonus: AID_BONUS,
    });
    debug!(aider = %aider, ally = %ally, "aid prepared");
    Some(DegreeOfSuccess::Success)
}

/// Removes and returns the pending Aid bonus of `actor`, 0 if none.
pub(crate) fn take_aid(ctx: &mut CombatContext<'_>, actor: EntityHandle) -> i32 {
    ctx.store
        .get_mut(actor)
        .and_then(|d| d.links.aid.take())
        .map_or(0, |aid| aid.bonus)
}

/// The pending Aid bonus of `actor` without consuming it.
#[must_use]
pub fn pending_aid(ctx: &CombatContext<'_>, actor: EntityHandle) -> i32 {
    ctx.store
        .get(actor)
        .and_then(|d| d.links.aid)
        .map_or(0, |aid| aid.bonus)
}

// =============================================================================
// Stand
// =============================================================================

/// Why `actor` cannot Stand.
#[must_use]
pub fn stand_failure(ctx: &CombatContext<'_>, actor: EntityHandle) -> Option<TargetingFailure> {
    match living(ctx, actor) {
        Ok(data) if data.has_condition(ConditionType::Prone) => None,
        Ok(_) => Some(TargetingFailure::InvalidState),
        Err(failure) => Some(failure),
    }
}

/// True if `actor` is prone and may Stand.
#[must_use]
pub fn can_stand(ctx: &CombatContext<'_>, actor: EntityHandle) -> bool {
    stand_failure(ctx, actor).is_none()
}

/// Stands up, removing prone.
pub fn try_stand(ctx: &mut CombatContext<'_>, actor: EntityHandle) -> Option<DegreeOfSuccess> {
    if let Some(failure) = stand_failure(ctx, actor) {
        rejected(ActionKind::Stand, actor, failure);
        return None;
    }
    let data = ctx.store.get_mut(actor)?;
    ConditionService::remove(data, ConditionType::Prone, ctx.events);
    Some(DegreeOfSuccess::Success)
}

// =============================================================================
// Raise a Shield
// =============================================================================

/// Why `actor` cannot Raise a Shield.
#[must_use]
pub fn raise_shield_failure(ctx: &CombatContext<'_>, actor: EntityHandle) -> Option<TargetingFailure> {
    let data = match living(ctx, actor) {
        Ok(data) => data,
        Err(failure) => return Some(failure),
    };
    match data.shield() {
        Some(shield) if !shield.raised && !shield.is_broken() => None,
        _ => Some(TargetingFailure::InvalidState),
    }
}

/// True if `actor` holds an unbroken, lowered shield.
#[must_use]
pub fn can_raise_shield(ctx: &CombatContext<'_>, actor: EntityHandle) -> bool {
    raise_shield_failure(ctx, actor).is_none()
}

/// Raises the shield until the start of the actor's next turn.
pub fn try_raise_shield(ctx: &mut CombatContext<'_>, actor: EntityHandle) -> Option<DegreeOfSuccess> {
    if let Some(failure) = raise_shield_failure(ctx, actor) {
        rejected(ActionKind::RaiseShield, actor, failure);
        return None;
    }
    let shield = ctx.store.get_mut(actor)?.shield_mut()?;
    shield.raised = true;
    debug!(actor = %actor, bonus = shield.ac_bonus, "shield raised");
    Some(DegreeOfSuccess::Success)
}
