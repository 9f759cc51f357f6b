//! Escape from a grapple.

use super::{
    count_attack, known_pair, map_penalty, rejected, release_grapple, ActionKind, TargetingFailure,
};
use crate::check::{self, CheckSource, DegreeOfSuccess};
use crate::context::CombatContext;
use crate::entity::{EntityHandle, Skill};
use crate::event::CombatEvent;

/// Why `actor` cannot try to Escape `grappler`.
#[must_use]
pub fn escape_target_failure(
    ctx: &CombatContext<'_>,
    actor: EntityHandle,
    grappler: EntityHandle,
) -> Option<TargetingFailure> {
    let (a, g) = match known_pair(ctx, actor, grappler) {
        Ok(pair) => pair,
        Err(failure) => return Some(failure),
    };
    let held = a.links.grappled_by == Some(grappler)
        && g.links.grappling.is_some_and(|hold| hold.target == actor);
    if held {
        None
    } else {
        Some(TargetingFailure::NoGrappleRelation)
    }
}

/// True if `actor` is held by `grappler`.
#[must_use]
pub fn can_escape(ctx: &CombatContext<'_>, actor: EntityHandle, grappler: EntityHandle) -> bool {
    escape_target_failure(ctx, actor, grappler).is_none()
}

/// Escapes `grappler`'s hold using the better of Athletics and Acrobatics
/// against the grappler's Athletics DC. Any success ends the hold.
pub fn try_escape(
    ctx: &mut CombatContext<'_>,
    actor: EntityHandle,
    grappler: EntityHandle,
) -> Option<DegreeOfSuccess> {
    if let Some(failure) = escape_target_failure(ctx, actor, grappler) {
        rejected(ActionKind::Escape, actor, failure);
        return None;
    }
    let a = ctx.store.get(actor)?;
    let athletics = a.skill_modifier(Skill::Athletics);
    let acrobatics = a.skill_modifier(Skill::Acrobatics);
    let (skill, best) = if acrobatics > athletics {
        (Skill::Acrobatics, acrobatics)
    } else {
        (Skill::Athletics, athletics)
    };
    let modifier = best + map_penalty(a.turn.map_count, false);
    let dc = ctx.store.get(grappler)?.skill_dc(Skill::Athletics);

    let outcome = check::roll_check(modifier, dc, CheckSource::Skill(skill), ctx.rng);
    let degree = outcome.degree;
    count_attack(ctx, actor);
    ctx.events.push(CombatEvent::SkillCheckResolved {
        action: ActionKind::Escape,
        actor,
        target: Some(grappler),
        outcome,
    });
    if degree.is_success() {
        release_grapple(ctx, grappler);
    }
    Some(degree)
}
