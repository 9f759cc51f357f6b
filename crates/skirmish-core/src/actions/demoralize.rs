//! Demoralize: Intimidation against Will.

use tracing::debug;

use super::{hostile_pair, rejected, ActionKind, TargetingFailure};
use crate::check::{self, CheckSource, DegreeOfSuccess};
use crate::condition::{ConditionService, ConditionType, Remaining};
use crate::context::CombatContext;
use crate::entity::{EntityHandle, Save, Skill};
use crate::event::CombatEvent;

/// Demoralize works on targets within this many feet.
pub const DEMORALIZE_RANGE_FEET: u32 = 30;

/// Why `actor` cannot Demoralize `target`.
#[must_use]
pub fn demoralize_target_failure(
    ctx: &CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
) -> Option<TargetingFailure> {
    let (a, t) = match hostile_pair(ctx, actor, target) {
        Ok(pair) => pair,
        Err(failure) => return Some(failure),
    };
    if t.links.demoralize_immunity.contains(&actor) {
        return Some(TargetingFailure::InvalidState);
    }
    if a.position.distance_feet(t.position) > DEMORALIZE_RANGE_FEET {
        return Some(TargetingFailure::OutOfRange);
    }
    if !ctx.battlefield.has_line_of_sight(a.position, t.position) {
        return Some(TargetingFailure::NoLineOfSight);
    }
    None
}

/// True if `actor` may Demoralize `target`.
#[must_use]
pub fn can_demoralize(ctx: &CombatContext<'_>, actor: EntityHandle, target: EntityHandle) -> bool {
    demoralize_target_failure(ctx, actor, target).is_none()
}

/// Demoralizes `target`: frightened 2 on a critical success, 1 on a success.
///
/// Whatever the result, the target becomes immune to this actor's
/// Demoralize for the rest of the encounter.
pub fn try_demoralize(
    ctx: &mut CombatContext<'_>,
    actor: EntityHandle,
    target: EntityHandle,
) -> Option<DegreeOfSuccess> {
    if let Some(failure) = demoralize_target_failure(ctx, actor, target) {
        rejected(ActionKind::Demoralize, actor, failure);
        return None;
    }
    let modifier = ctx.store.get(actor)?.skill_modifier(Skill::Intimidation);
    let dc = ctx.store.get(target)?.save_dc(Save::Will);
    let outcome = check::roll_check(
        modifier,
        dc,
        CheckSource::Skill(Skill::Intimidation),
        ctx.rng,
    );
    let degree = outcome.degree;
    ctx.events.push(CombatEvent::SkillCheckResolved {
        action: ActionKind::Demoralize,
        actor,
        target: Some(target),
        outcome,
    });

    let frightened = match degree {
        DegreeOfSuccess::CriticalSuccess => 2,
        DegreeOfSuccess::Success => 1,
        DegreeOfSuccess::Failure | DegreeOfSuccess::CriticalFailure => 0,
    };
    if let Some(data) = ctx.store.get_mut(target) {
        if frightened > 0 {
            ConditionService::apply(
                data,
                ConditionType::Frightened,
                frightened,
                Remaining::Indefinite,
                ctx.events,
            );
        }
        data.links.demoralize_immunity.insert(actor);
    }
    debug!(actor = %actor, target = %target, %degree, frightened, "demoralize resolved");
    Some(degree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntityStore;
    use crate::tests::helpers::duel;
    use tessera::Cell;

    #[test]
    fn success_frightens_once() {
        // 10 + 3 = 13 vs Will DC 13
        let (mut enc, hero, goblin) = duel([10]);
        assert_eq!(
            try_demoralize(&mut enc.context(), hero, goblin),
            Some(DegreeOfSuccess::Success)
        );
        let target = enc.roster.get(goblin).unwrap();
        assert_eq!(target.condition_value(ConditionType::Frightened), Some(1));
        assert_eq!(target.armor_class(), 12);
    }

    #[test]
    fn critical_success_frightens_twice() {
        let (mut enc, hero, goblin) = duel([20]);
        try_demoralize(&mut enc.context(), hero, goblin);
        assert_eq!(
            enc.roster.get(goblin).unwrap().condition_value(ConditionType::Frightened),
            Some(2)
        );
    }

    #[test]
    fn any_attempt_grants_immunity() {
        let (mut enc, hero, goblin) = duel([2]);
        assert_eq!(
            try_demoralize(&mut enc.context(), hero, goblin),
            Some(DegreeOfSuccess::Failure)
        );
        assert_eq!(
            demoralize_target_failure(&enc.context(), hero, goblin),
            Some(TargetingFailure::InvalidState)
        );
    }

    #[test]
    fn range_is_thirty_feet() {
        let (mut enc, hero, goblin) = duel([]);
        enc.roster.get_mut(goblin).unwrap().position = Cell::new(7, 1, 0);
        assert_eq!(demoralize_target_failure(&enc.context(), hero, goblin), None);
        enc.roster.get_mut(goblin).unwrap().position = Cell::new(8, 1, 0);
        assert_eq!(
            demoralize_target_failure(&enc.context(), hero, goblin),
            Some(TargetingFailure::OutOfRange)
        );
    }
}
