//! The Shield Block reaction.
//!
//! Interposed between phases 2 and 3 of a Strike: the shield absorbs up to
//! its hardness and takes the rest of the damage itself.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{rejected, ActionKind, TargetingFailure};
use crate::context::CombatContext;
use crate::entity::EntityHandle;
use crate::event::CombatEvent;

/// What a Shield Block did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldBlockResult {
    /// Shield bearer
    pub reactor: EntityHandle,
    /// Damage prevented, to be subtracted from the Strike
    pub reduction: i32,
    /// Damage the shield took
    pub shield_damage: i32,
    /// Shield HP afterwards
    pub shield_hp: i32,
    /// The shield broke
    pub broken: bool,
}

/// Why `reactor` cannot Shield Block.
#[must_use]
pub fn shield_block_failure(ctx: &CombatContext<'_>, reactor: EntityHandle) -> Option<TargetingFailure> {
    let Some(data) = ctx.store.get(reactor) else {
        return Some(TargetingFailure::InvalidTarget);
    };
    if !data.is_alive() {
        return Some(TargetingFailure::NotAlive);
    }
    if !data.turn.reaction_available {
        return Some(TargetingFailure::InvalidState);
    }
    match data.shield() {
        Some(shield) if shield.raised && !shield.is_broken() => None,
        _ => Some(TargetingFailure::InvalidState),
    }
}

/// True if `reactor` has its reaction and a raised, intact shield.
#[must_use]
pub fn can_shield_block(ctx: &CombatContext<'_>, reactor: EntityHandle) -> bool {
    shield_block_failure(ctx, reactor).is_none()
}

/// Blocks `incoming` damage with the raised shield and spends the reaction.
pub fn try_shield_block(
    ctx: &mut CombatContext<'_>,
    reactor: EntityHandle,
    incoming: i32,
) -> Option<ShieldBlockResult> {
    if let Some(failure) = shield_block_failure(ctx, reactor) {
        rejected(ActionKind::ShieldBlock, reactor, failure);
        return None;
    }
    let incoming = incoming.max(0);
    let data = ctx.store.get_mut(reactor)?;
    data.turn.reaction_available = false;
    let shield = data.shield_mut()?;

    let reduction = shield.hardness.min(incoming);
    let shield_damage = (incoming - shield.hardness).max(0);
    shield.hp = (shield.hp - shield_damage).max(0);
    let broken = shield.is_broken();
    if broken {
        shield.raised = false;
    }
    let result = ShieldBlockResult {
        reactor,
        reduction,
        shield_damage,
        shield_hp: shield.hp,
        broken,
    };
    debug!(reactor = %reactor, reduction, shield_damage, broken, "shield block");
    ctx.events.push(CombatEvent::ShieldBlocked {
        reactor,
        reduction,
        shield_damage,
        broken,
    });
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Shield;
    use crate::store::EntityStore;
    use crate::tests::helpers::duel;

    fn raise(enc: &mut crate::context::Encounter<crate::dice::ScriptedDice>, who: EntityHandle) {
        let data = enc.roster.get_mut(who).unwrap();
        data.equip_shield(Some(Shield::steel()));
        data.shield_mut().unwrap().raised = true;
    }

    #[test]
    fn block_absorbs_hardness_and_damages_shield() {
        let (mut enc, _, goblin) = duel([]);
        raise(&mut enc, goblin);
        let result = try_shield_block(&mut enc.context(), goblin, 10).unwrap();
        assert_eq!(result.reduction, 5);
        assert_eq!(result.shield_damage, 5);
        assert_eq!(result.shield_hp, 15);
        assert!(!result.broken);
        assert!(!enc.roster.get(goblin).unwrap().turn.reaction_available);
    }

    #[test]
    fn small_hits_are_fully_absorbed() {
        let (mut enc, _, goblin) = duel([]);
        raise(&mut enc, goblin);
        let result = try_shield_block(&mut enc.context(), goblin, 3).unwrap();
        assert_eq!(result.reduction, 3);
        assert_eq!(result.shield_damage, 0);
    }

    #[test]
    fn heavy_hit_breaks_and_lowers_the_shield() {
        let (mut enc, _, goblin) = duel([]);
        raise(&mut enc, goblin);
        let result = try_shield_block(&mut enc.context(), goblin, 16).unwrap();
        assert!(result.broken);
        let shield = *enc.roster.get(goblin).unwrap().shield().unwrap();
        assert_eq!(shield.hp, 9);
        assert!(!shield.raised);
    }

    #[test]
    fn needs_reaction_and_raised_shield() {
        let (mut enc, _, goblin) = duel([]);
        assert_eq!(
            shield_block_failure(&enc.context(), goblin),
            Some(TargetingFailure::InvalidState)
        );
        raise(&mut enc, goblin);
        enc.roster.get_mut(goblin).unwrap().turn.reaction_available = false;
        assert!(!can_shield_block(&enc.context(), goblin));
        assert!(try_shield_block(&mut enc.context(), goblin, 10).is_none());
        assert!(enc.events.is_empty());
    }
}
