//! Initiative rolling and ordering.

use serde::{Deserialize, Serialize};

use crate::check::{self, CheckRoll, CheckSource};
use crate::context::CombatContext;
use crate::entity::{EntityHandle, InitiativeStat};

/// One slot in the initiative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    /// Combatant
    pub handle: EntityHandle,
    /// The initiative roll, kept unchanged through delays
    pub roll: CheckRoll,
    /// Player controlled at the time of rolling
    pub is_player: bool,
}

/// Sorts highest total first; ties go to adversaries, then to the lower handle.
pub fn sort_initiative(order: &mut [InitiativeEntry]) {
    order.sort_by(|a, b| {
        b.roll
            .total
            .cmp(&a.roll.total)
            .then(a.is_player.cmp(&b.is_player))
            .then(a.handle.cmp(&b.handle))
    });
}

/// Rolls initiative for every living combatant in handle order.
pub(crate) fn roll_initiative(
    ctx: &mut CombatContext<'_>,
    default_stat: InitiativeStat,
) -> Vec<InitiativeEntry> {
    let contenders: Vec<(EntityHandle, i32, CheckSource, bool)> = ctx
        .store
        .handles()
        .into_iter()
        .filter_map(|handle| {
            let data = ctx.store.get(handle)?;
            if !data.is_alive() {
                return None;
            }
            let stat = data.initiative.unwrap_or(default_stat);
            let source = match stat {
                InitiativeStat::Perception => CheckSource::Perception,
                InitiativeStat::Skill(skill) => CheckSource::Skill(skill),
            };
            Some((
                handle,
                data.initiative_modifier(stat),
                source,
                data.player_controlled,
            ))
        })
        .collect();

    let mut order: Vec<InitiativeEntry> = contenders
        .into_iter()
        .map(|(handle, modifier, source, is_player)| InitiativeEntry {
            handle,
            roll: check::roll(modifier, source, ctx.rng),
            is_player,
        })
        .collect();
    sort_initiative(&mut order);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, total: i32, is_player: bool) -> InitiativeEntry {
        InitiativeEntry {
            handle: EntityHandle::new(id),
            roll: CheckRoll {
                natural: 10,
                modifier: total - 10,
                total,
                source: CheckSource::Perception,
            },
            is_player,
        }
    }

    #[test]
    fn sorts_descending_with_adversaries_winning_ties() {
        let mut order = vec![
            entry(1, 15, true),
            entry(2, 20, true),
            entry(4, 15, false),
            entry(3, 15, false),
        ];
        sort_initiative(&mut order);
        let handles: Vec<u64> = order.iter().map(|e| e.handle.as_u64()).collect();
        assert_eq!(handles, vec![2, 3, 4, 1]);
    }
}
