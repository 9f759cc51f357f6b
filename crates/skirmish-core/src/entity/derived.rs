//! Cached derived statistics.
//!
//! Armor class and the condition-driven penalties are recomputed only when
//! their inputs change. The cache is keyed by a fingerprint of every input
//! and can also be invalidated explicitly through a dirty flag.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::components::{Armor, ProficiencyRank, Shield};
use crate::condition::{ActiveCondition, ConditionType};

/// Statistics computed from abilities, equipment and conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DerivedStats {
    /// Armor class including a raised shield, off-guard and frightened
    pub armor_class: i32,
    /// Status penalty to every check and DC (frightened value)
    pub status_penalty: i32,
    /// Circumstance penalty to attack rolls (prone)
    pub attack_penalty: i32,
    /// Off-guard: -2 circumstance to AC
    pub off_guard: bool,
    /// Cannot use move actions
    pub immobilized: bool,
    /// Cannot use attack-trait actions other than Escape
    pub attacks_forbidden: bool,
}

/// Every input the derived stats depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DerivedKey {
    dexterity: i32,
    level: u32,
    defense: ProficiencyRank,
    armor: Option<(i32, Option<i32>)>,
    shield: Option<(i32, bool, bool)>,
    conditions: u64,
}

impl DerivedKey {
    pub(crate) fn new(
        dexterity: i32,
        level: u32,
        defense: ProficiencyRank,
        armor: Option<&Armor>,
        shield: Option<&Shield>,
        conditions: &[ActiveCondition],
    ) -> Self {
        Self {
            dexterity,
            level,
            defense,
            armor: armor.map(|a| (a.ac_bonus, a.dex_cap)),
            shield: shield.map(|s| (s.ac_bonus, s.raised, s.is_broken())),
            conditions: condition_fingerprint(conditions),
        }
    }

    pub(crate) fn compute(&self, conditions: &[ActiveCondition]) -> DerivedStats {
        let has = |kind: ConditionType| conditions.iter().any(|c| c.kind == kind);
        let frightened = conditions
            .iter()
            .find(|c| c.kind == ConditionType::Frightened)
            .map_or(0, |c| i32::from(c.value));

        let prone = has(ConditionType::Prone);
        let grabbed = has(ConditionType::Grabbed);
        let restrained = has(ConditionType::Restrained);
        let off_guard = prone || grabbed || restrained;

        let (armor_bonus, dex) = match self.armor {
            Some((bonus, Some(cap))) => (bonus, self.dexterity.min(cap)),
            Some((bonus, None)) => (bonus, self.dexterity),
            None => (0, self.dexterity),
        };
        let shield_bonus = match self.shield {
            Some((bonus, true, false)) => bonus,
            _ => 0,
        };

        let armor_class = 10 + dex + armor_bonus + self.defense.bonus(self.level) + shield_bonus
            - if off_guard { 2 } else { 0 }
            - frightened;

        DerivedStats {
            armor_class,
            status_penalty: frightened,
            attack_penalty: if prone { 2 } else { 0 },
            off_guard,
            immobilized: grabbed || restrained,
            attacks_forbidden: restrained,
        }
    }
}

/// Order-insensitive fingerprint of the active conditions and their values.
///
/// Durations are left out: they never change a derived statistic.
fn condition_fingerprint(conditions: &[ActiveCondition]) -> u64 {
    let mut pairs: Vec<(ConditionType, u8)> =
        conditions.iter().map(|c| (c.kind, c.value)).collect();
    pairs.sort_unstable();
    let mut hasher = DefaultHasher::new();
    pairs.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Remaining;

    fn cond(kind: ConditionType, value: u8) -> ActiveCondition {
        ActiveCondition {
            kind,
            value,
            remaining: Remaining::Indefinite,
        }
    }

    #[test]
    fn fingerprint_ignores_order_and_duration() {
        let a = [cond(ConditionType::Prone, 0), cond(ConditionType::Frightened, 2)];
        let mut b = [cond(ConditionType::Frightened, 2), cond(ConditionType::Prone, 0)];
        b[0].remaining = Remaining::Rounds(3);
        assert_eq!(condition_fingerprint(&a), condition_fingerprint(&b));
        assert_ne!(
            condition_fingerprint(&a),
            condition_fingerprint(&[cond(ConditionType::Frightened, 1)])
        );
    }

    #[test]
    fn armor_caps_dexterity() {
        let armor = Armor {
            ac_bonus: 4,
            dex_cap: Some(1),
        };
        let key = DerivedKey::new(3, 1, ProficiencyRank::Trained, Some(&armor), None, &[]);
        // 10 + 1 (capped) + 4 + 3 (trained at level 1)
        assert_eq!(key.compute(&[]).armor_class, 18);
    }

    #[test]
    fn conditions_feed_armor_class() {
        let conditions = [cond(ConditionType::Prone, 0), cond(ConditionType::Frightened, 1)];
        let key = DerivedKey::new(0, 1, ProficiencyRank::Trained, None, None, &conditions);
        let stats = key.compute(&conditions);
        assert_eq!(stats.armor_class, 13 - 2 - 1);
        assert_eq!(stats.status_penalty, 1);
        assert_eq!(stats.attack_penalty, 2);
        assert!(stats.off_guard);
        assert!(!stats.immobilized);
    }

    #[test]
    fn only_raised_intact_shield_counts() {
        let mut shield = Shield::steel();
        let lowered = DerivedKey::new(0, 1, ProficiencyRank::Trained, None, Some(&shield), &[]);
        shield.raised = true;
        let raised = DerivedKey::new(0, 1, ProficiencyRank::Trained, None, Some(&shield), &[]);
        shield.hp = shield.broken_threshold;
        let broken = DerivedKey::new(0, 1, ProficiencyRank::Trained, None, Some(&shield), &[]);
        assert_eq!(lowered.compute(&[]).armor_class, 13);
        assert_eq!(raised.compute(&[]).armor_class, 15);
        assert_eq!(broken.compute(&[]).armor_class, 13);
    }

    #[test]
    fn restrained_forbids_attacks() {
        let conditions = [cond(ConditionType::Restrained, 0)];
        let key = DerivedKey::new(0, 1, ProficiencyRank::Trained, None, None, &conditions);
        let stats = key.compute(&conditions);
        assert!(stats.attacks_forbidden);
        assert!(stats.immobilized);
    }
}
