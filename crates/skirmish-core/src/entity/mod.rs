//! Combatant identity and data.
//!
//! This module provides the core combatant types:
//! - [`EntityHandle`]: Opaque identity, with zero reserved as "none"
//! - [`Team`]: Which side a combatant fights for
//! - [`Size`]: Creature size, used by the Athletics maneuvers
//! - [`EntityData`]: Everything the rules engine reads and writes about a combatant
//!
//! # Example
//!
//! ```
//! use skirmish_core::entity::{EntityData, EntityHandle, Team};
//! use tessera::Cell;
//!
//! let fighter = EntityData::new("Kyra", Team::Party, Cell::new(0, 0, 0))
//!     .with_level(3)
//!     .with_hp(40);
//!
//! assert!(fighter.is_alive());
//! assert!(fighter.handle().is_none());
//! assert_eq!(EntityHandle::NONE.as_u64(), 0);
//! ```

pub mod components;
pub mod derived;

use std::fmt;

use serde::{Deserialize, Serialize};
use tessera::Cell;

use crate::condition::{ActiveCondition, ConditionType};
pub use components::{
    Ability, AbilityModifiers, Armor, DamageDice, Entanglements, GrappleHold, InitiativeStat,
    PendingAid, Proficiencies, ProficiencyRank, Save, Shield, Skill, TurnBudget, Weapon,
    WeaponRange, WeaponTraits,
};
pub use derived::DerivedStats;
use derived::DerivedKey;

// =============================================================================
// Identity
// =============================================================================

/// Opaque combatant identity.
///
/// Handles are ordered by their numeric value, which every tie-break in the
/// engine relies on. The value zero is the [`EntityHandle::NONE`] sentinel
/// and is never issued by a store.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// The "no combatant" sentinel.
    pub const NONE: Self = Self(0);

    /// Creates a handle from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// True for the sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityHandle({})", self.0)
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for EntityHandle {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityHandle> for u64 {
    fn from(handle: EntityHandle) -> Self {
        handle.as_u64()
    }
}

/// Side of the fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    /// The player characters and their allies
    Party,
    /// Everyone the party is fighting
    Adversary,
}

impl Team {
    /// True when the two teams are enemies.
    #[must_use]
    pub fn opposes(self, other: Self) -> bool {
        self != other
    }
}

/// Creature size.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[allow(missing_docs)]
pub enum Size {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
    Gargantuan,
}

impl Size {
    /// Size steps by which `self` exceeds `other` (negative when smaller).
    #[must_use]
    pub fn steps_above(self, other: Self) -> i32 {
        self as i32 - other as i32
    }
}

// =============================================================================
// Combatant Data
// =============================================================================

/// A combatant.
///
/// Statistic fields are public and freely editable. Equipment that feeds
/// armor class and the condition list are private: change them through the
/// setters here or through [`ConditionService`](crate::condition::ConditionService)
/// so the derived-stat cache sees the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    handle: EntityHandle,
    /// Display name
    pub name: String,
    /// Side of the fight
    pub team: Team,
    /// Driven by a human rather than the AI
    pub player_controlled: bool,
    /// Character or creature level
    pub level: u32,
    /// Creature size
    pub size: Size,
    /// Current cell
    pub position: Cell,
    /// Current hit points
    pub hp: i32,
    /// Maximum hit points
    pub max_hp: i32,
    /// Land speed in feet
    pub speed_feet: u32,
    /// Ability modifiers
    pub abilities: AbilityModifiers,
    /// Proficiency ranks
    pub proficiencies: Proficiencies,
    /// Statistic rolled for initiative, `None` uses the engine default
    pub initiative: Option<InitiativeStat>,
    /// Wielded weapon, `None` fights unarmed
    pub weapon: Option<Weapon>,
    /// Action economy for the current turn
    pub turn: TurnBudget,
    /// Grapples, pending aid and demoralize immunity
    pub links: Entanglements,
    armor: Option<Armor>,
    shield: Option<Shield>,
    conditions: Vec<ActiveCondition>,
    #[serde(skip)]
    derived: std::cell::Cell<Option<(DerivedKey, DerivedStats)>>,
    #[serde(skip)]
    derived_dirty: std::cell::Cell<bool>,
}

impl EntityData {
    /// Creates a level 1, 20 HP, medium combatant with a 25-foot speed.
    #[must_use]
    pub fn new(name: impl Into<String>, team: Team, position: Cell) -> Self {
        Self {
            handle: EntityHandle::NONE,
            name: name.into(),
            team,
            player_controlled: false,
            level: 1,
            size: Size::Medium,
            position,
            hp: 20,
            max_hp: 20,
            speed_feet: 25,
            abilities: AbilityModifiers::default(),
            proficiencies: Proficiencies::default(),
            initiative: None,
            weapon: None,
            turn: TurnBudget::default(),
            links: Entanglements::default(),
            armor: None,
            shield: None,
            conditions: Vec::new(),
            derived: std::cell::Cell::new(None),
            derived_dirty: std::cell::Cell::new(true),
        }
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    /// Marks the combatant as player controlled.
    #[must_use]
    pub fn player_controlled(mut self) -> Self {
        self.player_controlled = true;
        self
    }

    /// Sets the level.
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self.mark_dirty();
        self
    }

    /// Sets current and maximum HP.
    #[must_use]
    pub fn with_hp(mut self, hp: i32) -> Self {
        self.hp = hp;
        self.max_hp = hp;
        self
    }

    /// Sets the land speed.
    #[must_use]
    pub fn with_speed(mut self, speed_feet: u32) -> Self {
        self.speed_feet = speed_feet;
        self
    }

    /// Sets the size.
    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Sets the ability modifiers.
    #[must_use]
    pub fn with_abilities(mut self, abilities: AbilityModifiers) -> Self {
        self.abilities = abilities;
        self.mark_dirty();
        self
    }

    /// Sets the proficiency ranks.
    #[must_use]
    pub fn with_proficiencies(mut self, proficiencies: Proficiencies) -> Self {
        self.proficiencies = proficiencies;
        self.mark_dirty();
        self
    }

    /// Sets the initiative statistic.
    #[must_use]
    pub fn with_initiative(mut self, stat: InitiativeStat) -> Self {
        self.initiative = Some(stat);
        self
    }

    /// Wields a weapon.
    #[must_use]
    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapon = Some(weapon);
        self
    }

    /// Wears armor.
    #[must_use]
    pub fn with_armor(mut self, armor: Armor) -> Self {
        self.equip_armor(Some(armor));
        self
    }

    /// Carries a shield.
    #[must_use]
    pub fn with_shield(mut self, shield: Shield) -> Self {
        self.equip_shield(Some(shield));
        self
    }

    // -------------------------------------------------------------------------
    // Identity and Vitality
    // -------------------------------------------------------------------------

    /// Handle assigned by the owning store.
    #[must_use]
    pub const fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: EntityHandle) {
        self.handle = handle;
    }

    /// True while HP is above zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    // -------------------------------------------------------------------------
    // Equipment
    // -------------------------------------------------------------------------

    /// Worn armor.
    #[must_use]
    pub const fn armor(&self) -> Option<&Armor> {
        self.armor.as_ref()
    }

    /// Carried shield.
    #[must_use]
    pub const fn shield(&self) -> Option<&Shield> {
        self.shield.as_ref()
    }

    /// Mutable shield access; invalidates the derived stats.
    pub fn shield_mut(&mut self) -> Option<&mut Shield> {
        self.mark_dirty();
        self.shield.as_mut()
    }

    /// Replaces the worn armor.
    pub fn equip_armor(&mut self, armor: Option<Armor>) {
        self.armor = armor;
        self.mark_dirty();
    }

    /// Replaces the carried shield.
    pub fn equip_shield(&mut self, shield: Option<Shield>) {
        self.shield = shield;
        self.mark_dirty();
    }

    /// The weapon used for Strikes: the wielded one or a fist.
    #[must_use]
    pub fn strike_weapon(&self) -> Weapon {
        self.weapon.clone().unwrap_or_else(Weapon::fist)
    }

    /// A hand is free for a maneuver: unarmed, or a one-handed weapon and no shield.
    #[must_use]
    pub fn has_free_hand(&self) -> bool {
        match &self.weapon {
            None => true,
            Some(w) => !w.traits.contains(WeaponTraits::TWO_HAND) && self.shield.is_none(),
        }
    }

    // -------------------------------------------------------------------------
    // Conditions
    // -------------------------------------------------------------------------

    /// Active conditions.
    #[must_use]
    pub fn conditions(&self) -> &[ActiveCondition] {
        &self.conditions
    }

    /// True if the condition is active.
    #[must_use]
    pub fn has_condition(&self, kind: ConditionType) -> bool {
        self.conditions.iter().any(|c| c.kind == kind)
    }

    /// Value of a condition, `None` when inactive.
    #[must_use]
    pub fn condition_value(&self, kind: ConditionType) -> Option<u8> {
        self.conditions
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.value)
    }

    pub(crate) fn conditions_mut(&mut self) -> &mut Vec<ActiveCondition> {
        self.mark_dirty();
        &mut self.conditions
    }

    // -------------------------------------------------------------------------
    // Derived Statistics
    // -------------------------------------------------------------------------

    /// Forces the next [`derived`](Self::derived) call to recompute.
    pub fn mark_dirty(&self) {
        self.derived_dirty.set(true);
    }

    /// Derived statistics, recomputed only when an input changed.
    #[must_use]
    pub fn derived(&self) -> DerivedStats {
        let key = DerivedKey::new(
            self.abilities.dexterity,
            self.level,
            self.proficiencies.defense,
            self.armor.as_ref(),
            self.shield.as_ref(),
            &self.conditions,
        );
        if !self.derived_dirty.get() {
            if let Some((cached_key, stats)) = self.derived.get() {
                if cached_key == key {
                    return stats;
                }
            }
        }
        let stats = key.compute(&self.conditions);
        self.derived.set(Some((key, stats)));
        self.derived_dirty.set(false);
        stats
    }

    /// Armor class, before cover.
    #[must_use]
    pub fn armor_class(&self) -> i32 {
        self.derived().armor_class
    }

    /// Perception modifier.
    #[must_use]
    pub fn perception_modifier(&self) -> i32 {
        self.abilities.wisdom + self.proficiencies.perception.bonus(self.level)
            - self.derived().status_penalty
    }

    /// Skill modifier.
    #[must_use]
    pub fn skill_modifier(&self, skill: Skill) -> i32 {
        self.abilities.get(skill.key_ability()) + self.proficiencies.skill(skill).bonus(self.level)
            - self.derived().status_penalty
    }

    /// Skill DC (10 + modifier).
    #[must_use]
    pub fn skill_dc(&self, skill: Skill) -> i32 {
        10 + self.skill_modifier(skill)
    }

    /// Saving throw modifier.
    #[must_use]
    pub fn save_modifier(&self, save: Save) -> i32 {
        self.abilities.get(save.key_ability()) + self.proficiencies.save(save).bonus(self.level)
            - self.derived().status_penalty
    }

    /// Save DC (10 + modifier).
    #[must_use]
    pub fn save_dc(&self, save: Save) -> i32 {
        10 + self.save_modifier(save)
    }

    /// Modifier for an initiative statistic.
    #[must_use]
    pub fn initiative_modifier(&self, stat: InitiativeStat) -> i32 {
        match stat {
            InitiativeStat::Perception => self.perception_modifier(),
            InitiativeStat::Skill(skill) => self.skill_modifier(skill),
        }
    }

    /// Attack modifier with a weapon, before the multiple attack penalty.
    #[must_use]
    pub fn attack_modifier(&self, weapon: &Weapon) -> i32 {
        let ability = if !weapon.is_melee() {
            self.abilities.dexterity
        } else if weapon.traits.contains(WeaponTraits::FINESSE) {
            self.abilities.strength.max(self.abilities.dexterity)
        } else {
            self.abilities.strength
        };
        let derived = self.derived();
        ability + self.proficiencies.attacks.bonus(self.level) + weapon.item_bonus
            - derived.status_penalty
            - derived.attack_penalty
    }

    /// Flat damage bonus with a weapon: Strength for melee plus the weapon's own bonus.
    #[must_use]
    pub fn damage_bonus(&self, weapon: &Weapon) -> i32 {
        let strength = if weapon.is_melee() {
            self.abilities.strength
        } else {
            0
        };
        strength + weapon.damage.bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Remaining;

    fn fighter() -> EntityData {
        EntityData::new("fighter", Team::Party, Cell::new(0, 0, 0)).with_abilities(
            AbilityModifiers {
                strength: 4,
                dexterity: 2,
                wisdom: 1,
                charisma: 0,
                ..AbilityModifiers::default()
            },
        )
    }

    #[test]
    fn handle_sentinel() {
        assert!(EntityHandle::NONE.is_none());
        assert!(!EntityHandle::new(3).is_none());
        assert_eq!(format!("{}", EntityHandle::new(3)), "#3");
        assert_eq!(u64::from(EntityHandle::from(9)), 9);
    }

    #[test]
    fn size_steps() {
        assert_eq!(Size::Huge.steps_above(Size::Medium), 2);
        assert_eq!(Size::Small.steps_above(Size::Medium), -1);
    }

    #[test]
    fn modifiers_include_proficiency() {
        let f = fighter();
        assert_eq!(f.skill_modifier(Skill::Athletics), 4 + 3);
        assert_eq!(f.perception_modifier(), 1 + 3);
        assert_eq!(f.save_dc(Save::Will), 10 + 1 + 3);
        assert_eq!(f.armor_class(), 10 + 2 + 3);
    }

    #[test]
    fn finesse_uses_better_ability() {
        let mut f = fighter();
        f.abilities.dexterity = 5;
        f.mark_dirty();
        assert_eq!(f.attack_modifier(&Weapon::fist()), 5 + 3);
        let axe = Weapon::melee("axe", DamageDice::new(1, 8), WeaponTraits::empty());
        assert_eq!(f.attack_modifier(&axe), 4 + 3);
    }

    #[test]
    fn frightened_lowers_checks_and_dcs() {
        let mut f = fighter();
        f.conditions_mut().push(ActiveCondition {
            kind: ConditionType::Frightened,
            value: 2,
            remaining: Remaining::Indefinite,
        });
        assert_eq!(f.skill_modifier(Skill::Athletics), 7 - 2);
        assert_eq!(f.save_dc(Save::Will), 14 - 2);
        assert_eq!(f.armor_class(), 15 - 2);
    }

    #[test]
    fn cache_tracks_shield_changes() {
        let mut f = fighter().with_shield(Shield::steel());
        assert_eq!(f.armor_class(), 15);
        if let Some(shield) = f.shield_mut() {
            shield.raised = true;
        }
        assert_eq!(f.armor_class(), 17);
    }

    #[test]
    fn free_hand_rules() {
        let mut f = fighter();
        assert!(f.has_free_hand());
        f.weapon = Some(Weapon::melee("sword", DamageDice::new(1, 8), WeaponTraits::empty()));
        assert!(f.has_free_hand());
        f.equip_shield(Some(Shield::steel()));
        assert!(!f.has_free_hand());
        f.equip_shield(None);
        f.weapon = Some(Weapon::melee("maul", DamageDice::new(1, 12), WeaponTraits::TWO_HAND));
        assert!(!f.has_free_hand());
    }
}
