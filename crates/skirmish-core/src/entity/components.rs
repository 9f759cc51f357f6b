//! Component types carried by combatants.
//!
//! Everything here is plain data. Rules that combine several components
//! (attack modifiers, armor class, save DCs) live on
//! [`EntityData`](super::EntityData) and in the derived-stat cache.

use std::collections::BTreeSet;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::EntityHandle;

// =============================================================================
// Abilities and Proficiency
// =============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// Strength
    Strength,
    /// Dexterity
    Dexterity,
    /// Constitution
    Constitution,
    /// Intelligence
    Intelligence,
    /// Wisdom
    Wisdom,
    /// Charisma
    Charisma,
}

/// Ability modifiers (not raw scores).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbilityModifiers {
    /// Strength modifier
    pub strength: i32,
    /// Dexterity modifier
    pub dexterity: i32,
    /// Constitution modifier
    pub constitution: i32,
    /// Intelligence modifier
    pub intelligence: i32,
    /// Wisdom modifier
    pub wisdom: i32,
    /// Charisma modifier
    pub charisma: i32,
}

impl AbilityModifiers {
    /// Modifier for one ability.
    #[must_use]
    pub const fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }
}

/// Proficiency rank in a statistic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ProficiencyRank {
    /// No proficiency bonus at all
    Untrained,
    /// +2 plus level
    #[default]
    Trained,
    /// +4 plus level
    Expert,
    /// +6 plus level
    Master,
    /// +8 plus level
    Legendary,
}

impl ProficiencyRank {
    /// Proficiency bonus at a given character level.
    ///
    /// # Example
    ///
    /// ```
    /// use skirmish_core::entity::components::ProficiencyRank;
    ///
    /// assert_eq!(ProficiencyRank::Untrained.bonus(5), 0);
    /// assert_eq!(ProficiencyRank::Trained.bonus(1), 3);
    /// assert_eq!(ProficiencyRank::Expert.bonus(3), 7);
    /// ```
    #[must_use]
    pub fn bonus(self, level: u32) -> i32 {
        let rank = match self {
            Self::Untrained => return 0,
            Self::Trained => 1,
            Self::Expert => 2,
            Self::Master => 3,
            Self::Legendary => 4,
        };
        i32::try_from(level).unwrap_or(i32::MAX / 2) + 2 * rank
    }
}

/// Skills used by the combat actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Skill {
    /// Trip, Shove, Grapple, Reposition, Escape
    Athletics,
    /// Escape
    Acrobatics,
    /// Demoralize
    Intimidation,
    /// Initiative when sneaking up on a fight
    Stealth,
}

impl Skill {
    /// The ability that keys this skill.
    #[must_use]
    pub const fn key_ability(self) -> Ability {
        match self {
            Self::Athletics => Ability::Strength,
            Self::Acrobatics | Self::Stealth => Ability::Dexterity,
            Self::Intimidation => Ability::Charisma,
        }
    }

    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Athletics => "athletics",
            Self::Acrobatics => "acrobatics",
            Self::Intimidation => "intimidation",
            Self::Stealth => "stealth",
        }
    }
}

/// Saving throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Save {
    /// Constitution based
    Fortitude,
    /// Dexterity based
    Reflex,
    /// Wisdom based
    Will,
}

impl Save {
    /// The ability that keys this save.
    #[must_use]
    pub const fn key_ability(self) -> Ability {
        match self {
            Self::Fortitude => Ability::Constitution,
            Self::Reflex => Ability::Dexterity,
            Self::Will => Ability::Wisdom,
        }
    }
}

/// Statistic rolled for initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitiativeStat {
    /// Perception, the usual choice
    #[default]
    Perception,
    /// A skill, e.g. Stealth when the combatant was sneaking
    Skill(Skill),
}

/// Proficiency ranks for every statistic the engine rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Proficiencies {
    pub perception: ProficiencyRank,
    pub fortitude: ProficiencyRank,
    pub reflex: ProficiencyRank,
    pub will: ProficiencyRank,
    pub athletics: ProficiencyRank,
    pub acrobatics: ProficiencyRank,
    pub intimidation: ProficiencyRank,
    pub stealth: ProficiencyRank,
    /// Weapon attacks
    pub attacks: ProficiencyRank,
    /// Armor class
    pub defense: ProficiencyRank,
}

impl Proficiencies {
    /// Rank in a skill.
    #[must_use]
    pub const fn skill(&self, skill: Skill) -> ProficiencyRank {
        match skill {
            Skill::Athletics => self.athletics,
            Skill::Acrobatics => self.acrobatics,
            Skill::Intimidation => self.intimidation,
            Skill::Stealth => self.stealth,
        }
    }

    /// Rank in a save.
    #[must_use]
    pub const fn save(&self, save: Save) -> ProficiencyRank {
        match save {
            Save::Fortitude => self.fortitude,
            Save::Reflex => self.reflex,
            Save::Will => self.will,
        }
    }
}

// =============================================================================
// Equipment
// =============================================================================

bitflags! {
    /// Weapon traits the rules engine cares about.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WeaponTraits: u16 {
        /// Multiple attack penalty is -4/-8 instead of -5/-10
        const AGILE = 1 << 0;
        /// May use Dexterity for melee attack rolls
        const FINESSE = 1 << 1;
        /// Can be used to Trip
        const TRIP = 1 << 2;
        /// Can be used to Shove and Reposition
        const SHOVE = 1 << 3;
        /// Can be used to Grapple
        const GRAPPLE = 1 << 4;
        /// Needs both hands
        const TWO_HAND = 1 << 5;
    }
}

/// Melee reach or ranged increment of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponRange {
    /// Melee weapon with a reach in feet
    Melee {
        /// Reach in feet, 5 for most weapons
        reach_feet: u32,
    },
    /// Ranged weapon
    Ranged {
        /// Range increment in feet
        increment_feet: u32,
        /// Targets this close or closer take a -2 penalty (volley trait)
        volley_feet: Option<u32>,
    },
}

/// Weapon damage dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageDice {
    /// Number of dice
    pub count: u8,
    /// Sides per die
    pub sides: u8,
    /// Flat bonus added to the dice total
    pub bonus: i32,
}

impl DamageDice {
    /// Creates a damage expression such as 1d8.
    #[must_use]
    pub const fn new(count: u8, sides: u8) -> Self {
        Self {
            count,
            sides,
            bonus: 0,
        }
    }

    /// Adds a flat bonus, e.g. 1d8+2.
    #[must_use]
    pub const fn plus(mut self, bonus: i32) -> Self {
        self.bonus = bonus;
        self
    }
}

/// A wielded weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    /// Display name
    pub name: String,
    /// Melee reach or ranged increment
    pub range: WeaponRange,
    /// Damage dice
    pub damage: DamageDice,
    /// Item bonus to attack rolls (potency runes)
    pub item_bonus: i32,
    /// Traits
    pub traits: WeaponTraits,
}

impl Weapon {
    /// A melee weapon with 5-foot reach.
    #[must_use]
    pub fn melee(name: impl Into<String>, damage: DamageDice, traits: WeaponTraits) -> Self {
        Self {
            name: name.into(),
            range: WeaponRange::Melee { reach_feet: 5 },
            damage,
            item_bonus: 0,
            traits,
        }
    }

    /// A ranged weapon with the given increment.
    #[must_use]
    pub fn ranged(name: impl Into<String>, damage: DamageDice, increment_feet: u32) -> Self {
        Self {
            name: name.into(),
            range: WeaponRange::Ranged {
                increment_feet,
                volley_feet: None,
            },
            damage,
            item_bonus: 0,
            traits: WeaponTraits::empty(),
        }
    }

    /// The unarmed attack everyone has: 1d4, agile, finesse.
    #[must_use]
    pub fn fist() -> Self {
        Self::melee(
            "fist",
            DamageDice::new(1, 4),
            WeaponTraits::AGILE | WeaponTraits::FINESSE,
        )
    }

    /// True for melee weapons.
    #[must_use]
    pub const fn is_melee(&self) -> bool {
        matches!(self.range, WeaponRange::Melee { .. })
    }

    /// Melee reach in feet, `None` for ranged weapons.
    #[must_use]
    pub const fn reach_feet(&self) -> Option<u32> {
        match self.range {
            WeaponRange::Melee { reach_feet } => Some(reach_feet),
            WeaponRange::Ranged { .. } => None,
        }
    }
}

/// Worn armor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Armor {
    /// Item bonus to AC
    pub ac_bonus: i32,
    /// Maximum Dexterity modifier applied to AC
    pub dex_cap: Option<i32>,
}

/// A shield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shield {
    /// Circumstance bonus to AC while raised
    pub ac_bonus: i32,
    /// Damage prevented by a Shield Block
    pub hardness: i32,
    /// Current hit points
    pub hp: i32,
    /// Maximum hit points
    pub max_hp: i32,
    /// At or below this many HP the shield is broken
    pub broken_threshold: i32,
    /// Raised until the start of the bearer's next turn
    pub raised: bool,
}

impl Shield {
    /// A steel shield: +2 AC, hardness 5, 20 HP, broken at 10.
    #[must_use]
    pub const fn steel() -> Self {
        Self {
            ac_bonus: 2,
            hardness: 5,
            hp: 20,
            max_hp: 20,
            broken_threshold: 10,
            raised: false,
        }
    }

    /// True once HP has fallen to the broken threshold.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.hp <= self.broken_threshold
    }
}

// =============================================================================
// Per-Combat State
// =============================================================================

/// Action economy state, reset at the start of each of the combatant's turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnBudget {
    /// Actions left this turn (0..=3)
    pub actions_remaining: u8,
    /// Actions granted when this turn began
    pub actions_at_turn_start: u8,
    /// Attack-trait actions taken this turn
    pub map_count: u8,
    /// The reaction has not been spent this round
    pub reaction_available: bool,
}

impl Default for TurnBudget {
    fn default() -> Self {
        Self {
            actions_remaining: 0,
            actions_at_turn_start: 0,
            map_count: 0,
            reaction_available: true,
        }
    }
}

/// A grapple this combatant is maintaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrappleHold {
    /// The grabbed or restrained combatant
    pub target: EntityHandle,
    /// Round in which the hold was established or renewed
    pub established_round: u32,
}

/// A prepared Aid bonus waiting to be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAid {
    /// The ally who prepared it
    pub aider: EntityHandle,
    /// Circumstance bonus granted
    pub bonus: i32,
}

/// Per-combat bookkeeping that outlives a single turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entanglements {
    /// Grapple this combatant holds
    pub grappling: Option<GrappleHold>,
    /// Combatant holding this one
    pub grappled_by: Option<EntityHandle>,
    /// Aid waiting to be consumed by this combatant's next check
    pub aid: Option<PendingAid>,
    /// Combatants whose Demoralize no longer affects this one
    pub demoralize_immunity: BTreeSet<EntityHandle>,
}
