//! d20 checks and the four degrees of success.
//!
//! A check succeeds when `d20 + modifier` meets the DC. Beating the DC by
//! 10 or more is a critical success; missing it by 10 or more is a
//! critical failure. A natural 20 then improves the result one step and a
//! natural 1 worsens it one step.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dice::RandomSource;
use crate::entity::{Save, Skill};

/// Outcome tier of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DegreeOfSuccess {
    /// Missed the DC by 10 or more
    CriticalFailure,
    /// Below the DC
    Failure,
    /// Met the DC
    Success,
    /// Beat the DC by 10 or more
    CriticalSuccess,
}

impl DegreeOfSuccess {
    /// One step better, saturating at critical success.
    #[must_use]
    pub const fn upgraded(self) -> Self {
        match self {
            Self::CriticalFailure => Self::Failure,
            Self::Failure => Self::Success,
            Self::Success | Self::CriticalSuccess => Self::CriticalSuccess,
        }
    }

    /// One step worse, saturating at critical failure.
    #[must_use]
    pub const fn downgraded(self) -> Self {
        match self {
            Self::CriticalSuccess => Self::Success,
            Self::Success => Self::Failure,
            Self::Failure | Self::CriticalFailure => Self::CriticalFailure,
        }
    }

    /// Success or critical success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::CriticalSuccess)
    }
}

impl fmt::Display for DegreeOfSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CriticalFailure => "critical failure",
            Self::Failure => "failure",
            Self::Success => "success",
            Self::CriticalSuccess => "critical success",
        };
        f.write_str(name)
    }
}

/// Maps a natural roll, total and DC to a degree of success.
///
/// # Example
///
/// ```
/// use skirmish_core::check::{degree_of_success, DegreeOfSuccess};
///
/// assert_eq!(degree_of_success(15, 25, 15), DegreeOfSuccess::CriticalSuccess);
/// assert_eq!(degree_of_success(11, 20, 15), DegreeOfSuccess::Success);
/// assert_eq!(degree_of_success(5, 6, 15), DegreeOfSuccess::Failure);
/// assert_eq!(degree_of_success(1, 5, 15), DegreeOfSuccess::CriticalFailure);
/// ```
#[must_use]
pub fn degree_of_success(natural: u8, total: i32, dc: i32) -> DegreeOfSuccess {
    let margin = total - dc;
    let base = if margin >= 10 {
        DegreeOfSuccess::CriticalSuccess
    } else if margin >= 0 {
        DegreeOfSuccess::Success
    } else if margin > -10 {
        DegreeOfSuccess::Failure
    } else {
        DegreeOfSuccess::CriticalFailure
    };
    match natural {
        20 => base.upgraded(),
        1 => base.downgraded(),
        _ => base,
    }
}

/// What was rolled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckSource {
    /// Perception check
    Perception,
    /// Skill check
    Skill(Skill),
    /// Saving throw
    Save(Save),
    /// Anything else: attack rolls, flat checks
    Custom(String),
}

impl fmt::Display for CheckSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Perception => f.write_str("perception"),
            Self::Skill(skill) => f.write_str(skill.name()),
            Self::Save(save) => write!(f, "{save:?}"),
            Self::Custom(label) => f.write_str(label),
        }
    }
}

/// A single d20 roll with its modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRoll {
    /// Die result
    pub natural: u8,
    /// Total modifier added
    pub modifier: i32,
    /// Natural plus modifier
    pub total: i32,
    /// What was rolled
    pub source: CheckSource,
}

/// A roll compared against a DC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// The roll
    pub roll: CheckRoll,
    /// Difficulty class
    pub dc: i32,
    /// Resulting degree
    pub degree: DegreeOfSuccess,
}

/// Rolls a d20 and adds `modifier`.
pub fn roll(modifier: i32, source: CheckSource, rng: &mut dyn RandomSource) -> CheckRoll {
    let natural = rng.roll_d20();
    CheckRoll {
        natural,
        modifier,
        total: i32::from(natural) + modifier,
        source,
    }
}

/// Rolls a check against a DC.
pub fn roll_check(
    modifier: i32,
    dc: i32,
    source: CheckSource,
    rng: &mut dyn RandomSource,
) -> CheckOutcome {
    let roll = roll(modifier, source, rng);
    let degree = degree_of_success(roll.natural, roll.total, dc);
    debug!(
        source = %roll.source,
        natural = roll.natural,
        total = roll.total,
        dc,
        %degree,
        "check rolled"
    );
    CheckOutcome { roll, dc, degree }
}

/// Rolls an unmodified flat check. Returns the die and whether it met the DC.
pub fn flat_check(dc: i32, rng: &mut dyn RandomSource) -> (u8, bool) {
    let natural = rng.roll_d20();
    (natural, i32::from(natural) >= dc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use proptest::prelude::*;

    mod degree_tests {
        use super::*;

        #[test]
        fn thresholds() {
            assert_eq!(degree_of_success(10, 25, 15), DegreeOfSuccess::CriticalSuccess);
            assert_eq!(degree_of_success(10, 24, 15), DegreeOfSuccess::Success);
            assert_eq!(degree_of_success(10, 15, 15), DegreeOfSuccess::Success);
            assert_eq!(degree_of_success(10, 14, 15), DegreeOfSuccess::Failure);
            assert_eq!(degree_of_success(10, 6, 15), DegreeOfSuccess::Failure);
            assert_eq!(degree_of_success(10, 5, 15), DegreeOfSuccess::CriticalFailure);
        }

        #[test]
        fn natural_twenty_and_one_shift() {
            assert_eq!(degree_of_success(20, 14, 15), DegreeOfSuccess::Success);
            assert_eq!(degree_of_success(20, 30, 15), DegreeOfSuccess::CriticalSuccess);
            assert_eq!(degree_of_success(1, 15, 15), DegreeOfSuccess::Failure);
            assert_eq!(degree_of_success(1, 2, 15), DegreeOfSuccess::CriticalFailure);
        }

        proptest! {
            #[test]
            fn natural_twenty_never_worse(total in -30i32..60, dc in 0i32..40) {
                let plain = degree_of_success(10, total, dc);
                prop_assert!(degree_of_success(20, total, dc) >= plain);
                prop_assert!(degree_of_success(1, total, dc) <= plain);
            }

            #[test]
            fn higher_total_never_worse(total in -30i32..60, dc in 0i32..40, natural in 2u8..20) {
                prop_assert!(
                    degree_of_success(natural, total + 1, dc) >= degree_of_success(natural, total, dc)
                );
            }
        }
    }

    mod roll_tests {
        use super::*;

        #[test]
        fn roll_check_records_breakdown() {
            let mut dice = ScriptedDice::new([12]);
            let outcome = roll_check(5, 17, CheckSource::Skill(Skill::Athletics), &mut dice);
            assert_eq!(outcome.roll.natural, 12);
            assert_eq!(outcome.roll.total, 17);
            assert_eq!(outcome.degree, DegreeOfSuccess::Success);
            assert_eq!(outcome.roll.source.to_string(), "athletics");
        }

        #[test]
        fn flat_check_compares_die_only() {
            let mut dice = ScriptedDice::new([4, 5]);
            assert_eq!(flat_check(5, &mut dice), (4, false));
            assert_eq!(flat_check(5, &mut dice), (5, true));
        }
    }
}
