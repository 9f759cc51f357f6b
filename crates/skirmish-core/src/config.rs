//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document (or none at all)
//! yields a working configuration.
//!
//! # Example
//!
//! ```
//! use skirmish_core::config::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "timeouts": { "reaction_ms": 5000 } }"#).unwrap();
//! assert_eq!(config.timeouts.reaction_ms, 5000);
//! assert_eq!(config.timeouts.stride_ms, 30_000);
//! assert_eq!(config.actions_per_turn, 3);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::InitiativeStat;
use crate::reaction::ReactionPreference;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Liveness budgets for suspension points, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Waiting for a movement to finish
    pub stride_ms: u64,
    /// Waiting for a player to answer a reaction prompt
    pub reaction_ms: u64,
    /// Longest an action may hold the execution lock
    pub lock_watchdog_ms: u64,
}

impl TimeoutConfig {
    /// Stride budget.
    #[must_use]
    pub const fn stride(&self) -> Duration {
        Duration::from_millis(self.stride_ms)
    }

    /// Reaction prompt budget.
    #[must_use]
    pub const fn reaction(&self) -> Duration {
        Duration::from_millis(self.reaction_ms)
    }

    /// Lock watchdog budget.
    #[must_use]
    pub const fn lock_watchdog(&self) -> Duration {
        Duration::from_millis(self.lock_watchdog_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            stride_ms: 30_000,
            reaction_ms: 10_000,
            lock_watchdog_ms: 30_000,
        }
    }
}

/// AI turn limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Decision iterations per turn before giving up
    pub max_attempts: u32,
    /// Identical consecutive observations tolerated before ending the turn
    pub no_progress_limit: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            no_progress_limit: 2,
        }
    }
}

/// Reaction prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionConfig {
    /// How reactions of player-controlled combatants are decided
    pub player_preference: ReactionPreference,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Actions granted at the start of each turn
    pub actions_per_turn: u8,
    /// Statistic rolled for initiative when a combatant has none of its own
    pub initiative_stat: InitiativeStat,
    /// Suspension point budgets
    pub timeouts: TimeoutConfig,
    /// AI limits
    pub ai: AiConfig,
    /// Reaction prompting
    pub reactions: ReactionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            actions_per_turn: 3,
            initiative_stat: InitiativeStat::Perception,
            timeouts: TimeoutConfig::default(),
            ai: AiConfig::default(),
            reactions: ReactionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=3).contains(&self.actions_per_turn) {
            return Err(ConfigError::Invalid(format!(
                "actions_per_turn must be 1..=3, got {}",
                self.actions_per_turn
            )));
        }
        let t = &self.timeouts;
        if t.stride_ms == 0 || t.reaction_ms == 0 || t.lock_watchdog_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        if t.lock_watchdog_ms < t.stride_ms.max(t.reaction_ms) {
            return Err(ConfigError::Invalid(format!(
                "timeouts.lock_watchdog_ms must cover the stride and reaction timeouts, got {}",
                t.lock_watchdog_ms
            )));
        }
        if self.ai.max_attempts == 0 {
            return Err(ConfigError::Invalid("ai.max_attempts must be non-zero".into()));
        }
        if self.ai.no_progress_limit == 0 {
            return Err(ConfigError::Invalid(
                "ai.no_progress_limit must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeouts.stride(), Duration::from_secs(30));
        assert_eq!(config.timeouts.reaction(), Duration::from_secs(10));
        assert_eq!(config.ai.max_attempts, 8);
        assert_eq!(config.reactions.player_preference, ReactionPreference::AlwaysAsk);
    }

    #[test]
    fn json_round_trip() {
        let mut config = EngineConfig::default();
        config.reactions.player_preference = ReactionPreference::AlwaysAccept;
        config.ai.no_progress_limit = 4;
        let text = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "actions_per_turn": 4 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "timeouts": { "stride_ms": 0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "timeouts": { "lock_watchdog_ms": 5000 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(EngineConfig::from_json(
            r#"{ "timeouts": { "stride_ms": 5000, "reaction_ms": 5000, "lock_watchdog_ms": 5000 } }"#
        )
        .is_ok());
        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
