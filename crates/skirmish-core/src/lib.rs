//! # Skirmish Core
//!
//! Turn and action resolution engine for squad-level tactical combat using
//! Pathfinder 2e style rules.
//!
//! The engine is a single-writer state machine. Every mutation flows through
//! one of a small number of entry points:
//!
//! - [`turn::TurnEngine`]: initiative, turn order, the three-action economy,
//!   delayed turns and the execution lock
//! - [`actions`]: legality checks and resolution for Strike, the Athletics
//!   maneuvers, Demoralize, Escape, Aid, Raise a Shield, Stand, Stride and
//!   Shield Block
//! - [`condition::ConditionService`]: applying, refreshing, removing and
//!   ticking conditions
//! - [`executor::ActionExecutor`]: drives a request through the lock, any
//!   reaction prompt and any movement, suspending where the outside world
//!   has to answer
//! - [`ai::AiTurnController`]: picks and sequences actions for computer
//!   controlled combatants
//!
//! Collaborators are injected through [`context::CombatContext`]: an entity
//! store, a battlefield, a random source and an event log. Nothing in the
//! crate holds global state, so two encounters never share anything.
//!
//! ## Quick Start
//!
//! ```
//! use skirmish_core::config::EngineConfig;
//! use skirmish_core::context::Encounter;
//! use skirmish_core::dice::SeededDice;
//! use skirmish_core::entity::{EntityData, Team};
//! use skirmish_core::turn::TurnEngine;
//! use tessera::{Bounds, Cell, GridMap};
//!
//! let mut encounter = Encounter::new(GridMap::new(Bounds::new(10, 10)), SeededDice::new(7));
//! encounter.spawn(EntityData::new("Valeros", Team::Party, Cell::new(1, 1, 0)).player_controlled());
//! encounter.spawn(EntityData::new("Goblin", Team::Adversary, Cell::new(2, 1, 0)));
//!
//! let mut engine = TurnEngine::new(&EngineConfig::default());
//! engine.start_combat(&mut encounter.context()).unwrap();
//! assert_eq!(engine.round(), 1);
//! assert!(engine.current_actor().is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod ai;
pub mod battlefield;
pub mod check;
pub mod condition;
pub mod config;
pub mod context;
pub mod dice;
pub mod entity;
pub mod error;
pub mod event;
pub mod executor;
pub mod reaction;
pub mod store;
pub mod suspend;
pub mod turn;

#[cfg(test)]
mod tests;

// Re-export the grid substrate
pub use tessera;

// Re-exports for convenience
pub use check::{degree_of_success, roll_check, CheckOutcome, CheckRoll, CheckSource, DegreeOfSuccess};
pub use condition::{ConditionService, ConditionType};
pub use config::EngineConfig;
pub use context::{CombatContext, Encounter};
pub use entity::{EntityData, EntityHandle, Team};
pub use error::{EngineError, Result};
pub use event::{CombatEvent, EventLog};
pub use turn::{TurnEngine, TurnState};
