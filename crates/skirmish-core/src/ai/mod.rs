//! Computer-controlled combatants.
//!
//! - [`policy`]: target selection with a sticky lock, and where to Stride
//! - [`orchestrator`]: sequences one enemy turn through the
//!   [`ActionExecutor`](crate::executor::ActionExecutor), bounded by an attempt
//!   cap and a no-progress guard
//!
//! The AI never mutates combatants itself. Every effect goes through the same
//! executor a player-facing caller uses.

pub mod orchestrator;
pub mod policy;

pub use orchestrator::{AiProgress, AiTurnController, AiTurnEnd, ProgressGuard};
pub use policy::{AiPolicy, NearestFoePolicy, TargetMemory};
