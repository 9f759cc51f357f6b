//! Engine error types.

use thiserror::Error;

use crate::entity::EntityHandle;
use crate::turn::TurnState;

/// Why a delay request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DelayRejection {
    /// Only player-controlled combatants may delay
    #[error("combatant is not player controlled")]
    NotPlayerControlled,
    /// It is not this combatant's turn, or no turn is in progress
    #[error("not the acting combatant")]
    NotActing,
    /// An action has already been spent this turn
    #[error("actions already spent this turn")]
    ActionsSpent,
    /// This turn is itself a resumed delayed turn
    #[error("already delayed this round")]
    AlreadyResumed,
    /// An action is executing
    #[error("an action is executing")]
    Busy,
    /// The requested anchor is missing, defeated, delayed or the actor itself
    #[error("invalid return anchor")]
    InvalidAnchor,
    /// The combatant is not offered a return in the open window
    #[error("not eligible to return now")]
    NotEligible,
}

/// Errors returned by the turn engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The execution lock is already held
    #[error("execution lock held by {holder} for {tag}")]
    LockHeld {
        /// Combatant holding the lock
        holder: EntityHandle,
        /// Label the lock was taken with
        tag: String,
    },

    /// Completion was reported with no action executing
    #[error("no action is executing")]
    LockNotHeld,

    /// The operation is not valid in the current state
    #[error("not allowed while {0:?}")]
    WrongState(TurnState),

    /// Only the acting combatant may do this
    #[error("{0} is not the acting combatant")]
    NotCurrentActor(EntityHandle),

    /// A delay request was refused
    #[error("delay refused: {0}")]
    Delay(#[from] DelayRejection),

    /// The handle is not in the store
    #[error("unknown combatant {0}")]
    UnknownCombatant(EntityHandle),

    /// Nobody alive to fight
    #[error("no living combatants")]
    NoLivingCombatants,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
