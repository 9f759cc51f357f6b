//! Stride: movement legality, planning and commit.
//!
//! Planning and committing are separate because the position change is
//! applied only once the host reports the movement finished. A
//! [`StridePlan`] is what the executor holds while it waits.

use serde::{Deserialize, Serialize};
use tessera::{Cell, MoveProfile, PathPlan};
use tracing::debug;

use super::{rejected, release_grapple, ActionKind, TargetingFailure};
use crate::condition::ConditionType;
use crate::context::CombatContext;
use crate::entity::EntityHandle;
use crate::event::CombatEvent;

/// A validated movement waiting to be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StridePlan {
    /// Mover
    pub actor: EntityHandle,
    /// Cell the path starts from
    pub from: Cell,
    /// Final cell
    pub destination: Cell,
    /// Path and its action cost
    pub path: PathPlan,
}

impl StridePlan {
    /// Actions the movement costs.
    #[must_use]
    pub const fn cost(&self) -> u8 {
        self.path.actions
    }
}

/// Plans a Stride to `destination` within `budget` actions.
///
/// # Errors
///
/// `InvalidState` when grabbed, restrained or prone, `InvalidTarget` for
/// the mover's own cell and `OutOfRange` when no path fits the budget.
pub fn plan_stride(
    ctx: &CombatContext<'_>,
    actor: EntityHandle,
    destination: Cell,
    budget: u8,
) -> Result<StridePlan, TargetingFailure> {
    let data = ctx.store.get(actor).ok_or(TargetingFailure::InvalidTarget)?;
    if !data.is_alive() {
        return Err(TargetingFailure::NotAlive);
    }
    if data.derived().immobilized || data.has_condition(ConditionType::Prone) {
        return Err(TargetingFailure::InvalidState);
    }
    let from = data.position;
    if destination == from {
        return Err(TargetingFailure::InvalidTarget);
    }
    let profile = MoveProfile::walker(data.speed_feet);
    let path = ctx
        .battlefield
        .find_path_by_actions(from, destination, &profile, actor, budget)
        .filter(|p| p.actions > 0 && p.actions <= budget)
        .ok_or(TargetingFailure::OutOfRange)?;
    Ok(StridePlan {
        actor,
        from,
        destination,
        path,
    })
}

/// Why `actor` cannot Stride to `destination` within `budget` actions.
#[must_use]
pub fn stride_failure(
    ctx: &CombatContext<'_>,
    actor: EntityHandle,
    destination: Cell,
    budget: u8,
) -> Option<TargetingFailure> {
    plan_stride(ctx, actor, destination, budget).err()
}

/// Applies a finished movement.
///
/// Returns false if the mover moved or died since planning, or the
/// destination became occupied. Moving away ends any grapple the mover holds.
pub fn commit_stride(ctx: &mut CombatContext<'_>, plan: &StridePlan) -> bool {
    let current = ctx
        .store
        .get(plan.actor)
        .filter(|d| d.is_alive())
        .map(|d| d.position);
    if current != Some(plan.from) {
        rejected(ActionKind::Stride, plan.actor, TargetingFailure::InvalidState);
        return false;
    }
    let Some(from) = ctx.relocate(plan.actor, plan.destination) else {
        rejected(ActionKind::Stride, plan.actor, TargetingFailure::InvalidTarget);
        return false;
    };
    debug!(actor = %plan.actor, %from, to = %plan.destination, feet = plan.path.feet, "stride committed");
    ctx.events.push(CombatEvent::Moved {
        entity: plan.actor,
        from,
        to: plan.destination,
    });
    release_grapple(ctx, plan.actor);
    true
}
