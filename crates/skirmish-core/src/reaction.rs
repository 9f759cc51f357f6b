//! Reaction arbitration.
//!
//! When an action reaches a trigger point the [`ReactionArbiter`] scans the
//! participants for someone holding a matching reaction, asks a
//! [`ReactionPolicy`] what to do about it and, on acceptance, runs the
//! reaction's effect.
//!
//! A policy either decides on the spot or asks for a prompt. A prompt is
//! returned as [`ReactionDecision::Prompt`] with the time the caller may
//! wait; the executor turns it into a suspension that defaults to decline.
//!
//! # Example
//!
//! ```
//! use skirmish_core::reaction::{ReactionArbiter, ReactionPreference, StandardReactionPolicy};
//! use std::time::Duration;
//!
//! let arbiter = ReactionArbiter::new(
//!     Box::new(StandardReactionPolicy::new(ReactionPreference::AlwaysAccept)),
//!     Duration::from_secs(10),
//! );
//! assert_eq!(arbiter.prompt_timeout(), Duration::from_secs(10));
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actions::shield_block::{can_shield_block, try_shield_block, ShieldBlockResult};
use crate::context::CombatContext;
use crate::entity::{EntityData, EntityHandle};

// =============================================================================
// Types
// =============================================================================

/// Points in an action where reactions may trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerPhase {
    /// A Strike hit and damage is about to be applied
    StrikeHitBeforeDamage,
}

/// Reactions the engine models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionType {
    /// Reduce incoming damage with a raised shield
    ShieldBlock,
}

impl ReactionType {
    /// The trigger this reaction answers.
    #[must_use]
    pub const fn trigger(self) -> TriggerPhase {
        match self {
            Self::ShieldBlock => TriggerPhase::StrikeHitBeforeDamage,
        }
    }
}

/// A reaction someone could take right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionOption {
    /// Who would react
    pub reactor: EntityHandle,
    /// Which reaction
    pub reaction: ReactionType,
    /// The trigger
    pub trigger: TriggerPhase,
    /// The combatant whose action triggered it
    pub source: EntityHandle,
    /// Damage about to be dealt
    pub incoming_damage: i32,
}

/// The answer to a reaction option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionChoice {
    /// Take the reaction
    Accept,
    /// Let it pass
    Decline,
}

/// How reactions of player-controlled combatants are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReactionPreference {
    /// Prompt the player each time
    #[default]
    AlwaysAsk,
    /// Take every available reaction
    AlwaysAccept,
    /// Never react
    AlwaysDecline,
}

/// What a policy says about one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Decided now
    Decided(ReactionChoice),
    /// Somebody has to be asked
    Ask,
}

/// How the arbiter's decision arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionDecision {
    /// The choice is known now
    Immediate(ReactionChoice),
    /// Wait for an answer at most this long, then decline
    Prompt {
        /// Liveness budget
        timeout: Duration,
    },
}

// =============================================================================
// Policy
// =============================================================================

/// Decides whether a reactor takes a reaction.
pub trait ReactionPolicy {
    /// Judges one option for `reactor`.
    fn decide(&self, option: &ReactionOption, reactor: &EntityData) -> Verdict;
}

/// Computer-controlled reactors always accept; players follow a preference.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardReactionPolicy {
    player_preference: ReactionPreference,
}

impl StandardReactionPolicy {
    /// Creates the policy with a player preference.
    #[must_use]
    pub const fn new(player_preference: ReactionPreference) -> Self {
        Self { player_preference }
    }
}

impl ReactionPolicy for StandardReactionPolicy {
    fn decide(&self, _option: &ReactionOption, reactor: &EntityData) -> Verdict {
        if !reactor.player_controlled {
            return Verdict::Decided(ReactionChoice::Accept);
        }
        match self.player_preference {
            ReactionPreference::AlwaysAsk => Verdict::Ask,
            ReactionPreference::AlwaysAccept => Verdict::Decided(ReactionChoice::Accept),
            ReactionPreference::AlwaysDecline => Verdict::Decided(ReactionChoice::Decline),
        }
    }
}

// =============================================================================
// Arbiter
// =============================================================================

/// Finds, decides and resolves reactions.
pub struct ReactionArbiter {
    policy: Box<dyn ReactionPolicy>,
    prompt_timeout: Duration,
    suppressed: BTreeSet<EntityHandle>,
}

impl std::fmt::Debug for ReactionArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionArbiter")
            .field("prompt_timeout", &self.prompt_timeout)
            .field("suppressed", &self.suppressed)
            .finish_non_exhaustive()
    }
}

impl ReactionArbiter {
    /// Creates an arbiter with a decision policy and a prompt budget.
    #[must_use]
    pub fn new(policy: Box<dyn ReactionPolicy>, prompt_timeout: Duration) -> Self {
        Self {
            policy,
            prompt_timeout,
            suppressed: BTreeSet::new(),
        }
    }

    /// How long a prompt may stay open.
    #[must_use]
    pub const fn prompt_timeout(&self) -> Duration {
        self.prompt_timeout
    }

    /// Stops offering reactions to `handle` until [`allow`](Self::allow) is called.
    pub fn suppress(&mut self, handle: EntityHandle) {
        self.suppressed.insert(handle);
    }

    /// Lifts a suppression.
    pub fn allow(&mut self, handle: EntityHandle) {
        self.suppressed.remove(&handle);
    }

    /// Reactions available at `trigger`, scanning `participants` in order.
    ///
    /// Only the struck target's own Shield Block is modeled, so at most one
    /// option is returned.
    #[must_use]
    pub fn collect_eligible_reactions(
        &self,
        ctx: &CombatContext<'_>,
        trigger: TriggerPhase,
        source: EntityHandle,
        target: EntityHandle,
        incoming_damage: i32,
        participants: &[EntityHandle],
    ) -> Vec<ReactionOption> {
        participants
            .iter()
            .copied()
            .filter(|&reactor| reactor == target && reactor != source)
            .filter(|reactor| !self.suppressed.contains(reactor))
            .filter(|&reactor| match trigger {
                TriggerPhase::StrikeHitBeforeDamage => can_shield_block(ctx, reactor),
            })
            .map(|reactor| ReactionOption {
                reactor,
                reaction: ReactionType::ShieldBlock,
                trigger,
                source,
                incoming_damage,
            })
            .take(1)
            .collect()
    }

    /// Asks the policy about `option`.
    #[must_use]
    pub fn decide(&self, ctx: &CombatContext<'_>, option: &ReactionOption) -> ReactionDecision {
        let Some(reactor) = ctx.store.get(option.reactor) else {
            return ReactionDecision::Immediate(ReactionChoice::Decline);
        };
        match self.policy.decide(option, reactor) {
            Verdict::Decided(choice) => {
                debug!(reactor = %option.reactor, reaction = ?option.reaction, ?choice, "reaction decided");
                ReactionDecision::Immediate(choice)
            }
            Verdict::Ask => {
                debug!(reactor = %option.reactor, reaction = ?option.reaction, "reaction prompt");
                ReactionDecision::Prompt {
                    timeout: self.prompt_timeout,
                }
            }
        }
    }

    /// Runs the reaction's effect if `choice` accepts it.
    ///
    /// The reaction is re-validated, so a stale acceptance does nothing.
    pub fn resolve(
        &self,
        ctx: &mut CombatContext<'_>,
        option: &ReactionOption,
        choice: ReactionChoice,
    ) -> Option<ShieldBlockResult> {
        if choice == ReactionChoice::Decline {
            return None;
        }
        match option.reaction {
            ReactionType::ShieldBlock => {
                try_shield_block(ctx, option.reactor, option.incoming_damage)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Shield;
    use crate::store::EntityStore;
    use crate::tests::helpers::duel;

    fn arbiter(preference: ReactionPreference) -> ReactionArbiter {
        ReactionArbiter::new(
            Box::new(StandardReactionPolicy::new(preference)),
            Duration::from_secs(10),
        )
    }

    fn raise(data: &mut EntityData) {
        data.equip_shield(Some(Shield::steel()));
        if let Some(shield) = data.shield_mut() {
            shield.raised = true;
        }
    }

    #[test]
    fn no_shield_no_options() {
        let (mut enc, hero, goblin) = duel([]);
        let options = arbiter(ReactionPreference::AlwaysAsk).collect_eligible_reactions(
            &enc.context(),
            TriggerPhase::StrikeHitBeforeDamage,
            hero,
            goblin,
            8,
            &[hero, goblin],
        );
        assert!(options.is_empty());
    }

    #[test]
    fn struck_target_with_raised_shield_is_offered_a_block() {
        let (mut enc, hero, goblin) = duel([]);
        raise(enc.roster.get_mut(goblin).unwrap());
        raise(enc.roster.get_mut(hero).unwrap());
        let options = arbiter(ReactionPreference::AlwaysAsk).collect_eligible_reactions(
            &enc.context(),
            TriggerPhase::StrikeHitBeforeDamage,
            hero,
            goblin,
            8,
            &[hero, goblin],
        );
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].reactor, goblin);
        assert_eq!(options[0].incoming_damage, 8);
    }

    #[test]
    fn suppressed_reactors_are_skipped() {
        let (mut enc, hero, goblin) = duel([]);
        raise(enc.roster.get_mut(goblin).unwrap());
        let mut arb = arbiter(ReactionPreference::AlwaysAsk);
        arb.suppress(goblin);
        let ctx = enc.context();
        let collect = |a: &ReactionArbiter| {
            a.collect_eligible_reactions(
                &ctx,
                TriggerPhase::StrikeHitBeforeDamage,
                hero,
                goblin,
                8,
                &[hero, goblin],
            )
        };
        assert!(collect(&arb).is_empty());
        arb.allow(goblin);
        assert_eq!(collect(&arb).len(), 1);
    }

    #[test]
    fn policy_by_controller_and_preference() {
        let (mut enc, hero, goblin) = duel([]);
        let option = |reactor| ReactionOption {
            reactor,
            reaction: ReactionType::ShieldBlock,
            trigger: TriggerPhase::StrikeHitBeforeDamage,
            source: EntityHandle::NONE,
            incoming_damage: 5,
        };
        let ctx = enc.context();
        let ask = arbiter(ReactionPreference::AlwaysAsk);
        assert_eq!(
            ask.decide(&ctx, &option(goblin)),
            ReactionDecision::Immediate(ReactionChoice::Accept)
        );
        assert_eq!(
            ask.decide(&ctx, &option(hero)),
            ReactionDecision::Prompt {
                timeout: Duration::from_secs(10)
            }
        );
        assert_eq!(
            arbiter(ReactionPreference::AlwaysDecline).decide(&ctx, &option(hero)),
            ReactionDecision::Immediate(ReactionChoice::Decline)
        );
    }

    #[test]
    fn accepting_runs_the_block_and_declining_does_not() {
        let (mut enc, hero, goblin) = duel([]);
        raise(enc.roster.get_mut(goblin).unwrap());
        let option = ReactionOption {
            reactor: goblin,
            reaction: ReactionType::ShieldBlock,
            trigger: TriggerPhase::StrikeHitBeforeDamage,
            source: hero,
            incoming_damage: 10,
        };
        let arb = arbiter(ReactionPreference::AlwaysAsk);
        assert!(arb
            .resolve(&mut enc.context(), &option, ReactionChoice::Decline)
            .is_none());
        let block = arb
            .resolve(&mut enc.context(), &option, ReactionChoice::Accept)
            .unwrap();
        assert_eq!(block.reduction, 5);
        // reaction is spent, a second acceptance is refused
        assert!(arb
            .resolve(&mut enc.context(), &option, ReactionChoice::Accept)
            .is_none());
    }

    #[test]
    fn policy_is_object_safe() {
        fn _accepts(_policy: &dyn ReactionPolicy) {}
        _accepts(&StandardReactionPolicy::default());
    }
}
