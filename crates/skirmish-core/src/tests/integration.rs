//! Integration tests driving whole turns.
//!
//! These cover the path a host takes: the turn engine, the action executor
//! for player requests and the AI controller for adversaries.

use tessera::Cell;

use super::helpers::{duel, init_tracing, scripted_encounter};
use crate::actions::{ActionKind, StridePlan};
use crate::ai::{AiProgress, AiTurnController, AiTurnEnd};
use crate::check::DegreeOfSuccess;
use crate::condition::ConditionType;
use crate::config::EngineConfig;
use crate::entity::{EntityData, Team};
use crate::error::EngineError;
use crate::event::CombatEvent;
use crate::executor::{
    ActionExecutor, ActionOutcome, ActionRequest, MovementDriver, MovementStart, Rejection,
};
use crate::store::EntityStore;
use crate::turn::{CombatResult, TurnEngine, TurnState};

struct Deferred;

impl MovementDriver for Deferred {
    fn begin_movement(&mut self, _plan: &StridePlan) -> MovementStart {
        MovementStart::InProgress
    }
}

// =============================================================================
// Player Flow
// =============================================================================

#[test]
fn killing_the_last_adversary_wins() {
    init_tracing();
    let (mut enc, hero, goblin) = duel([18, 3]);
    enc.roster.get_mut(goblin).unwrap().hp = 4;
    let config = EngineConfig::default();
    let mut engine = TurnEngine::new(&config);
    let mut executor = ActionExecutor::new(&config);
    engine.start_combat(&mut enc.context()).unwrap();

    enc.dice.push([15, 4]);
    let outcome = executor.execute(
        &mut engine,
        &mut enc.context(),
        hero,
        ActionRequest::Strike { target: goblin },
    );
    assert!(outcome.report().unwrap().strike.as_ref().unwrap().defeated);
    assert_eq!(engine.state(), TurnState::CombatOver);
    assert_eq!(engine.result(), Some(CombatResult::Victory));
    assert!(!engine.is_locked());
    assert!(enc
        .events
        .iter()
        .any(|e| matches!(e, CombatEvent::CombatEnded { result: CombatResult::Victory })));
}

#[test]
fn spending_every_action_hands_the_turn_over() {
    let (mut enc, hero, goblin) = duel([18, 3]);
    let config = EngineConfig::default();
    let mut engine = TurnEngine::new(&config);
    let mut executor = ActionExecutor::new(&config);
    engine.start_combat(&mut enc.context()).unwrap();

    // two one-action Strides; raising a shield the hero does not carry costs nothing
    for destination in [Cell::new(1, 4, 0), Cell::new(1, 7, 0)] {
        let outcome = executor.execute(
            &mut engine,
            &mut enc.context(),
            hero,
            ActionRequest::Stride { destination },
        );
        assert_eq!(outcome.report().unwrap().cost, 1);
    }
    let refused = executor.execute(&mut engine, &mut enc.context(), hero, ActionRequest::RaiseShield);
    assert_eq!(
        refused,
        ActionOutcome::Rejected(Rejection::Illegal(crate::actions::TargetingFailure::InvalidState))
    );
    assert_eq!(enc.roster.get(hero).unwrap().turn.actions_remaining, 1);

    executor.execute(
        &mut engine,
        &mut enc.context(),
        hero,
        ActionRequest::Stride {
            destination: Cell::new(1, 8, 0),
        },
    );
    assert_eq!(engine.current_actor(), Some(goblin));
    assert_eq!(engine.state(), TurnState::EnemyTurn);
}

#[test]
fn second_request_is_refused_while_one_is_suspended() {
    let (mut enc, hero, goblin) = duel([18, 3]);
    let config = EngineConfig::default();
    let mut engine = TurnEngine::new(&config);
    let mut executor = ActionExecutor::new(&config).with_movement(Box::new(Deferred));
    engine.start_combat(&mut enc.context()).unwrap();

    let first = executor.execute(
        &mut engine,
        &mut enc.context(),
        hero,
        ActionRequest::Stride {
            destination: Cell::new(1, 4, 0),
        },
    );
    let ActionOutcome::Suspended { id, .. } = first else {
        panic!("expected a movement wait, got {first:?}");
    };
    let second = executor.execute(
        &mut engine,
        &mut enc.context(),
        hero,
        ActionRequest::Demoralize { target: goblin },
    );
    assert!(matches!(
        second,
        ActionOutcome::Rejected(Rejection::Engine(EngineError::LockHeld { holder, .. })) if holder == hero
    ));
    assert!(executor.is_pending(id));

    executor.complete_movement(&mut engine, &mut enc.context(), id).unwrap();
    assert!(!engine.is_locked());
    assert_eq!(enc.roster.get(hero).unwrap().turn.actions_remaining, 2);
}

#[test]
fn aid_carries_into_the_allys_strike() {
    let mut enc = scripted_encounter([5, 20, 1]);
    let hero = enc.spawn(EntityData::new("hero", Team::Party, Cell::new(1, 1, 0)).player_controlled());
    let cleric = enc.spawn(EntityData::new("cleric", Team::Party, Cell::new(0, 1, 0)).player_controlled());
    let goblin = enc.spawn(EntityData::new("goblin", Team::Adversary, Cell::new(2, 1, 0)));
    let config = EngineConfig::default();
    let mut engine = TurnEngine::new(&config);
    let mut executor = ActionExecutor::new(&config);
    engine.start_combat(&mut enc.context()).unwrap();
    assert_eq!(engine.current_actor(), Some(cleric));

    let aid = executor.execute(&mut engine, &mut enc.context(), cleric, ActionRequest::Aid { ally: hero });
    assert_eq!(aid.report().unwrap().action, ActionKind::Aid);
    engine.end_turn(&mut enc.context()).unwrap();
    assert_eq!(engine.current_actor(), Some(hero));

    // 9 + 3 + 1 meets AC 13 exactly
    enc.dice.push([9, 1]);
    let strike = executor.execute(
        &mut engine,
        &mut enc.context(),
        hero,
        ActionRequest::Strike { target: goblin },
    );
    let report = strike.report().unwrap();
    assert_eq!(report.degree, Some(DegreeOfSuccess::Success));
    assert_eq!(report.strike.as_ref().unwrap().phase.circumstance, 1);
    assert!(enc.roster.get(hero).unwrap().links.aid.is_none());
}

// =============================================================================
// AI Flow
// =============================================================================

#[test]
fn full_round_with_an_ai_adversary() {
    init_tracing();
    let (mut enc, hero, goblin) = duel([18, 3]);
    let config = EngineConfig::default();
    let mut engine = TurnEngine::new(&config);
    let mut executor = ActionExecutor::new(&config);
    let mut ai = AiTurnController::new(config.ai);
    engine.start_combat(&mut enc.context()).unwrap();

    assert!(ai.run_turn(&mut engine, &mut executor, &mut enc.context()).is_none());
    engine.end_turn(&mut enc.context()).unwrap();

    // three misses
    enc.dice.push([2, 2, 2]);
    let end = ai.run_turn(&mut engine, &mut executor, &mut enc.context());
    assert_eq!(end, Some(AiProgress::Finished(AiTurnEnd::TurnOver)));
    assert_eq!(engine.round(), 2);
    assert_eq!(engine.current_actor(), Some(hero));
    assert_eq!(enc.roster.get(goblin).unwrap().turn.map_count, 3);
    assert!(enc
        .events
        .iter()
        .any(|e| matches!(e, CombatEvent::RoundStarted { round: 2 })));
}

#[test]
fn grabbed_adversary_tries_to_escape_first() {
    let (mut enc, hero, goblin) = duel([18, 3]);
    let config = EngineConfig::default();
    let mut engine = TurnEngine::new(&config);
    let mut executor = ActionExecutor::new(&config);
    let mut ai = AiTurnController::new(config.ai);
    engine.start_combat(&mut enc.context()).unwrap();

    // 15 + 3 against Fortitude DC 13
    enc.dice.push([15]);
    let grapple = executor.execute(
        &mut engine,
        &mut enc.context(),
        hero,
        ActionRequest::Grapple { target: goblin },
    );
    assert_eq!(grapple.report().unwrap().degree, Some(DegreeOfSuccess::Success));
    engine.end_turn(&mut enc.context()).unwrap();
    enc.events.take_events();

    enc.dice.push([2, 2, 2]);
    ai.run_turn(&mut engine, &mut executor, &mut enc.context());

    let first_check = enc.events.iter().find_map(|e| match e {
        CombatEvent::SkillCheckResolved { action, actor, .. } if *actor == goblin => Some(*action),
        _ => None,
    });
    assert_eq!(first_check, Some(ActionKind::Escape));
    assert!(enc.roster.get(goblin).unwrap().has_condition(ConditionType::Grabbed));
    assert_eq!(engine.current_actor(), Some(hero));
}
