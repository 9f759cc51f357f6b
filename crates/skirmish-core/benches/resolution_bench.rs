use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skirmish_core::actions;
use skirmish_core::ai::AiTurnController;
use skirmish_core::dice::SeededDice;
use skirmish_core::executor::ActionExecutor;
use skirmish_core::store::EntityStore;
use skirmish_core::tessera::{Bounds, Cell, GridMap};
use skirmish_core::{roll_check, CheckSource, EngineConfig, Encounter, EntityData, Team, TurnEngine, TurnState};

fn duel_encounter(seed: u64) -> Encounter<SeededDice> {
    Encounter::new(GridMap::new(Bounds::new(12, 12)), SeededDice::new(seed))
}

fn bench_roll_check(c: &mut Criterion) {
    let mut dice = SeededDice::new(7);
    let source = CheckSource::Custom("attack".into());
    c.bench_function("roll_check", |b| {
        b.iter(|| roll_check(black_box(7), black_box(15), source.clone(), &mut dice))
    });
}

fn bench_strike(c: &mut Criterion) {
    let mut enc = duel_encounter(11);
    let fighter = enc.spawn(EntityData::new("fighter", Team::Party, Cell::new(4, 4, 0)));
    let target = enc.spawn(EntityData::new("target", Team::Adversary, Cell::new(5, 4, 0)));

    c.bench_function("strike_resolution", |b| {
        b.iter(|| {
            // keep the target standing so every iteration does the same work
            if let Some(data) = enc.roster.get_mut(target) {
                data.hp = data.max_hp;
            }
            let strike = actions::try_strike(&mut enc.context(), fighter, target, 0);
            enc.events.take_events();
            black_box(strike)
        })
    });
}

fn bench_ai_skirmish(c: &mut Criterion) {
    let config = EngineConfig::default();
    c.bench_function("ai_skirmish_to_the_end", |b| {
        b.iter(|| {
            let mut enc = duel_encounter(black_box(3));
            for i in 0..3 {
                enc.spawn(EntityData::new(format!("hero{i}"), Team::Party, Cell::new(2 + i * 3, 1, 0)));
                enc.spawn(EntityData::new(format!("goblin{i}"), Team::Adversary, Cell::new(2 + i * 3, 10, 0)));
            }
            let mut engine = TurnEngine::new(&config);
            let mut executor = ActionExecutor::new(&config);
            let mut ai = AiTurnController::new(config.ai);
            if engine.start_combat(&mut enc.context()).is_err() {
                return 0;
            }
            let mut turns = 0;
            while engine.state() != TurnState::CombatOver && turns < 500 {
                if ai.run_turn(&mut engine, &mut executor, &mut enc.context()).is_none() {
                    break;
                }
                turns += 1;
            }
            turns
        })
    });
}

criterion_group!(benches, bench_roll_check, bench_strike, bench_ai_skirmish);
criterion_main!(benches);
