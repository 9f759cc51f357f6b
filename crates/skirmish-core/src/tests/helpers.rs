//! Encounter factories for tests.
//!
//! Every combatant built here uses the default profile: level 1, all
//! abilities +0, trained in everything (+3), AC 13, 20 HP, 25 ft speed and a
//! 1d4 agile finesse fist.

use tessera::{Bounds, Cell, GridMap};
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::context::Encounter;
use crate::dice::{ScriptedDice, SeededDice};
use crate::entity::{EntityData, EntityHandle, Team};
use crate::turn::TurnEngine;

// =============================================================================
// Encounters
// =============================================================================

/// Side length of the test map.
pub const MAP_SIZE: i32 = 10;

/// An empty encounter on a flat 10x10 map with scripted dice.
pub fn scripted_encounter(dice: impl IntoIterator<Item = u8>) -> Encounter<ScriptedDice> {
    Encounter::new(
        GridMap::new(Bounds::new(MAP_SIZE, MAP_SIZE)),
        ScriptedDice::new(dice),
    )
}

/// A player-controlled hero at (1,1) next to an adversary goblin at (2,1).
///
/// If combat is started, the first two dice are the initiative rolls of the
/// hero and the goblin (both +3).
pub fn duel(
    dice: impl IntoIterator<Item = u8>,
) -> (Encounter<ScriptedDice>, EntityHandle, EntityHandle) {
    let mut enc = scripted_encounter(dice);
    let hero = enc.spawn(EntityData::new("hero", Team::Party, Cell::new(1, 1, 0)).player_controlled());
    let goblin = enc.spawn(EntityData::new("goblin", Team::Adversary, Cell::new(2, 1, 0)));
    (enc, hero, goblin)
}

/// A seeded skirmish: `per_side` heroes on row 1 against as many goblins on row 8.
pub fn seeded_skirmish(seed: u64, per_side: i32) -> (Encounter<SeededDice>, Vec<EntityHandle>) {
    let mut enc = Encounter::new(
        GridMap::new(Bounds::new(MAP_SIZE, MAP_SIZE)),
        SeededDice::new(seed),
    );
    let mut handles = Vec::new();
    for i in 0..per_side {
        handles.push(enc.spawn(EntityData::new(
            format!("hero{i}"),
            Team::Party,
            Cell::new(1 + i * 2, 1, 0),
        )));
        handles.push(enc.spawn(EntityData::new(
            format!("goblin{i}"),
            Team::Adversary,
            Cell::new(1 + i * 2, 8, 0),
        )));
    }
    (enc, handles)
}

/// Starts combat on `enc` with the default configuration.
pub fn started_engine<R: crate::dice::RandomSource>(enc: &mut Encounter<R>) -> TurnEngine {
    let mut engine = TurnEngine::new(&EngineConfig::default());
    engine
        .start_combat(&mut enc.context())
        .expect("combat should start");
    engine
}

// =============================================================================
// Logging
// =============================================================================

/// Routes `tracing` output to the test harness; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
