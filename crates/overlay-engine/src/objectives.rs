//! Objective spawn schedule and the timer section built from it.

use std::str::FromStr;

use overlay_types::{
    config::ObjectiveConfig,
    game::{GameState, ObjectiveKind, ObjectiveState, Objectives, SpawnTime},
    view::{format_countdown, GoldFooter, ObjectiveSection, ObjectiveTimer},
};

use crate::reference::GoldValues;

pub const DRAGON_FIRST_SPAWN: u32 = 300;
pub const DRAGON_RESPAWN: u32 = 300;
pub const HERALD_SPAWN: u32 = 480;
pub const HERALD_DESPAWN: u32 = 1200;
pub const BARON_FIRST_SPAWN: u32 = 1200;
pub const BARON_RESPAWN: u32 = 420;

const DRAGON_VARIANT: &str = "elemental";

/// Next spawn of `kind` as absolute game time.
pub fn next_spawn(kind: ObjectiveKind, game_time: u32) -> SpawnTime {
    match kind {
        ObjectiveKind::Dragon => {
            if game_time < DRAGON_FIRST_SPAWN {
                SpawnTime::At(DRAGON_FIRST_SPAWN)
            } else {
                let cycles = (game_time - DRAGON_FIRST_SPAWN).div_ceil(DRAGON_RESPAWN);
                SpawnTime::At(cycles * DRAGON_RESPAWN + DRAGON_FIRST_SPAWN)
            }
        }
        ObjectiveKind::Baron => {
            SpawnTime::At(game_time.saturating_add(BARON_RESPAWN).max(BARON_FIRST_SPAWN))
        }
        ObjectiveKind::Herald => {
            if game_time < HERALD_DESPAWN {
                SpawnTime::At(HERALD_SPAWN)
            } else {
                SpawnTime::Closed
            }
        }
    }
}

/// String-keyed variant used at the wire boundary; unknown labels yield `0`.
pub fn next_spawn_for_label(label: &str, game_time: u32) -> i64 {
    ObjectiveKind::from_str(label)
        .map(|kind| next_spawn(kind, game_time).as_seconds())
        .unwrap_or(0)
}

/// Full objective schedule for a live snapshot.
pub fn schedule(game_time: u32) -> Objectives {
    let state = |kind| ObjectiveState {
        spawns_at: next_spawn(kind, game_time),
        variant: None,
    };
    Objectives {
        dragon: state(ObjectiveKind::Dragon).with_variant(DRAGON_VARIANT),
        herald: state(ObjectiveKind::Herald),
        baron: state(ObjectiveKind::Baron),
    }
}

/// Builds the timer rows, trade hint and gold footer for the overlay.
pub fn objective_section(
    state: &GameState,
    config: &ObjectiveConfig,
    gold: &GoldValues,
) -> ObjectiveSection {
    let now = state.game_time;
    let timers = if config.show_upcoming {
        state
            .objectives
            .iter()
            .filter(|(kind, objective)| match kind {
                ObjectiveKind::Dragon => true,
                ObjectiveKind::Herald => !objective.spawns_at.is_closed(),
                ObjectiveKind::Baron => now >= BARON_FIRST_SPAWN,
            })
            .map(|(kind, objective)| {
                let countdown = objective.spawns_at.countdown(now).unwrap_or(0);
                ObjectiveTimer {
                    kind,
                    spawns_at: objective.spawns_at,
                    countdown,
                    label: format_countdown(countdown),
                    gold_value: config.show_gold_values.then(|| gold.for_objective(kind)),
                    warning: countdown > 0 && countdown <= config.warning_threshold,
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    ObjectiveSection {
        timers,
        next_best: config
            .show_trade_advice
            .then(|| next_best_trade(&state.objectives, now).to_string()),
        footer: config.show_gold_values.then(|| GoldFooter {
            tower_plate: gold.tower_plate,
            cannon_wave: gold.cannon_wave,
        }),
    }
}

/// Short hint on which objective to prioritise next.
pub fn next_best_trade(objectives: &Objectives, now: u32) -> &'static str {
    // A closed window never counts as imminent.
    let until = |kind| {
        objectives
            .get(kind)
            .spawns_at
            .countdown(now)
            .unwrap_or(u32::MAX)
    };
    let dragon = until(ObjectiveKind::Dragon);
    let herald = until(ObjectiveKind::Herald);
    let baron = until(ObjectiveKind::Baron);

    if dragon <= 30 && herald > 60 {
        "Trade Herald for Dragon"
    } else if herald <= 30 && dragon > 60 {
        "Herald > Early Dragon"
    } else if baron <= 60 {
        "Focus Baron prep"
    } else {
        "Farm for next objective"
    }
}
