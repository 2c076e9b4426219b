//! Gold-differential driven fight / trade / avoid classifier.

use overlay_types::{
    advice::{AdviceKind, AdviceVerdict},
    game::GameState,
};

const DECISIVE_LEAD_PCT: f64 = 15.0;
const CONFIDENCE_CAP: f64 = 95.0;
const DECISIVE_BASE: f64 = 70.0;
const TRADE_BASE: f64 = 60.0;
const NEUTRAL_CONFIDENCE: f64 = 50.0;

const BARON_GATE: u32 = 1200;
const PICK_WINDOW_END: u32 = 900;
const HERALD_PLATE_WINDOW_END: u32 = 480;
const LANING_PHASE_END: u32 = 600;
const POWER_SPIKE_LEVEL: u8 = 6;

const DRAGON_SOON_SECS: u32 = 60;
const HERALD_SOON_SECS: u32 = 60;
const BARON_SOON_SECS: u32 = 90;

pub const DEFAULT_EARLY_WEAK_CHAMPION: &str = "Diana";

/// Classifier parameterised by the champion that gets the pre-6 farming reminder.
#[derive(Debug, Clone)]
pub struct AdviceClassifier {
    early_weak_champion: String,
}

impl Default for AdviceClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_EARLY_WEAK_CHAMPION)
    }
}

/// Classifies `state` with the default classifier.
pub fn classify(state: &GameState) -> AdviceVerdict {
    AdviceClassifier::default().classify(state)
}

/// Team gold lead relative to the enemy, in percent. Zero when the enemy has no gold.
pub fn gold_difference_pct(state: &GameState) -> f64 {
    if state.enemy_gold > 0 {
        state.gold_difference() as f64 / f64::from(state.enemy_gold) * 100.0
    } else {
        0.0
    }
}

impl AdviceClassifier {
    pub fn new(early_weak_champion: impl Into<String>) -> Self {
        Self {
            early_weak_champion: early_weak_champion.into(),
        }
    }

    /// First matching branch wins: decisive lead, decisive deficit, objective
    /// imminent, neutral.
    pub fn classify(&self, state: &GameState) -> AdviceVerdict {
        let gold_diff = state.gold_difference();
        let pct = gold_difference_pct(state);

        if pct >= DECISIVE_LEAD_PCT {
            return AdviceVerdict {
                kind: AdviceKind::Fight,
                message: fight_message(state, gold_diff),
                confidence: CONFIDENCE_CAP.min(DECISIVE_BASE + pct),
            };
        }

        if pct <= -DECISIVE_LEAD_PCT {
            return AdviceVerdict {
                kind: AdviceKind::Avoid,
                message: avoid_message(state, gold_diff),
                confidence: CONFIDENCE_CAP.min(DECISIVE_BASE + pct.abs()),
            };
        }

        if objective_soon(state) {
            return AdviceVerdict {
                kind: AdviceKind::Trade,
                message: trade_message(state).to_string(),
                confidence: TRADE_BASE + pct.abs(),
            };
        }

        AdviceVerdict {
            kind: AdviceKind::Trade,
            message: self.neutral_message(state).to_string(),
            confidence: NEUTRAL_CONFIDENCE,
        }
    }

    fn neutral_message(&self, state: &GameState) -> &'static str {
        if state.player_champion == self.early_weak_champion
            && state.player_level < POWER_SPIKE_LEVEL
        {
            "Farm safely until level 6 power spike"
        } else if state.game_time < LANING_PHASE_END {
            "Focus on laning phase fundamentals"
        } else if state.game_time >= BARON_GATE {
            "Look for late game teamfight opportunities"
        } else {
            "Play for vision and farm"
        }
    }
}

fn baron_up_late(state: &GameState) -> bool {
    state.game_time >= BARON_GATE && state.objectives.baron.spawns_at.is_up(state.game_time)
}

fn dragon_up(state: &GameState) -> bool {
    state.objectives.dragon.spawns_at.is_up(state.game_time)
}

fn fight_message(state: &GameState, gold_diff: i64) -> String {
    let action = if baron_up_late(state) {
        "Force Baron fight"
    } else if dragon_up(state) {
        "Contest Dragon"
    } else if state.game_time < PICK_WINDOW_END {
        "Look for picks"
    } else {
        "Force teamfights"
    };
    format!("Gold lead +{gold_diff}g - {action}")
}

fn avoid_message(state: &GameState, gold_diff: i64) -> String {
    let action = if baron_up_late(state) {
        "Give Baron, farm safely"
    } else if dragon_up(state) {
        "Trade Dragon for farm"
    } else {
        "Focus farming & scaling"
    };
    format!("Behind {}g - {action}", gold_diff.abs())
}

fn dragon_soon(state: &GameState) -> bool {
    state
        .objectives
        .dragon
        .spawns_at
        .is_soon(state.game_time, DRAGON_SOON_SECS)
}

fn herald_soon(state: &GameState) -> bool {
    state
        .objectives
        .herald
        .spawns_at
        .is_soon(state.game_time, HERALD_SOON_SECS)
}

fn objective_soon(state: &GameState) -> bool {
    // Baron only counts once the baron gate has passed.
    let baron_soon = state.game_time >= BARON_GATE
        && state
            .objectives
            .baron
            .spawns_at
            .is_soon(state.game_time, BARON_SOON_SECS);
    dragon_soon(state) || herald_soon(state) || baron_soon
}

fn trade_message(state: &GameState) -> &'static str {
    let herald = herald_soon(state);
    if state.game_time < HERALD_PLATE_WINDOW_END && herald {
        "Early game - Herald for tower plates"
    } else if dragon_soon(state) && herald {
        "Trade Herald for Dragon + farm"
    } else if state.game_time >= BARON_GATE {
        "Late game - Split push or group mid"
    } else {
        "Look for objective trades"
    }
}
