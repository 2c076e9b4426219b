use serde::{Deserialize, Serialize};

/// Coarse match-progress bucket used to filter champion guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulePhase {
    Early,
    Mid,
    Late,
}

impl RulePhase {
    pub fn from_progress(game_time: u32, level: u8) -> Self {
        if level < 6 || game_time < 600 {
            RulePhase::Early
        } else if level < 11 || game_time < 1200 {
            RulePhase::Mid
        } else {
            RulePhase::Late
        }
    }
}

/// Declarative guidance line; `condition` is a small boolean expression over
/// `level`, `gameTime`, `mana`, `position` and `hasItem('name')`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionRule {
    pub id: String,
    pub phase: RulePhase,
    pub condition: String,
    pub text: String,
    /// Lower values are shown first.
    pub priority: i32,
}
