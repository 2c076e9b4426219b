use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{OverlayError, Result};

/// Contestable neutral objectives tracked by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveKind {
    Dragon,
    Herald,
    Baron,
}

impl ObjectiveKind {
    pub const ALL: [ObjectiveKind; 3] = [
        ObjectiveKind::Dragon,
        ObjectiveKind::Herald,
        ObjectiveKind::Baron,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ObjectiveKind::Dragon => "dragon",
            ObjectiveKind::Herald => "herald",
            ObjectiveKind::Baron => "baron",
        }
    }
}

impl fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ObjectiveKind {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dragon" => Ok(ObjectiveKind::Dragon),
            "herald" => Ok(ObjectiveKind::Herald),
            "baron" => Ok(ObjectiveKind::Baron),
            other => Err(OverlayError::Rule(format!("unknown objective kind: {other}"))),
        }
    }
}

/// Absolute game time of the next spawn.
///
/// Serialised as a single integer where `-1` means the objective will not
/// spawn again in the current phase of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum SpawnTime {
    At(u32),
    Closed,
}

impl SpawnTime {
    pub const CLOSED_SENTINEL: i64 = -1;

    pub fn as_seconds(self) -> i64 {
        match self {
            SpawnTime::At(seconds) => i64::from(seconds),
            SpawnTime::Closed => Self::CLOSED_SENTINEL,
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, SpawnTime::Closed)
    }

    /// Seconds until the spawn, clamped at zero. `None` once the window closed.
    pub fn countdown(self, now: u32) -> Option<u32> {
        match self {
            SpawnTime::At(at) => Some(at.saturating_sub(now)),
            SpawnTime::Closed => None,
        }
    }

    /// The objective has spawned and is waiting on the map.
    pub fn is_up(self, now: u32) -> bool {
        match self {
            SpawnTime::At(at) => at > 0 && now >= at,
            SpawnTime::Closed => false,
        }
    }

    /// The objective spawns within `threshold` seconds (inclusive, not yet up).
    pub fn is_soon(self, now: u32, threshold: u32) -> bool {
        match self {
            SpawnTime::At(at) => at > 0 && at >= now && at - now <= threshold,
            SpawnTime::Closed => false,
        }
    }
}

impl From<i64> for SpawnTime {
    fn from(value: i64) -> Self {
        if value < 0 {
            SpawnTime::Closed
        } else {
            SpawnTime::At(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }
}

impl From<SpawnTime> for i64 {
    fn from(value: SpawnTime) -> Self {
        value.as_seconds()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveState {
    pub spawns_at: SpawnTime,
    /// Informational only, e.g. the dragon's elemental type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl ObjectiveState {
    pub fn at(seconds: u32) -> Self {
        Self {
            spawns_at: SpawnTime::At(seconds),
            variant: None,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

/// The fixed set of objectives carried by every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objectives {
    pub dragon: ObjectiveState,
    pub herald: ObjectiveState,
    pub baron: ObjectiveState,
}

impl Objectives {
    pub fn get(&self, kind: ObjectiveKind) -> &ObjectiveState {
        match kind {
            ObjectiveKind::Dragon => &self.dragon,
            ObjectiveKind::Herald => &self.herald,
            ObjectiveKind::Baron => &self.baron,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectiveKind, &ObjectiveState)> {
        ObjectiveKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

impl Default for Objectives {
    /// Estimated first spawns used before a match has started.
    fn default() -> Self {
        Self {
            dragon: ObjectiveState::at(300).with_variant("unknown"),
            herald: ObjectiveState::at(480),
            baron: ObjectiveState::at(1200),
        }
    }
}

/// Live match snapshot, rebuilt from scratch on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub is_in_game: bool,
    pub game_time: u32,
    pub player_champion: String,
    pub player_level: u8,
    pub player_gold: u32,
    pub team_gold: u32,
    pub enemy_gold: u32,
    pub objectives: Objectives,
}

impl GameState {
    pub const MAX_LEVEL: u8 = 18;

    /// Snapshot reported while the client is up but no match is running.
    pub fn not_in_game() -> Self {
        Self {
            is_in_game: false,
            game_time: 0,
            player_champion: String::new(),
            player_level: 1,
            player_gold: 0,
            team_gold: 0,
            enemy_gold: 0,
            objectives: Objectives::default(),
        }
    }

    pub fn gold_difference(&self) -> i64 {
        i64::from(self.team_gold) - i64::from(self.enemy_gold)
    }

    /// Rejects in-game snapshots the decision engines cannot make sense of.
    pub fn validate(&self) -> Result<()> {
        if !self.is_in_game {
            return Ok(());
        }
        if self.player_champion.trim().is_empty() {
            return Err(OverlayError::InvalidSnapshot("in-game snapshot without a champion".into()));
        }
        if !(1..=Self::MAX_LEVEL).contains(&self.player_level) {
            return Err(OverlayError::InvalidSnapshot(format!(
                "player level {} outside 1..={}",
                self.player_level,
                Self::MAX_LEVEL
            )));
        }
        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::not_in_game()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_time_sentinel_round_trips_through_json() {
        let state = ObjectiveState {
            spawns_at: SpawnTime::Closed,
            variant: None,
        };
        let json = serde_json::to_value(&state).expect("serialize");
        assert_eq!(json["spawns_at"], -1);
        let back: ObjectiveState = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.spawns_at, SpawnTime::Closed);
    }

    #[test]
    fn up_and_soon_windows() {
        let dragon = SpawnTime::At(300);
        assert!(dragon.is_soon(290, 60));
        assert!(dragon.is_soon(300, 60));
        assert!(!dragon.is_soon(301, 60));
        assert!(!dragon.is_soon(239, 60));
        assert!(dragon.is_up(300));
        assert!(!dragon.is_up(299));
        assert!(!SpawnTime::At(0).is_up(100));
        assert!(!SpawnTime::Closed.is_soon(0, u32::MAX));
        assert_eq!(SpawnTime::At(300).countdown(450), Some(0));
        assert_eq!(SpawnTime::Closed.countdown(0), None);
    }

    #[test]
    fn not_in_game_defaults() {
        let state = GameState::not_in_game();
        assert!(!state.is_in_game);
        assert_eq!(state.objectives.dragon.spawns_at, SpawnTime::At(300));
        assert_eq!(state.objectives.herald.spawns_at, SpawnTime::At(480));
        assert_eq!(state.objectives.baron.spawns_at, SpawnTime::At(1200));
        assert!(state.validate().is_ok());
    }

    #[test]
    fn validate_rejects_broken_in_game_snapshots() {
        let mut state = GameState {
            is_in_game: true,
            player_champion: "Diana".into(),
            ..GameState::not_in_game()
        };
        assert!(state.validate().is_ok());
        state.player_level = 0;
        assert!(state.validate().is_err());
        state.player_level = 19;
        assert!(state.validate().is_err());
        state.player_level = 7;
        state.player_champion.clear();
        assert!(matches!(state.validate(), Err(OverlayError::InvalidSnapshot(_))));
    }

    #[test]
    fn parse_objective_kind() {
        assert_eq!(
            "Baron".parse::<ObjectiveKind>().unwrap(),
            ObjectiveKind::Baron
        );
        assert!("elder".parse::<ObjectiveKind>().is_err());
    }
}
