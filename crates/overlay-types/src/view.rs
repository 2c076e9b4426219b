use serde::{Deserialize, Serialize};

use crate::{
    advice::AdviceVerdict,
    game::{ObjectiveKind, SpawnTime},
    rules::{ChampionRule, RulePhase},
};

/// Connection lifecycle of a polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitingReason {
    /// The game client could not be discovered or stopped answering.
    ClientUnavailable,
    /// The client is up but no match is running.
    NoActiveMatch,
    /// The client returned a snapshot the pipeline refused to evaluate.
    InvalidSnapshot,
}

impl WaitingReason {
    pub fn message(self) -> &'static str {
        match self {
            WaitingReason::ClientUnavailable => "Waiting for League of Legends...",
            WaitingReason::NoActiveMatch => "Waiting for a match to start...",
            WaitingReason::InvalidSnapshot => "Waiting for match data...",
        }
    }
}

/// Everything the presentation layer needs for one frame. Either a waiting
/// indicator or a populated match view, never something in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlayView {
    Waiting {
        connection: ConnectionState,
        reason: WaitingReason,
    },
    Match(MatchView),
}

impl OverlayView {
    pub fn waiting(connection: ConnectionState, reason: WaitingReason) -> Self {
        OverlayView::Waiting { connection, reason }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, OverlayView::Waiting { .. })
    }
}

/// Sections are `None` when disabled in the configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchView {
    pub game_time: Option<u32>,
    pub player: Option<PlayerStats>,
    pub gold: Option<GoldStatus>,
    pub objectives: Option<ObjectiveSection>,
    pub advice: Option<AdviceSection>,
    /// `None` means rules were not evaluated; an empty section means nothing matched.
    pub rules: Option<RuleSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub champion: String,
    pub level: u8,
    pub gold: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldStatus {
    pub team: u32,
    pub enemy: u32,
    pub difference: i64,
}

impl GoldStatus {
    pub fn new(team: u32, enemy: u32) -> Self {
        Self {
            team,
            enemy,
            difference: i64::from(team) - i64::from(enemy),
        }
    }

    /// Signed label such as `+3000g` or `-400g`.
    pub fn difference_label(&self) -> String {
        if self.difference > 0 {
            format!("+{}g", self.difference)
        } else {
            format!("{}g", self.difference)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveTimer {
    pub kind: ObjectiveKind,
    pub spawns_at: SpawnTime,
    pub countdown: u32,
    pub label: String,
    pub gold_value: Option<u32>,
    pub warning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldFooter {
    pub tower_plate: u32,
    pub cannon_wave: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectiveSection {
    pub timers: Vec<ObjectiveTimer>,
    pub next_best: Option<String>,
    pub footer: Option<GoldFooter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceSection {
    pub verdict: AdviceVerdict,
    pub show_confidence: bool,
    pub show_icon: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSection {
    pub champion: String,
    pub phase: RulePhase,
    pub rules: Vec<ChampionRule>,
}

/// Countdown label: `UP` once spawned, otherwise `m:ss`.
pub fn format_countdown(seconds: u32) -> String {
    if seconds == 0 {
        "UP".to_string()
    } else {
        format_clock(seconds)
    }
}

pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
