use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Point, Size, DEFAULT_OVERLAY_POSITION, DEFAULT_OVERLAY_SIZE},
    OverlayError, Result,
};

/// Which overlay sections are rendered at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionToggles {
    pub champion_rules: bool,
    pub objective_timers: bool,
    pub advice_panel: bool,
    pub gold_status: bool,
    pub game_time: bool,
    pub player_stats: bool,
}

impl Default for SectionToggles {
    fn default() -> Self {
        Self {
            champion_rules: true,
            objective_timers: true,
            advice_panel: true,
            gold_status: true,
            game_time: true,
            player_stats: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    ChampionRules,
    ObjectiveTimers,
    AdvicePanel,
    GoldStatus,
    GameTime,
    PlayerStats,
}

impl SectionToggles {
    pub fn is_enabled(&self, section: Section) -> bool {
        match section {
            Section::ChampionRules => self.champion_rules,
            Section::ObjectiveTimers => self.objective_timers,
            Section::AdvicePanel => self.advice_panel,
            Section::GoldStatus => self.gold_status,
            Section::GameTime => self.game_time,
            Section::PlayerStats => self.player_stats,
        }
    }

    pub fn set(&mut self, section: Section, enabled: bool) {
        let slot = match section {
            Section::ChampionRules => &mut self.champion_rules,
            Section::ObjectiveTimers => &mut self.objective_timers,
            Section::AdvicePanel => &mut self.advice_panel,
            Section::GoldStatus => &mut self.gold_status,
            Section::GameTime => &mut self.game_time,
            Section::PlayerStats => &mut self.player_stats,
        };
        *slot = enabled;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChampionRulesConfig {
    pub max_rules: usize,
    /// `true` shows only rules of the current phase; `false` adds the early
    /// phase reminders on top of the current phase.
    pub show_only_active_phase: bool,
    /// Rules with a priority above this value are hidden.
    pub priority_filter: i32,
}

impl Default for ChampionRulesConfig {
    fn default() -> Self {
        Self {
            max_rules: 5,
            show_only_active_phase: true,
            priority_filter: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveConfig {
    pub show_upcoming: bool,
    pub show_gold_values: bool,
    pub show_trade_advice: bool,
    /// Countdown (seconds) at or below which a timer is flagged.
    pub warning_threshold: u32,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            show_upcoming: true,
            show_gold_values: true,
            show_trade_advice: true,
            warning_threshold: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviceConfig {
    pub show_confidence: bool,
    pub minimum_confidence: f64,
    pub show_icon: bool,
    /// Champion that gets the "farm until 6" reminder in neutral games.
    pub early_weak_champion: String,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            show_confidence: true,
            minimum_confidence: 50.0,
            show_icon: true,
            early_weak_champion: "Diana".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub opacity: f32,
    pub font_size: FontSize,
    pub compact_mode: bool,
    pub click_through: bool,
    /// Move the overlay next to the game window on boot when it can be found.
    pub follow_game_window: bool,
    pub position: Point,
    pub size: Size,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            opacity: 0.85,
            font_size: FontSize::Medium,
            compact_mode: false,
            click_through: false,
            follow_game_window: true,
            position: DEFAULT_OVERLAY_POSITION,
            size: DEFAULT_OVERLAY_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    pub toggle: String,
    pub cycle_mode: String,
    pub reset_position: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            toggle: "F10".into(),
            cycle_mode: "F11".into(),
            reset_position: "F12".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Overrides the platform default lockfile location.
    pub lockfile_path: Option<String>,
    pub username: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    pub const MAX_REQUEST_TIMEOUT_MS: u64 = 5_000;
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            lockfile_path: None,
            username: "riot".into(),
            poll_interval_ms: 2_000,
            request_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub sections: SectionToggles,
    pub champion_rules: ChampionRulesConfig,
    pub objectives: ObjectiveConfig,
    pub advice: AdviceConfig,
    pub display: DisplayConfig,
    pub hotkeys: HotkeyConfig,
    pub client: ClientConfig,
    pub ops: OpsConfig,
}

impl OverlayConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            OverlayError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        Self::from_toml_str(&contents).map_err(|err| {
            OverlayError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|err| OverlayError::Configuration(err.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| OverlayError::Configuration(err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.champion_rules.max_rules == 0 {
            return Err(OverlayError::Configuration(
                "champion_rules.max_rules must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.display.opacity) {
            return Err(OverlayError::Configuration(
                "display.opacity must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.advice.minimum_confidence) {
            return Err(OverlayError::Configuration(
                "advice.minimum_confidence must be between 0 and 100".into(),
            ));
        }
        if self.client.poll_interval_ms == 0 {
            return Err(OverlayError::Configuration(
                "client.poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.client.request_timeout_ms == 0
            || self.client.request_timeout_ms > ClientConfig::MAX_REQUEST_TIMEOUT_MS
        {
            return Err(OverlayError::Configuration(format!(
                "client.request_timeout_ms must be within 1..={}",
                ClientConfig::MAX_REQUEST_TIMEOUT_MS
            )));
        }
        if self.client.username.trim().is_empty() {
            return Err(OverlayError::Configuration("client.username must not be empty".into()));
        }
        let hotkeys = [
            ("toggle", &self.hotkeys.toggle),
            ("cycle_mode", &self.hotkeys.cycle_mode),
            ("reset_position", &self.hotkeys.reset_position),
        ];
        for (name, binding) in hotkeys {
            if binding.trim().is_empty() {
                return Err(OverlayError::Configuration(format!(
                    "hotkeys.{name} must not be empty"
                )));
            }
        }
        Ok(())
    }
}
