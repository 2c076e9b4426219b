use overlay_types::{game::ObjectiveKind, OverlayError, Result};
use serde::{Deserialize, Serialize};

const BUILTIN_GOLD_VALUES: &str = include_str!("../data/gold_values.toml");

/// Read-only gold reference table shown next to objective timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldValues {
    pub dragon: u32,
    pub herald: u32,
    pub baron: u32,
    pub tower: u32,
    pub tower_plate: u32,
    pub cannon_wave: u32,
}

impl GoldValues {
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_GOLD_VALUES)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|err| OverlayError::Configuration(format!("invalid gold table: {err}")))
    }

    pub fn for_objective(&self, kind: ObjectiveKind) -> u32 {
        match kind {
            ObjectiveKind::Dragon => self.dragon,
            ObjectiveKind::Herald => self.herald,
            ObjectiveKind::Baron => self.baron,
        }
    }
}

impl Default for GoldValues {
    fn default() -> Self {
        Self {
            dragon: 1000,
            herald: 1000,
            baron: 1500,
            tower: 550,
            tower_plate: 160,
            cannon_wave: 195,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_matches_defaults() {
        let table = GoldValues::builtin().expect("builtin gold table");
        assert_eq!(table, GoldValues::default());
        assert_eq!(table.for_objective(ObjectiveKind::Baron), 1500);
    }

    #[test]
    fn incomplete_table_is_rejected() {
        assert!(GoldValues::from_toml_str("dragon = 1").is_err());
    }
}
