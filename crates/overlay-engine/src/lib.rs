//! Decision engines: objective schedule, advice classifier and champion rules.
//!
//! Everything in this crate is pure. Callers pass the snapshot and the
//! configuration in and get a fresh view back; nothing reads a clock.

pub mod advice;
pub mod objectives;
pub mod reference;
pub mod rules;

use overlay_types::{
    advice::AdviceVerdict,
    config::{OverlayConfig, Section},
    game::GameState,
    rules::RulePhase,
    view::{AdviceSection, GoldStatus, MatchView, PlayerStats, RuleSection},
    OverlayError, Result,
};
use tracing::debug;

use crate::{
    advice::AdviceClassifier,
    reference::GoldValues,
    rules::{select_rules, RuleBook},
};

/// Turns an in-game snapshot into advice and the populated overlay sections.
pub trait AdvisoryEngine: Send + Sync {
    fn classify(&self, state: &GameState, config: &OverlayConfig) -> AdviceVerdict;

    /// Builds the sections the configuration enables. `verdict` is only shown
    /// when the advice panel is on and its confidence clears the minimum.
    fn render(
        &self,
        state: &GameState,
        config: &OverlayConfig,
        verdict: AdviceVerdict,
    ) -> MatchView;
}

/// Engine backed by the built-in rule book and gold table.
#[derive(Debug, Clone)]
pub struct StandardEngine {
    rules: RuleBook,
    gold: GoldValues,
}

impl StandardEngine {
    pub fn new(rules: RuleBook, gold: GoldValues) -> Self {
        Self { rules, gold }
    }

    pub fn builtin() -> Result<Self> {
        Ok(Self::new(RuleBook::builtin()?, GoldValues::builtin()?))
    }

    pub fn rule_book(&self) -> &RuleBook {
        &self.rules
    }

    pub fn gold_values(&self) -> &GoldValues {
        &self.gold
    }
}

impl AdvisoryEngine for StandardEngine {
    fn classify(&self, state: &GameState, config: &OverlayConfig) -> AdviceVerdict {
        AdviceClassifier::new(config.advice.early_weak_champion.clone()).classify(state)
    }

    fn render(
        &self,
        state: &GameState,
        config: &OverlayConfig,
        verdict: AdviceVerdict,
    ) -> MatchView {
        let sections = &config.sections;
        let enabled = |section| sections.is_enabled(section);

        let advice = if !enabled(Section::AdvicePanel) {
            None
        } else if verdict.confidence >= config.advice.minimum_confidence {
            Some(AdviceSection {
                verdict,
                show_confidence: config.advice.show_confidence,
                show_icon: config.advice.show_icon,
            })
        } else {
            debug!(
                confidence = verdict.confidence,
                minimum = config.advice.minimum_confidence,
                "advice below confidence threshold"
            );
            None
        };

        let rules = if enabled(Section::ChampionRules) {
            self.rules
                .rules_for(&state.player_champion)
                .map(|rules| RuleSection {
                    champion: state.player_champion.clone(),
                    phase: RulePhase::from_progress(state.game_time, state.player_level),
                    rules: select_rules(rules, state, &config.champion_rules),
                })
        } else {
            None
        };

        MatchView {
            game_time: enabled(Section::GameTime).then_some(state.game_time),
            player: enabled(Section::PlayerStats).then(|| PlayerStats {
                champion: state.player_champion.clone(),
                level: state.player_level,
                gold: state.player_gold,
            }),
            gold: enabled(Section::GoldStatus)
                .then(|| GoldStatus::new(state.team_gold, state.enemy_gold)),
            objectives: enabled(Section::ObjectiveTimers)
                .then(|| objectives::objective_section(state, &config.objectives, &self.gold)),
            advice,
            rules,
        }
    }
}

pub fn engine_error(message: impl Into<String>) -> OverlayError {
    OverlayError::Rule(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_types::advice::AdviceKind;

    fn evaluate(engine: &StandardEngine, state: &GameState, config: &OverlayConfig) -> MatchView {
        engine.render(state, config, engine.classify(state, config))
    }

    fn snapshot(champion: &str, level: u8, game_time: u32, team: u32, enemy: u32) -> GameState {
        GameState {
            is_in_game: true,
            game_time,
            player_champion: champion.into(),
            player_level: level,
            player_gold: 1_250,
            team_gold: team,
            enemy_gold: enemy,
            objectives: objectives::schedule(game_time),
        }
    }

    #[test]
    fn default_sections_for_diana() {
        let engine = StandardEngine::builtin().expect("builtin engine");
        let view = evaluate(
            &engine,
            &snapshot("Diana", 7, 800, 15_000, 12_000),
            &OverlayConfig::default(),
        );

        assert_eq!(view.game_time, Some(800));
        assert!(view.player.is_none());
        assert_eq!(view.gold.map(|g| g.difference), Some(3_000));

        let advice = view.advice.expect("advice section");
        assert_eq!(advice.verdict.kind, AdviceKind::Fight);
        assert_eq!(advice.verdict.confidence, 95.0);

        let rules = view.rules.expect("rules evaluated");
        assert_eq!(rules.phase, RulePhase::Mid);
        assert_eq!(rules.rules.len(), 1);
        assert_eq!(rules.rules[0].id, "diana-mid-roam");

        let objectives = view.objectives.expect("objective section");
        assert!(!objectives.timers.is_empty());
        assert!(objectives.footer.is_some());
    }

    #[test]
    fn unknown_champion_has_no_rule_section() {
        let engine = StandardEngine::builtin().expect("builtin engine");
        let view = evaluate(
            &engine,
            &snapshot("Teemo", 7, 800, 10_000, 10_000),
            &OverlayConfig::default(),
        );
        assert!(view.rules.is_none());
    }

    #[test]
    fn empty_rule_selection_is_still_a_section() {
        let engine = StandardEngine::builtin().expect("builtin engine");
        let mut config = OverlayConfig::default();
        config.champion_rules.priority_filter = 0;
        let view = evaluate(&engine, &snapshot("Diana", 3, 200, 10_000, 10_000), &config);
        let rules = view.rules.expect("rules evaluated");
        assert!(rules.rules.is_empty());
    }

    #[test]
    fn disabled_sections_are_absent() {
        let engine = StandardEngine::builtin().expect("builtin engine");
        let mut config = OverlayConfig::default();
        for section in [
            Section::ChampionRules,
            Section::ObjectiveTimers,
            Section::AdvicePanel,
            Section::GoldStatus,
            Section::GameTime,
        ] {
            config.sections.set(section, false);
        }
        config.sections.set(Section::PlayerStats, true);

        let view = evaluate(&engine, &snapshot("Diana", 3, 200, 10_000, 10_000), &config);
        assert_eq!(
            view.player,
            Some(PlayerStats {
                champion: "Diana".into(),
                level: 3,
                gold: 1_250,
            })
        );
        assert!(view.game_time.is_none());
        assert!(view.gold.is_none());
        assert!(view.objectives.is_none());
        assert!(view.advice.is_none());
        assert!(view.rules.is_none());
    }

    #[test]
    fn low_confidence_advice_is_hidden() {
        let engine = StandardEngine::builtin().expect("builtin engine");
        let mut config = OverlayConfig::default();
        config.advice.minimum_confidence = 60.0;
        // Neutral gold, nothing spawning soon: confidence 50.
        let view = evaluate(&engine, &snapshot("Ahri", 9, 700, 10_000, 10_000), &config);
        assert!(view.advice.is_none());

        config.advice.minimum_confidence = 50.0;
        let view = evaluate(&engine, &snapshot("Ahri", 9, 700, 10_000, 10_000), &config);
        assert_eq!(
            view.advice.map(|a| a.verdict.message),
            Some("Play for vision and farm".to_string())
        );
    }
}
