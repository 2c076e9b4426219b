//! Champion rule book and the filter that picks the lines to display.

mod condition;

use std::collections::{BTreeMap, HashSet};

use overlay_types::{
    config::ChampionRulesConfig,
    game::GameState,
    rules::{ChampionRule, RulePhase},
    Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine_error;

pub use condition::{evaluate, Condition, ConditionContext, ConditionError};

const BUILTIN_RULES: &str = include_str!("../../data/champion_rules.toml");

/// Rules keyed by champion name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleBook {
    #[serde(default)]
    champions: BTreeMap<String, Vec<ChampionRule>>,
}

impl RuleBook {
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    /// Parses a rule book. Rules whose condition does not parse are dropped
    /// with a warning; the rest of the book still loads.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut book: RuleBook = toml::from_str(contents)
            .map_err(|err| engine_error(format!("invalid rule book: {err}")))?;
        book.validate()?;
        book.drop_unparseable();
        Ok(book)
    }

    /// Rule ids must be unique per champion.
    pub fn validate(&self) -> Result<()> {
        for (champion, rules) in &self.champions {
            let mut seen = HashSet::new();
            for rule in rules {
                if !seen.insert(rule.id.as_str()) {
                    return Err(engine_error(format!(
                        "duplicate rule id {} for {champion}",
                        rule.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn drop_unparseable(&mut self) {
        for (champion, rules) in &mut self.champions {
            rules.retain(|rule| match Condition::parse(&rule.condition) {
                Ok(_) => true,
                Err(err) => {
                    warn!(%champion, rule = %rule.id, error = %err, "skipping rule");
                    false
                }
            });
        }
    }

    pub fn insert(&mut self, champion: impl Into<String>, rules: Vec<ChampionRule>) {
        self.champions.insert(champion.into(), rules);
    }

    pub fn rules_for(&self, champion: &str) -> Option<&[ChampionRule]> {
        self.champions.get(champion).map(Vec::as_slice)
    }

    pub fn champions(&self) -> impl Iterator<Item = &str> {
        self.champions.keys().map(String::as_str)
    }
}

/// Context a snapshot exposes to rule conditions.
pub fn context_for(state: &GameState) -> ConditionContext {
    ConditionContext::new(state.player_level, state.game_time)
}

/// Applicable rules, at most `config.max_rules`, lowest priority value first.
///
/// A condition that fails to evaluate counts as not matching.
pub fn select_rules(
    rules: &[ChampionRule],
    state: &GameState,
    config: &ChampionRulesConfig,
) -> Vec<ChampionRule> {
    let phase = RulePhase::from_progress(state.game_time, state.player_level);
    let ctx = context_for(state);

    let mut selected: Vec<ChampionRule> = rules
        .iter()
        .filter(|rule| phase_matches(rule.phase, phase, config.show_only_active_phase))
        .filter(|rule| rule.priority <= config.priority_filter)
        .filter(|rule| match evaluate(&rule.condition, &ctx) {
            Ok(matched) => matched,
            Err(err) => {
                debug!(rule = %rule.id, error = %err, "rule condition rejected");
                false
            }
        })
        .cloned()
        .collect();

    selected.sort_by_key(|rule| rule.priority);
    selected.truncate(config.max_rules);
    selected
}

fn phase_matches(rule: RulePhase, current: RulePhase, only_active: bool) -> bool {
    rule == current || (!only_active && rule == RulePhase::Early)
}
