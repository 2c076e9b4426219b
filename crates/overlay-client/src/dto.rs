//! Wire shapes of the live client endpoints and their mapping onto [`GameState`].

use overlay_engine::objectives;
use overlay_types::game::GameState;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameStats {
    pub game_mode: String,
    pub game_time: f64,
    pub map_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChampionStats {
    pub champion_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivePlayer {
    pub summoner_name: String,
    pub level: u8,
    pub current_gold: f64,
    pub champion_stats: ChampionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerEntry {
    pub champion_name: String,
    pub team: String,
    pub current_gold: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllGameData {
    pub all_players: Vec<PlayerEntry>,
}

/// Truncates to a whole non-negative number.
pub fn floor_non_negative(raw: f64) -> u32 {
    // `as` saturates and maps NaN to zero.
    raw.max(0.0).floor() as u32
}

/// Sums gold by team. Players on the active player's team count as allies,
/// everyone else as enemies. When the active champion is not listed at all,
/// every player counts as an enemy.
pub fn team_gold(active_champion: &str, players: &[PlayerEntry]) -> (u32, u32) {
    let own_team = players
        .iter()
        .find(|player| player.champion_name == active_champion)
        .map(|player| player.team.as_str());

    players
        .iter()
        .fold((0u32, 0u32), |(team, enemy), player| {
            let amount = floor_non_negative(player.current_gold.unwrap_or(0.0));
            if Some(player.team.as_str()) == own_team {
                (team.saturating_add(amount), enemy)
            } else {
                (team, enemy.saturating_add(amount))
            }
        })
}

/// Builds an in-game snapshot from the four live responses.
pub fn map_snapshot(game_time: f64, active: &ActivePlayer, all: &AllGameData) -> GameState {
    let game_time = floor_non_negative(game_time);
    let champion = active.champion_stats.champion_name.clone();
    let (team_gold, enemy_gold) = team_gold(&champion, &all.all_players);

    GameState {
        is_in_game: true,
        game_time,
        player_champion: champion,
        player_level: active.level,
        player_gold: floor_non_negative(active.current_gold),
        team_gold,
        enemy_gold,
        objectives: objectives::schedule(game_time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_types::game::SpawnTime;
    use serde_json::json;

    fn player(champion: &str, team: &str, gold: Option<f64>) -> PlayerEntry {
        PlayerEntry {
            champion_name: champion.into(),
            team: team.into(),
            current_gold: gold,
        }
    }

    #[test]
    fn decodes_live_payloads() {
        let active: ActivePlayer = serde_json::from_value(json!({
            "summonerName": "moon",
            "level": 7,
            "currentGold": 1234.56,
            "championStats": { "championName": "Diana", "attackDamage": 80.0 }
        }))
        .expect("active player");
        assert_eq!(active.level, 7);
        assert_eq!(active.champion_stats.champion_name, "Diana");

        let all: AllGameData = serde_json::from_value(json!({
            "allPlayers": [
                { "championName": "Diana", "team": "ORDER", "currentGold": 1000.0 },
                { "championName": "Zed", "team": "CHAOS" }
            ],
            "events": { "Events": [] }
        }))
        .expect("all game data");
        assert_eq!(all.all_players.len(), 2);
        assert_eq!(all.all_players[1].current_gold, None);

        let stats: GameStats = serde_json::from_value(json!({ "gameMode": "CLASSIC" }))
            .expect("game stats");
        assert_eq!(stats.game_mode, "CLASSIC");
    }

    #[test]
    fn partitions_gold_by_team() {
        let players = vec![
            player("Diana", "ORDER", Some(5000.0)),
            player("Lux", "ORDER", Some(4000.9)),
            player("Zed", "CHAOS", Some(3000.0)),
            player("Ahri", "CHAOS", None),
        ];
        assert_eq!(team_gold("Diana", &players), (9000, 3000));
        assert_eq!(team_gold("Zed", &players), (3000, 9000));
    }

    #[test]
    fn unmatched_champion_makes_everyone_an_enemy() {
        let players = vec![
            player("Lux", "ORDER", Some(4000.0)),
            player("Zed", "CHAOS", Some(3000.0)),
        ];
        assert_eq!(team_gold("Diana", &players), (0, 7000));
    }

    #[test]
    fn snapshot_mapping() {
        let active = ActivePlayer {
            level: 9,
            current_gold: 812.7,
            champion_stats: ChampionStats {
                champion_name: "Diana".into(),
            },
            ..ActivePlayer::default()
        };
        let all = AllGameData {
            all_players: vec![
                player("Diana", "ORDER", Some(6000.0)),
                player("Zed", "CHAOS", Some(5000.0)),
            ],
        };
        let state = map_snapshot(650.9, &active, &all);
        assert!(state.is_in_game);
        assert_eq!(state.game_time, 650);
        assert_eq!(state.player_gold, 812);
        assert_eq!((state.team_gold, state.enemy_gold), (6000, 5000));
        assert_eq!(state.objectives.dragon.spawns_at, SpawnTime::At(900));
        assert_eq!(state.objectives.herald.spawns_at, SpawnTime::At(480));
        assert_eq!(state.objectives.baron.spawns_at, SpawnTime::At(1200));
    }

    #[test]
    fn negative_and_nan_times_clamp_to_zero() {
        assert_eq!(floor_non_negative(-100.0), 0);
        assert_eq!(floor_non_negative(f64::NAN), 0);
        assert_eq!(floor_non_negative(59.99), 59);
    }
}
