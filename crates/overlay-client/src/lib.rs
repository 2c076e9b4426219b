//! Game state source backed by the local client's live data API.

pub mod discovery;
pub mod dto;
pub mod transport;

use std::time::Duration;

use async_trait::async_trait;
use overlay_types::{config::ClientConfig, game::GameState, OverlayError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info};

pub use discovery::{ClientDiscovery, Endpoint, Lockfile, LockfileDiscovery};
pub use transport::{ClientTransport, ReqwestTransport, TransportError};

use dto::{ActivePlayer, AllGameData, GameStats};

pub const SUMMONER_PROBE_PATH: &str = "/lol-summoner/v1/current-summoner";
pub const GAME_STATS_PATH: &str = "/liveclientdata/gamestats";
pub const GAME_TIME_PATH: &str = "/liveclientdata/gametime";
pub const ACTIVE_PLAYER_PATH: &str = "/liveclientdata/activeplayer";
pub const ALL_GAME_DATA_PATH: &str = "/liveclientdata/allgamedata";

/// Result of a successful poll. "No active match" is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    InGame(GameState),
    NotInGame(GameState),
}

impl FetchOutcome {
    pub fn state(&self) -> &GameState {
        match self {
            FetchOutcome::InGame(state) | FetchOutcome::NotInGame(state) => state,
        }
    }

    pub fn into_state(self) -> GameState {
        match self {
            FetchOutcome::InGame(state) | FetchOutcome::NotInGame(state) => state,
        }
    }

    pub fn is_in_game(&self) -> bool {
        matches!(self, FetchOutcome::InGame(_))
    }
}

#[async_trait]
pub trait GameStateSource: Send + Sync {
    /// Connection problems surface as [`OverlayError::Discovery`] or
    /// [`OverlayError::Fetch`]; the next call starts over from discovery.
    async fn fetch(&mut self) -> Result<FetchOutcome>;

    /// Drops any cached connection.
    fn reset(&mut self) {}
}

/// Discovers the client, caches the endpoint and polls the four live endpoints
/// concurrently.
pub struct LiveClientSource<D, T> {
    discovery: D,
    transport: T,
    request_timeout: Duration,
    endpoint: Option<Endpoint>,
}

impl<D, T> LiveClientSource<D, T>
where
    D: ClientDiscovery,
    T: ClientTransport,
{
    pub fn new(discovery: D, transport: T, request_timeout: Duration) -> Self {
        Self {
            discovery,
            transport,
            request_timeout,
            endpoint: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn connect(&self) -> Result<Endpoint> {
        let endpoint = self.discovery.discover().await?;
        match timeout(
            self.request_timeout,
            self.transport.get_json(&endpoint, SUMMONER_PROBE_PATH),
        )
        .await
        {
            Ok(Ok(_)) => {
                info!(url = %endpoint.base_url, "connected to game client");
                Ok(endpoint)
            }
            Ok(Err(err)) => Err(discovery_error(format!("handshake failed: {err}"))),
            Err(_) => Err(discovery_error("handshake timed out")),
        }
    }

    async fn fetch_live(&self, endpoint: &Endpoint) -> Result<GameState, TransportError> {
        let (stats, game_time, active, all) = tokio::try_join!(
            self.transport.get_json(endpoint, GAME_STATS_PATH),
            self.transport.get_json(endpoint, GAME_TIME_PATH),
            self.transport.get_json(endpoint, ACTIVE_PLAYER_PATH),
            self.transport.get_json(endpoint, ALL_GAME_DATA_PATH),
        )?;

        let stats: GameStats = decode(GAME_STATS_PATH, stats)?;
        let game_time: f64 = decode(GAME_TIME_PATH, game_time)?;
        let active: ActivePlayer = decode(ACTIVE_PLAYER_PATH, active)?;
        let all: AllGameData = decode(ALL_GAME_DATA_PATH, all)?;
        debug!(mode = %stats.game_mode, game_time, "live snapshot received");

        Ok(dto::map_snapshot(game_time, &active, &all))
    }
}

fn decode<V: DeserializeOwned>(path: &str, value: Value) -> Result<V, TransportError> {
    serde_json::from_value(value)
        .map_err(|err| TransportError::Failed(format!("{path}: unexpected payload: {err}")))
}

#[async_trait]
impl<D, T> GameStateSource for LiveClientSource<D, T>
where
    D: ClientDiscovery,
    T: ClientTransport,
{
    async fn fetch(&mut self) -> Result<FetchOutcome> {
        let endpoint = match self.endpoint.clone() {
            Some(endpoint) => endpoint,
            None => {
                let endpoint = self.connect().await?;
                self.endpoint = Some(endpoint.clone());
                endpoint
            }
        };

        match timeout(self.request_timeout, self.fetch_live(&endpoint)).await {
            Ok(Ok(state)) => Ok(FetchOutcome::InGame(state)),
            Ok(Err(TransportError::NotFound(path))) => {
                debug!(%path, "no active match");
                Ok(FetchOutcome::NotInGame(GameState::not_in_game()))
            }
            Ok(Err(TransportError::Failed(reason))) => {
                self.endpoint = None;
                Err(fetch_error(reason))
            }
            Err(_) => {
                self.endpoint = None;
                Err(fetch_error(format!(
                    "live data did not answer within {}ms",
                    self.request_timeout.as_millis()
                )))
            }
        }
    }

    fn reset(&mut self) {
        self.endpoint = None;
    }
}

/// Production source: lockfile discovery plus the `reqwest` transport.
pub fn live_source(
    config: &ClientConfig,
) -> Result<LiveClientSource<LockfileDiscovery, ReqwestTransport>> {
    let request_timeout = Duration::from_millis(config.request_timeout_ms);
    Ok(LiveClientSource::new(
        LockfileDiscovery::from_config(config),
        ReqwestTransport::new(request_timeout)?,
        request_timeout,
    ))
}

pub fn discovery_error(message: impl Into<String>) -> OverlayError {
    OverlayError::Discovery(message.into())
}

pub fn fetch_error(message: impl Into<String>) -> OverlayError {
    OverlayError::Fetch(message.into())
}
