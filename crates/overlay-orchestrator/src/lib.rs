//! Poll loop tying the game state source, decision engines, display and
//! event bus together.

mod session;

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use overlay_client::{FetchOutcome, GameStateSource};
use overlay_display::{boot_commands, DisplayChannel};
use overlay_engine::AdvisoryEngine;
use overlay_network::EventPublisher;
use overlay_ops::{ConfigStore, TelemetryStore};
use overlay_types::{
    advice::AdviceVerdict,
    events::{LifecyclePhase, SystemEvent},
    game::GameState,
    telemetry::{LatencySample, PollMetrics},
    view::{ConnectionState, OverlayView, WaitingReason},
    OverlayError, Result,
};
use tracing::{debug, info, warn};

pub use session::PollSession;

/// Outcome of a single poll tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub connection: ConnectionState,
    pub view: OverlayView,
}

pub struct PollOrchestrator<S, E, D, N>
where
    S: GameStateSource,
    E: AdvisoryEngine,
    D: DisplayChannel,
    N: EventPublisher,
{
    source: S,
    engine: E,
    display: Arc<D>,
    network: N,
    telemetry: TelemetryStore,
    config: ConfigStore,
    connection: ConnectionState,
    current: Option<GameState>,
    verdict: Option<AdviceVerdict>,
    view: OverlayView,
    in_match: bool,
    stopped: bool,
    metrics: PollMetrics,
}

impl<S, E, D, N> PollOrchestrator<S, E, D, N>
where
    S: GameStateSource,
    E: AdvisoryEngine,
    D: DisplayChannel,
    N: EventPublisher,
{
    pub fn new(
        config: ConfigStore,
        source: S,
        engine: E,
        display: Arc<D>,
        network: N,
        telemetry: TelemetryStore,
    ) -> Self {
        Self {
            source,
            engine,
            display,
            network,
            telemetry,
            config,
            connection: ConnectionState::Idle,
            current: None,
            verdict: None,
            view: OverlayView::waiting(ConnectionState::Idle, WaitingReason::ClientUnavailable),
            in_match: false,
            stopped: false,
            metrics: PollMetrics::default(),
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Last accepted snapshot; `None` while disconnected.
    pub fn current_state(&self) -> Option<&GameState> {
        self.current.as_ref()
    }

    pub fn current_verdict(&self) -> Option<&AdviceVerdict> {
        self.verdict.as_ref()
    }

    pub fn view(&self) -> &OverlayView {
        &self.view
    }

    pub fn metrics(&self) -> &PollMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Applies the display configuration and publishes the initial waiting view.
    pub async fn boot(&mut self) -> Result<()> {
        self.publish(SystemEvent::lifecycle(LifecyclePhase::Boot, "overlay session starting"))
            .await?;

        let display_config = self.config.current().display;
        for command in boot_commands(&display_config) {
            let acknowledged = match self.display.send(command).await {
                Ok(ack) => ack.is_some(),
                Err(err) => {
                    warn!(command = command.label(), error = %err, "display setup step failed");
                    false
                }
            };
            self.publish(SystemEvent::display(command.label(), acknowledged))
                .await?;
        }

        self.publish(SystemEvent::view(self.view.clone())).await?;
        self.publish(SystemEvent::lifecycle(LifecyclePhase::Ready, "overlay session ready"))
            .await?;
        info!("overlay session ready");
        Ok(())
    }

    /// One fetch, evaluate, publish cycle.
    pub async fn tick(&mut self) -> Result<TickReport> {
        let started = Instant::now();
        self.metrics.ticks += 1;
        let previous = self.connection;
        if self.connection != ConnectionState::Connected {
            self.transition(ConnectionState::Connecting, None).await?;
        }

        let fetched = self.source.fetch().await;
        let fetch_ms = elapsed_ms(started);

        match fetched {
            Ok(FetchOutcome::InGame(state)) => {
                self.transition(ConnectionState::Connected, None).await?;
                self.accept_in_game(state).await?;
            }
            Ok(FetchOutcome::NotInGame(state)) => {
                debug!("client reachable, no active match");
                self.transition(ConnectionState::Connected, None).await?;
                self.metrics.waiting_ticks += 1;
                self.end_match().await?;
                self.current = Some(state);
                self.verdict = None;
                self.view = OverlayView::waiting(
                    ConnectionState::Connected,
                    WaitingReason::NoActiveMatch,
                );
            }
            Err(err) => self.handle_connection_error(err, previous).await?,
        }

        self.publish(SystemEvent::view(self.view.clone())).await?;
        self.record_latency(fetch_ms, elapsed_ms(started)).await?;

        Ok(TickReport {
            connection: self.connection,
            view: self.view.clone(),
        })
    }

    /// Re-evaluates the current in-game snapshot without fetching, e.g. after
    /// a configuration change.
    pub async fn refresh(&mut self) -> Result<()> {
        let Some(state) = self.current.clone().filter(|state| state.is_in_game) else {
            return Ok(());
        };
        self.evaluate(&state);
        self.publish(SystemEvent::view(self.view.clone())).await
    }

    /// Stops reporting and releases the source connection. Safe to call repeatedly.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.source.reset();
        self.end_match().await?;
        self.current = None;
        self.verdict = None;
        self.connection = ConnectionState::Idle;
        self.view = OverlayView::waiting(ConnectionState::Idle, WaitingReason::ClientUnavailable);
        self.publish(SystemEvent::view(self.view.clone())).await?;
        self.publish(SystemEvent::lifecycle(LifecyclePhase::Shutdown, "overlay session stopped"))
            .await?;
        self.telemetry.record_metrics(self.metrics.clone()).await?;
        self.publish(SystemEvent::telemetry(
            self.metrics.last_latency.clone(),
            Some(self.metrics.clone()),
        ))
        .await?;
        info!(ticks = self.metrics.ticks, "overlay session stopped");
        Ok(())
    }

    async fn accept_in_game(&mut self, state: GameState) -> Result<()> {
        if let Err(err) = state.validate() {
            warn!(error = %err, "rejecting snapshot");
            self.metrics.rejected_snapshots += 1;
            self.current = None;
            self.verdict = None;
            self.view = OverlayView::waiting(
                ConnectionState::Connected,
                WaitingReason::InvalidSnapshot,
            );
            return Ok(());
        }

        if !self.in_match {
            self.in_match = true;
            info!(champion = %state.player_champion, "match detected");
            self.publish(SystemEvent::lifecycle(
                LifecyclePhase::MatchStart,
                format!("playing {}", state.player_champion),
            ))
            .await?;
        }

        self.metrics.in_game_ticks += 1;
        self.evaluate(&state);
        self.current = Some(state);
        Ok(())
    }

    fn evaluate(&mut self, state: &GameState) {
        let config = self.config.current();
        let verdict = self.engine.classify(state, &config);
        let view = self.engine.render(state, &config, verdict.clone());
        self.verdict = Some(verdict);
        self.view = OverlayView::Match(view);
    }

    async fn handle_connection_error(
        &mut self,
        err: OverlayError,
        previous: ConnectionState,
    ) -> Result<()> {
        self.metrics.connection_failures += 1;
        if previous == ConnectionState::Disconnected {
            debug!(error = %err, "game client still unavailable");
        } else {
            warn!(error = %err, "game client unavailable");
        }

        self.end_match().await?;
        self.current = None;
        self.verdict = None;
        self.view = OverlayView::waiting(
            ConnectionState::Disconnected,
            WaitingReason::ClientUnavailable,
        );
        self.transition(ConnectionState::Disconnected, Some(err.to_string()))
            .await
    }

    async fn end_match(&mut self) -> Result<()> {
        if !self.in_match {
            return Ok(());
        }
        self.in_match = false;
        info!("match ended");
        self.publish(SystemEvent::lifecycle(LifecyclePhase::MatchEnd, "match over"))
            .await
    }

    async fn transition(&mut self, next: ConnectionState, details: Option<String>) -> Result<()> {
        if self.connection == next {
            return Ok(());
        }
        debug!(from = ?self.connection, to = ?next, "connection state change");
        self.connection = next;
        self.publish(SystemEvent::connection(next, details)).await
    }

    async fn record_latency(&mut self, fetch_ms: u64, total_ms: u64) -> Result<()> {
        let sample = LatencySample {
            fetch_ms,
            evaluation_ms: total_ms.saturating_sub(fetch_ms),
            total_ms,
            captured_at: Utc::now(),
        };
        self.metrics.last_latency = Some(sample.clone());
        self.telemetry.record_latency(sample).await?;
        self.telemetry.record_metrics(self.metrics.clone()).await
    }

    async fn publish(&self, event: SystemEvent) -> Result<()> {
        let cloned = event.clone();
        self.network.publish(event).await?;
        self.telemetry.record_event(cloned).await?;
        Ok(())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

pub fn orchestrator_error(message: impl Into<String>) -> OverlayError {
    OverlayError::Orchestrator(message.into())
}

#[cfg(test)]
mod tests;
