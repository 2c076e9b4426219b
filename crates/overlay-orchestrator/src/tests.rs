use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use overlay_client::{discovery_error, fetch_error, FetchOutcome, GameStateSource};
use overlay_display::{DisplayChannel, VirtualDisplay};
use overlay_engine::StandardEngine;
use overlay_network::{EventPublisher, LocalServer};
use overlay_ops::{ConfigStore, TelemetryStore};
use overlay_types::{
    advice::AdviceKind,
    config::{OverlayConfig, Section},
    events::{EventPayload, LifecyclePhase, SystemEvent},
    game::{GameState, Objectives},
    geometry::Point,
    view::{ConnectionState, OverlayView, WaitingReason},
    Result,
};

use super::*;

/// Replays a fixed list of fetch results; once exhausted the client is gone.
#[derive(Clone, Default)]
struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Result<FetchOutcome>>>>,
    resets: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<FetchOutcome>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            resets: Arc::default(),
        }
    }

    fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GameStateSource for ScriptedSource {
    async fn fetch(&mut self) -> Result<FetchOutcome> {
        let next = self.script.lock().expect("script lock").pop_front();
        next.unwrap_or_else(|| Err(discovery_error("lockfile not found")))
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Answers with an in-game snapshot, but only after `delay`.
struct SlowSource {
    delay: Duration,
}

#[async_trait]
impl GameStateSource for SlowSource {
    async fn fetch(&mut self) -> Result<FetchOutcome> {
        tokio::time::sleep(self.delay).await;
        Ok(FetchOutcome::InGame(diana()))
    }
}

type TestOrchestrator<S> = PollOrchestrator<S, StandardEngine, VirtualDisplay, LocalServer>;

struct Harness<S: GameStateSource> {
    orchestrator: TestOrchestrator<S>,
    display: Arc<VirtualDisplay>,
    network: LocalServer,
    telemetry: TelemetryStore,
}

fn harness<S: GameStateSource>(source: S, config: OverlayConfig) -> Harness<S> {
    let config = ConfigStore::new(config);
    let display = Arc::new(VirtualDisplay::new(&config.current().display));
    let network = LocalServer::default();
    let telemetry = TelemetryStore::new();
    let orchestrator = PollOrchestrator::new(
        config,
        source,
        StandardEngine::builtin().expect("built-in engine"),
        display.clone(),
        network.clone(),
        telemetry.clone(),
    );
    Harness {
        orchestrator,
        display,
        network,
        telemetry,
    }
}

fn diana() -> GameState {
    GameState {
        is_in_game: true,
        game_time: 800,
        player_champion: "Diana".into(),
        player_level: 9,
        player_gold: 640,
        team_gold: 15_000,
        enemy_gold: 12_000,
        objectives: Objectives::default(),
    }
}

fn in_game(state: GameState) -> Result<FetchOutcome> {
    Ok(FetchOutcome::InGame(state))
}

fn not_in_game() -> Result<FetchOutcome> {
    Ok(FetchOutcome::NotInGame(GameState::not_in_game()))
}

fn lifecycle_phases(events: &[SystemEvent]) -> Vec<LifecyclePhase> {
    events
        .iter()
        .filter_map(|event| match &event.payload {
            EventPayload::Lifecycle(lifecycle) => Some(lifecycle.phase),
            _ => None,
        })
        .collect()
}

fn idle_view() -> OverlayView {
    OverlayView::waiting(ConnectionState::Idle, WaitingReason::ClientUnavailable)
}

#[tokio::test]
async fn discovery_failures_then_connect() {
    let source = ScriptedSource::new(vec![
        Err(discovery_error("lockfile not found")),
        Err(discovery_error("lockfile not found")),
        Err(discovery_error("lockfile not found")),
        in_game(diana()),
    ]);
    let mut h = harness(source, OverlayConfig::default());

    let mut states = Vec::new();
    for _ in 0..4 {
        let report = h.orchestrator.tick().await.expect("tick");
        if report.connection == ConnectionState::Disconnected {
            assert!(h.orchestrator.current_state().is_none());
            assert!(h.orchestrator.current_verdict().is_none());
            assert_eq!(
                report.view,
                OverlayView::waiting(
                    ConnectionState::Disconnected,
                    WaitingReason::ClientUnavailable
                )
            );
        }
        states.push(report.connection);
    }

    assert_eq!(
        states,
        vec![
            ConnectionState::Disconnected,
            ConnectionState::Disconnected,
            ConnectionState::Disconnected,
            ConnectionState::Connected,
        ]
    );
    assert_eq!(h.orchestrator.metrics().connection_failures, 3);
    assert_eq!(h.orchestrator.current_state(), Some(&diana()));
}

#[tokio::test]
async fn in_game_tick_publishes_match_view() {
    let mut h = harness(
        ScriptedSource::new(vec![in_game(diana())]),
        OverlayConfig::default(),
    );
    let report = h.orchestrator.tick().await.expect("tick");

    let OverlayView::Match(view) = &report.view else {
        panic!("expected a match view, got {:?}", report.view);
    };
    assert_eq!(view.game_time, Some(800));
    let advice = view.advice.as_ref().expect("advice section");
    assert_eq!(advice.verdict.kind, AdviceKind::Fight);
    assert_eq!(advice.verdict.confidence, 95.0);
    assert!(view.rules.is_some());

    let verdict = h.orchestrator.current_verdict().expect("verdict");
    assert_eq!(verdict.kind, AdviceKind::Fight);
    assert_eq!(h.network.latest_view(), Some(report.view.clone()));
    assert_eq!(h.orchestrator.metrics().in_game_ticks, 1);
    assert!(h.telemetry.latency_summary().await.is_some());
}

#[tokio::test]
async fn not_in_game_stays_connected_without_advice() {
    let mut h = harness(
        ScriptedSource::new(vec![not_in_game()]),
        OverlayConfig::default(),
    );
    let report = h.orchestrator.tick().await.expect("tick");

    assert_eq!(report.connection, ConnectionState::Connected);
    assert_eq!(
        report.view,
        OverlayView::waiting(ConnectionState::Connected, WaitingReason::NoActiveMatch)
    );
    assert!(h.orchestrator.current_verdict().is_none());
    assert!(!h.orchestrator.current_state().expect("state").is_in_game);
    assert_eq!(h.orchestrator.metrics().waiting_ticks, 1);
}

#[tokio::test]
async fn match_boundaries_are_published_once() {
    let mut h = harness(
        ScriptedSource::new(vec![in_game(diana()), in_game(diana()), not_in_game()]),
        OverlayConfig::default(),
    );
    for _ in 0..3 {
        h.orchestrator.tick().await.expect("tick");
    }

    let phases = lifecycle_phases(&h.telemetry.snapshot_events().await);
    assert_eq!(
        phases,
        vec![LifecyclePhase::MatchStart, LifecyclePhase::MatchEnd]
    );
}

#[tokio::test]
async fn losing_the_client_clears_stale_data() {
    let mut h = harness(
        ScriptedSource::new(vec![
            in_game(diana()),
            Err(fetch_error("connection reset")),
        ]),
        OverlayConfig::default(),
    );
    h.orchestrator.tick().await.expect("first tick");
    assert!(h.orchestrator.current_verdict().is_some());

    let report = h.orchestrator.tick().await.expect("second tick");
    assert_eq!(report.connection, ConnectionState::Disconnected);
    assert!(h.orchestrator.current_state().is_none());
    assert!(h.orchestrator.current_verdict().is_none());
    assert!(h.network.latest_view().expect("view").is_waiting());

    let phases = lifecycle_phases(&h.telemetry.snapshot_events().await);
    assert_eq!(phases.last(), Some(&LifecyclePhase::MatchEnd));
}

#[tokio::test]
async fn invalid_snapshot_is_rejected() {
    let broken = GameState {
        player_level: 0,
        ..diana()
    };
    let mut h = harness(
        ScriptedSource::new(vec![in_game(broken)]),
        OverlayConfig::default(),
    );
    let report = h.orchestrator.tick().await.expect("tick");

    assert_eq!(
        report.view,
        OverlayView::waiting(ConnectionState::Connected, WaitingReason::InvalidSnapshot)
    );
    assert!(h.orchestrator.current_state().is_none());
    assert_eq!(h.orchestrator.metrics().rejected_snapshots, 1);
    assert!(lifecycle_phases(&h.telemetry.snapshot_events().await).is_empty());
}

#[tokio::test]
async fn boot_applies_display_config() {
    let mut config = OverlayConfig::default();
    config.display.position = Point::new(10, 20);
    config.display.click_through = true;
    config.display.follow_game_window = false;
    let mut h = harness(ScriptedSource::default(), config);

    h.display
        .send(overlay_display::DisplayCommand::SetVisible(false))
        .await
        .expect("hide");
    h.orchestrator.boot().await.expect("boot");

    let state = h.display.state();
    assert!(state.visible);
    assert!(state.click_through);
    assert_eq!(state.bounds.origin, Point::new(10, 20));

    let events = h.telemetry.snapshot_events().await;
    assert_eq!(
        lifecycle_phases(&events),
        vec![LifecyclePhase::Boot, LifecyclePhase::Ready]
    );
    let display_events = events
        .iter()
        .filter(|event| matches!(event.payload, EventPayload::Display(_)))
        .count();
    assert_eq!(display_events, 4);
    assert_eq!(h.network.latest_view(), Some(idle_view()));
}

#[tokio::test]
async fn config_change_refreshes_current_match() {
    let mut h = harness(
        ScriptedSource::new(vec![in_game(diana())]),
        OverlayConfig::default(),
    );
    h.orchestrator.tick().await.expect("tick");

    h.orchestrator
        .config()
        .set_section(Section::AdvicePanel, false)
        .expect("toggle");
    h.orchestrator.refresh().await.expect("refresh");

    let Some(OverlayView::Match(view)) = h.network.latest_view() else {
        panic!("expected a match view");
    };
    assert!(view.advice.is_none());
    let verdict = h.orchestrator.current_verdict().expect("verdict kept");
    assert_eq!(verdict.kind, AdviceKind::Fight);
}

#[tokio::test]
async fn verdict_is_kept_below_display_confidence() {
    let mut config = OverlayConfig::default();
    config.advice.minimum_confidence = 99.0;
    let mut h = harness(ScriptedSource::new(vec![in_game(diana())]), config);
    let report = h.orchestrator.tick().await.expect("tick");

    let OverlayView::Match(view) = &report.view else {
        panic!("expected a match view, got {:?}", report.view);
    };
    assert!(view.advice.is_none());
    let verdict = h.orchestrator.current_verdict().expect("verdict");
    assert_eq!(verdict.kind, AdviceKind::Fight);
    assert_eq!(verdict.confidence, 95.0);
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let source = ScriptedSource::new(vec![in_game(diana())]);
    let mut h = harness(source.clone(), OverlayConfig::default());
    h.orchestrator.tick().await.expect("tick");

    h.orchestrator.shutdown().await.expect("shutdown");
    h.orchestrator.shutdown().await.expect("second shutdown");

    assert_eq!(source.resets(), 1);
    assert_eq!(h.orchestrator.connection(), ConnectionState::Idle);
    assert!(h.orchestrator.current_state().is_none());
    assert_eq!(h.network.latest_view(), Some(idle_view()));
    assert_eq!(
        lifecycle_phases(&h.telemetry.snapshot_events().await),
        vec![
            LifecyclePhase::MatchStart,
            LifecyclePhase::MatchEnd,
            LifecyclePhase::Shutdown,
        ]
    );
    let final_metrics: Vec<_> = h
        .telemetry
        .snapshot_events()
        .await
        .into_iter()
        .filter_map(|event| match event.payload {
            EventPayload::Telemetry(telemetry) => telemetry.metrics,
            _ => None,
        })
        .collect();
    assert_eq!(final_metrics.len(), 1);
    assert_eq!(final_metrics[0].ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn session_polls_on_interval() {
    let h = harness(
        ScriptedSource::new(vec![not_in_game(), in_game(diana())]),
        OverlayConfig::default(),
    );
    let Harness {
        orchestrator,
        network,
        telemetry,
        ..
    } = h;

    let mut session = orchestrator.spawn();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        network.latest_view(),
        Some(OverlayView::waiting(ConnectionState::Connected, WaitingReason::NoActiveMatch))
    );

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert!(matches!(network.latest_view(), Some(OverlayView::Match(_))));
    assert!(session.is_running());

    session.teardown().await.expect("teardown");
    session.teardown().await.expect("second teardown");
    assert!(!session.is_running());
    assert_eq!(network.latest_view(), Some(idle_view()));
    assert_eq!(telemetry.metrics().await.ticks, 2);
}

#[tokio::test(start_paused = true)]
async fn teardown_drops_in_flight_fetch() {
    let h = harness(
        SlowSource {
            delay: Duration::from_secs(10),
        },
        OverlayConfig::default(),
    );
    let Harness {
        orchestrator,
        network,
        telemetry,
        ..
    } = h;

    let mut session = orchestrator.spawn();
    tokio::time::sleep(Duration::from_millis(500)).await;
    session.teardown().await.expect("teardown");

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(network.latest_view(), Some(idle_view()));
    assert_eq!(telemetry.metrics().await.in_game_ticks, 0);
    assert_eq!(
        lifecycle_phases(&telemetry.snapshot_events().await),
        vec![LifecyclePhase::Shutdown]
    );
}
