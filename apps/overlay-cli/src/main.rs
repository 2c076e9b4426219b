mod ui;

use std::{
    env,
    path::PathBuf,
    sync::{mpsc, Arc},
};

use anyhow::{Context, Result};
use clap::Parser;
use futures::{stream::BoxStream, StreamExt};
use overlay_client::live_source;
use overlay_display::{DisplayChannel, DisplayCommand, VirtualDisplay, XdotoolLocator};
use overlay_engine::StandardEngine;
use overlay_network::{EventPublisher, LocalServer};
use overlay_ops::{init_tracing, ConfigStore, TelemetryStore};
use overlay_orchestrator::PollOrchestrator;
use overlay_types::events::SystemEvent;
use tokio::{sync::mpsc as async_mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use ui::{UiCommand, UiMessage};

const DEFAULT_CONFIG_PATH: &str = "configs/dev.toml";

#[derive(Debug, Parser)]
#[command(name = "overlay", about = "Live match advisory overlay")]
struct Args {
    /// Configuration file. Defaults to $OVERLAY_CONFIG, then configs/dev.toml.
    config: Option<PathBuf>,
    /// Log only, without the terminal overlay. Stops on Ctrl-C.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let path = config_path(args.config);
    let config = ConfigStore::load(&path);
    let current = config.current();
    init_tracing(&current.ops)?;
    if let Some(reason) = config.load_error() {
        warn!(path = %path.display(), %reason, "falling back to default configuration");
    }

    let display = Arc::new(VirtualDisplay::with_locator(
        &current.display,
        XdotoolLocator::default(),
    ));
    let network = LocalServer::default();
    let telemetry = TelemetryStore::new();

    let mut orchestrator = PollOrchestrator::new(
        config.clone(),
        live_source(&current.client)?,
        StandardEngine::builtin()?,
        display.clone(),
        network.clone(),
        telemetry.clone(),
    );

    // Subscribe before boot so the front-end sees the boot events too.
    let events = network.subscribe();
    orchestrator.boot().await?;
    let mut session = orchestrator.spawn();
    info!(path = %path.display(), headless = args.headless, "overlay running");

    let result = if args.headless {
        run_headless(events).await
    } else {
        let summary = format!(
            "{} | poll {}ms | {}/{}/{}",
            path.display(),
            current.client.poll_interval_ms,
            current.hotkeys.toggle,
            current.hotkeys.cycle_mode,
            current.hotkeys.reset_position
        );
        run_terminal(events, &config, display, &network, summary).await
    };

    session.teardown().await?;
    if let Some(latency) = telemetry.latency_summary().await {
        info!(
            samples = latency.samples,
            mean_total_ms = latency.mean_total_ms,
            max_total_ms = latency.max_total_ms,
            "poll latency"
        );
    }
    result
}

fn config_path(from_args: Option<PathBuf>) -> PathBuf {
    from_args
        .or_else(|| env::var_os("OVERLAY_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

async fn run_headless(mut events: BoxStream<'static, SystemEvent>) -> Result<()> {
    let log_events = async {
        while let Some(event) = events.next().await {
            match event.as_view() {
                Some(view) => debug!(?view, "view published"),
                None => info!(kind = ?event.kind, payload = ?event.payload, "event"),
            }
        }
    };
    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal.context("failed to listen for Ctrl-C")?,
        _ = log_events => {}
    }
    Ok(())
}

async fn run_terminal(
    mut events: BoxStream<'static, SystemEvent>,
    config: &ConfigStore,
    display: Arc<VirtualDisplay<XdotoolLocator>>,
    network: &LocalServer,
    summary: String,
) -> Result<()> {
    let (ui_tx, ui_rx) = mpsc::channel();
    let (command_tx, mut command_rx) = async_mpsc::unbounded_channel();

    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();
    {
        let ui_tx = ui_tx.clone();
        forwarders.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if ui_tx.send(UiMessage::Event(event)).is_err() {
                    break;
                }
            }
        }));
    }
    {
        let ui_tx = ui_tx.clone();
        let mut changes = display.subscribe();
        forwarders.push(tokio::spawn(async move {
            loop {
                let state = *changes.borrow_and_update();
                if ui_tx.send(UiMessage::Display(state)).is_err() {
                    break;
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        }));
    }
    {
        let mut changes = config.subscribe();
        forwarders.push(tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let next = changes.borrow_and_update().clone();
                if ui_tx.send(UiMessage::Config(Box::new(next))).is_err() {
                    break;
                }
            }
        }));
    }

    let initial = config.current();
    let terminal =
        tokio::task::spawn_blocking(move || ui::run(ui_rx, command_tx, initial, summary));

    // Closes once the terminal thread exits and drops its sender.
    while let Some(command) = command_rx.recv().await {
        handle_command(command, config, display.as_ref(), network).await;
    }

    for forwarder in forwarders {
        forwarder.abort();
    }
    terminal.await.context("terminal thread panicked")?
}

async fn handle_command(
    command: UiCommand,
    config: &ConfigStore,
    display: &impl DisplayChannel,
    network: &impl EventPublisher,
) {
    let result = match command {
        UiCommand::ToggleVisibility => display
            .send(DisplayCommand::ToggleVisibility)
            .await
            .map(|_| format!("overlay visible: {}", display.state().visible)),
        UiCommand::CycleMode => config
            .update_with(|config| config.display.compact_mode = !config.display.compact_mode)
            .map(|config| format!("compact mode: {}", config.display.compact_mode)),
        UiCommand::ResetPosition => {
            let home = config.current().display.position;
            display
                .send(DisplayCommand::SetPosition(home))
                .await
                .map(|_| format!("overlay moved to {},{}", home.x, home.y))
        }
    };
    match result {
        Ok(message) => {
            let notice = SystemEvent::ops(message, vec!["hotkey".to_string()]);
            if let Err(err) = network.publish(notice).await {
                debug!(error = %err, "hotkey notice not published");
            }
        }
        Err(err) => warn!(?command, error = %err, "hotkey action failed"),
    }
}
