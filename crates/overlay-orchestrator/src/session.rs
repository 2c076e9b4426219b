use std::time::Duration;

use overlay_client::GameStateSource;
use overlay_display::DisplayChannel;
use overlay_engine::AdvisoryEngine;
use overlay_network::EventPublisher;
use overlay_types::Result;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{orchestrator_error, PollOrchestrator};

/// Handle to a running poll loop.
///
/// Only one tick is in flight at a time. Tearing the session down drops any
/// outstanding fetch, so a late response never reaches the published view.
pub struct PollSession {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl PollSession {
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the interval and waits for the loop to release its source.
    /// Calling it again is a no-op.
    pub async fn teardown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.shutdown.send(true);
        handle
            .await
            .map_err(|err| orchestrator_error(format!("poll loop aborted: {err}")))?
    }
}

impl Drop for PollSession {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

impl<S, E, D, N> PollOrchestrator<S, E, D, N>
where
    S: GameStateSource + 'static,
    E: AdvisoryEngine + 'static,
    D: DisplayChannel + 'static,
    N: EventPublisher + 'static,
{
    /// Moves the orchestrator onto a background task that ticks every
    /// `client.poll_interval_ms` and re-renders on configuration changes.
    pub fn spawn(mut self) -> PollSession {
        let (shutdown, mut stop) = watch::channel(false);
        let period = Duration::from_millis(self.config().current().client.poll_interval_ms);
        let mut config_changes = self.config().subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_ms = period.as_millis() as u64, "poll loop started");

            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    Ok(()) = config_changes.changed() => {
                        debug!("configuration changed, re-rendering");
                        if let Err(err) = self.refresh().await {
                            warn!(error = %err, "refresh after configuration change failed");
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    _ = stop.changed() => {
                        debug!("dropping in-flight tick");
                        break;
                    }
                    result = self.tick() => {
                        if let Err(err) = result {
                            warn!(error = %err, "poll tick failed");
                        }
                    }
                }
            }

            self.shutdown().await
        });

        PollSession {
            shutdown,
            handle: Some(handle),
        }
    }
}
