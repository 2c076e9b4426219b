//! Operational helpers: logging, telemetry, configuration store.

mod config_store;

use std::{collections::VecDeque, sync::Arc};

use overlay_types::{
    config::OpsConfig,
    events::SystemEvent,
    telemetry::{LatencySample, PollMetrics},
    OverlayError, Result,
};
use tokio::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

pub use config_store::ConfigStore;

pub const DEFAULT_TELEMETRY_CAPACITY: usize = 1_024;

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| ops_error(format!("failed to create log filter: {err}")))?;

    // stdout belongs to the terminal front-end.
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ops_error(format!("tracing init error: {err}")))?;
    Ok(())
}

/// Aggregate over the retained latency samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub samples: usize,
    pub mean_total_ms: f64,
    pub max_total_ms: u64,
    pub mean_fetch_ms: f64,
}

/// In-memory telemetry for one session. Keeps the most recent events and
/// latency samples only.
#[derive(Clone)]
pub struct TelemetryStore {
    capacity: usize,
    events: Arc<Mutex<VecDeque<SystemEvent>>>,
    latencies: Arc<Mutex<VecDeque<LatencySample>>>,
    metrics: Arc<Mutex<PollMetrics>>,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TELEMETRY_CAPACITY)
    }
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            latencies: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            metrics: Arc::new(Mutex::new(PollMetrics::default())),
        }
    }

    pub async fn record_event(&self, event: SystemEvent) -> Result<()> {
        push_bounded(&mut *self.events.lock().await, event, self.capacity);
        Ok(())
    }

    pub async fn record_latency(&self, sample: LatencySample) -> Result<()> {
        push_bounded(&mut *self.latencies.lock().await, sample, self.capacity);
        Ok(())
    }

    pub async fn record_metrics(&self, metrics: PollMetrics) -> Result<()> {
        *self.metrics.lock().await = metrics;
        Ok(())
    }

    pub async fn snapshot_events(&self) -> Vec<SystemEvent> {
        self.events.lock().await.iter().cloned().collect()
    }

    pub async fn metrics(&self) -> PollMetrics {
        self.metrics.lock().await.clone()
    }

    pub async fn latency_summary(&self) -> Option<LatencySummary> {
        let latencies = self.latencies.lock().await;
        if latencies.is_empty() {
            return None;
        }
        let samples = latencies.len();
        let total: u64 = latencies.iter().map(|s| s.total_ms).sum();
        let fetch: u64 = latencies.iter().map(|s| s.fetch_ms).sum();
        Some(LatencySummary {
            samples,
            mean_total_ms: total as f64 / samples as f64,
            max_total_ms: latencies.iter().map(|s| s.total_ms).max().unwrap_or(0),
            mean_fetch_ms: fetch as f64 / samples as f64,
        })
    }
}

fn push_bounded<T>(buffer: &mut VecDeque<T>, item: T, capacity: usize) {
    while buffer.len() >= capacity {
        buffer.pop_front();
    }
    buffer.push_back(item);
}

pub fn ops_error(message: impl Into<String>) -> OverlayError {
    OverlayError::Ops(message.into())
}
