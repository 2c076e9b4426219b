use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timing of one poll tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySample {
    pub fetch_ms: u64,
    pub evaluation_ms: u64,
    pub total_ms: u64,
    pub captured_at: DateTime<Utc>,
}

/// Running counters for a polling session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PollMetrics {
    pub ticks: u64,
    pub in_game_ticks: u64,
    pub waiting_ticks: u64,
    pub connection_failures: u64,
    pub rejected_snapshots: u64,
    pub last_latency: Option<LatencySample>,
}
