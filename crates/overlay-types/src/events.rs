use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    telemetry::{LatencySample, PollMetrics},
    view::{ConnectionState, OverlayView},
};

/// High-level event bus message kinds moving through the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Lifecycle,
    Connection,
    View,
    Display,
    Telemetry,
    Ops,
}

/// Immutable event envelope for logging, publication, and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Lifecycle(LifecycleEvent),
    Connection(ConnectionEvent),
    View(Box<OverlayView>),
    Display(DisplayEvent),
    Telemetry(TelemetryEvent),
    Ops(OpsEvent),
    Unknown(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub phase: LifecyclePhase,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LifecyclePhase {
    Boot,
    Ready,
    MatchStart,
    MatchEnd,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub state: ConnectionState,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayEvent {
    pub command: String,
    pub acknowledged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub latency: Option<LatencySample>,
    pub metrics: Option<PollMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsEvent {
    pub message: String,
    pub tags: Vec<String>,
}

impl SystemEvent {
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn lifecycle(phase: LifecyclePhase, details: impl Into<String>) -> Self {
        Self::new(
            EventKind::Lifecycle,
            EventPayload::Lifecycle(LifecycleEvent {
                phase,
                details: Some(details.into()),
            }),
        )
    }

    pub fn view(view: OverlayView) -> Self {
        Self::new(EventKind::View, EventPayload::View(Box::new(view)))
    }

    pub fn connection(state: ConnectionState, details: Option<String>) -> Self {
        Self::new(
            EventKind::Connection,
            EventPayload::Connection(ConnectionEvent { state, details }),
        )
    }

    pub fn display(command: impl Into<String>, acknowledged: bool) -> Self {
        Self::new(
            EventKind::Display,
            EventPayload::Display(DisplayEvent {
                command: command.into(),
                acknowledged,
            }),
        )
    }

    pub fn telemetry(latency: Option<LatencySample>, metrics: Option<PollMetrics>) -> Self {
        Self::new(
            EventKind::Telemetry,
            EventPayload::Telemetry(TelemetryEvent { latency, metrics }),
        )
    }

    pub fn ops(message: impl Into<String>, tags: Vec<String>) -> Self {
        Self::new(
            EventKind::Ops,
            EventPayload::Ops(OpsEvent {
                message: message.into(),
                tags,
            }),
        )
    }

    pub fn as_view(&self) -> Option<&OverlayView> {
        match &self.payload {
            EventPayload::View(view) => Some(view.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::WaitingReason;

    #[test]
    fn view_events_expose_their_view() {
        let view = OverlayView::waiting(
            ConnectionState::Connecting,
            WaitingReason::ClientUnavailable,
        );
        let event = SystemEvent::view(view.clone());
        assert_eq!(event.kind, EventKind::View);
        assert_eq!(event.as_view(), Some(&view));

        let event = SystemEvent::display("toggle_visibility", true);
        assert_eq!(event.kind, EventKind::Display);
        assert!(event.as_view().is_none());
    }

    #[test]
    fn events_serialize_to_json() {
        let event = SystemEvent::lifecycle(LifecyclePhase::Boot, "starting");
        let json = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(json["kind"], "Lifecycle");
        assert_eq!(json["payload"]["Lifecycle"]["phase"], "Boot");
    }
}
