//! In-process publication of overlay events to presentation subscribers.

use std::sync::{Arc, Mutex};

use async_stream::stream;
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use overlay_types::{events::SystemEvent, view::OverlayView, Result};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};

pub const DEFAULT_CAPACITY: usize = 64;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: SystemEvent) -> Result<()>;
    fn subscribe(&self) -> BoxStream<'static, SystemEvent>;
    /// Most recently published view, if any.
    fn latest_view(&self) -> Option<OverlayView>;
}

/// Broadcast-channel bus. Slow subscribers skip events instead of blocking
/// the poll loop.
#[derive(Clone)]
pub struct LocalServer {
    tx: broadcast::Sender<SystemEvent>,
    latest: Arc<Mutex<Option<OverlayView>>>,
}

impl Default for LocalServer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LocalServer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Current view first, then every view published afterwards.
    pub fn view_stream(&self) -> BoxStream<'static, OverlayView> {
        let initial = self.latest_view();
        let mut events = self.subscribe();
        stream! {
            if let Some(view) = initial {
                yield view;
            }
            while let Some(event) = events.next().await {
                if let Some(view) = event.as_view() {
                    yield view.clone();
                }
            }
        }
        .boxed()
    }
}

#[async_trait]
impl EventPublisher for LocalServer {
    async fn publish(&self, event: SystemEvent) -> Result<()> {
        if let Some(view) = event.as_view() {
            if let Ok(mut latest) = self.latest.lock() {
                *latest = Some(view.clone());
            }
        }
        // No subscribers is not an error.
        if self.tx.send(event).is_err() {
            debug!("event published without subscribers");
        }
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, SystemEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move {
                match event {
                    Ok(event) => Some(event),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber lagged behind the event bus");
                        None
                    }
                }
            })
            .boxed()
    }

    fn latest_view(&self) -> Option<OverlayView> {
        self.latest.lock().ok().and_then(|latest| latest.clone())
    }
}
