//! Overlay surface control: commands, state and the in-memory surface.

pub mod window;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use overlay_types::{
    config::DisplayConfig,
    geometry::{Bounds, Point, Size, TARGET_WINDOW_MARGIN},
    OverlayError, Result,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use window::{NoopLocator, WindowLocator, XdotoolLocator};

/// Commands understood by an overlay surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayCommand {
    ToggleVisibility,
    SetVisible(bool),
    SetPosition(Point),
    SetSize(Size),
    QueryBounds,
    SetClickThrough(bool),
    /// Move next to the game window, or to the configured position when it
    /// cannot be found.
    RelocateToTarget,
}

impl DisplayCommand {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayCommand::ToggleVisibility => "toggle_visibility",
            DisplayCommand::SetVisible(_) => "set_visible",
            DisplayCommand::SetPosition(_) => "set_position",
            DisplayCommand::SetSize(_) => "set_size",
            DisplayCommand::QueryBounds => "query_bounds",
            DisplayCommand::SetClickThrough(_) => "set_click_through",
            DisplayCommand::RelocateToTarget => "relocate_to_target",
        }
    }
}

/// Optional acknowledgement returned by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayAck {
    Visibility(bool),
    Bounds(Bounds),
    ClickThrough(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayState {
    pub visible: bool,
    pub bounds: Bounds,
    pub click_through: bool,
}

impl DisplayState {
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            visible: true,
            bounds: Bounds::new(config.position, config.size),
            click_through: config.click_through,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct DisplayMetrics {
    pub commands_applied: u64,
    pub commands_failed: u64,
    pub last_command_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait DisplayChannel: Send + Sync {
    async fn send(&self, command: DisplayCommand) -> Result<Option<DisplayAck>>;
    fn state(&self) -> DisplayState;
    fn subscribe(&self) -> watch::Receiver<DisplayState>;
    fn metrics(&self) -> DisplayMetrics;
}

/// In-memory surface. Front-ends render from [`DisplayChannel::subscribe`].
pub struct VirtualDisplay<L = NoopLocator> {
    state: watch::Sender<DisplayState>,
    locator: L,
    home: Point,
    metrics: Arc<Mutex<DisplayMetrics>>,
}

impl VirtualDisplay<NoopLocator> {
    pub fn new(config: &DisplayConfig) -> Self {
        Self::with_locator(config, NoopLocator)
    }
}

impl<L: WindowLocator> VirtualDisplay<L> {
    pub fn with_locator(config: &DisplayConfig, locator: L) -> Self {
        let (state, _) = watch::channel(DisplayState::from_config(config));
        Self {
            state,
            locator,
            home: config.position,
            metrics: Arc::new(Mutex::new(DisplayMetrics::default())),
        }
    }

    fn record(&self, ok: bool) {
        if let Ok(mut guard) = self.metrics.lock() {
            if ok {
                guard.commands_applied += 1;
            } else {
                guard.commands_failed += 1;
            }
            guard.last_command_at = Some(Utc::now());
        }
    }

    async fn target_position(&self, size: Size) -> Point {
        match self.locator.locate().await {
            Ok(Some(window)) => {
                let point = window.anchor_top_right(size, TARGET_WINDOW_MARGIN);
                debug!(?window, ?point, "anchoring overlay to game window");
                point
            }
            Ok(None) => {
                debug!("game window not found, using configured position");
                self.home
            }
            Err(err) => {
                warn!(error = %err, "window lookup failed, using configured position");
                self.home
            }
        }
    }

    async fn apply(&self, command: DisplayCommand) -> Result<Option<DisplayAck>> {
        match command {
            DisplayCommand::ToggleVisibility => {
                let mut visible = false;
                self.state.send_modify(|state| {
                    state.visible = !state.visible;
                    visible = state.visible;
                });
                Ok(Some(DisplayAck::Visibility(visible)))
            }
            DisplayCommand::SetVisible(visible) => {
                self.state.send_modify(|state| state.visible = visible);
                Ok(Some(DisplayAck::Visibility(visible)))
            }
            DisplayCommand::SetPosition(origin) => {
                self.state.send_modify(|state| state.bounds.origin = origin);
                Ok(Some(DisplayAck::Bounds(self.state().bounds)))
            }
            DisplayCommand::SetSize(size) => {
                if size.width == 0 || size.height == 0 {
                    return Err(display_error(format!(
                        "overlay size must be non-zero, got {}x{}",
                        size.width, size.height
                    )));
                }
                self.state.send_modify(|state| state.bounds.size = size);
                Ok(Some(DisplayAck::Bounds(self.state().bounds)))
            }
            DisplayCommand::QueryBounds => Ok(Some(DisplayAck::Bounds(self.state().bounds))),
            DisplayCommand::SetClickThrough(enabled) => {
                self.state.send_modify(|state| state.click_through = enabled);
                Ok(Some(DisplayAck::ClickThrough(enabled)))
            }
            DisplayCommand::RelocateToTarget => {
                let origin = self.target_position(self.state().bounds.size).await;
                self.state.send_modify(|state| state.bounds.origin = origin);
                Ok(Some(DisplayAck::Bounds(self.state().bounds)))
            }
        }
    }
}

#[async_trait]
impl<L: WindowLocator> DisplayChannel for VirtualDisplay<L> {
    async fn send(&self, command: DisplayCommand) -> Result<Option<DisplayAck>> {
        let result = self.apply(command).await;
        self.record(result.is_ok());
        match &result {
            Ok(ack) => info!(command = command.label(), ?ack, "display command applied"),
            Err(err) => warn!(command = command.label(), error = %err, "display command failed"),
        }
        result
    }

    fn state(&self) -> DisplayState {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state.subscribe()
    }

    fn metrics(&self) -> DisplayMetrics {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

/// Display commands derived from the configuration, in the order they are
/// applied at startup.
pub fn boot_commands(config: &DisplayConfig) -> Vec<DisplayCommand> {
    let mut commands = vec![
        DisplayCommand::SetSize(config.size),
        DisplayCommand::SetPosition(config.position),
        DisplayCommand::SetClickThrough(config.click_through),
    ];
    if config.follow_game_window {
        commands.push(DisplayCommand::RelocateToTarget);
    }
    commands.push(DisplayCommand::SetVisible(true));
    commands
}

pub fn display_error(message: impl Into<String>) -> OverlayError {
    OverlayError::Display(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLocator(Result<Option<Bounds>>);

    #[async_trait]
    impl WindowLocator for FixedLocator {
        async fn locate(&self) -> Result<Option<Bounds>> {
            match &self.0 {
                Ok(bounds) => Ok(*bounds),
                Err(err) => Err(display_error(err.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn toggles_and_reports_visibility() {
        let display = VirtualDisplay::new(&DisplayConfig::default());
        let mut updates = display.subscribe();
        assert!(display.state().visible);

        let ack = display
            .send(DisplayCommand::ToggleVisibility)
            .await
            .expect("toggle");
        assert_eq!(ack, Some(DisplayAck::Visibility(false)));
        assert!(updates.has_changed().expect("sender alive"));
        assert!(!updates.borrow_and_update().visible);

        display
            .send(DisplayCommand::SetVisible(true))
            .await
            .expect("show");
        assert!(display.state().visible);
        assert_eq!(display.metrics().commands_applied, 2);
    }

    #[tokio::test]
    async fn moves_and_resizes() {
        let display = VirtualDisplay::new(&DisplayConfig::default());
        display
            .send(DisplayCommand::SetPosition(Point::new(10, 20)))
            .await
            .expect("move");
        let ack = display
            .send(DisplayCommand::SetSize(Size::new(320, 480)))
            .await
            .expect("resize");
        let expected = Bounds::new(Point::new(10, 20), Size::new(320, 480));
        assert_eq!(ack, Some(DisplayAck::Bounds(expected)));
        assert_eq!(
            display
                .send(DisplayCommand::QueryBounds)
                .await
                .expect("query"),
            Some(DisplayAck::Bounds(expected))
        );

        assert!(display
            .send(DisplayCommand::SetSize(Size::new(0, 480)))
            .await
            .is_err());
        assert_eq!(display.state().bounds, expected);
        assert_eq!(display.metrics().commands_failed, 1);
    }

    #[tokio::test]
    async fn click_through_toggle() {
        let display = VirtualDisplay::new(&DisplayConfig::default());
        display
            .send(DisplayCommand::SetClickThrough(true))
            .await
            .expect("click through");
        assert!(display.state().click_through);
    }

    #[tokio::test]
    async fn relocates_next_to_game_window() {
        let window = Bounds::new(Point::new(0, 0), Size::new(1920, 1080));
        let display =
            VirtualDisplay::with_locator(&DisplayConfig::default(), FixedLocator(Ok(Some(window))));
        display
            .send(DisplayCommand::RelocateToTarget)
            .await
            .expect("relocate");
        assert_eq!(display.state().bounds.origin, Point::new(1500, 20));
    }

    #[tokio::test]
    async fn relocation_falls_back_to_configured_position() {
        let config = DisplayConfig {
            position: Point::new(40, 60),
            ..DisplayConfig::default()
        };
        let display = VirtualDisplay::with_locator(
            &config,
            FixedLocator(Err(display_error("no display server"))),
        );
        display
            .send(DisplayCommand::SetPosition(Point::new(900, 900)))
            .await
            .expect("move away");
        display
            .send(DisplayCommand::RelocateToTarget)
            .await
            .expect("relocate");
        assert_eq!(display.state().bounds.origin, Point::new(40, 60));

        let display = VirtualDisplay::new(&config);
        display
            .send(DisplayCommand::RelocateToTarget)
            .await
            .expect("relocate");
        assert_eq!(display.state().bounds.origin, Point::new(40, 60));
    }

    #[test]
    fn boot_commands_follow_config() {
        let config = DisplayConfig::default();
        let commands = boot_commands(&config);
        assert_eq!(
            commands.first(),
            Some(&DisplayCommand::SetSize(config.size))
        );
        assert!(commands.contains(&DisplayCommand::RelocateToTarget));
        assert_eq!(commands.last(), Some(&DisplayCommand::SetVisible(true)));

        let config = DisplayConfig {
            follow_game_window: false,
            ..DisplayConfig::default()
        };
        assert!(!boot_commands(&config).contains(&DisplayCommand::RelocateToTarget));
    }
}
