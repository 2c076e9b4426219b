use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use overlay_types::{
    geometry::{Bounds, Point, Size},
    Result,
};
use tokio::{process::Command, time::timeout};
use tracing::{debug, warn};

use crate::display_error;

const DEFAULT_XDOTOOL: &str = "xdotool";
const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_GAME_WINDOW: &str = "League of Legends (TM) Client";

/// Best-effort lookup of the game window on screen.
#[async_trait]
pub trait WindowLocator: Send + Sync {
    /// `Ok(None)` when the window is simply not there.
    async fn locate(&self) -> Result<Option<Bounds>>;
}

/// Locator for platforms without a lookup tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLocator;

#[async_trait]
impl WindowLocator for NoopLocator {
    async fn locate(&self) -> Result<Option<Bounds>> {
        Ok(None)
    }
}

/// X11 lookup through the `xdotool` binary.
#[derive(Debug, Clone)]
pub struct XdotoolLocator {
    binary: PathBuf,
    window_name: String,
    timeout: Duration,
}

impl Default for XdotoolLocator {
    fn default() -> Self {
        Self::new(None, DEFAULT_GAME_WINDOW)
    }
}

impl XdotoolLocator {
    pub fn new(binary: Option<PathBuf>, window_name: impl Into<String>) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| PathBuf::from(DEFAULT_XDOTOOL)),
            window_name: window_name.into(),
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Caps each `xdotool` call; a call that runs over counts as not found.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, args: &[&str]) -> Result<Option<String>> {
        let mut command = Command::new(&self.binary);
        command.args(args).kill_on_drop(true);
        let Ok(output) = timeout(self.timeout, command.output()).await else {
            warn!(args = %args.join(" "), timeout = ?self.timeout, "xdotool timed out");
            return Ok(None);
        };
        let output = output.map_err(|err| {
            display_error(format!("failed to run xdotool ({}): {err}", args.join(" ")))
        })?;

        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
        } else {
            // xdotool exits non-zero when a search matches nothing.
            debug!(
                args = %args.join(" "),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "xdotool returned no result"
            );
            Ok(None)
        }
    }
}

#[async_trait]
impl WindowLocator for XdotoolLocator {
    async fn locate(&self) -> Result<Option<Bounds>> {
        let Some(ids) = self
            .run(&["search", "--name", self.window_name.as_str()])
            .await?
        else {
            return Ok(None);
        };
        let Some(window_id) = ids.lines().map(str::trim).find(|line| !line.is_empty()) else {
            return Ok(None);
        };
        let Some(geometry) = self
            .run(&["getwindowgeometry", "--shell", window_id])
            .await?
        else {
            return Ok(None);
        };
        Ok(parse_shell_geometry(&geometry))
    }
}

/// Parses `xdotool getwindowgeometry --shell` output (`X=`, `Y=`, `WIDTH=`, `HEIGHT=` lines).
pub fn parse_shell_geometry(output: &str) -> Option<Bounds> {
    let mut x = None;
    let mut y = None;
    let mut width = None;
    let mut height = None;
    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "X" => x = value.parse::<i32>().ok(),
            "Y" => y = value.parse::<i32>().ok(),
            "WIDTH" => width = value.parse::<u32>().ok(),
            "HEIGHT" => height = value.parse::<u32>().ok(),
            _ => {}
        }
    }
    Some(Bounds::new(Point::new(x?, y?), Size::new(width?, height?)))
}
