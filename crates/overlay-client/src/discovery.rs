//! Locating the local game client through its lockfile.

use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use overlay_types::{config::ClientConfig, Result};
use tracing::debug;

use crate::discovery_error;

const LOOPBACK: &str = "127.0.0.1";

/// Where the client's HTTPS API lives and how to authenticate against it.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl Endpoint {
    pub fn new(port: u16, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: format!("https://{LOOPBACK}:{port}"),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parsed `name:pid:port:password:protocol` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lockfile {
    pub name: String,
    pub pid: u32,
    pub port: u16,
    pub password: String,
    pub protocol: String,
}

impl Lockfile {
    pub fn parse(contents: &str) -> Result<Self> {
        let parts: Vec<&str> = contents.trim().split(':').collect();
        let [name, pid, port, password, protocol] = parts.as_slice() else {
            return Err(discovery_error(format!(
                "lockfile has {} fields, expected 5",
                parts.len()
            )));
        };
        let pid = pid
            .parse()
            .map_err(|err| discovery_error(format!("bad pid {pid:?}: {err}")))?;
        let port = port
            .parse()
            .map_err(|err| discovery_error(format!("bad port {port:?}: {err}")))?;
        if password.is_empty() {
            return Err(discovery_error("lockfile password is empty"));
        }
        Ok(Self {
            name: name.to_string(),
            pid,
            port,
            password: password.to_string(),
            protocol: protocol.to_string(),
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            discovery_error(format!("unable to read lockfile {}: {err}", path.display()))
        })?;
        Self::parse(&contents)
    }
}

/// Platform default lockfile location.
pub fn default_lockfile_path() -> PathBuf {
    if cfg!(windows) {
        let base = env::var("LOCALAPPDATA").unwrap_or_default();
        PathBuf::from(base)
            .join("Riot Games")
            .join("League of Legends")
            .join("lockfile")
    } else {
        PathBuf::from("/tmp/riot-lcu.lockfile")
    }
}

#[async_trait]
pub trait ClientDiscovery: Send + Sync {
    async fn discover(&self) -> Result<Endpoint>;
}

/// Reads the lockfile on every discovery attempt; the port and password
/// change whenever the client restarts.
#[derive(Debug, Clone)]
pub struct LockfileDiscovery {
    path: PathBuf,
    username: String,
}

impl LockfileDiscovery {
    pub fn new(path: impl Into<PathBuf>, username: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            username: username.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let path = config
            .lockfile_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_lockfile_path);
        Self::new(path, config.username.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ClientDiscovery for LockfileDiscovery {
    async fn discover(&self) -> Result<Endpoint> {
        let lockfile = Lockfile::read(&self.path)?;
        debug!(
            process = %lockfile.name,
            pid = lockfile.pid,
            port = lockfile.port,
            "client lockfile found"
        );
        Ok(Endpoint::new(lockfile.port, self.username.clone(), lockfile.password))
    }
}
