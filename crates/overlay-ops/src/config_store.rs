//! Session-scoped configuration handle with change notifications.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use overlay_types::{
    config::{OverlayConfig, Section},
    OverlayError, Result,
};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Cloneable handle; every clone sees the same configuration.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<Inner>,
}

struct Inner {
    tx: watch::Sender<OverlayConfig>,
    path: Option<PathBuf>,
    load_error: Option<String>,
}

impl ConfigStore {
    pub fn new(config: OverlayConfig) -> Self {
        Self::build(config, None, None)
    }

    /// Loads `path`, falling back to defaults when it is missing or invalid.
    /// Later changes are written back to the same file.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (config, load_error) = match OverlayConfig::from_file(&path).and_then(|config| {
            config.validate()?;
            Ok(config)
        }) {
            Ok(config) => {
                info!(path = %path.display(), "configuration loaded");
                (config, None)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "using default configuration");
                (OverlayConfig::default(), Some(err.to_string()))
            }
        };
        Self::build(config, Some(path), load_error)
    }

    fn build(config: OverlayConfig, path: Option<PathBuf>, load_error: Option<String>) -> Self {
        let (tx, _) = watch::channel(config);
        Self {
            inner: Arc::new(Inner {
                tx,
                path,
                load_error,
            }),
        }
    }

    /// Why [`ConfigStore::load`] fell back to defaults, if it did.
    pub fn load_error(&self) -> Option<&str> {
        self.inner.load_error.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn current(&self) -> OverlayConfig {
        self.inner.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OverlayConfig> {
        self.inner.tx.subscribe()
    }

    /// Merges `patch` into the current configuration section by section.
    /// Keys missing from a patched section keep their current value.
    pub fn update(&self, patch: Value) -> Result<OverlayConfig> {
        let base = to_value(&self.current())?;
        self.commit(merge_sections(base, patch)?)
    }

    /// Applies an in-place edit; the result is validated like any update.
    pub fn update_with(&self, edit: impl FnOnce(&mut OverlayConfig)) -> Result<OverlayConfig> {
        let mut next = self.current();
        edit(&mut next);
        self.commit(next)
    }

    pub fn set_section(&self, section: Section, enabled: bool) -> Result<OverlayConfig> {
        self.update_with(|config| config.sections.set(section, enabled))
    }

    pub fn reset_to_defaults(&self) -> Result<OverlayConfig> {
        self.commit(OverlayConfig::default())
    }

    /// Current configuration as TOML.
    pub fn export(&self) -> Result<String> {
        self.current().to_toml_string()
    }

    /// Replaces the configuration with `text` merged over the defaults.
    /// On error the current configuration is left untouched.
    pub fn import(&self, text: &str) -> Result<OverlayConfig> {
        let imported: toml::Value = toml::from_str(text)
            .map_err(|err| ops_config_error(format!("invalid configuration text: {err}")))?;
        let patch = serde_json::to_value(imported)
            .map_err(|err| ops_config_error(format!("unsupported configuration value: {err}")))?;
        let base = to_value(&OverlayConfig::default())?;
        self.commit(merge_sections(base, patch)?)
    }

    fn commit(&self, next: OverlayConfig) -> Result<OverlayConfig> {
        next.validate()?;
        let changed = self.inner.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        if changed {
            debug!("configuration changed");
            self.persist(&next);
        }
        Ok(next)
    }

    fn persist(&self, config: &OverlayConfig) {
        let Some(path) = &self.inner.path else {
            return;
        };
        let written = config.to_toml_string().and_then(|doc| {
            fs::write(path, doc).map_err(|err| {
                ops_config_error(format!("unable to write {}: {err}", path.display()))
            })
        });
        if let Err(err) = written {
            warn!(error = %err, "configuration not persisted");
        }
    }
}

fn to_value(config: &OverlayConfig) -> Result<Value> {
    serde_json::to_value(config).map_err(|err| ops_config_error(err.to_string()))
}

fn merge_sections(base: Value, patch: Value) -> Result<OverlayConfig> {
    let Value::Object(mut base) = base else {
        return Err(ops_config_error("configuration is not a table"));
    };
    let Value::Object(patch) = patch else {
        return Err(ops_config_error("configuration patch must be a table"));
    };

    for (section, values) in patch {
        match (base.get_mut(&section), values) {
            (Some(Value::Object(current)), Value::Object(values)) => merge_shallow(current, values),
            (_, values) => {
                base.insert(section, values);
            }
        }
    }

    serde_json::from_value(Value::Object(base))
        .map_err(|err| ops_config_error(format!("invalid configuration: {err}")))
}

fn merge_shallow(current: &mut Map<String, Value>, values: Map<String, Value>) {
    for (key, value) in values {
        current.insert(key, value);
    }
}

fn ops_config_error(message: impl Into<String>) -> OverlayError {
    OverlayError::Configuration(message.into())
}
