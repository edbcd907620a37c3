use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::drivers::DriversConfig;

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Host the instances' mapped ports are published on.
    pub host: String,
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            timeout_ms: 3000,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifierConfig {
    pub interval_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl NotifierConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InventoryConfig {
    pub path: PathBuf,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("inventory.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DynmapConfig {
    pub label: String,
    /// Lookup service queried as `{lookup_url}/{host_port}`.
    pub lookup_url: Option<Url>,
}

impl Default for DynmapConfig {
    fn default() -> Self {
        Self {
            label: "net.forgeserv.dynmap".to_string(),
            lookup_url: None,
        }
    }
}

/// immutable through full lifetime of app, unless restart app.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub drivers: DriversConfig,
    pub probe: ProbeConfig,
    pub notifier: NotifierConfig,
    pub inventory: InventoryConfig,
    pub dynmap: DynmapConfig,
}

impl AppConfig {
    fn load() -> AppConfig {
        let mut config = Self::load_or_init(Path::new(CONFIG_FILE)).unwrap_or_else(|e| {
            warn!("failed to load {}: {:#}, using defaults", CONFIG_FILE, e);
            Self::default()
        });
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Reads `path`; a missing file is created with the defaults first.
    pub fn load_or_init(path: &Path) -> anyhow::Result<AppConfig> {
        if !path.exists() {
            let config = AppConfig::default();
            config.save(path)?;
            info!("wrote default config to {}", path.display());
            return Ok(config);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("malformed {}", path.display()))
    }

    /// Writes pretty JSON; an existing file is kept as `<name>.bak` first.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            std::fs::copy(path, path.with_extension("bak"))
                .with_context(|| format!("failed to back up {}", path.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }

    /// `REST_PORT` / `WS_PORT` take precedence over the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let port_override = |key: &str, port: &mut u16| {
            if let Some(value) = lookup(key) {
                match value.parse::<u16>() {
                    Ok(parsed) => *port = parsed,
                    Err(_) => warn!("ignoring {}={:?}: not a port", key, value),
                }
            }
        };
        port_override("REST_PORT", &mut self.drivers.rest_driver_config.port);
        port_override("WS_PORT", &mut self.drivers.websocket_driver_config.port);
    }
}

static APP_CONFIG: LazyLock<AppConfig> = LazyLock::new(AppConfig::load);

impl AppConfig {
    pub fn get() -> &'static AppConfig {
        &APP_CONFIG
    }
}
