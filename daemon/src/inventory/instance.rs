use forgeserv_protocol::status::DEFAULT_SERVER_TYPE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instances carrying this label are never reported.
pub const HIDE_LABEL: &str = "net.forgeserv.hide";
const RUNNING_STATE: &str = "running";
const TYPE_ENV_PREFIX: &str = "TYPE=";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Tcp,
    Udp,
    #[serde(other)]
    Other,
}

/// One exposed container port and the host ports bound to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortMapping {
    pub container_port: u16,
    pub transport: Transport,
    #[serde(default)]
    pub host_ports: Vec<u16>,
}

/// An instance as reported by the inventory provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceDescriptor {
    pub name: String,
    /// Lifecycle state, e.g. `running` or `exited`.
    pub state: String,
    #[serde(default = "default_health")]
    pub health: String,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    /// Output of the most recent health check.
    #[serde(default)]
    pub health_log: Option<String>,
}

fn default_health() -> String {
    "none".to_string()
}

impl InstanceDescriptor {
    pub fn is_running(&self) -> bool {
        self.state == RUNNING_STATE
    }

    pub fn is_hidden(&self) -> bool {
        self.labels.contains_key(HIDE_LABEL)
    }

    /// Host ports worth probing, in inventory order. Non-TCP mappings are skipped.
    pub fn tcp_host_ports(&self) -> Vec<u16> {
        self.ports
            .iter()
            .filter(|mapping| mapping.transport == Transport::Tcp)
            .flat_map(|mapping| mapping.host_ports.iter().copied())
            .collect()
    }

    /// Distribution label from the first `TYPE=` env entry, e.g. `FORGE` -> `Forge`.
    pub fn server_type(&self) -> String {
        self.env
            .iter()
            .find_map(|entry| entry.strip_prefix(TYPE_ENV_PREFIX))
            .and_then(capitalize)
            .unwrap_or_else(|| DEFAULT_SERVER_TYPE.to_string())
    }
}

fn capitalize(value: &str) -> Option<String> {
    let mut chars = value.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect())
}
