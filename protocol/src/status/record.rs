use serde::{Deserialize, Serialize};

/// Distribution label used when an instance does not declare one.
pub const DEFAULT_SERVER_TYPE: &str = "Vanilla";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    /// Player id as the server sent it; not guaranteed to be a UUID.
    pub uuid: String,
}

/// Status of one game-server instance as handed to consumers.
///
/// Built fresh on every assembly pass and compared by value: two records
/// with the same fields are the same status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatusRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub server_type: String,
    pub status: String,
    pub health: String,
    pub players: Vec<PlayerEntry>,
    /// Size of `players`, not the count reported by the server.
    pub online: usize,
    pub max: i64,
    /// Base64 encoded server icon.
    pub icon: Option<String>,
    pub motd: String,
    pub version: String,
    pub dynmap: Option<String>,
}

/// Every current record, in inventory order.
pub type Snapshot = Vec<ServerStatusRecord>;
