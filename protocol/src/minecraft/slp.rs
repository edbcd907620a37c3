use serde::{Deserialize, Serialize};

/// Length of the `data:image/png;base64,` scheme prefix carried by `favicon`.
pub const FAVICON_PREFIX_LEN: usize = 22;

/// Raw JSON body of a status response, as sent by the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PingPayload {
    pub version: VersionPayload,
    pub players: PlayersPayload,
    #[serde(default, with = "description_serde")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl PingPayload {
    /// Base64 part of the favicon with the scheme prefix cut off.
    pub fn favicon_data(&self) -> Option<&str> {
        self.favicon
            .as_deref()
            .and_then(|favicon| favicon.get(FAVICON_PREFIX_LEN..))
            .filter(|data| !data.is_empty())
    }
}

mod description_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(value: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(s) => Ok(s),
            Value::Object(obj) => Ok(obj
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string()),
            _ => Ok("".to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VersionPayload {
    pub protocol: i32,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayersPayload {
    #[serde(default)]
    pub max: i32,
    #[serde(default)]
    pub online: i32,
    #[serde(default)]
    pub sample: Vec<PlayerSample>,
}

/// One `players.sample` entry. `id` is usually a UUID, but plugins fill the
/// sample with hover-text lines whose ids are empty or arbitrary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayerSample {
    pub name: String,
    #[serde(default)]
    pub id: String,
}

/// Outcome of one completed status exchange.
///
/// Only built from a fully read, well-formed response; there is no
/// "empty" result for a failed probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingResult {
    pub description: String,
    pub icon: Option<Vec<u8>>,
    /// Server-controlled sample, not an authoritative online count.
    pub players: Vec<PlayerSample>,
    pub version_name: String,
    pub protocol: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAYLOAD_TEXT: &str = r#"{
        "version": {"name": "1.20.1", "protocol": 763},
        "players": {
            "max": 20,
            "online": 2,
            "sample": [
                {"name": "Notch", "id": "069a79f4-44e9-4726-a5be-fca90e38aaf5"}
            ]
        },
        "description": {"text": "A Minecraft Server"},
        "favicon": "data:image/png;base64,iVBORw0KGgo="
    }"#;

    #[test]
    fn payload_with_object_description_test() {
        let payload: PingPayload = serde_json::from_str(PAYLOAD_TEXT).unwrap();
        assert_eq!(payload.description, "A Minecraft Server");
        assert_eq!(payload.version.name, "1.20.1");
        assert_eq!(payload.version.protocol, 763);
        assert_eq!(payload.players.sample.len(), 1);
        assert_eq!(payload.players.sample[0].name, "Notch");
        assert_eq!(payload.favicon_data(), Some("iVBORw0KGgo="));
    }

    #[test]
    fn payload_with_plain_description_test() {
        let payload: PingPayload = serde_json::from_str(
            r#"{"version": {"name": "1.8.9", "protocol": 47},
                "players": {"max": 10, "online": 0},
                "description": "hello"}"#,
        )
        .unwrap();
        assert_eq!(payload.description, "hello");
        assert!(payload.players.sample.is_empty());
        assert_eq!(payload.favicon_data(), None);
    }

    #[test]
    fn payload_description_without_text_test() {
        let payload: PingPayload = serde_json::from_str(
            r#"{"version": {"name": "x", "protocol": 1},
                "players": {},
                "description": {"extra": [{"text": "ignored"}]}}"#,
        )
        .unwrap();
        assert_eq!(payload.description, "");
    }

    #[test]
    fn payload_missing_version_is_rejected_test() {
        let result = serde_json::from_str::<PingPayload>(r#"{"players": {}, "description": ""}"#);
        assert!(result.is_err());
    }

    #[test]
    fn payload_with_free_text_sample_ids_test() {
        let payload: PingPayload = serde_json::from_str(
            r#"{"version": {"name": "Paper 1.20.1", "protocol": 763},
                "players": {"max": 20, "online": 1, "sample": [
                    {"name": "§aWelcome!", "id": ""},
                    {"name": "Notch", "id": "not-a-uuid"},
                    {"name": "no id at all"}
                ]},
                "description": "hi"}"#,
        )
        .unwrap();
        let ids: Vec<_> = payload.players.sample.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["", "not-a-uuid", ""]);
        assert_eq!(payload.players.sample[0].name, "§aWelcome!");
    }

    #[test]
    fn short_favicon_has_no_data_test() {
        let payload = PingPayload {
            version: VersionPayload {
                protocol: 1,
                name: "x".into(),
            },
            players: PlayersPayload::default(),
            description: String::new(),
            favicon: Some("data:image/png".into()),
        };
        assert_eq!(payload.favicon_data(), None);
    }
}
