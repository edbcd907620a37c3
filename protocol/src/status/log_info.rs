use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A status-log value, kept as an integer when it parses as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogValue {
    Integer(i64),
    Text(String),
}

impl LogValue {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(value) => LogValue::Integer(value),
            Err(_) => LogValue::Text(raw.to_string()),
        }
    }
}

/// Fields recovered from a health-check status line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogDerivedInfo {
    pub version: String,
    pub max: i64,
    pub motd: String,
    /// Keys other than the three above; captured, not used for records.
    #[serde(flatten)]
    pub extra: BTreeMap<String, LogValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn log_value_parse_test() {
        assert_eq!(LogValue::parse("20"), LogValue::Integer(20));
        assert_eq!(LogValue::parse("-3"), LogValue::Integer(-3));
        assert_eq!(LogValue::parse("1.20.1"), LogValue::Text("1.20.1".into()));
    }

    #[test]
    fn log_info_serialize_flattens_extra() {
        let mut info = LogDerivedInfo {
            version: "1.20.1".into(),
            max: 20,
            motd: "Hi".into(),
            ..Default::default()
        };
        info.extra.insert("online".into(), LogValue::Integer(3));

        let serialized = serde_json::to_value(&info).unwrap();
        assert_eq!(
            serialized,
            serde_json::json!({"version": "1.20.1", "max": 20, "motd": "Hi", "online": 3})
        );
    }
}
