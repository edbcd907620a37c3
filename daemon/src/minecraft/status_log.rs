use forgeserv_protocol::minecraft::motd::{clean_motd, strip_quotes};
use forgeserv_protocol::status::{LogDerivedInfo, LogValue};
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use thiserror::Error;

/// Splits the endpoint prefix from the `key=value` fields.
pub const SEPARATOR: &str = " : ";

lazy_static! {
    // 键必须位于开头或空白之后, 避免把值中的 '=' 当作新键
    static ref KEY_RE: Regex = Regex::new(r"(?:^|\s)([A-Za-z_][A-Za-z0-9_.\-]*)=").unwrap();
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusLogError {
    #[error("status line has no \"{SEPARATOR}\" separator")]
    MissingSeparator,
}

/// Pairs every `key=` token with the text up to the next token.
fn split_fields(fields: &str) -> Vec<(&str, &str)> {
    let tokens: Vec<(&str, usize, usize)> = KEY_RE
        .captures_iter(fields)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps.get(1)?;
            Some((key.as_str(), whole.start(), whole.end()))
        })
        .collect();

    tokens
        .iter()
        .enumerate()
        .map(|(idx, (key, _, value_start))| {
            let value_end = tokens
                .get(idx + 1)
                .map(|(_, next_start, _)| *next_start)
                .unwrap_or(fields.len());
            (*key, fields[*value_start..value_end].trim())
        })
        .collect()
}

/// Decodes `prefix : version=... max=... motd=...`.
pub fn decode(line: &str) -> Result<LogDerivedInfo, StatusLogError> {
    let (_, fields) = line
        .split_once(SEPARATOR)
        .ok_or(StatusLogError::MissingSeparator)?;

    let mut info = LogDerivedInfo::default();
    for (key, raw) in split_fields(fields) {
        match key {
            "motd" => info.motd = clean_motd(raw),
            "version" => info.version = strip_quotes(raw).trim().to_string(),
            "max" => {
                info.max = match LogValue::parse(strip_quotes(raw).trim()) {
                    LogValue::Integer(max) => max,
                    LogValue::Text(text) => {
                        warn!("max player count {:?} is not a number, using 0", text);
                        0
                    }
                }
            }
            _ => {
                info.extra
                    .insert(key.to_string(), LogValue::parse(strip_quotes(raw).trim()));
            }
        }
    }
    Ok(info)
}

/// Like [`decode`], but a broken or missing line yields defaults.
pub fn decode_or_default(line: Option<&str>) -> LogDerivedInfo {
    let Some(line) = line else {
        return LogDerivedInfo::default();
    };
    match decode(line) {
        Ok(info) => info,
        Err(e) => {
            warn!("could not decode status line {:?}: {}", line, e);
            LogDerivedInfo::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_health_check_line() {
        let info =
            decode("localhost:25565 : version=1.20.1 online=3 max=20 motd=§aWelcome §lHome")
                .unwrap();
        assert_eq!(info.version, "1.20.1");
        assert_eq!(info.max, 20);
        assert_eq!(info.motd, "Welcome Home");
        assert_eq!(info.extra.get("online"), Some(&LogValue::Integer(3)));
    }

    #[test]
    fn plain_motd_only_loses_quotes() {
        let info = decode("localhost:25565 : version=1.19.4 max=10 motd='A Modded Server'").unwrap();
        assert_eq!(info.motd, "A Modded Server");
    }

    #[test]
    fn fields_may_come_in_any_order() {
        let info = decode("host : motd=Hi there max=8 version=1.12.2").unwrap();
        assert_eq!(info.motd, "Hi there");
        assert_eq!(info.max, 8);
        assert_eq!(info.version, "1.12.2");
    }

    #[test]
    fn equals_inside_value_is_not_a_key() {
        let info = decode("host : motd=2+2=4 max=1").unwrap();
        assert_eq!(info.motd, "2+2=4");
        assert_eq!(info.max, 1);
    }

    #[test]
    fn missing_keys_keep_defaults() {
        let info = decode("localhost:25565 : motd=Only a motd").unwrap();
        assert_eq!(info.version, "");
        assert_eq!(info.max, 0);
        assert_eq!(info.motd, "Only a motd");
    }

    #[test]
    fn unparsable_max_falls_back_to_zero() {
        let info = decode("host : max=lots version=1.7.10").unwrap();
        assert_eq!(info.max, 0);
        assert_eq!(info.version, "1.7.10");
    }

    #[test]
    fn unknown_keys_are_captured() {
        let info = decode("host : modpack=Enigmatica build=42").unwrap();
        assert_eq!(
            info.extra.get("modpack"),
            Some(&LogValue::Text("Enigmatica".into()))
        );
        assert_eq!(info.extra.get("build"), Some(&LogValue::Integer(42)));
    }

    #[test]
    fn missing_separator_is_an_error() {
        assert_eq!(
            decode("version=1.20.1 max=20"),
            Err(StatusLogError::MissingSeparator)
        );
        assert_eq!(decode_or_default(Some("version=1.20.1 max=20")), LogDerivedInfo::default());
        assert_eq!(decode_or_default(None), LogDerivedInfo::default());
    }
}
