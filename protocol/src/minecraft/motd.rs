use lazy_static::lazy_static;
use regex::Regex;

/// Marker character that opens a two-character formatting code (`§a`, `§l`, ...).
pub const FORMAT_MARKER: char = '§';

lazy_static! {
    static ref FORMAT_CODE_RE: Regex =
        Regex::new(&format!("(?s){}.", regex::escape(&FORMAT_MARKER.to_string()))).unwrap();
}

/// Removes every `§x` formatting code, whatever the mode character.
///
/// Runs until no code is left; every pass shortens the text, so the loop is
/// bounded by the input length.
pub fn strip_format_codes(motd: &str) -> String {
    let mut result = motd.to_string();
    while FORMAT_CODE_RE.is_match(&result) {
        result = FORMAT_CODE_RE.replace_all(&result, "").to_string();
    }
    result
}

pub fn strip_quotes(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '\'' | '"')).collect()
}

/// Plain-text MOTD: formatting codes and stray quotes removed, then trimmed.
pub fn clean_motd(motd: &str) -> String {
    strip_quotes(&strip_format_codes(motd)).trim().to_string()
}
