//! Directive codec.
//!
//! The narrative model cannot be forced to emit strictly typed output, so it is
//! asked to end its replies with machine-readable directive lines:
//!
//! ```text
//! INVENTORY_ADD: item1, item2, item3
//! CHARACTER_DATA: {"stats": {"Strength": 8}, "abilities": {"Stealth": true}}
//! GAME_OVER: reason
//! ```
//!
//! This is version 1 of the convention. Keywords are case-insensitive. The text comes from an untrusted generator:
//! anything directive-shaped that fails to parse degrades to "no data" and is
//! logged, it never becomes an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// Keyword of the inventory-addition directive.
pub const INVENTORY_KEYWORD: &str = "INVENTORY_ADD";
/// Keyword of the character-data directive.
pub const CHARACTER_KEYWORD: &str = "CHARACTER_DATA";
/// Keyword of the end-of-story directive.
pub const GAME_OVER_KEYWORD: &str = "GAME_OVER";

static INVENTORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)INVENTORY_ADD:[ \t]*([^\r\n]*)").expect("inventory directive pattern")
});

static CHARACTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)CHARACTER_DATA:\s*").expect("character directive pattern"));

static GAME_OVER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)GAME_OVER:[ \t]*([^\r\n]*)").expect("game over directive pattern")
});

/// Stats parsed from a character-data directive.
pub type StatMap = BTreeMap<String, i32>;
/// Abilities parsed from a character-data directive.
pub type AbilityMap = BTreeMap<String, bool>;

/// Extracts the first inventory directive.
///
/// Returns the text with the directive removed (trimmed) and the trimmed,
/// non-empty item names. Without a directive the text is returned unchanged.
pub fn extract_inventory_directive(text: &str) -> (String, Vec<String>) {
    let Some(caps) = INVENTORY_RE.captures(text) else {
        return (text.to_string(), Vec::new());
    };

    let range = caps.get(0).map_or(0..0, |m| m.range());
    let payload = caps.get(1).map_or("", |m| m.as_str());
    let items = split_items(payload);

    let mut stripped = String::with_capacity(text.len());
    stripped.push_str(&text[..range.start]);
    stripped.push_str(&text[range.end..]);

    (stripped.trim().to_string(), items)
}

/// Extracts stats and abilities from the first character-data directive.
///
/// Malformed JSON yields two empty maps. Entries of the wrong type are skipped.
pub fn extract_character_directive(text: &str) -> (StatMap, AbilityMap) {
    let Some(keyword) = CHARACTER_RE.find(text) else {
        return (StatMap::new(), AbilityMap::new());
    };

    let payload = &text[keyword.end()..];
    match first_json_value(payload) {
        Ok((value, _)) => character_maps(&value),
        Err(reason) => {
            tracing::warn!(
                "[DirectiveCodec] Failed to parse {} JSON ({}): {}",
                CHARACTER_KEYWORD,
                reason,
                preview(payload)
            );
            (StatMap::new(), AbilityMap::new())
        }
    }
}

/// Extracts the reason of the first end-of-story directive, if any.
pub fn extract_game_over_directive(text: &str) -> Option<String> {
    GAME_OVER_RE
        .captures(text)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()).trim().to_string())
}

/// Removes every directive and all blank lines, producing player-visible text.
///
/// A character-data directive is removed through the end of its JSON value, or
/// through the end of the text when the JSON cannot be parsed.
pub fn strip_all_directives(text: &str) -> String {
    let mut text = text.to_string();

    while let Some(keyword) = CHARACTER_RE.find(&text) {
        let payload_start = keyword.end();
        let end = match first_json_value(&text[payload_start..]) {
            Ok((_, consumed)) => payload_start + consumed,
            Err(_) => text.len(),
        };
        text.replace_range(keyword.start()..end, "");
    }

    let text = INVENTORY_RE.replace_all(&text, "");
    let text = GAME_OVER_RE.replace_all(&text, "");

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_items(payload: &str) -> Vec<String> {
    payload
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses the first JSON value in `payload`, returning it with the number of
/// bytes consumed. Trailing text is ignored.
fn first_json_value(payload: &str) -> Result<(Value, usize), String> {
    let mut stream = serde_json::Deserializer::from_str(payload).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => Ok((value, stream.byte_offset())),
        Some(Err(err)) => Err(err.to_string()),
        None => Err("empty payload".to_string()),
    }
}

fn character_maps(value: &Value) -> (StatMap, AbilityMap) {
    let mut stats = StatMap::new();
    let mut abilities = AbilityMap::new();

    if let Some(entries) = value.get("stats").and_then(Value::as_object) {
        for (name, raw) in entries {
            match raw.as_i64().and_then(|n| i32::try_from(n).ok()) {
                Some(n) => {
                    stats.insert(name.clone(), n);
                }
                None => tracing::warn!(
                    "[DirectiveCodec] Skipping non-integer stat '{}': {}",
                    name,
                    raw
                ),
            }
        }
    }

    if let Some(entries) = value.get("abilities").and_then(Value::as_object) {
        for (name, raw) in entries {
            match raw.as_bool() {
                Some(flag) => {
                    abilities.insert(name.clone(), flag);
                }
                None => tracing::warn!(
                    "[DirectiveCodec] Skipping non-boolean ability '{}': {}",
                    name,
                    raw
                ),
            }
        }
    }

    (stats, abilities)
}

fn preview(text: &str) -> String {
    text.chars().take(120).collect()
}
