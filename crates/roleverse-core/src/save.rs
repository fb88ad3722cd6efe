//! Portable save records.
//!
//! A `SaveRecord` is the storage-agnostic projection of a [`Session`] used for
//! export and import. It deliberately leaves out the message history and the
//! universe/ruleset, so a save/load round trip starts a fresh conversation
//! with the same character state.

use crate::error::{Result, RoleverseError};
use crate::session::{MAX_HEALTH, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the save file layout written by [`SaveRecord::from_session`].
pub const SAVE_FORMAT_VERSION: u32 = 1;
/// Highest stat value a save may carry.
pub const MAX_STAT_VALUE: i64 = 20;
/// Longest item name accepted after sanitizing.
pub const MAX_ITEM_NAME_CHARS: usize = 100;
/// Most items a save may carry.
pub const MAX_INVENTORY_ITEMS: usize = 100;
/// Longest stat name accepted.
pub const MAX_STAT_NAME_CHARS: usize = 50;
/// Longest character summary accepted.
pub const MAX_CHARACTER_CHARS: usize = 4000;
/// Longest world context accepted.
pub const MAX_WORLD_CONTEXT_CHARS: usize = 2000;

/// Exported game state.
///
/// Numeric fields are wide on purpose: out-of-range values must reach
/// [`SaveRecord::validate`] so the violation can be reported by name instead of
/// failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    /// Files written before versioning count as version 1.
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub user_id: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default = "default_health")]
    pub health: i64,
    #[serde(default)]
    pub stats: BTreeMap<String, i64>,
    #[serde(default)]
    pub abilities: BTreeMap<String, bool>,
    #[serde(default)]
    pub world_context: String,
    #[serde(default)]
    pub game_over: bool,
    pub last_active: DateTime<Utc>,
}

fn default_format_version() -> u32 {
    SAVE_FORMAT_VERSION
}

fn default_health() -> i64 {
    i64::from(MAX_HEALTH)
}

impl SaveRecord {
    /// Projects a session into a save record.
    pub fn from_session(session: &Session) -> Self {
        Self {
            format_version: SAVE_FORMAT_VERSION,
            user_id: session.id.clone(),
            character: session.character.clone(),
            inventory: session.inventory.clone(),
            health: i64::from(session.health),
            stats: session
                .stats
                .iter()
                .map(|(name, value)| (name.clone(), i64::from(*value)))
                .collect(),
            abilities: session.abilities.clone(),
            world_context: session.world_context.clone(),
            game_over: session.game_over,
            last_active: session.last_active,
        }
    }

    /// Validates the record and returns a sanitized copy.
    ///
    /// Item names have unsafe characters stripped and surrounding whitespace
    /// trimmed; items that end up empty or duplicate an earlier item
    /// (case-insensitively) are dropped. Every other violation is rejected,
    /// naming the first constraint that failed.
    pub fn validate(self) -> Result<SaveRecord> {
        if !(1..=SAVE_FORMAT_VERSION).contains(&self.format_version) {
            return Err(RoleverseError::validation(format!(
                "unsupported save format version {}",
                self.format_version
            )));
        }

        if !(0..=i64::from(MAX_HEALTH)).contains(&self.health) {
            return Err(RoleverseError::validation(format!(
                "health must be between 0 and {MAX_HEALTH}, got {}",
                self.health
            )));
        }

        for (name, value) in &self.stats {
            if name.trim().is_empty() {
                return Err(RoleverseError::validation("stat names must not be empty"));
            }
            if name.chars().count() > MAX_STAT_NAME_CHARS {
                return Err(RoleverseError::validation(format!(
                    "stat name exceeds {MAX_STAT_NAME_CHARS} characters"
                )));
            }
            if !(0..=MAX_STAT_VALUE).contains(value) {
                return Err(RoleverseError::validation(format!(
                    "stat '{name}' must be between 0 and {MAX_STAT_VALUE}, got {value}"
                )));
            }
        }

        if self.inventory.len() > MAX_INVENTORY_ITEMS {
            return Err(RoleverseError::validation(format!(
                "inventory holds {} items, at most {MAX_INVENTORY_ITEMS} are allowed",
                self.inventory.len()
            )));
        }

        let mut inventory: Vec<String> = Vec::with_capacity(self.inventory.len());
        for raw in &self.inventory {
            let item = sanitize_item_name(raw);
            if item.chars().count() > MAX_ITEM_NAME_CHARS {
                return Err(RoleverseError::validation(format!(
                    "inventory item name exceeds {MAX_ITEM_NAME_CHARS} characters"
                )));
            }
            if item.is_empty() {
                continue;
            }
            let lower = item.to_lowercase();
            if inventory.iter().any(|kept| kept.to_lowercase() == lower) {
                continue;
            }
            inventory.push(item);
        }

        let character_chars = self.character.as_deref().map_or(0, |c| c.chars().count());
        if character_chars > MAX_CHARACTER_CHARS {
            return Err(RoleverseError::validation(format!(
                "character summary exceeds {MAX_CHARACTER_CHARS} characters"
            )));
        }

        if self.world_context.chars().count() > MAX_WORLD_CONTEXT_CHARS {
            return Err(RoleverseError::validation(format!(
                "world context exceeds {MAX_WORLD_CONTEXT_CHARS} characters"
            )));
        }

        Ok(SaveRecord { inventory, ..self })
    }

    /// Builds a fresh session seeded from this record.
    ///
    /// Call [`SaveRecord::validate`] first; values are narrowed here assuming
    /// they are already in range.
    pub fn into_session(self, session_id: impl Into<String>) -> Session {
        let mut session = Session::new(session_id);
        session.character = self.character;
        session.inventory = self.inventory;
        session.health = u8::try_from(self.health.clamp(0, i64::from(MAX_HEALTH)))
            .unwrap_or(MAX_HEALTH);
        session.stats = self
            .stats
            .into_iter()
            .map(|(name, value)| (name, value.clamp(0, MAX_STAT_VALUE) as i32))
            .collect();
        session.abilities = self.abilities;
        session.world_context = self.world_context;
        session.game_over = self.game_over;
        session
    }
}

/// Strips control and markup characters from an item name and trims it.
pub fn sanitize_item_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | '&'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Sanitizes an item name and cuts it to [`MAX_ITEM_NAME_CHARS`].
///
/// The result passes [`SaveRecord::validate`] unchanged.
pub fn normalize_item_name(raw: &str) -> String {
    clip_chars(&sanitize_item_name(raw), MAX_ITEM_NAME_CHARS)
}

/// Trims `text` and cuts it to at most `max_chars` characters.
pub fn clip_chars(text: &str, max_chars: usize) -> String {
    text.trim()
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SaveRecord {
        SaveRecord {
            format_version: SAVE_FORMAT_VERSION,
            user_id: "player-1".to_string(),
            character: Some("A cautious smuggler".to_string()),
            inventory: vec!["Blaster".to_string(), "Star map".to_string()],
            health: 80,
            stats: BTreeMap::from([("Strength".to_string(), 7), ("Charisma".to_string(), 12)]),
            abilities: BTreeMap::from([("Stealth".to_string(), true)]),
            world_context: "Docked at a derelict station.".to_string(),
            game_over: false,
            last_active: Utc::now(),
        }
    }

    #[test]
    fn test_valid_record_passes_unchanged() {
        let record = sample_record();
        assert_eq!(record.clone().validate().unwrap(), record);
    }

    #[test]
    fn test_stat_above_twenty_is_rejected() {
        let mut record = sample_record();
        record.stats.insert("Strength".to_string(), 21);
        let err = record.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Strength"));
    }

    #[test]
    fn test_negative_stat_is_rejected() {
        let mut record = sample_record();
        record.stats.insert("Wisdom".to_string(), -1);
        assert!(record.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_health_out_of_range_is_rejected() {
        let mut record = sample_record();
        record.health = 200;
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("health"));
    }

    #[test]
    fn test_oversized_item_name_is_rejected() {
        let mut record = sample_record();
        record.inventory.push("x".repeat(150));
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("item name"));
    }

    #[test]
    fn test_item_names_are_sanitized_and_deduplicated() {
        let mut record = sample_record();
        record.inventory = vec![
            "Lantern".to_string(),
            "LANTERN".to_string(),
            "\u{0007}".to_string(),
            "  <Rope> ".to_string(),
        ];
        let record = record.validate().unwrap();
        assert_eq!(record.inventory, vec!["Lantern", "Rope"]);
    }

    #[test]
    fn test_format_version() {
        let json = r#"{"user_id": "old", "last_active": "2024-01-01T00:00:00Z"}"#;
        let legacy: SaveRecord = serde_json::from_str(json).unwrap();
        assert_eq!(legacy.format_version, SAVE_FORMAT_VERSION);
        assert!(legacy.validate().is_ok());

        let mut record = sample_record();
        record.format_version = SAVE_FORMAT_VERSION + 1;
        let err = record.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("format version"));
    }

    #[test]
    fn test_quotes_survive_validation() {
        let mut record = sample_record();
        record.inventory = vec![
            "Traveler's clothes".to_string(),
            "The \"Lucky\" coin".to_string(),
        ];
        let validated = record.clone().validate().unwrap();
        assert_eq!(validated.inventory, record.inventory);
    }

    #[test]
    fn test_normalized_names_pass_validation_unchanged() {
        let long = format!("{} tail", "y".repeat(MAX_ITEM_NAME_CHARS - 1));
        let name = normalize_item_name(&long);
        assert_eq!(name.chars().count(), MAX_ITEM_NAME_CHARS - 1);
        assert_eq!(normalize_item_name("a&b <c>"), "ab c");

        let mut record = sample_record();
        record.inventory = vec![name.clone()];
        assert_eq!(record.validate().unwrap().inventory, vec![name]);
    }

    #[test]
    fn test_clip_chars() {
        assert_eq!(clip_chars("  Dragon's tooth  ", 100), "Dragon's tooth");
        assert_eq!(clip_chars("ёжик", 2), "ёж");
        assert_eq!(clip_chars("ab cd", 3), "ab");
    }

    #[test]
    fn test_round_trip_through_session() {
        let record = sample_record().validate().unwrap();
        let session = record.clone().into_session("new-id");

        assert_eq!(session.id, "new-id");
        assert_eq!(session.inventory, record.inventory);
        assert_eq!(session.health, 80);
        assert_eq!(session.stats.get("Charisma"), Some(&12));
        assert!(session.messages.is_empty());
        assert!(session.universe.is_none());
        assert!(session.ruleset.is_none());

        let exported = SaveRecord::from_session(&session);
        assert_eq!(exported.inventory, record.inventory);
        assert_eq!(exported.stats, record.stats);
        assert_eq!(exported.abilities, record.abilities);
        assert_eq!(exported.world_context, record.world_context);
    }

    #[test]
    fn test_json_shape_uses_documented_field_names() {
        let json = serde_json::to_value(sample_record()).unwrap();
        for field in [
            "format_version",
            "user_id",
            "character",
            "inventory",
            "health",
            "stats",
            "abilities",
            "world_context",
            "game_over",
            "last_active",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
    }
}
