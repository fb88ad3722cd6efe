//! Session domain model.
//!
//! A `Session` is the whole persisted state of one player's game: character,
//! inventory, stats, the conversation replayed to the narrative model and the
//! rolling world-context summary.

use super::message::ConversationMessage;
use crate::save::{MAX_INVENTORY_ITEMS, normalize_item_name};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health a character starts with.
pub const MAX_HEALTH: u8 = 100;

/// Where a session is in its lifecycle, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No universe has been chosen and no character exists.
    ChoosingUniverse,
    /// A ruleset is set but the character has not been created yet.
    CreatingCharacter,
    /// The character exists and turns can be played.
    Playing,
    /// The story has ended; no further actions are accepted.
    GameOver,
}

/// Represents one player's game session.
///
/// This is the pure domain model; storage backends persist it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format for system-created sessions)
    pub id: String,
    /// Character summary shown to the player, `None` until created
    #[serde(default)]
    pub character: Option<String>,
    /// Item names, unique under case-insensitive comparison
    #[serde(default)]
    pub inventory: Vec<String>,
    /// Health in [0, 100]
    #[serde(default = "default_health")]
    pub health: u8,
    /// Stat name to value, values in [0, 20]
    #[serde(default)]
    pub stats: BTreeMap<String, i32>,
    /// Ability name to present flag
    #[serde(default)]
    pub abilities: BTreeMap<String, bool>,
    /// Conversation history replayed to the narrative model (append-only)
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    /// Short rolling summary of the current narrative state
    #[serde(default)]
    pub world_context: String,
    /// Universe catalog key
    #[serde(default)]
    pub universe: Option<String>,
    /// Ruleset text of the chosen universe
    #[serde(default)]
    pub ruleset: Option<String>,
    /// Set once the story has ended, never cleared
    #[serde(default)]
    pub game_over: bool,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last committed mutation, drives idle expiry
    pub last_active: DateTime<Utc>,
}

fn default_health() -> u8 {
    MAX_HEALTH
}

impl Session {
    /// Creates an empty session.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            character: None,
            inventory: Vec::new(),
            health: MAX_HEALTH,
            stats: BTreeMap::new(),
            abilities: BTreeMap::new(),
            messages: Vec::new(),
            world_context: String::new(),
            universe: None,
            ruleset: None,
            game_over: false,
            created_at: now,
            last_active: now,
        }
    }

    /// Returns the lifecycle phase implied by the session's fields.
    pub fn phase(&self) -> SessionPhase {
        if self.game_over {
            SessionPhase::GameOver
        } else if self.character.is_some() {
            SessionPhase::Playing
        } else if self.ruleset.is_some() {
            SessionPhase::CreatingCharacter
        } else {
            SessionPhase::ChoosingUniverse
        }
    }

    /// Whether character creation has completed.
    pub fn has_character(&self) -> bool {
        self.character.is_some()
    }

    /// Whether an item with this name is already carried (case-insensitive).
    pub fn has_item(&self, item: &str) -> bool {
        let needle = item.to_lowercase();
        self.inventory
            .iter()
            .any(|existing| existing.to_lowercase() == needle)
    }

    /// Adds an item unless one with the same name exists case-insensitively.
    ///
    /// The name is normalized the way save validation expects, and nothing is
    /// added once the inventory holds [`MAX_INVENTORY_ITEMS`]. Returns `true`
    /// if the inventory grew.
    pub fn add_item(&mut self, item: impl Into<String>) -> bool {
        let name = normalize_item_name(&item.into());
        if name.is_empty()
            || self.has_item(&name)
            || self.inventory.len() >= MAX_INVENTORY_ITEMS
        {
            return false;
        }
        self.inventory.push(name);
        true
    }

    /// Ends the story. One-way.
    pub fn mark_game_over(&mut self) {
        self.game_over = true;
    }

    /// Refreshes the last-activity timestamp.
    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Whether the session has been idle since before `cutoff`.
    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_active < cutoff
    }
}
