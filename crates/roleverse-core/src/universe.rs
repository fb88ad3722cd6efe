//! Preset universe catalog.

use crate::error::{Result, RoleverseError};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Ruleset used when the player starts without choosing a universe.
pub const SANDBOX_RULESET: &str = "The rules of this world are defined by the player.";

/// Universes offered before character creation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UniverseKey {
    Fantasy,
    Cyberpunk,
    SpaceOpera,
    Custom,
}

impl UniverseKey {
    /// Parses a universe key, reporting unknown keys as validation errors.
    pub fn parse(key: &str) -> Result<Self> {
        key.trim()
            .parse()
            .map_err(|_| RoleverseError::validation(format!("Unknown universe '{}'", key.trim())))
    }

    /// Human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            UniverseKey::Fantasy => "Fantasy",
            UniverseKey::Cyberpunk => "Cyberpunk",
            UniverseKey::SpaceOpera => "Space Opera",
            UniverseKey::Custom => "Custom",
        }
    }

    /// Preset ruleset text. `None` for [`UniverseKey::Custom`], whose rules are
    /// supplied by the player.
    pub fn preset_ruleset(&self) -> Option<&'static str> {
        match self {
            UniverseKey::Fantasy => Some(
                "A medieval world of swords and sorcery. Magic exists but is rare and \
                 costly. Kingdoms feud, monsters roam the wilds, and ancient ruins hide \
                 treasure and danger alike.",
            ),
            UniverseKey::Cyberpunk => Some(
                "A neon-lit megacity ruled by corporations. Cybernetic implants, hacking \
                 and street crime are everyday life. Technology is advanced, but there is \
                 no magic.",
            ),
            UniverseKey::SpaceOpera => Some(
                "A galaxy of rival star empires, smugglers and ancient alien relics. \
                 Faster-than-light travel is common, energy weapons are standard, and \
                 space itself is deadly.",
            ),
            UniverseKey::Custom => None,
        }
    }

    /// All universes in display order.
    pub fn all() -> Vec<UniverseKey> {
        UniverseKey::iter().collect()
    }
}

/// Resolves the ruleset of a universe choice.
///
/// Custom universes require non-empty `custom_rules`; presets ignore it.
pub fn resolve_ruleset(key: UniverseKey, custom_rules: Option<&str>) -> Result<String> {
    match key.preset_ruleset() {
        Some(preset) => Ok(preset.to_string()),
        None => match custom_rules.map(str::trim) {
            Some(rules) if !rules.is_empty() => Ok(rules.to_string()),
            _ => Err(RoleverseError::validation(
                "A custom universe requires a non-empty ruleset",
            )),
        },
    }
}
