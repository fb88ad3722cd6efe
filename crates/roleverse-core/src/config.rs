//! Game configuration.
//!
//! Every field has a default so a partial (or missing) `config.toml` is valid.
//! The API key is never part of this file; it is read from the environment.

use crate::chance::ChanceTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root of `config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub model: ModelSettings,
    pub storage: StorageSettings,
    pub session: SessionSettings,
    pub cache: CacheSettings,
    pub rules: RulesSettings,
}

/// `[model]`: chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub base_url: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Temperature of narration calls.
    pub temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com/chat/completions".to_string(),
            model_name: "deepseek-chat".to_string(),
            max_tokens: 600,
            timeout_secs: 60,
            temperature: 0.7,
        }
    }
}

/// Session store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Session directory for the file backend; defaults to the data dir.
    pub directory: Option<PathBuf>,
}

/// `[session]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub idle_ttl_minutes: u64,
    pub max_action_chars: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_ttl_minutes: 60 * 24,
            max_action_chars: 500,
        }
    }
}

/// `[cache]`: response cache for stateless prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            max_entries: 256,
        }
    }
}

/// `[rules]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSettings {
    /// Reply that marks an action as possible.
    pub affirmative_token: String,
    /// Upper bound requested for narrated outcomes.
    pub narration_max_chars: usize,
    pub chance: ChanceTable,
}

impl Default for RulesSettings {
    fn default() -> Self {
        Self {
            affirmative_token: "YES".to_string(),
            narration_max_chars: 300,
            chance: ChanceTable::default(),
        }
    }
}
