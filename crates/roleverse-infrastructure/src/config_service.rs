//! Configuration service.
//!
//! Loads [`GameConfig`] from `~/.config/roleverse/config.toml` and resolves
//! the model API key from the environment. The key is never written to disk.

use crate::paths::RoleversePaths;
use roleverse_core::config::GameConfig;
use roleverse_core::error::{Result, RoleverseError};
use std::path::{Path, PathBuf};

/// Environment variables checked for the model API key, in priority order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["ROLEVERSE_API_KEY", "DEEPSEEK_API_KEY", "OPENAI_API_KEY"];

/// Loads configuration from a TOML file.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses the platform config file location.
    pub fn default_location() -> Result<Self> {
        let path = RoleversePaths::config_file()
            .map_err(|e| RoleverseError::config(format!("Failed to get config path: {}", e)))?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration. A missing file yields the defaults; a file
    /// that exists but does not parse is an error.
    pub fn load(&self) -> Result<GameConfig> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "[ConfigService] No config at {:?}, using defaults",
                    self.path
                );
                return Ok(GameConfig::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: GameConfig = toml::from_str(&content)?;
        tracing::debug!("[ConfigService] Loaded config from {:?}", self.path);
        Ok(config)
    }

    /// Writes the default configuration if no file exists yet.
    ///
    /// Returns `true` if a file was created.
    pub fn ensure_default_file(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&GameConfig::default())?;
        std::fs::write(&self.path, content)?;
        tracing::info!("[ConfigService] Created default config at {:?}", self.path);
        Ok(true)
    }
}

/// Resolves the API key from the process environment.
pub fn api_key_from_env() -> Option<String> {
    api_key_from(|name| std::env::var(name).ok())
}

/// Resolves the API key using `lookup` for variable access.
///
/// The first variable in [`API_KEY_ENV_VARS`] with a non-blank value wins.
pub fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_ENV_VARS.iter().find_map(|name| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use roleverse_core::config::StorageBackend;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));
        assert_eq!(service.load().unwrap(), GameConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[model]\nmodel_name = \"gpt-4o-mini\"\n\n[storage]\nbackend = \"memory\"\n",
        )
        .unwrap();

        let config = ConfigService::new(&path).load().unwrap();
        assert_eq!(config.model.model_name, "gpt-4o-mini");
        assert_eq!(config.model.max_tokens, 600);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[model\nbroken").unwrap();

        let err = ConfigService::new(&path).load().unwrap_err();
        assert!(matches!(err, RoleverseError::Serialization { .. }));
    }

    #[test]
    fn test_ensure_default_file_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("nested/config.toml"));

        assert!(service.ensure_default_file().unwrap());
        assert!(!service.ensure_default_file().unwrap());
        assert_eq!(service.load().unwrap(), GameConfig::default());
    }

    #[test]
    fn test_api_key_priority_and_blank_values() {
        let vars = HashMap::from([
            ("ROLEVERSE_API_KEY", "   "),
            ("DEEPSEEK_API_KEY", "sk-deep"),
            ("OPENAI_API_KEY", "sk-open"),
        ]);
        let key = api_key_from(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(key.as_deref(), Some("sk-deep"));

        assert_eq!(api_key_from(|_| None), None);
    }
}
