//! Persistent application configuration
//!
//! Stored as pretty JSON at `<data dir>/config.json`. Missing or unreadable
//! files fall back to defaults; missing fields take their defaults.

use crate::core::error::{Error, Result};
use crate::core::generator::GenerationWeights;
use crate::core::traffic::DeviceProfile;
use crate::core::traffic_log::LOG_CAPACITY;
use crate::utils::get_data_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Initial device profile of the simulator
    #[serde(default)]
    pub profile: DeviceProfile,
    #[serde(default)]
    pub weights: GenerationWeights,
    /// Events kept in the rolling log
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Fixed RNG seed for reproducible runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: DeviceProfile::default(),
            weights: GenerationWeights::default(),
            log_capacity: LOG_CAPACITY,
            seed: None,
        }
    }
}

fn default_log_capacity() -> usize {
    LOG_CAPACITY
}

impl AppConfig {
    /// Checks values serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a zero log capacity or unusable
    /// generation weights.
    pub fn validate(&self) -> Result<()> {
        if self.log_capacity == 0 {
            return Err(Error::validation("log_capacity", "must be at least 1"));
        }
        self.weights.validate()
    }
}

/// Location of the config file, if a data directory exists
pub fn config_path() -> Option<PathBuf> {
    get_data_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Saves the config to the default location. See [`save_config_to`].
pub async fn save_config(config: &AppConfig) -> Result<()> {
    match config_path() {
        Some(path) => save_config_to(config, &path).await,
        None => Err(Error::Internal("no data directory available".to_string())),
    }
}

/// Saves the config using an atomic write pattern.
/// 1. Writes to a temporary file next to `path`.
/// 2. Sets restrictive permissions (0o600).
/// 3. Atomically renames to the target path.
///
/// # Async
/// Uses `tokio::fs` for non-blocking I/O.
pub async fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    config.validate()?;
    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("json.tmp");

    #[cfg(unix)]
    {
        use tokio::fs::OpenOptions;
        use tokio::io::AsyncWriteExt;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600) // Permissions set before any data is written
            .open(&temp_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    #[cfg(not(unix))]
    {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::StorageFull {
            std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "Disk full: cannot save configuration. Free up space and try again.",
            )
        } else {
            e
        }
    })?;

    tracing::info!(path = %path.display(), "Configuration saved");
    Ok(())
}

/// Loads the config from the default location, or defaults.
pub async fn load_config() -> AppConfig {
    match config_path() {
        Some(path) => load_config_from(&path).await,
        None => AppConfig::default(),
    }
}

/// Loads the config from `path`. Missing, malformed or invalid files yield
/// the defaults.
pub async fn load_config_from(path: &Path) -> AppConfig {
    let json = match tokio::fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AppConfig::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to read config: {e}");
            return AppConfig::default();
        }
    };

    match serde_json::from_str::<AppConfig>(&json) {
        Ok(config) if config.validate().is_ok() => config,
        Ok(config) => {
            if let Err(e) = config.validate() {
                tracing::warn!(path = %path.display(), "Ignoring invalid config: {e}");
            }
            AppConfig::default()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "Ignoring malformed config: {e}");
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traffic::{ActivityLevel, OperatingSystem};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.profile.operating_system = OperatingSystem::Linux;
        config.profile.activity_level = ActivityLevel::new(8).unwrap();
        config.seed = Some(42);

        save_config_to(&config, &path).await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = load_config_from(&path).await;
        assert_eq!(loaded, config);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_config_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        save_config_to(&AppConfig::default(), &path).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config_from(&dir.path().join("absent.json")).await;
        assert_eq!(loaded, AppConfig::default());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"profile":{"browser":"firefox"},"log_capacity":25}"#).unwrap();

        let loaded = load_config_from(&path).await;
        assert_eq!(loaded.log_capacity, 25);
        assert_eq!(loaded.profile.activity_level.get(), 5);
        assert_eq!(loaded.weights, GenerationWeights::default());
    }

    #[tokio::test]
    async fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"log_capacity":0}"#).unwrap();
        assert_eq!(load_config_from(&path).await, AppConfig::default());

        std::fs::write(&path, r#"{"profile":{"activity_level":12}}"#).unwrap();
        assert_eq!(load_config_from(&path).await, AppConfig::default());

        std::fs::write(
            &path,
            r#"{"weights":{"background_service":1e308,"browser_activity":1e308,"foreground":1.0}}"#,
        )
        .unwrap();
        assert_eq!(load_config_from(&path).await, AppConfig::default());

        let bad = AppConfig {
            log_capacity: 0,
            ..AppConfig::default()
        };
        assert!(save_config_to(&bad, &path).await.is_err());
    }
}
