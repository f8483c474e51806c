//! Runtime configuration for notehub-daemon, read from TOML.

use serde::Deserialize;
use std::path::PathBuf;

use tracker_core::TrackerConfig;

const DEFAULT_CONFIG_RELATIVE_PATH: &str = ".notehub/daemon/config.toml";
const DEFAULT_DB_RELATIVE_PATH: &str = ".notehub/daemon/state.db";
const CONFIG_PATH_ENV: &str = "NOTEHUB_DAEMON_CONFIG";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct DaemonConfig {
    #[serde(default)]
    pub tracker: TrackerDefaults,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Tracker settings for documents that never stored their own.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TrackerDefaults {
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default)]
    pub default_stats_top: bool,
    #[serde(default = "default_stats_bottom")]
    pub default_stats_bottom: bool,
}

impl Default for TrackerDefaults {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            default_stats_top: false,
            default_stats_bottom: default_stats_bottom(),
        }
    }
}

impl TrackerDefaults {
    pub fn to_tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            stats_top: self.default_stats_top,
            stats_bottom: self.default_stats_bottom,
            stats_anywhere: false,
            timezone: self.default_timezone.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct StorageConfig {
    /// Overrides `~/.notehub/daemon/state.db`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_stats_bottom() -> bool {
    true
}

pub fn default_config_path() -> Result<PathBuf, String> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let home = dirs::home_dir().ok_or_else(|| "Home directory not found".to_string())?;
    Ok(home.join(DEFAULT_CONFIG_RELATIVE_PATH))
}

pub fn default_db_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "Home directory not found".to_string())?;
    Ok(home.join(DEFAULT_DB_RELATIVE_PATH))
}

pub fn load_runtime_config(path: Option<PathBuf>) -> Result<DaemonConfig, String> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };

    if !config_path.exists() {
        return Ok(DaemonConfig::default());
    }

    let content = fs_err::read_to_string(&config_path).map_err(|err| {
        format!(
            "Failed to read daemon config {}: {}",
            config_path.display(),
            err
        )
    })?;
    toml::from_str::<DaemonConfig>(&content).map_err(|err| {
        format!(
            "Failed to parse daemon config {}: {}",
            config_path.display(),
            err
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_runtime_config_defaults_when_file_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("missing.toml");

        let config = load_runtime_config(Some(path)).expect("load config");
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.tracker.to_tracker_config(), TrackerConfig::default());
    }

    #[test]
    fn load_runtime_config_parses_tracker_and_storage() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
[tracker]
default_timezone = "America/New_York"
default_stats_top = true

[storage]
db_path = "/tmp/notehub/state.db"
"#,
        )
        .expect("write config");

        let config = load_runtime_config(Some(path)).expect("load config");
        assert_eq!(config.tracker.default_timezone, "America/New_York");
        assert!(config.tracker.default_stats_top);
        assert!(config.tracker.default_stats_bottom);
        assert_eq!(
            config.storage.db_path,
            Some(PathBuf::from("/tmp/notehub/state.db"))
        );
    }

    #[test]
    fn load_runtime_config_rejects_malformed_toml() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[tracker\ndefault_stats_top = ").expect("write config");

        let err = load_runtime_config(Some(path)).unwrap_err();
        assert!(err.contains("Failed to parse daemon config"));
    }
}
