//! Per-document tracker configuration.
//!
//! Stored as camelCase JSON under `config_<token>_<docId>`. A stored value
//! that no longer parses is treated like a missing one: the tracker keeps
//! working with defaults and logs a warning.

use notehub_protocol::SettingsPatch;
use serde::{Deserialize, Serialize};

use crate::block::DEFAULT_TIMEZONE;
use crate::error::{Result, TrackerError};
use crate::placement::PlacementMode;
use crate::store::{config_key, StateStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    #[serde(default)]
    pub stats_top: bool,
    #[serde(default = "default_stats_bottom")]
    pub stats_bottom: bool,
    /// Expand `⏳` placeholders anywhere in the body.
    #[serde(default)]
    pub stats_anywhere: bool,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            stats_top: false,
            stats_bottom: default_stats_bottom(),
            stats_anywhere: false,
            timezone: default_timezone(),
        }
    }
}

fn default_stats_bottom() -> bool {
    true
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl TrackerConfig {
    /// Overlays the settings a request supplied. Absent fields are kept.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(top) = patch.stats_top {
            self.stats_top = top;
        }
        if let Some(bottom) = patch.stats_bottom {
            self.stats_bottom = bottom;
        }
        if let Some(anywhere) = patch.stats_anywhere {
            self.stats_anywhere = anywhere;
        }
        if let Some(timezone) = patch.timezone.as_deref().filter(|tz| !tz.is_empty()) {
            self.timezone = timezone.to_string();
        }
    }

    /// Fresh configuration for a newly registered document: `defaults`
    /// overlaid with whatever the registration supplied.
    pub fn registered(patch: &SettingsPatch, defaults: &TrackerConfig) -> Self {
        let mut config = defaults.clone();
        config.apply(patch);
        config
    }

    pub fn placement(&self) -> PlacementMode {
        PlacementMode::from_flags(self.stats_top, self.stats_bottom)
    }

    /// True when nothing would be rendered anywhere.
    pub fn all_disabled(&self) -> bool {
        !self.stats_top && !self.stats_bottom && !self.stats_anywhere
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|source| TrackerError::Json {
            context: "serialize tracker config".to_string(),
            source,
        })
    }
}

/// Loads the stored configuration, or `defaults` when none is stored.
pub fn load_config<S: StateStore + ?Sized>(
    store: &S,
    token: &str,
    doc_id: &str,
    defaults: &TrackerConfig,
) -> Result<TrackerConfig> {
    let raw = match store.get(&config_key(token, doc_id))? {
        Some(raw) => raw,
        None => {
            tracing::debug!(doc_id = %doc_id, "No stored tracker config; using defaults");
            return Ok(defaults.clone());
        }
    };

    match serde_json::from_str::<TrackerConfig>(&raw) {
        Ok(config) => Ok(config),
        Err(err) => {
            tracing::warn!(
                doc_id = %doc_id,
                error = %err,
                "Stored tracker config is malformed; using defaults"
            );
            Ok(defaults.clone())
        }
    }
}

pub fn save_config<S: StateStore + ?Sized>(
    store: &mut S,
    token: &str,
    doc_id: &str,
    config: &TrackerConfig,
) -> Result<()> {
    let raw = serde_json::to_string(config).map_err(|source| TrackerError::Json {
        context: format!("serialize config for {}", doc_id),
        source,
    })?;
    store.set(&config_key(token, doc_id), &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert!(!config.stats_top);
        assert!(config.stats_bottom);
        assert!(!config.stats_anywhere);
        assert_eq!(config.timezone, "UTC");
    }

    #[test]
    fn test_apply_only_touches_supplied_fields() {
        let mut config = TrackerConfig::default();
        config.apply(&SettingsPatch {
            stats_top: Some(true),
            timezone: Some(String::new()),
            ..SettingsPatch::default()
        });
        assert!(config.stats_top);
        assert!(config.stats_bottom);
        assert_eq!(config.timezone, "UTC");
    }

    #[test]
    fn test_round_trip_through_store_uses_camel_case() {
        let mut store = MemoryStore::new();
        let config = TrackerConfig {
            stats_top: true,
            stats_bottom: false,
            stats_anywhere: true,
            timezone: "Europe/Paris".to_string(),
        };
        save_config(&mut store, "tok", "doc", &config).unwrap();

        let raw = store.get("config_tok_doc").unwrap().unwrap();
        assert!(raw.contains("\"statsTop\":true"));
        let loaded = load_config(&store, "tok", "doc", &TrackerConfig::default()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_stored_json_fills_defaults() {
        let mut store = MemoryStore::new();
        store.set("config_tok_doc", r#"{"statsTop":true}"#).unwrap();
        let loaded = load_config(&store, "tok", "doc", &TrackerConfig::default()).unwrap();
        assert!(loaded.stats_top);
        assert!(loaded.stats_bottom);
    }

    #[test]
    fn test_malformed_stored_json_falls_back() {
        let mut store = MemoryStore::new();
        store.set("config_tok_doc", "{oops").unwrap();
        let loaded = load_config(&store, "tok", "doc", &TrackerConfig::default()).unwrap();
        assert_eq!(loaded, TrackerConfig::default());
    }
}
