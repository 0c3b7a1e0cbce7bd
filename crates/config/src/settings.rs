// Application settings
// Loaded from ~/.config/shipaudit/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the history/weight store inside the data directory.
pub const STORE_FILE: &str = "shipaudit.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Storage
    #[serde(rename = "storage.dataDir", skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    // Audit
    #[serde(rename = "audit.defaultProvider")]
    pub default_provider: String,

    #[serde(rename = "audit.defaultPreset")]
    pub default_preset: Option<String>,

    #[serde(rename = "audit.recordHistory")]
    pub record_history: bool,

    // Logging
    #[serde(rename = "log.level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_provider: "Unknown".to_string(),
            default_preset: Some("standard".to_string()),
            record_history: true,
            log_level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shipaudit");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }
        Self::load_from(&path)
    }

    /// Load settings from `path`. Missing or malformed files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                        Self::default()
                    }
                }
            }
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Directory holding the audit store. Configured value wins over the
    /// platform data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("shipaudit")
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join(STORE_FILE)
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // Where audit history and weight data are kept.
    // Omit to use the platform data directory.
    // "storage.dataDir": "/var/lib/shipaudit",

    // Provider name recorded when --provider is not given
    "audit.defaultProvider": "Unknown",

    // Rate card used when neither --contract nor --preset is given
    // Built-in presets: "standard", "economy", "express"
    "audit.defaultPreset": "standard",

    // Record each run in the audit history
    "audit.recordHistory": true,

    // One of: "error", "warn", "info", "debug", "trace"
    "log.level": "warn"
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }
}
