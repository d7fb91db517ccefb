use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::document::{read_json, write_json};
use crate::error::SketchError;

const SETTINGS_VERSION: u32 = 1;

/// Settings stored in the OS config directory as `settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts-export", ts(export))]
pub struct SketchSettings {
    pub version: u32,
    /// Canvas size used to centre the origin on start.
    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,
    #[serde(default = "default_canvas_height")]
    pub canvas_height: u32,
    /// Per-request timeout for reference downloads.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// How long headless runs wait for references before giving up.
    #[serde(default = "default_settle_timeout")]
    pub settle_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Document most recently opened or saved.
    #[serde(default)]
    pub last_document: Option<PathBuf>,
}

fn default_canvas_width() -> u32 {
    800
}

fn default_canvas_height() -> u32 {
    600
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_settle_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("sketchline/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for SketchSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            fetch_timeout_secs: default_fetch_timeout(),
            settle_timeout_secs: default_settle_timeout(),
            user_agent: default_user_agent(),
            last_document: None,
        }
    }
}

/// Load settings from the app config directory. Returns None if no settings file exists.
pub fn load_settings(app_config_dir: &Path) -> Result<Option<SketchSettings>, SketchError> {
    let path = crate::paths::settings_path(app_config_dir);
    if !path.exists() {
        return Ok(None);
    }
    let settings = read_json::<SketchSettings>(&path)?;
    if settings.version > SETTINGS_VERSION {
        return Err(SketchError::Settings {
            message: format!(
                "settings version {} is newer than supported version {SETTINGS_VERSION}",
                settings.version
            ),
        });
    }
    Ok(Some(settings))
}

/// Load settings, falling back to defaults when the file is missing or unreadable.
pub fn load_or_default(app_config_dir: &Path) -> SketchSettings {
    match load_settings(app_config_dir) {
        Ok(Some(settings)) => settings,
        Ok(None) => SketchSettings::default(),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable settings");
            SketchSettings::default()
        }
    }
}

pub fn save_settings(app_config_dir: &Path, settings: &SketchSettings) -> Result<(), SketchError> {
    std::fs::create_dir_all(app_config_dir)?;
    write_json(&crate::paths::settings_path(app_config_dir), settings)
}

/// JSON Schema of the settings file.
pub fn settings_schema() -> serde_json::Value {
    let root = schemars::schema_for!(SketchSettings);
    serde_json::to_value(root).unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
}
