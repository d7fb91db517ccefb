//! Path definitions for persisted files. Other modules should not hard-code
//! these names.

use std::path::{Path, PathBuf};

// ── Application identity ─────────────────────────────────────────

pub const APP_ID: &str = "dev.sketchline.app";

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "settings.json";
/// Script text kept between sessions.
pub const SCRIPT_FILE: &str = "script.thtm";
/// Extension of saved sketch documents.
pub const DOCUMENT_EXTENSION: &str = "thtm";

// ── Config-dir functions ─────────────────────────────────────────

pub fn settings_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(SETTINGS_FILE)
}

pub fn script_store_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(SCRIPT_FILE)
}

/// `<OS config dir>/<APP_ID>`.
pub fn app_config_dir() -> PathBuf {
    let base = if cfg!(target_os = "windows") {
        std::env::var("APPDATA")
            .map_or_else(|_| PathBuf::from("C:\\Users\\Default\\AppData\\Roaming"), PathBuf::from)
    } else if cfg!(target_os = "macos") {
        home_dir().join("Library/Application Support")
    } else {
        std::env::var("XDG_CONFIG_HOME").map_or_else(|_| home_dir().join(".config"), PathBuf::from)
    };
    base.join(APP_ID)
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_or_else(|_| PathBuf::from("."), PathBuf::from)
}
