//! Script documents: the script kept between sessions, save-file naming, and the
//! file helpers the settings module shares.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::SketchError;
use crate::paths::DOCUMENT_EXTENSION;

// ── File helpers ────────────────────────────────────────────────

/// Per-file mutex map to serialize concurrent writes to the same path.
static FILE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Write bytes to `path` through a fsynced `.tmp` sibling and a rename. The
/// previous file, if any, is kept as a `.bak` sibling.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), SketchError> {
    let lock = FILE_LOCKS
        .lock()
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    let _guard = lock.lock();

    let file_name = path.file_name().unwrap_or_default();

    let mut tmp_name = OsString::from(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(&tmp_name);

    let mut bak_name = OsString::from(file_name);
    bak_name.push(".bak");
    let bak_path = path.with_file_name(&bak_name);

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    // Best-effort backup.
    if path.exists() {
        let _ = fs::rename(path, &bak_path);
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SketchError> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SketchError> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

// ── Script store ────────────────────────────────────────────────

/// The script text kept between sessions. Stored verbatim, no envelope.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    path: PathBuf,
}

impl ScriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store at its usual place in the app config directory.
    pub fn in_config_dir(app_config_dir: &Path) -> Self {
        Self::new(crate::paths::script_store_path(app_config_dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored script, or None if nothing was saved yet.
    pub fn load(&self) -> Result<Option<String>, SketchError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, script: &str) -> Result<(), SketchError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&self.path, script.as_bytes())
    }
}

// ── Naming ──────────────────────────────────────────────────────

/// File name for a download: the name itself if it already carries `.ext`,
/// `name.ext` otherwise, and a timestamp when the name is empty.
pub fn save_file_name(name: &str, extension: &str, now: DateTime<Utc>) -> String {
    let suffix = format!(".{extension}");
    if name.is_empty() {
        format!("{}{suffix}", now.format("%Y-%m-%d-%H-%M-%S"))
    } else if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

/// Document name shown in the name field for an opened file.
pub fn document_name(file_name: &str) -> &str {
    file_name
        .strip_suffix(&format!(".{DOCUMENT_EXTENSION}"))
        .unwrap_or(file_name)
}

/// Script with a `reference` line for a freshly imported local image on top.
pub fn prepend_reference(script: &str, name: &str) -> String {
    format!("reference {name} 0 0\n{script}")
}
