//! Persistent resume store.
//!
//! Maps a source fingerprint to the upload URL and the last offset the
//! server acknowledged, so an interrupted upload can continue where it
//! stopped after a restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors from resume store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty fingerprint")]
    EmptyFingerprint,
}

/// Where an upload stands on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeEntry {
    pub url: String,
    pub offset: i64,
    pub updated_at: DateTime<Utc>,
}

impl ResumeEntry {
    pub fn new(url: impl Into<String>, offset: i64) -> Self {
        Self {
            url: url.into(),
            offset,
            updated_at: Utc::now(),
        }
    }
}

/// Resume entries cached in memory and persisted to a JSON file.
pub struct ResumeStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, ResumeEntry>>,
}

impl ResumeStore {
    /// Opens the store at `path`, loading existing entries from disk.
    pub fn new(path: PathBuf) -> Result<Self, StoreError> {
        let entries = load_entries(&path)?;
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Returns the entry for `fingerprint`, if any.
    pub fn get(&self, fingerprint: &str) -> Option<ResumeEntry> {
        self.entries.read().unwrap().get(fingerprint).cloned()
    }

    /// Records `entry` for `fingerprint` and persists the store.
    pub fn save(&self, fingerprint: &str, entry: ResumeEntry) -> Result<(), StoreError> {
        if fingerprint.is_empty() {
            return Err(StoreError::EmptyFingerprint);
        }
        {
            let mut map = self.entries.write().unwrap();
            map.insert(fingerprint.to_string(), entry);
        }
        self.persist()
    }

    /// Removes the entry for `fingerprint`.
    pub fn remove(&self, fingerprint: &str) -> Result<(), StoreError> {
        let removed = self.entries.write().unwrap().remove(fingerprint).is_some();
        if removed {
            self.persist()?;
        }
        Ok(())
    }

    /// Returns all stored fingerprints.
    pub fn fingerprints(&self) -> Vec<String> {
        self.entries.read().unwrap().keys().cloned().collect()
    }

    /// Drops entries not updated within `max_age`, returning how many
    /// were removed.
    ///
    /// Servers expire unfinished uploads, so very old entries usually
    /// point at resources that no longer exist.
    pub fn prune_older_than(&self, max_age: Duration) -> Result<usize, StoreError> {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let removed = {
            let mut map = self.entries.write().unwrap();
            let before = map.len();
            map.retain(|_, entry| entry.updated_at >= cutoff);
            before - map.len()
        };
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Writes the current entries to disk.
    fn persist(&self) -> Result<(), StoreError> {
        let map = self.entries.read().unwrap();
        let json = serde_json::to_string_pretty(&*map)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        debug!("persisted {} resume entr(ies) to {:?}", map.len(), self.path);
        Ok(())
    }
}

/// Loads entries from a JSON file on disk.
fn load_entries(path: &Path) -> Result<HashMap<String, ResumeEntry>, StoreError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let data = std::fs::read_to_string(path)?;
    let entries: HashMap<String, ResumeEntry> = serde_json::from_str(&data)?;
    debug!("loaded {} resume entr(ies) from {:?}", entries.len(), path);
    Ok(entries)
}

/// Returns the default resume store path.
pub fn default_store_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("tuskit").join("uploads.json"))
}

/// Returns the platform-specific config directory.
fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".config"))
    }
}
