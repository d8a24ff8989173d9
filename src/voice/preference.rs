//! Persisted voice navigation preference
//!
//! A single boolean survives restarts so every screen can silently restore
//! whether voice commands were left on. Absent or unreadable means off.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{Error, Result};

/// Key the flag is stored under
pub const PREFERENCE_KEY: &str = "voiceNavigationEnabled";

/// File name inside the data directory
const PREFERENCE_FILE: &str = "voice_navigation.json";

/// Storage for the voice navigation flag
pub trait PreferenceStore: Send + Sync {
    /// Read the stored flag, `None` if never saved
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be read
    fn load(&self) -> Result<Option<bool>>;

    /// Persist the flag
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be written
    fn save(&self, enabled: bool) -> Result<()>;

    /// Forget the stored flag
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be written
    fn clear(&self) -> Result<()>;

    /// Stored flag, defaulting to disabled on absence or failure
    fn load_or_default(&self) -> bool {
        match self.load() {
            Ok(enabled) => {
                let enabled = enabled.unwrap_or(false);
                tracing::debug!(enabled, "voice navigation preference loaded");
                enabled
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load voice navigation preference");
                false
            }
        }
    }
}

/// JSON file store under the data directory
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    /// Store at `<data_dir>/voice_navigation.json`
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(PREFERENCE_FILE),
        }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, serde_json::Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<bool>> {
        let map = self.read_map()?;
        match map.get(PREFERENCE_KEY) {
            None => Ok(None),
            Some(serde_json::Value::Bool(enabled)) => Ok(Some(*enabled)),
            Some(other) => Err(Error::Preference(format!(
                "{PREFERENCE_KEY} is not a boolean: {other}"
            ))),
        }
    }

    fn save(&self, enabled: bool) -> Result<()> {
        let mut map = self.read_map().unwrap_or_default();
        map.insert(PREFERENCE_KEY.to_string(), serde_json::Value::Bool(enabled));
        self.write_map(&map)?;
        tracing::debug!(enabled, path = %self.path.display(), "voice navigation preference saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut map = self.read_map().unwrap_or_default();
        if map.remove(PREFERENCE_KEY).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// In-process store, for hosts that persist elsewhere
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    value: Mutex<Option<bool>>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<bool>> {
        Ok(*self.value.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn save(&self, enabled: bool) -> Result<()> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(enabled);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
