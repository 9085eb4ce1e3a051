//! Persisted author attributions
//!
//! A small table mapping an identifier (sample lab id, upload id) to the
//! names of the people credited for it. It lives next to the cache entries
//! as `attributions.json`, is written atomically like them, but is not a
//! cache entry: `clear` and `stats` ignore it.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use super::manager::{write_atomic, CacheManager, StorageError};

/// File name of the attribution table inside the cache directory
const ATTRIBUTIONS_FILE: &str = "attributions.json";

/// Identifier to credited author names
pub type Attributions = BTreeMap<String, Vec<String>>;

impl CacheManager {
    /// Location of the attribution table
    pub fn attributions_path(&self) -> PathBuf {
        self.cache_dir().join(ATTRIBUTIONS_FILE)
    }

    /// Loads the attribution table, empty if none has been saved yet
    pub fn load_attributions(&self) -> Result<Attributions, StorageError> {
        let path = self.attributions_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Attributions::new()),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt { path, source })
    }

    /// Replaces the attribution table
    pub fn save_attributions(&self, attributions: &Attributions) -> Result<(), StorageError> {
        self.ensure_cache_dir()?;

        let json = serde_json::to_string_pretty(attributions).map_err(|source| StorageError::Serialize {
            key: ATTRIBUTIONS_FILE.to_string(),
            source,
        })?;

        let path = self.attributions_path();
        write_atomic(self.cache_dir(), &path, json.as_bytes())?;
        debug!(count = attributions.len(), path = %path.display(), "attributions saved");
        Ok(())
    }
}
