//! Cache manager for persisting API query results to disk
//!
//! Provides a `CacheManager` that stores serializable query results as JSON
//! files, one file per `CacheKey`. Writes go through a temporary file in the
//! cache directory followed by a rename, so a reader (in this or another
//! process) sees either the previous entry or the new one, never a partial
//! file. Entries never expire; they live until explicitly cleared.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::key::{CacheKey, DIGEST_PREFIX_LEN};

/// Extension of cache entry files
const ENTRY_EXTENSION: &str = "json";

/// Prefix of in-flight temporary files created by atomic writes
const TEMP_PREFIX: &str = ".tmp-";

/// Mode of persisted cache files, readable by every user sharing the directory
#[cfg(unix)]
const ENTRY_MODE: u32 = 0o644;

/// Errors raised by filesystem-level cache operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// No default cache location exists on this platform (e.g. no home directory)
    #[error("Could not determine a cache directory for this platform")]
    NoCacheDir,

    /// A filesystem call failed
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The value could not be serialized for storage
    #[error("Failed to serialize cache entry for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// An artifact exists but cannot be decoded
    #[error("Corrupt cache entry at {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// On-disk envelope wrapping a cached value
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The raw key this entry was stored under
    key: String,
    /// When the data was cached
    cached_at: DateTime<Utc>,
    /// The cached data
    data: T,
}

/// Result of a cache hit
#[derive(Debug)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// The raw key the entry was stored under
    pub key: String,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
}

/// Aggregate metadata over all cache entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of entries in the cache directory
    pub entry_count: usize,
    /// Sum of entry file sizes in bytes
    pub total_size_bytes: u64,
    /// Modification time of the oldest entry
    pub oldest_entry: Option<DateTime<Utc>>,
    /// Modification time of the newest entry
    pub newest_entry: Option<DateTime<Utc>>,
}

/// Listing information for a single entry
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    /// Raw key read from the envelope, `None` if the file could not be decoded
    pub key: Option<String>,
    /// Location of the artifact
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
}

/// Manages reading and writing cached query results on disk
///
/// The cache directory is an explicit value: `with_dir` for a caller-chosen
/// location (tests use a temporary directory), `new` for the XDG-compliant
/// default (`~/.cache/nomad-api/` on Linux). The directory is created lazily
/// on the first write.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager using the XDG-compliant cache directory
    ///
    /// Returns `StorageError::NoCacheDir` if the platform has no cache
    /// location (e.g., no home directory).
    pub fn new() -> Result<Self, StorageError> {
        let project_dirs = ProjectDirs::from("", "", "nomad-api").ok_or(StorageError::NoCacheDir)?;
        Ok(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory holding the cache artifacts
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Ensures the cache directory exists and is writable
    ///
    /// Writability is checked by creating and removing a temporary file, so
    /// ownership and ACLs count, not just permission bits. Idempotent:
    /// calling it on an existing directory leaves its contents unchanged.
    pub fn ensure_cache_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| StorageError::io(&self.cache_dir, e))?;

        let check = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.cache_dir)
            .map_err(|e| StorageError::io(&self.cache_dir, e))?;
        check.close().map_err(|e| StorageError::io(&self.cache_dir, e))?;
        Ok(())
    }

    /// Returns the path of the artifact for `key`
    ///
    /// Pure: does not touch the filesystem.
    pub fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", key.file_stem(), ENTRY_EXTENSION))
    }

    /// Stores `data` under `key`, replacing any existing entry
    ///
    /// # Arguments
    /// * `key` - Identity of the cached query
    /// * `data` - The value to cache
    ///
    /// # Returns
    /// * `Ok(PathBuf)` with the artifact location
    /// * `Err(StorageError::Serialize)` if `data` has no JSON form that
    ///   decodes back into a `T` (e.g. a NaN float, written as `null`)
    /// * `Err(StorageError)` if the directory cannot be created or the write fails
    pub fn save<T>(&self, key: &CacheKey, data: &T) -> Result<PathBuf, StorageError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.ensure_cache_dir()?;

        let entry = CacheEntry {
            key: key.as_str().to_string(),
            cached_at: Utc::now(),
            data,
        };

        let json = serde_json::to_string_pretty(&entry).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        // Whatever is written must load back as the same type
        serde_json::from_str::<CacheEntry<T>>(&json).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;

        let path = self.cache_path(key);
        write_atomic(&self.cache_dir, &path, json.as_bytes())?;
        debug!(key = %key, path = %path.display(), bytes = json.len(), "cache entry saved");
        Ok(path)
    }

    /// Reads the entry stored under `key`
    ///
    /// # Returns
    /// * `Ok(Some(CachedData<T>))` on a hit
    /// * `Ok(None)` on a miss: no artifact, or the artifact belongs to a
    ///   different key whose file name collides with this one
    /// * `Err(StorageError)` if the artifact exists but cannot be read or
    ///   decoded as `T`
    pub fn load<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<CachedData<T>>, StorageError> {
        let path = self.cache_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(key = %key, "cache miss");
                return Ok(None);
            }
            Err(e) => return Err(StorageError::io(&path, e)),
        };

        let entry: CacheEntry<T> =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt { path: path.clone(), source })?;

        if entry.key != key.as_str() {
            warn!(
                key = %key,
                stored_key = %entry.key,
                path = %path.display(),
                "cache file name collision, treating as miss"
            );
            return Ok(None);
        }

        debug!(key = %key, "cache hit");
        Ok(Some(CachedData {
            data: entry.data,
            key: entry.key,
            cached_at: entry.cached_at,
        }))
    }

    /// Removes the entry for `key`, or every entry when `key` is `None`
    ///
    /// Clearing an absent key, or a cache whose directory does not exist,
    /// is a no-op. A full clear also sweeps temporary files left behind by
    /// interrupted writes. The directory itself and non-entry files in it
    /// are kept.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn clear(&self, key: Option<&CacheKey>) -> Result<usize, StorageError> {
        if let Some(key) = key {
            let path = self.cache_path(key);
            let removed = remove_if_present(&path)?;
            if removed {
                info!(key = %key, "cache entry cleared");
            }
            return Ok(usize::from(removed));
        }

        let mut removed = 0;
        for path in self.dir_files()? {
            if is_entry_file(&path) {
                if remove_if_present(&path)? {
                    removed += 1;
                }
            } else if is_temp_file(&path) {
                remove_if_present(&path)?;
            }
        }
        info!(removed, dir = %self.cache_dir.display(), "cache cleared");
        Ok(removed)
    }

    /// Computes aggregate statistics over all entries
    ///
    /// Read-only. A cache directory that does not exist yet reports zero entries.
    pub fn stats(&self) -> Result<CacheStats, StorageError> {
        let mut stats = CacheStats::default();

        for (_, size_bytes, modified) in self.entry_files()? {
            stats.entry_count += 1;
            stats.total_size_bytes += size_bytes;
            stats.oldest_entry = Some(stats.oldest_entry.map_or(modified, |t| t.min(modified)));
            stats.newest_entry = Some(stats.newest_entry.map_or(modified, |t| t.max(modified)));
        }

        Ok(stats)
    }

    /// Lists all entries, oldest first
    ///
    /// An entry whose contents cannot be decoded is listed with `key: None`.
    /// Failing to read an entry file is an error.
    pub fn entries(&self) -> Result<Vec<CacheEntryInfo>, StorageError> {
        let mut entries = Vec::new();

        for (path, size_bytes, modified) in self.entry_files()? {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                // Removed between listing and read
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(&path, e)),
            };
            let key = serde_json::from_slice::<CacheEntry<IgnoredAny>>(&bytes)
                .ok()
                .map(|entry| entry.key);
            entries.push(CacheEntryInfo {
                key,
                path,
                size_bytes,
                modified,
            });
        }

        entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
        Ok(entries)
    }

    /// Entry files with their size and modification time
    fn entry_files(&self) -> Result<Vec<(PathBuf, u64, DateTime<Utc>)>, StorageError> {
        let mut files = Vec::new();

        for path in self.dir_files()? {
            if !is_entry_file(&path) {
                continue;
            }
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                // Removed between listing and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(&path, e)),
            };
            let modified = metadata.modified().map_err(|e| StorageError::io(&path, e))?;
            files.push((path, metadata.len(), DateTime::<Utc>::from(modified)));
        }

        Ok(files)
    }

    /// Paths of the regular files directly inside the cache directory
    fn dir_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let read_dir = match fs::read_dir(&self.cache_dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.cache_dir, e)),
        };

        let mut paths = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| StorageError::io(&self.cache_dir, e))?;
            let file_type = entry.file_type().map_err(|e| StorageError::io(&entry.path(), e))?;
            if file_type.is_file() {
                paths.push(entry.path());
            }
        }
        Ok(paths)
    }
}

/// Writes `contents` to `path` via a temporary file in `dir` and a rename
///
/// `dir` must be on the same filesystem as `path` for the rename to be atomic.
/// On Unix the file is given `ENTRY_MODE` rather than the temp file's 0600.
pub(crate) fn write_atomic(dir: &Path, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| StorageError::io(dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(ENTRY_MODE);
        tmp.as_file().set_permissions(perms).map_err(|e| StorageError::io(tmp.path(), e))?;
    }

    tmp.write_all(contents).map_err(|e| StorageError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| StorageError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}

/// Removes a file, reporting whether it existed
fn remove_if_present(path: &Path) -> Result<bool, StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// Whether `path` names a cache entry: `<slug>-<16 hex digits>.json`
fn is_entry_file(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
        return false;
    }
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    if stem.starts_with('.') {
        return false;
    }
    match stem.rsplit_once('-') {
        Some((slug, digest)) => {
            !slug.is_empty() && digest.len() == DIGEST_PREFIX_LEN && digest.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(TEMP_PREFIX))
}
