//! Client configuration
//!
//! Everything that used to be process-wide state (API location, cache
//! directory) is an explicit value handed to `NomadClient::new`.

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{oasis_url, OASIS_OPTIONS};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for building a `NomadClient`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://nomad-lab.eu/prod/v1/api/v1`
    pub base_url: String,
    /// Cache directory; `None` selects the platform default
    pub cache_dir: Option<PathBuf>,
    /// Whether query results are memoized on disk
    pub use_cache: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Configuration for a custom base URL with default settings
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Configuration for a deployment named in `OASIS_OPTIONS`
    pub fn for_oasis(name: &str) -> Option<Self> {
        oasis_url(name).map(Self::with_base_url)
    }

    /// Sets the cache directory
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Disables the on-disk cache
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: OASIS_OPTIONS[0].1.to_string(),
            cache_dir: None,
            use_cache: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
