//! Cache module for storing API query results to disk
//!
//! This module provides a cache manager that persists query results to the
//! filesystem as one JSON artifact per `CacheKey`. There is no expiry: an
//! entry is served until it is cleared or overwritten by a refresh. The
//! attribution table shares the cache directory and its atomic writer.

mod attributions;
mod key;
mod manager;

pub use attributions::Attributions;
pub use key::CacheKey;
pub use manager::{CacheEntryInfo, CacheManager, CacheStats, CachedData, StorageError};
