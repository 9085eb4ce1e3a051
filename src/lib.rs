//! NOMAD API client library
//!
//! An authenticated client for the NOMAD materials database API whose query
//! results are memoized on disk. The cache layer (`cache`) is usable on its
//! own; the client (`client`, `data`, `convenience`) consumes it through
//! `NomadClient::cached`.

pub mod auth;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod convenience;
pub mod data;
pub mod error;

pub use auth::{
    authenticate, get_token, get_token_from_env, oasis_url, verify_token, AuthError, EnvToken, PasswordAuth,
    StaticToken, Token, TokenProvider, OASIS_OPTIONS, TOKEN_ENV_VAR,
};
pub use cache::{Attributions, CacheEntryInfo, CacheKey, CacheManager, CacheStats, CachedData, StorageError};
pub use client::{NomadClient, QueryError};
pub use config::ClientConfig;
pub use convenience::get_client;
pub use data::entries::DEFAULT_MAX_ENTRIES;
pub use data::{Author, Entry, User};
pub use error::Error;
