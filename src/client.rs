//! HTTP client for the NOMAD API
//!
//! `NomadClient` sends authenticated JSON requests and wraps them in
//! cache-aside memoization: `cached` answers from the `CacheManager` when it
//! can and otherwise runs the remote call and stores its result. Requests are
//! issued one at a time and never retried.

use std::future::Future;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::Token;
use crate::cache::{CacheKey, CacheManager};
use crate::config::ClientConfig;
use crate::error::Error;

/// Longest response body excerpt kept in a `QueryError::Status`
const ERROR_BODY_LIMIT: usize = 512;

/// Errors that can occur when querying the API
#[derive(Debug, Error)]
pub enum QueryError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned {status} for {url}: {body}")]
    Status { status: StatusCode, url: String, body: String },

    /// Failed to parse API response
    #[error("Failed to parse API response from {url}: {message}")]
    ParseError { url: String, message: String },
}

/// Client for the NOMAD REST API with an optional on-disk result cache
#[derive(Debug, Clone)]
pub struct NomadClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Base URL of the API, without trailing slash
    base_url: String,
    /// Bearer token sent with every request, if any
    token: Option<Token>,
    /// Cache manager for persisting responses
    cache_manager: Option<CacheManager>,
}

impl NomadClient {
    /// Creates an unauthenticated client from a configuration
    ///
    /// With `use_cache` set and no explicit `cache_dir`, the platform cache
    /// directory is used; failing to determine it is an error rather than a
    /// silently disabled cache.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(QueryError::from)?;

        let cache_manager = if config.use_cache {
            Some(match &config.cache_dir {
                Some(dir) => CacheManager::with_dir(dir.clone()),
                None => CacheManager::new()?,
            })
        } else {
            None
        };

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
            cache_manager,
        })
    }

    /// Attaches a bearer token to all subsequent requests
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Replaces the cache manager
    pub fn with_cache(mut self, cache_manager: CacheManager) -> Self {
        self.cache_manager = Some(cache_manager);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The cache backing this client, if caching is enabled
    pub fn cache(&self) -> Option<&CacheManager> {
        self.cache_manager.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Returns the value cached under `key`, or runs `fetch` and caches its result
    ///
    /// # Arguments
    /// * `key` - Identity of the query
    /// * `refresh` - Skip the lookup and overwrite whatever is cached
    /// * `fetch` - The remote call, run only on a miss or refresh
    ///
    /// # Behavior
    /// - A corrupt cache entry is reported as `Error::Storage`, not refetched
    /// - A failed fetch is returned as is and nothing is written
    /// - A failed write after a successful fetch is reported as `Error::Storage`
    pub async fn cached<T, F, Fut>(&self, key: &CacheKey, refresh: bool, fetch: F) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        if let Some(ref cache_manager) = self.cache_manager {
            if !refresh {
                if let Some(cached) = cache_manager.load::<T>(key)? {
                    return Ok(cached.data);
                }
            }
        }

        let data = fetch().await?;

        if let Some(ref cache_manager) = self.cache_manager {
            cache_manager.save(key, &data)?;
        }
        Ok(data)
    }

    /// Sends `GET <base>/<path>` and decodes the JSON response
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, QueryError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let mut request = self.http_client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(request, url).await
    }

    /// Sends `POST <base>/<path>` with a JSON body and decodes the JSON response
    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, QueryError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, "POST");
        let request = self.http_client.post(&url).json(body);
        self.send(request, url).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, url: String) -> Result<T, QueryError> {
        let request = match self.token {
            Some(ref token) => request.bearer_auth(token.secret()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(QueryError::Status { status, url, body });
        }

        serde_json::from_str(&text).map_err(|e| QueryError::ParseError {
            url,
            message: e.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
