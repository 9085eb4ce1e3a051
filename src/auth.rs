//! Token acquisition and verification for the NOMAD API
//!
//! Tokens come from one of three places: an explicit string, the
//! `NOMAD_CLIENT_ACCESS_TOKEN` environment variable, or the username and
//! password flow (`GET /auth/token`). A token can be checked against
//! `GET /users/me` before use.

use std::fmt;
use std::future::Future;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::data::User;

/// Environment variable read by `EnvToken` and `get_token_from_env`
pub const TOKEN_ENV_VAR: &str = "NOMAD_CLIENT_ACCESS_TOKEN";

/// Known NOMAD deployments and their API base URLs
pub const OASIS_OPTIONS: &[(&str, &str)] = &[
    ("central", "https://nomad-lab.eu/prod/v1/api/v1"),
    ("staging", "https://nomad-lab.eu/prod/v1/staging/api/v1"),
    ("test", "https://nomad-lab.eu/prod/v1/test/api/v1"),
    ("local", "http://localhost/nomad-oasis/api/v1"),
];

/// Looks up the base URL of a named deployment in `OASIS_OPTIONS`
pub fn oasis_url(name: &str) -> Option<&'static str> {
    OASIS_OPTIONS
        .iter()
        .find(|(option, _)| option.eq_ignore_ascii_case(name))
        .map(|(_, url)| *url)
}

/// Errors that can occur while acquiring or verifying a token
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token environment variable is unset
    #[error("Environment variable {0} is not set")]
    MissingEnv(String),

    /// A token source produced an empty string
    #[error("Token is empty")]
    EmptyToken,

    /// The server refused the credentials or token
    #[error("Authentication rejected by server (HTTP {0})")]
    Rejected(StatusCode),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// A bearer token for the NOMAD API
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wraps a token string, rejecting empty or whitespace-only input
    pub fn new(raw: impl Into<String>) -> Result<Self, AuthError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The raw token, for use in an `Authorization` header
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Supplies a token to the client
pub trait TokenProvider {
    /// Produces a token or fails with `AuthError`
    fn token(&self) -> impl Future<Output = Result<Token, AuthError>> + Send;
}

/// A token known up front
#[derive(Debug, Clone)]
pub struct StaticToken(pub Token);

impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<Token, AuthError> {
        Ok(self.0.clone())
    }
}

/// Reads the token from an environment variable
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    /// Reads from a custom variable instead of `TOKEN_ENV_VAR`
    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    fn read(&self) -> Result<Token, AuthError> {
        let raw = std::env::var(&self.var).map_err(|_| AuthError::MissingEnv(self.var.clone()))?;
        Token::new(raw)
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::with_var(TOKEN_ENV_VAR)
    }
}

impl TokenProvider for EnvToken {
    async fn token(&self) -> Result<Token, AuthError> {
        self.read()
    }
}

/// Username and password flow against `GET /auth/token`
#[derive(Clone)]
pub struct PasswordAuth {
    http_client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl PasswordAuth {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for PasswordAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordAuth")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl TokenProvider for PasswordAuth {
    async fn token(&self) -> Result<Token, AuthError> {
        request_token(&self.http_client, &self.base_url, &self.username, &self.password).await
    }
}

/// Response of `GET /auth/token`
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

async fn request_token(http_client: &Client, base_url: &str, username: &str, password: &str) -> Result<Token, AuthError> {
    let url = format!("{}/auth/token", base_url.trim_end_matches('/'));
    debug!(%url, username, "requesting access token");

    let response = http_client
        .get(&url)
        .query(&[("username", username), ("password", password)])
        .send()
        .await?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AuthError::Rejected(status));
    }

    let body = response.error_for_status()?.json::<TokenResponse>().await?;
    Token::new(body.access_token)
}

/// Obtains a token with the username and password flow
pub async fn authenticate(base_url: &str, username: &str, password: &str) -> Result<Token, AuthError> {
    request_token(&Client::new(), base_url, username, password).await
}

/// Obtains a token from any provider
pub async fn get_token<P: TokenProvider>(provider: &P) -> Result<Token, AuthError> {
    provider.token().await
}

/// Reads the token from `NOMAD_CLIENT_ACCESS_TOKEN`
pub fn get_token_from_env() -> Result<Token, AuthError> {
    EnvToken::default().read()
}

/// Checks a token against `GET /users/me`, returning the account it belongs to
pub async fn verify_token(base_url: &str, token: &Token) -> Result<User, AuthError> {
    let url = format!("{}/users/me", base_url.trim_end_matches('/'));

    let response = Client::new().get(&url).bearer_auth(token.secret()).send().await?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AuthError::Rejected(status));
    }

    let user = response.error_for_status()?.json::<User>().await?;
    debug!(user_id = %user.user_id, "token verified");
    Ok(user)
}
