//! Crate-level error type
//!
//! Cached queries can fail at three boundaries: acquiring a token, talking
//! to the API, or reading and writing the cache. Each keeps its own error
//! type; `Error` carries whichever one occurred.

use thiserror::Error;

use crate::auth::AuthError;
use crate::cache::StorageError;
use crate::client::QueryError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
