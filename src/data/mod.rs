//! Record types returned by the NOMAD API
//!
//! Only the fields the client reads are typed; everything else an entry
//! carries is kept as raw JSON so that cached records lose nothing.

pub mod entries;
pub mod users;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A NOMAD user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier of the account
    pub user_id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Login name
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
}

/// An author as listed on an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A single archive entry from `POST /entries/query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier of the entry
    pub entry_id: String,
    /// Upload the entry belongs to
    #[serde(default)]
    pub upload_id: Option<String>,
    /// Schema section name of the entry's data (e.g. a sample or batch class)
    #[serde(default)]
    pub entry_type: Option<String>,
    #[serde(default)]
    pub entry_name: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    /// Normalized results section, kept untyped
    #[serde(default)]
    pub results: Option<Value>,
}

impl Entry {
    /// Electronic lab notebook ids (`results.eln.lab_ids`) of this entry
    pub fn lab_ids(&self) -> Vec<String> {
        self.results
            .as_ref()
            .and_then(|results| results.pointer("/eln/lab_ids"))
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Names of the entry's authors, skipping anonymous ones
    pub fn author_names(&self) -> Vec<String> {
        self.authors.iter().filter_map(|author| author.name.clone()).collect()
    }
}

/// Pagination block of a paged response
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PaginationResponse {
    #[serde(default)]
    pub next_page_after_value: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Envelope of `POST /entries/query`
#[derive(Debug, Deserialize)]
pub(crate) struct EntriesResponse {
    #[serde(default)]
    pub data: Vec<Entry>,
    #[serde(default)]
    pub pagination: PaginationResponse,
}

/// Envelope of `GET /users`
#[derive(Debug, Deserialize)]
pub(crate) struct UsersResponse {
    #[serde(default)]
    pub data: Vec<User>,
}
