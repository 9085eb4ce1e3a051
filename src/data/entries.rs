//! Entry search (`POST /entries/query`)

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{EntriesResponse, Entry};
use crate::cache::CacheKey;
use crate::client::{NomadClient, QueryError};
use crate::error::Error;

/// Entries requested per page
const PAGE_SIZE: usize = 100;

/// Default cap on the number of entries collected by one query
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Serialize)]
struct EntriesQueryRequest<'a> {
    owner: &'static str,
    query: &'a Value,
    pagination: PaginationRequest<'a>,
}

#[derive(Debug, Serialize)]
struct PaginationRequest<'a> {
    page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_after_value: Option<&'a str>,
}

impl NomadClient {
    /// Runs an entry search, memoized under the query and limit
    ///
    /// `query` uses the API's search syntax, e.g.
    /// `{"entry_type": "HySprint_Sample"}` or `{"authors.name": "Jane Doe"}`.
    pub async fn query_entries(&self, query: &Value, max_entries: usize, refresh: bool) -> Result<Vec<Entry>, Error> {
        let key = entries_cache_key(query, max_entries);
        self.cached(&key, refresh, || self.fetch_entries(query, max_entries))
            .await
    }

    /// Entries of a given schema type, e.g. all samples of a lab
    pub async fn query_sample_entries(&self, entry_type: &str, max_entries: usize, refresh: bool) -> Result<Vec<Entry>, Error> {
        self.query_entries(&json!({ "entry_type": entry_type }), max_entries, refresh)
            .await
    }

    /// Collects up to `max_entries` matching entries, following pagination
    pub async fn fetch_entries(&self, query: &Value, max_entries: usize) -> Result<Vec<Entry>, QueryError> {
        let mut entries: Vec<Entry> = Vec::new();
        let mut page_after_value: Option<String> = None;

        while entries.len() < max_entries {
            let request = EntriesQueryRequest {
                owner: "visible",
                query,
                pagination: PaginationRequest {
                    page_size: (max_entries - entries.len()).min(PAGE_SIZE),
                    page_after_value: page_after_value.as_deref(),
                },
            };

            let response: EntriesResponse = self.post_json("entries/query", &request).await?;
            debug!(
                page = response.data.len(),
                collected = entries.len(),
                total = ?response.pagination.total,
                "entries page received"
            );

            let page_was_empty = response.data.is_empty();
            entries.extend(response.data);

            match response.pagination.next_page_after_value {
                Some(next) if !page_was_empty => page_after_value = Some(next),
                _ => break,
            }
        }

        entries.truncate(max_entries);
        Ok(entries)
    }
}

/// Cache key of an entry search
///
/// `serde_json` objects keep their keys sorted, so the rendered query is
/// canonical.
fn entries_cache_key(query: &Value, max_entries: usize) -> CacheKey {
    CacheKey::from_params(
        "entries",
        [
            ("query", query.to_string()),
            ("max_entries", max_entries.to_string()),
        ],
    )
}
