//! Convenience queries built on entry search
//!
//! Batches and samples are told apart by their schema type (for example
//! `HySprint_Batch` and `HySprint_Sample`), and tied together by their ELN
//! lab ids: a sample's lab id is its batch id followed by `_` and a suffix.
//! All of these go through `query_entries`, so they share its cache entries
//! and honor the same `refresh` flag.

use std::collections::BTreeSet;

use serde_json::json;

use crate::auth::{get_token, TokenProvider};
use crate::cache::Attributions;
use crate::client::NomadClient;
use crate::config::ClientConfig;
use crate::data::entries::DEFAULT_MAX_ENTRIES;
use crate::error::Error;

/// Builds a client and authenticates it with `provider`
pub async fn get_client<P: TokenProvider>(config: &ClientConfig, provider: &P) -> Result<NomadClient, Error> {
    let token = get_token(provider).await?;
    Ok(NomadClient::new(config)?.with_token(token))
}

impl NomadClient {
    /// Distinct lab ids of all batch entries, sorted
    pub async fn get_batch_ids(&self, batch_entry_type: &str, refresh: bool) -> Result<Vec<String>, Error> {
        let batches = self
            .query_sample_entries(batch_entry_type, DEFAULT_MAX_ENTRIES, refresh)
            .await?;

        let ids: BTreeSet<String> = batches.iter().flat_map(|entry| entry.lab_ids()).collect();
        Ok(ids.into_iter().collect())
    }

    /// Lab ids of the samples belonging to any of `batch_ids`, sorted
    pub async fn get_ids_in_batch<S: AsRef<str>>(
        &self,
        batch_ids: &[S],
        sample_entry_type: &str,
        refresh: bool,
    ) -> Result<Vec<String>, Error> {
        if batch_ids.is_empty() {
            return Ok(Vec::new());
        }

        let samples = self
            .query_sample_entries(sample_entry_type, DEFAULT_MAX_ENTRIES, refresh)
            .await?;

        let ids: BTreeSet<String> = samples
            .iter()
            .flat_map(|entry| entry.lab_ids())
            .filter(|lab_id| batch_ids.iter().any(|batch| belongs_to_batch(lab_id, batch.as_ref())))
            .collect();
        Ok(ids.into_iter().collect())
    }

    /// Distinct upload ids of entries authored by `author`, sorted
    pub async fn get_uploads_by_author(&self, author: &str, refresh: bool) -> Result<Vec<String>, Error> {
        let entries = self
            .query_entries(&json!({ "authors.name": author }), DEFAULT_MAX_ENTRIES, refresh)
            .await?;

        let uploads: BTreeSet<String> = entries.into_iter().filter_map(|entry| entry.upload_id).collect();
        Ok(uploads.into_iter().collect())
    }

    /// Every sample lab id mapped to the names of its entry's authors
    ///
    /// The result has the shape of the attribution table and can be stored
    /// with `CacheManager::save_attributions`.
    pub async fn get_all_samples_with_authors(&self, sample_entry_type: &str, refresh: bool) -> Result<Attributions, Error> {
        let samples = self
            .query_sample_entries(sample_entry_type, DEFAULT_MAX_ENTRIES, refresh)
            .await?;

        let mut attributions = Attributions::new();
        for entry in &samples {
            let authors = entry.author_names();
            for lab_id in entry.lab_ids() {
                let names = attributions.entry(lab_id).or_default();
                for author in &authors {
                    if !names.contains(author) {
                        names.push(author.clone());
                    }
                }
            }
        }
        Ok(attributions)
    }
}

/// Whether `lab_id` names a sample of `batch_id`
fn belongs_to_batch(lab_id: &str, batch_id: &str) -> bool {
    lab_id
        .strip_prefix(batch_id)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('_'))
}
