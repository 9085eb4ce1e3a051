//! User lookup (`GET /users`)

use super::{User, UsersResponse};
use crate::cache::CacheKey;
use crate::client::{NomadClient, QueryError};
use crate::error::Error;

impl NomadClient {
    /// Looks up a user by id, `None` if the API knows no such user
    pub async fn get_user_details(&self, user_id: &str, refresh: bool) -> Result<Option<User>, Error> {
        let key = CacheKey::from_params("users", [("user_id", user_id)]);
        self.cached(&key, refresh, || async {
            let response: UsersResponse = self.get_json("users", &[("user_id", user_id)]).await?;
            Ok::<_, QueryError>(response.data.into_iter().find(|user| user.user_id == user_id))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::CacheKey;
    use crate::client::NomadClient;
    use crate::config::ClientConfig;
    use mockito::Matcher;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_get_user_details_found_and_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users")
            .match_query(Matcher::UrlEncoded("user_id".into(), "u-1".into()))
            .with_status(200)
            .with_body(r#"{"data": [{"user_id": "u-1", "name": "Jane Doe", "affiliation": "HZB"}]}"#)
            .expect(1)
            .create_async()
            .await;
        let temp_dir = TempDir::new().unwrap();
        let client = NomadClient::new(&ClientConfig::with_base_url(server.url()).cache_dir(temp_dir.path())).unwrap();

        let user = client.get_user_details("u-1", false).await.unwrap().unwrap();
        let again = client.get_user_details("u-1", false).await.unwrap().unwrap();

        assert_eq!(user.name.as_deref(), Some("Jane Doe"));
        assert_eq!(user.affiliation.as_deref(), Some("HZB"));
        assert_eq!(user, again);
        let key = CacheKey::from_params("users", [("user_id", "u-1")]);
        assert!(client.cache().unwrap().cache_path(&key).exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_user_details_unknown_user() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/users")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;
        let client = NomadClient::new(&ClientConfig::with_base_url(server.url()).without_cache()).unwrap();

        assert!(client.get_user_details("nobody", false).await.unwrap().is_none());
    }
}
