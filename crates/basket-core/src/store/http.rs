//! HTTP record store
//!
//! Client for a hosted list service. Lists are addressed by share token on
//! the wire, so the client remembers the id -> token mapping it learns from
//! `create_list` and `get_list`; item operations on a list that was never
//! resolved through this store report NotFound without touching the network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Item, ItemPatch, NewItem, ShoppingList};
use crate::store::{RecordStore, StoreError, StoreResult};

/// Error body returned by the service
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

/// `GET /api/lists/{token}` response
#[derive(Debug, Deserialize)]
struct ListEnvelope {
    list: ShoppingList,
    items: Vec<Item>,
}

/// HTTP-backed record store
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    tokens: Mutex<HashMap<Uuid, String>>,
}

impl HttpStore {
    /// Create a client for the service at `base_url`
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn remember(&self, list: &ShoppingList) {
        self.tokens
            .lock()
            .expect("token cache poisoned")
            .insert(list.id, list.share_token.clone());
    }

    fn token_for(&self, list_id: Uuid) -> StoreResult<String> {
        self.tokens
            .lock()
            .expect("token cache poisoned")
            .get(&list_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn fetch_envelope(&self, token: &str) -> StoreResult<ListEnvelope> {
        let resp = self
            .client
            .get(self.url(&format!("/api/lists/{}", token)))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }
}

/// Map a response status to the store error taxonomy
async fn check_status(resp: Response) -> StoreResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let message = resp
        .json::<ApiError>()
        .await
        .map(|e| e.error)
        .unwrap_or_else(|_| status.to_string());

    match status {
        StatusCode::NOT_FOUND => Err(StoreError::NotFound),
        StatusCode::BAD_REQUEST => Err(StoreError::Validation(message)),
        _ => Err(StoreError::Request(message)),
    }
}

#[async_trait]
impl RecordStore for HttpStore {
    async fn create_list(&self, name: &str) -> StoreResult<ShoppingList> {
        let resp = self
            .client
            .post(self.url("/api/lists"))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        let list: ShoppingList = check_status(resp).await?.json().await?;
        self.remember(&list);
        Ok(list)
    }

    async fn get_list(&self, share_token: &str) -> StoreResult<ShoppingList> {
        let envelope = self.fetch_envelope(share_token).await?;
        self.remember(&envelope.list);
        Ok(envelope.list)
    }

    async fn get_items(&self, list_id: Uuid) -> StoreResult<Vec<Item>> {
        let token = self.token_for(list_id)?;
        Ok(self.fetch_envelope(&token).await?.items)
    }

    async fn create_item(&self, list_id: Uuid, fields: NewItem) -> StoreResult<Item> {
        let token = self.token_for(list_id)?;
        let resp = self
            .client
            .post(self.url(&format!("/api/lists/{}/items", token)))
            .json(&fields)
            .send()
            .await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn update_item(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        patch: ItemPatch,
    ) -> StoreResult<Item> {
        let token = self.token_for(list_id)?;
        let resp = self
            .client
            .patch(self.url(&format!("/api/lists/{}/items/{}", token, item_id)))
            .json(&patch)
            .send()
            .await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn delete_item(&self, list_id: Uuid, item_id: Uuid) -> StoreResult<()> {
        let token = self.token_for(list_id)?;
        let resp = self
            .client
            .delete(self.url(&format!("/api/lists/{}/items/{}", token, item_id)))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn delete_bought(&self, list_id: Uuid) -> StoreResult<()> {
        let token = self.token_for(list_id)?;
        let resp = self
            .client
            .delete(self.url(&format!("/api/lists/{}/items", token)))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn reorder(&self, list_id: Uuid, order: &[Uuid]) -> StoreResult<()> {
        let token = self.token_for(list_id)?;
        let resp = self
            .client
            .patch(self.url(&format!("/api/lists/{}/items/reorder", token)))
            .json(&serde_json::json!({ "order": order }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let store = HttpStore::new("https://basket.example/");
        assert_eq!(
            store.url("/api/lists/abc"),
            "https://basket.example/api/lists/abc"
        );
    }

    #[tokio::test]
    async fn test_unresolved_list_is_not_found_without_network() {
        let store = HttpStore::new("http://127.0.0.1:9");
        let err = store.get_items(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn test_token_cache_remembers_lists() {
        let store = HttpStore::new("http://127.0.0.1:9");
        let list = ShoppingList {
            id: Uuid::new_v4(),
            name: "Groceries".to_string(),
            share_token: "0123456789abcdef".to_string(),
            created_at: chrono::Utc::now(),
        };
        store.remember(&list);
        assert_eq!(store.token_for(list.id).unwrap(), list.share_token);
    }
}
