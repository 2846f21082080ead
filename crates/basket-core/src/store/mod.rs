//! Record store boundary
//!
//! The synchronization core talks to persistence through [`RecordStore`].
//! Any store with these operations suffices; this crate ships a SQLite
//! implementation for local use and an HTTP client for a hosted service.
//!
//! Lists are looked up by share token - the sole access credential - and
//! items are addressed by `(list_id, item_id)`.

mod http;
mod sqlite;

pub use http::HttpStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Item, ItemPatch, NewItem, ShoppingList};

/// Errors surfaced by record-store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The share token or item id did not resolve. Terminal; never retried.
    #[error("not found")]
    NotFound,

    /// The request was rejected before reaching the store. Surfaced inline,
    /// never retried, and never applied optimistically.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The store or the network failed while handling a mutation. The
    /// optimistic change is reverted; no automatic retry, since a retry
    /// after a revert could duplicate a create.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Request(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Request(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The persistent record store collaborator
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a list with a fresh share token
    async fn create_list(&self, name: &str) -> StoreResult<ShoppingList>;

    /// Resolve a share token to its list
    async fn get_list(&self, share_token: &str) -> StoreResult<ShoppingList>;

    /// All items of a list, sorted by (sort_order, created_at)
    async fn get_items(&self, list_id: Uuid) -> StoreResult<Vec<Item>>;

    /// Create an item; the store assigns id, sort_order (max+1) and
    /// creation timestamp
    async fn create_item(&self, list_id: Uuid, fields: NewItem) -> StoreResult<Item>;

    /// Partially update an item, returning the stored record
    async fn update_item(&self, list_id: Uuid, item_id: Uuid, patch: ItemPatch)
        -> StoreResult<Item>;

    /// Delete one item
    async fn delete_item(&self, list_id: Uuid, item_id: Uuid) -> StoreResult<()>;

    /// Delete every bought item of a list
    async fn delete_bought(&self, list_id: Uuid) -> StoreResult<()>;

    /// Set each item's sort_order to its position in `order`
    async fn reorder(&self, list_id: Uuid, order: &[Uuid]) -> StoreResult<()>;
}
