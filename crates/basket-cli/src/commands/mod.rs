//! Command handlers

pub mod config;
pub mod item;
pub mod list;
pub mod status;
pub mod watch;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use basket_core::{
    Config, HttpStore, Item, ListSession, RecordStore, SqliteStore, StoreError,
};

/// Open the configured record store: remote when a service URL is set,
/// local SQLite otherwise
pub fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match config.service_url {
        Some(ref url) => Ok(Arc::new(HttpStore::new(url))),
        None => {
            let store =
                SqliteStore::open(&config.db_path()).context("Failed to open local store")?;
            Ok(Arc::new(store))
        }
    }
}

/// Open a session for the list behind `token`
pub async fn open_session(store: Arc<dyn RecordStore>, token: &str) -> Result<ListSession> {
    match ListSession::open(store, token).await {
        Ok(session) => Ok(session),
        Err(StoreError::NotFound) => bail!("List not found: {}", token),
        Err(e) => Err(e).context("Failed to open list"),
    }
}

/// Parse an item ID (supports full UUID or prefix)
pub fn parse_item_id(id: &str, items: &[Item]) -> Result<Uuid> {
    // Try full UUID first
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }

    // Try prefix match
    let matches: Vec<&Item> = items
        .iter()
        .filter(|i| i.id.to_string().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No item found matching: {}", id),
        1 => Ok(matches[0].id),
        _ => {
            eprintln!("Multiple items match '{}':", id);
            for item in &matches {
                eprintln!("  {} - {}", item.id, item.name);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
