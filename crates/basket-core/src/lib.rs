//! Basket Core Library
//!
//! This crate provides the core functionality for Basket, shared shopping
//! lists that any holder of a share link can view and edit concurrently.
//!
//! # Architecture
//!
//! Every open list view owns a [`ListSession`]: the authoritative local
//! mirror of the list's items. Local edits are applied optimistically and
//! confirmed (or reverted) by the record store; other participants'
//! confirmed edits arrive through a change feed, are normalized into
//! canonical events, and are reconciled into the same mirror. Convergence
//! is eventual, with last-writer-wins on whole records.
//!
//! # Quick Start
//!
//! ```text
//! let store = Arc::new(SqliteStore::open_in_memory()?);
//! let list = store.create_list("Weekly Shop").await?;
//!
//! let mut session = ListSession::open(store, &list.share_token).await?;
//! session.add_item(NewItem::new("Milk")).await?;
//!
//! let view = session.current_view();
//! ```
//!
//! # Modules
//!
//! - `session`: per-view synchronization core (main entry point)
//! - `models`: lists, items, and boundary field bundles
//! - `event`: change notifications and their canonical form
//! - `order`: display-order assignment
//! - `view`: pure read-side projection (filters, counts, billing)
//! - `store`: record store collaborators (SQLite, HTTP)
//! - `feed`: change feed collaborators and connection supervision
//! - `config`: application configuration

pub mod config;
pub mod event;
pub mod feed;
pub mod models;
pub mod order;
pub mod session;
pub mod store;
pub mod view;

pub use config::Config;
pub use event::{ChangeEvent, RawChange};
pub use feed::{ChangeFeed, FeedError, FeedSupervisor, LocalFeed, Subscription, SyncStatus, WsFeed};
pub use models::{generate_share_token, Item, ItemPatch, NewItem, ShoppingList};
pub use session::{ListSession, SessionView};
pub use store::{HttpStore, RecordStore, SqliteStore, StoreError, StoreResult};
pub use view::{project, subtotal, Billing, Counts, Filter, ListView};
