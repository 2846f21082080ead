//! SQLite record store
//!
//! Local persistence for lists and items. Every confirmed mutation is also
//! published as a [`RawChange`] on a broadcast channel, so sessions in the
//! same process receive a live change feed (see [`LocalFeed`]).

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::event::RawChange;
use crate::feed::LocalFeed;
use crate::models::{generate_share_token, Item, ItemPatch, NewItem, ShoppingList};
use crate::store::{RecordStore, StoreError, StoreResult};

/// Broadcast capacity for the in-process change feed
const FEED_CAPACITY: usize = 256;

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS lists (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            share_token TEXT UNIQUE NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            list_id TEXT NOT NULL,
            name TEXT NOT NULL,
            qty TEXT,
            unit TEXT,
            price REAL,
            bought INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (list_id) REFERENCES lists(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_items_list_order
            ON items(list_id, sort_order, created_at);
        "#,
    )
}

/// SQLite-backed record store
pub struct SqliteStore {
    conn: Mutex<Connection>,
    events: broadcast::Sender<(Uuid, RawChange)>,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Request(format!("cannot create {:?}: {}", parent, e)))?;
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self::with_connection(conn))
    }

    /// Open an in-memory database (for testing and demos)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        let (events, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            conn: Mutex::new(conn),
            events,
        }
    }

    /// A change feed over this store's in-process mutations
    pub fn feed(&self) -> LocalFeed {
        LocalFeed::new(self.events.clone())
    }

    fn publish(&self, list_id: Uuid, change: RawChange) {
        // No receivers is fine - nobody is watching
        let _ = self.events.send((list_id, change));
    }

    fn get_item_row(conn: &Connection, list_id: Uuid, item_id: Uuid) -> StoreResult<Item> {
        let item = conn
            .query_row(
                "SELECT id, list_id, name, qty, unit, price, bought, sort_order, created_at
                 FROM items WHERE id = ?1 AND list_id = ?2",
                params![item_id.to_string(), list_id.to_string()],
                row_to_item,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => other.into(),
            })?;
        Ok(item)
    }

    fn list_exists(conn: &Connection, list_id: Uuid) -> StoreResult<()> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM lists WHERE id = ?1",
                params![list_id.to_string()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        if found.is_some() {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create_list(&self, name: &str) -> StoreResult<ShoppingList> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("name is required".to_string()));
        }

        let list = ShoppingList {
            id: Uuid::new_v4(),
            name: name.to_string(),
            share_token: generate_share_token(),
            created_at: now_micros(),
        };

        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO lists (id, name, share_token, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                list.id.to_string(),
                list.name,
                list.share_token,
                list.created_at.timestamp_micros()
            ],
        )?;
        Ok(list)
    }

    async fn get_list(&self, share_token: &str) -> StoreResult<ShoppingList> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let list = conn
            .query_row(
                "SELECT id, name, share_token, created_at FROM lists WHERE share_token = ?1",
                params![share_token],
                row_to_list,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => other.into(),
            })?;
        Ok(list)
    }

    async fn get_items(&self, list_id: Uuid) -> StoreResult<Vec<Item>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        Self::list_exists(&conn, list_id)?;

        let mut stmt = conn.prepare(
            "SELECT id, list_id, name, qty, unit, price, bought, sort_order, created_at
             FROM items WHERE list_id = ?1 ORDER BY sort_order ASC, created_at ASC",
        )?;
        let rows = stmt.query_map(params![list_id.to_string()], row_to_item)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    async fn create_item(&self, list_id: Uuid, fields: NewItem) -> StoreResult<Item> {
        let fields = fields.normalized();
        fields.validate().map_err(StoreError::Validation)?;

        let item = {
            let conn = self.conn.lock().expect("store mutex poisoned");
            Self::list_exists(&conn, list_id)?;

            // Append at the end: current max + 1
            let sort_order: i64 = conn.query_row(
                "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM items WHERE list_id = ?1",
                params![list_id.to_string()],
                |row| row.get(0),
            )?;

            let item = Item {
                id: Uuid::new_v4(),
                list_id,
                name: fields.name,
                qty: fields.qty,
                unit: fields.unit,
                price: fields.price,
                bought: false,
                sort_order,
                created_at: now_micros(),
            };

            conn.execute(
                "INSERT INTO items (id, list_id, name, qty, unit, price, bought, sort_order, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    item.id.to_string(),
                    item.list_id.to_string(),
                    item.name,
                    item.qty,
                    item.unit,
                    item.price,
                    item.bought as i64,
                    item.sort_order,
                    item.created_at.timestamp_micros()
                ],
            )?;
            item
        };

        self.publish(list_id, RawChange::Insert { item: item.clone() });
        Ok(item)
    }

    async fn update_item(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        patch: ItemPatch,
    ) -> StoreResult<Item> {
        patch.validate().map_err(StoreError::Validation)?;

        let item = {
            let conn = self.conn.lock().expect("store mutex poisoned");
            let mut item = Self::get_item_row(&conn, list_id, item_id)?;
            patch.apply_to(&mut item);

            conn.execute(
                "UPDATE items SET name = ?1, qty = ?2, unit = ?3, price = ?4, bought = ?5
                 WHERE id = ?6 AND list_id = ?7",
                params![
                    item.name,
                    item.qty,
                    item.unit,
                    item.price,
                    item.bought as i64,
                    item_id.to_string(),
                    list_id.to_string()
                ],
            )?;
            item
        };

        self.publish(list_id, RawChange::Update { item: item.clone() });
        Ok(item)
    }

    async fn delete_item(&self, list_id: Uuid, item_id: Uuid) -> StoreResult<()> {
        let deleted = {
            let conn = self.conn.lock().expect("store mutex poisoned");
            conn.execute(
                "DELETE FROM items WHERE id = ?1 AND list_id = ?2",
                params![item_id.to_string(), list_id.to_string()],
            )?
        };
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }

        self.publish(list_id, RawChange::Delete { id: item_id });
        Ok(())
    }

    async fn delete_bought(&self, list_id: Uuid) -> StoreResult<()> {
        let deleted_ids = {
            let conn = self.conn.lock().expect("store mutex poisoned");
            Self::list_exists(&conn, list_id)?;

            let mut stmt =
                conn.prepare("SELECT id FROM items WHERE list_id = ?1 AND bought = 1")?;
            let ids: Vec<String> = stmt
                .query_map(params![list_id.to_string()], |row| row.get(0))?
                .collect::<Result<_, _>>()?;

            conn.execute(
                "DELETE FROM items WHERE list_id = ?1 AND bought = 1",
                params![list_id.to_string()],
            )?;
            ids
        };

        for id in deleted_ids {
            if let Ok(id) = Uuid::parse_str(&id) {
                self.publish(list_id, RawChange::Delete { id });
            }
        }
        Ok(())
    }

    async fn reorder(&self, list_id: Uuid, order: &[Uuid]) -> StoreResult<()> {
        let updated = {
            let mut conn = self.conn.lock().expect("store mutex poisoned");
            Self::list_exists(&conn, list_id)?;

            let tx = conn.transaction()?;
            for (rank, id) in order.iter().enumerate() {
                tx.execute(
                    "UPDATE items SET sort_order = ?1 WHERE id = ?2 AND list_id = ?3",
                    params![rank as i64, id.to_string(), list_id.to_string()],
                )?;
            }
            tx.commit()?;

            let mut updated = Vec::with_capacity(order.len());
            for id in order {
                if let Ok(item) = Self::get_item_row(&conn, list_id, *id) {
                    updated.push(item);
                }
            }
            updated
        };

        for item in updated {
            self.publish(list_id, RawChange::Update { item });
        }
        Ok(())
    }
}

fn row_to_list(row: &Row<'_>) -> rusqlite::Result<ShoppingList> {
    Ok(ShoppingList {
        id: parse_uuid(row, 0)?,
        name: row.get(1)?,
        share_token: row.get(2)?,
        created_at: micros_to_datetime(row.get(3)?),
    })
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: parse_uuid(row, 0)?,
        list_id: parse_uuid(row, 1)?,
        name: row.get(2)?,
        qty: row.get(3)?,
        unit: row.get(4)?,
        price: row.get(5)?,
        bought: row.get::<_, i64>(6)? != 0,
        sort_order: row.get(7)?,
        created_at: micros_to_datetime(row.get(8)?),
    })
}

fn parse_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn micros_to_datetime(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Current time at the microsecond precision the database keeps, so
/// records compare equal across a round-trip
fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    micros_to_datetime(now.timestamp_micros())
}
