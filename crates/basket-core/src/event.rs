//! Change events
//!
//! Inbound signals arrive in two shapes: response payloads from mutations
//! this session issued, and pushed notifications describing any
//! participant's mutation (including this session's own, echoed back).
//! Both are normalized into one canonical event form before reconciliation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Item;

/// A raw change notification as delivered by the feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum RawChange {
    /// A row was inserted
    Insert { item: Item },
    /// A row was updated
    Update { item: Item },
    /// A row was deleted
    Delete { id: Uuid },
}

/// A canonical change event, ready for the reconciliation engine
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Insert or wholesale-replace one item
    ItemUpserted(Item),
    /// Remove one item; unknown ids are a no-op downstream
    ItemRemoved(Uuid),
    /// Replace the entire item set (reorder confirmation, full re-sync)
    BulkReplaced(Vec<Item>),
}

/// Normalize a raw feed notification into a canonical event.
///
/// Upserts whose id has an outstanding local delete are dropped: the echo
/// of a concurrent edit must not resurrect an item this session already
/// removed and is awaiting confirmation for. An upsert that matches the
/// current value is still forwarded; the engine treats it as a no-op.
pub fn normalize(raw: RawChange, pending_deletes: &HashSet<Uuid>) -> Option<ChangeEvent> {
    match raw {
        RawChange::Insert { item } | RawChange::Update { item } => {
            if pending_deletes.contains(&item.id) {
                tracing::debug!(item_id = %item.id, "dropping upsert for pending delete");
                None
            } else {
                Some(ChangeEvent::ItemUpserted(item))
            }
        }
        RawChange::Delete { id } => Some(ChangeEvent::ItemRemoved(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item() -> Item {
        Item {
            id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            name: "Milk".to_string(),
            qty: None,
            unit: None,
            price: None,
            bought: false,
            sort_order: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_update_both_normalize_to_upsert() {
        let it = item();
        let none = HashSet::new();

        let ev = normalize(RawChange::Insert { item: it.clone() }, &none).unwrap();
        assert_eq!(ev, ChangeEvent::ItemUpserted(it.clone()));

        let ev = normalize(RawChange::Update { item: it.clone() }, &none).unwrap();
        assert_eq!(ev, ChangeEvent::ItemUpserted(it));
    }

    #[test]
    fn test_delete_normalizes_to_removal() {
        let id = Uuid::new_v4();
        let ev = normalize(RawChange::Delete { id }, &HashSet::new()).unwrap();
        assert_eq!(ev, ChangeEvent::ItemRemoved(id));
    }

    #[test]
    fn test_upsert_for_pending_delete_is_dropped() {
        let it = item();
        let pending: HashSet<Uuid> = [it.id].into_iter().collect();

        assert!(normalize(RawChange::Update { item: it.clone() }, &pending).is_none());
        assert!(normalize(RawChange::Insert { item: it.clone() }, &pending).is_none());

        // Removals pass through regardless
        let ev = normalize(RawChange::Delete { id: it.id }, &pending).unwrap();
        assert_eq!(ev, ChangeEvent::ItemRemoved(it.id));
    }

    #[test]
    fn test_raw_change_wire_format() {
        let it = item();
        let json = serde_json::to_string(&RawChange::Insert { item: it.clone() }).unwrap();
        assert!(json.contains(r#""op":"insert""#));

        let back: RawChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RawChange::Insert { item: it });

        let json = serde_json::to_string(&RawChange::Delete { id: Uuid::nil() }).unwrap();
        assert!(json.contains(r#""op":"delete""#));
    }
}
