//! Display-order assignment
//!
//! Items carry an integer sort_order. New items are appended at max+1;
//! a drag relocation rewrites every item's index to its positional rank,
//! which keeps indices dense and collision-free at the cost of touching
//! the whole list. Lists are small enough that this is fine.

use std::cmp::Ordering;

use uuid::Uuid;

use crate::models::Item;

/// Compare two items in canonical display order: sort_order ascending,
/// creation time ascending as tie-break. The trailing id comparison only
/// breaks exact ties so sorting stays deterministic.
pub fn canonical_cmp(a: &Item, b: &Item) -> Ordering {
    a.sort_order
        .cmp(&b.sort_order)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

/// Sort items into canonical display order
pub fn sort_canonical(items: &mut [Item]) {
    items.sort_by(canonical_cmp);
}

/// Sort order for an item appended to the end of the list
///
/// Callers that immediately follow an insert with a full reorder skip this
/// and let the reorder assign the final rank.
pub fn next_sort_order(items: &[Item]) -> i64 {
    items.iter().map(|i| i.sort_order).max().map_or(0, |max| max + 1)
}

/// Relocate one id within a full ordered sequence
///
/// Removes `id` and reinserts it at `to` (clamped to the sequence length).
/// Returns the sequence unchanged if `id` is not present.
pub fn relocate(order: &[Uuid], id: Uuid, to: usize) -> Vec<Uuid> {
    let mut order: Vec<Uuid> = order.to_vec();
    let Some(from) = order.iter().position(|&x| x == id) else {
        return order;
    };
    order.remove(from);
    let to = to.min(order.len());
    order.insert(to, id);
    order
}

/// Reassign every item's sort_order to its rank in `sequence`
///
/// Items not named by the sequence keep their current index; the caller is
/// expected to pass the complete order.
pub fn reassign(items: &mut [Item], sequence: &[Uuid]) {
    for (rank, id) in sequence.iter().enumerate() {
        if let Some(item) = items.iter_mut().find(|i| i.id == *id) {
            item.sort_order = rank as i64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn item(sort_order: i64, offset_secs: i64) -> Item {
        Item {
            id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            name: "x".to_string(),
            qty: None,
            unit: None,
            price: None,
            bought: false,
            sort_order,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_next_sort_order_appends() {
        assert_eq!(next_sort_order(&[]), 0);

        let items = vec![item(0, 0), item(3, 1), item(1, 2)];
        assert_eq!(next_sort_order(&items), 4);
    }

    #[test]
    fn test_canonical_order_ties_on_created_at() {
        let mut a = item(1, 0);
        let b = item(1, 5);
        let c = item(0, 9);
        a.name = "a".to_string();

        let mut items = vec![b.clone(), a.clone(), c.clone()];
        sort_canonical(&mut items);

        assert_eq!(items[0].id, c.id);
        assert_eq!(items[1].id, a.id);
        assert_eq!(items[2].id, b.id);
    }

    #[test]
    fn test_relocate_moves_within_sequence() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

        let moved = relocate(&ids, ids[0], 2);
        assert_eq!(moved, vec![ids[1], ids[2], ids[0], ids[3]]);

        // Target past the end clamps to the tail
        let moved = relocate(&ids, ids[1], 99);
        assert_eq!(moved, vec![ids[0], ids[2], ids[3], ids[1]]);
    }

    #[test]
    fn test_relocate_unknown_id_is_noop() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        assert_eq!(relocate(&ids, Uuid::new_v4(), 0), ids);
    }

    #[test]
    fn test_reassign_rewrites_all_ranks() {
        let mut items = vec![item(10, 0), item(20, 1), item(30, 2)];
        let sequence = vec![items[2].id, items[0].id, items[1].id];

        reassign(&mut items, &sequence);
        sort_canonical(&mut items);

        let orders: Vec<i64> = items.iter().map(|i| i.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(items[0].id, sequence[0]);
        assert_eq!(items[1].id, sequence[1]);
        assert_eq!(items[2].id, sequence[2]);
    }
}
