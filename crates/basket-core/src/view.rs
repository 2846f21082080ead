//! Read-side projection
//!
//! Pure derivation of what a participant sees: the filtered, canonically
//! ordered item sequence, tab counts, and the billing summary. Nothing in
//! here mutates state; the session calls `project` on every render.

use serde::{Deserialize, Serialize};

use crate::models::Item;
use crate::order;

/// Which partition of the list is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Every item (the only view that permits reordering)
    #[default]
    All,
    /// Items still to pick up
    Unbought,
    /// Items already in the cart
    Bought,
}

impl Filter {
    /// Parse a filter name ("all", "unbought", "bought")
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Filter::All),
            "unbought" => Some(Filter::Unbought),
            "bought" => Some(Filter::Bought),
            _ => None,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Unbought => write!(f, "unbought"),
            Filter::Bought => write!(f, "bought"),
        }
    }
}

/// Item counts per filter tab, always computed over the unfiltered set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub all: usize,
    pub bought: usize,
    pub unbought: usize,
}

/// Derived billing figures over the priced items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Billing {
    /// Sum of every priced item's subtotal
    pub total: f64,
    /// Subtotals of priced items already bought ("in cart")
    pub bought_total: f64,
    /// Subtotals of priced items still to buy ("remaining")
    pub unbought_total: f64,
    /// How many items carry a price
    pub priced_items: usize,
}

/// One projected view of a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListView {
    /// Items matching the filter, in canonical display order
    pub items: Vec<Item>,
    pub counts: Counts,
    /// Absent when no item is priced
    pub billing: Option<Billing>,
}

/// Subtotal one item contributes to the bill
///
/// price x parsed quantity; the quantity defaults to 1 when absent or not
/// parsable as a number. Unpriced items contribute zero.
pub fn subtotal(item: &Item) -> f64 {
    let Some(price) = item.price else {
        return 0.0;
    };
    let qty = item
        .qty
        .as_deref()
        .and_then(|q| q.trim().parse::<f64>().ok())
        .unwrap_or(1.0);
    price * qty
}

/// Project the canonical item set into one view
pub fn project(items: &[Item], filter: Filter) -> ListView {
    let counts = Counts {
        all: items.len(),
        bought: items.iter().filter(|i| i.bought).count(),
        unbought: items.iter().filter(|i| !i.bought).count(),
    };

    let mut visible: Vec<Item> = items
        .iter()
        .filter(|i| match filter {
            Filter::All => true,
            Filter::Bought => i.bought,
            Filter::Unbought => !i.bought,
        })
        .cloned()
        .collect();
    order::sort_canonical(&mut visible);

    let priced: Vec<&Item> = items.iter().filter(|i| i.price.is_some()).collect();
    let billing = if priced.is_empty() {
        None
    } else {
        Some(Billing {
            total: priced.iter().copied().map(subtotal).sum(),
            bought_total: priced
                .iter()
                .copied()
                .filter(|i| i.bought)
                .map(subtotal)
                .sum(),
            unbought_total: priced
                .iter()
                .copied()
                .filter(|i| !i.bought)
                .map(subtotal)
                .sum(),
            priced_items: priced.len(),
        })
    };

    ListView {
        items: visible,
        counts,
        billing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn item(name: &str, bought: bool, sort_order: i64) -> Item {
        Item {
            id: Uuid::new_v4(),
            list_id: Uuid::nil(),
            name: name.to_string(),
            qty: None,
            unit: None,
            price: None,
            bought,
            sort_order,
            created_at: Utc::now() + Duration::seconds(sort_order),
        }
    }

    #[test]
    fn test_counts_ignore_active_filter() {
        let items = vec![
            item("a", true, 0),
            item("b", true, 1),
            item("c", false, 2),
            item("d", false, 3),
            item("e", false, 4),
        ];

        for filter in [Filter::All, Filter::Bought, Filter::Unbought] {
            let view = project(&items, filter);
            assert_eq!(view.counts.all, 5);
            assert_eq!(view.counts.bought, 2);
            assert_eq!(view.counts.unbought, 3);
        }
    }

    #[test]
    fn test_filter_partitions() {
        let items = vec![item("a", true, 0), item("b", false, 1)];

        let bought = project(&items, Filter::Bought);
        assert_eq!(bought.items.len(), 1);
        assert_eq!(bought.items[0].name, "a");

        let unbought = project(&items, Filter::Unbought);
        assert_eq!(unbought.items.len(), 1);
        assert_eq!(unbought.items[0].name, "b");

        assert_eq!(project(&items, Filter::All).items.len(), 2);
    }

    #[test]
    fn test_visible_items_in_canonical_order() {
        let items = vec![item("c", false, 2), item("a", false, 0), item("b", false, 1)];
        let view = project(&items, Filter::All);
        let names: Vec<&str> = view.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_subtotal_qty_times_price() {
        let mut it = item("Milk", false, 0);
        it.qty = Some("3".to_string());
        it.price = Some(2.50);
        assert!((subtotal(&it) - 7.50).abs() < 1e-9);
    }

    #[test]
    fn test_subtotal_defaults_qty_to_one() {
        let mut it = item("Milk", false, 0);
        it.price = Some(2.50);
        assert!((subtotal(&it) - 2.50).abs() < 1e-9);

        // Unparsable quantities fall back to 1 as well
        it.qty = Some("a few".to_string());
        assert!((subtotal(&it) - 2.50).abs() < 1e-9);
    }

    #[test]
    fn test_unpriced_items_contribute_nothing() {
        let mut priced = item("Milk", true, 0);
        priced.qty = Some("2".to_string());
        priced.price = Some(1.80);
        let unpriced = item("Bags", false, 1);

        let view = project(&[priced, unpriced], Filter::All);
        let billing = view.billing.unwrap();
        assert_eq!(billing.priced_items, 1);
        assert!((billing.total - 3.60).abs() < 1e-9);
        assert!((billing.bought_total - 3.60).abs() < 1e-9);
        assert!(billing.unbought_total.abs() < 1e-9);
    }

    #[test]
    fn test_billing_absent_without_prices() {
        let items = vec![item("a", false, 0), item("b", true, 1)];
        assert!(project(&items, Filter::All).billing.is_none());
    }

    #[test]
    fn test_filter_parse_roundtrip() {
        for filter in [Filter::All, Filter::Unbought, Filter::Bought] {
            assert_eq!(Filter::parse(&filter.to_string()), Some(filter));
        }
        assert_eq!(Filter::parse("cleared"), None);
    }
}
