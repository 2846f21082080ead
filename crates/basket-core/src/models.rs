//! Data models for Basket
//!
//! Defines the core records: ShoppingList and Item, plus the field
//! bundles used at the record-store boundary (NewItem, ItemPatch).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conventional units for quantities. Advisory: the store keeps whatever
/// string the participant entered.
pub const UNITS: &[&str] = &["each", "kg", "g", "L", "mL", "pack"];

/// A shared shopping list
///
/// The share token is the sole access credential - anyone holding it has
/// full read/write capability, so it is generated with 64 bits of entropy
/// and never derived from anything enumerable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShoppingList {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Opaque share token
    pub share_token: String,
    /// When this list was created
    pub created_at: DateTime<Utc>,
}

/// A single item on a shopping list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Unique identifier, assigned by the store on creation
    pub id: Uuid,
    /// The list this item belongs to
    pub list_id: Uuid,
    /// Display name (non-empty)
    pub name: String,
    /// Free-text quantity ("2", "1.5", ...)
    pub qty: Option<String>,
    /// Unit for the quantity, meaningful only when a quantity is present
    pub unit: Option<String>,
    /// Unit price, if the participant priced the item
    pub price: Option<f64>,
    /// Whether the item has been picked up
    pub bought: bool,
    /// Display position; rewritten wholesale on every reorder
    pub sort_order: i64,
    /// Creation timestamp, used as a stable ordering tie-break
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a new item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl NewItem {
    /// Create item fields with just a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Normalize text fields the way the store does: the name is trimmed,
    /// empty qty/unit collapse to absent.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.qty = normalize_text(self.qty);
        self.unit = normalize_text(self.unit);
        self
    }

    /// Check the invariants enforced before any mutation is issued
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        validate_price(self.price)
    }
}

/// Partial update for an item
///
/// Unset fields are left untouched by the store. Setting qty or unit to an
/// empty string clears them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bought: Option<bool>,
}

impl ItemPatch {
    /// A patch that only flips the bought flag
    pub fn bought(value: bool) -> Self {
        Self {
            bought: Some(value),
            ..Self::default()
        }
    }

    /// True when the patch would change nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.qty.is_none()
            && self.unit.is_none()
            && self.price.is_none()
            && self.bought.is_none()
    }

    /// Check the invariants enforced before any mutation is issued
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err("name cannot be empty".to_string());
            }
        }
        validate_price(self.price)
    }

    /// Apply the patch to an in-memory item, with the same normalization
    /// the store performs
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(ref name) = self.name {
            item.name = name.trim().to_string();
        }
        if let Some(ref qty) = self.qty {
            item.qty = normalize_text(Some(qty.clone()));
        }
        if let Some(ref unit) = self.unit {
            item.unit = normalize_text(Some(unit.clone()));
        }
        if let Some(price) = self.price {
            item.price = Some(price);
        }
        if let Some(bought) = self.bought {
            item.bought = bought;
        }
    }
}

/// Generate a share token: 16 hex characters (64 bits of randomness)
pub fn generate_share_token() -> String {
    Uuid::new_v4().simple().to_string()[..16].to_string()
}

fn normalize_text(value: Option<String>) -> Option<String> {
    match value {
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => None,
    }
}

fn validate_price(price: Option<f64>) -> Result<(), String> {
    match price {
        Some(p) if !p.is_finite() => Err("price must be a number".to_string()),
        Some(p) if p < 0.0 => Err("price cannot be negative".to_string()),
        _ => Ok(()),
    }
}
