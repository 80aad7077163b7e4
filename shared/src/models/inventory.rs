//! Inventory ledger models
//!
//! An `InventoryRecord` is the single source of truth for on-hand quantity
//! per (store, product variant). Sales, scraps and stock transfers all
//! describe movements against these rows; none of them own quantity
//! independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A per-store, per-variant stock counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: Uuid,
    pub store_id: Uuid,
    pub product_variant_id: Uuid,
    /// On-hand quantity, never negative
    pub quantity: i64,
    /// Derived from quantity; denormalized for query filtering
    pub status: InventoryStatus,
    /// Required when the variant is serialized
    pub serial_number: Option<String>,
    pub batch_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Availability status derived from quantity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    Available,
    OutOfStock,
}

impl InventoryStatus {
    pub fn from_quantity(quantity: i64) -> Self {
        if quantity > 0 {
            InventoryStatus::Available
        } else {
            InventoryStatus::OutOfStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::Available => "available",
            InventoryStatus::OutOfStock => "out_of_stock",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(InventoryStatus::Available),
            "out_of_stock" => Some(InventoryStatus::OutOfStock),
            _ => None,
        }
    }
}

/// Clamp-to-zero decrement.
///
/// Returns the new quantity and whether the full amount was applied.
/// Subtracting more than is available yields zero, not an error; callers
/// that care can inspect the flag.
pub fn apply_decrement(current: i64, amount: i64) -> (i64, bool) {
    ((current - amount).max(0), amount <= current)
}

/// New quantity after a clamped decrement
pub fn clamp_decrement(current: i64, amount: i64) -> i64 {
    (current - amount).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_quantity() {
        assert_eq!(InventoryStatus::from_quantity(1), InventoryStatus::Available);
        assert_eq!(InventoryStatus::from_quantity(0), InventoryStatus::OutOfStock);
    }

    #[test]
    fn decrement_clamps_at_zero() {
        assert_eq!(clamp_decrement(6, 20), 0);
        assert_eq!(clamp_decrement(10, 4), 6);
    }
}
