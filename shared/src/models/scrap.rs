//! Scrap adjustment models
//!
//! A scrap records stock leaving (damage) or pending re-entry (customer
//! return) outside the sales channel. Repeated events for the same merge
//! key accumulate quantity on one row instead of creating duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A non-sale inventory adjustment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scrap {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub scrap_type: ScrapType,
    /// Set only for returned scraps; part of their merge key
    pub customer_id: Option<Uuid>,
    pub quantity: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScrapType {
    Damaged,
    Returned,
    Other,
}

impl ScrapType {
    /// Returned stock is not restocked at creation; the ledger is only
    /// touched by a later add-back. Damaged/other decrement immediately.
    pub fn decrements_inventory(&self) -> bool {
        !matches!(self, ScrapType::Returned)
    }

    /// Returned scraps merge per customer as well
    pub fn merges_per_customer(&self) -> bool {
        matches!(self, ScrapType::Returned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapType::Damaged => "damaged",
            ScrapType::Returned => "returned",
            ScrapType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "damaged" => Some(ScrapType::Damaged),
            "returned" => Some(ScrapType::Returned),
            "other" => Some(ScrapType::Other),
            _ => None,
        }
    }
}

/// Quantity actually moved by an add-back request.
///
/// Defaults to the full scrap quantity and is clamped to what the scrap
/// still holds.
pub fn clamp_add_back(scrap_quantity: i64, requested: Option<i64>) -> i64 {
    requested.unwrap_or(scrap_quantity).clamp(0, scrap_quantity)
}
