//! Store and staff models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical retail location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A staff member attached to one store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub email: String,
    /// Permission strings, e.g. "transfers:receive"
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A sellable product variant; its price is the authoritative unit price
/// snapshotted onto sale lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub price: rust_decimal::Decimal,
    /// Serialized variants require a serial number on each inventory row
    pub is_serialized: bool,
    pub created_at: DateTime<Utc>,
}
