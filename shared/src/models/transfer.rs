//! Stock transfer models
//!
//! A transfer moves quantity between two stores' ledgers through an
//! explicit lifecycle: new → dispatched → accepted | rejected. The status
//! enum owns the ordering rules; permission checks live with the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header of a stock movement between two stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransfer {
    pub id: Uuid,
    pub from_store_id: Uuid,
    pub to_store_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub status: TransferStatus,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a transfer, unique per (transfer, inventory row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransferLine {
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub inventory_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    New,
    Dispatched,
    Accepted,
    Rejected,
}

impl TransferStatus {
    /// Only a freshly created transfer can be dispatched
    pub fn can_dispatch(&self) -> bool {
        matches!(self, TransferStatus::New)
    }

    /// Accepting requires the stock to have left the source store
    pub fn can_accept(&self) -> bool {
        matches!(self, TransferStatus::Dispatched)
    }

    /// A transfer can be rejected before it reaches a terminal state
    pub fn can_reject(&self) -> bool {
        matches!(self, TransferStatus::New | TransferStatus::Dispatched)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Accepted | TransferStatus::Rejected)
    }

    /// Lines may be edited or removed until the transfer is terminal
    pub fn lines_mutable(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::New => "new",
            TransferStatus::Dispatched => "dispatched",
            TransferStatus::Accepted => "accepted",
            TransferStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(TransferStatus::New),
            "dispatched" => Some(TransferStatus::Dispatched),
            "accepted" => Some(TransferStatus::Accepted),
            "rejected" => Some(TransferStatus::Rejected),
            _ => None,
        }
    }
}
