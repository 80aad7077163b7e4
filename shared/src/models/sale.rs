//! Point-of-sale models
//!
//! A sale snapshots the unit price of every line at creation time and
//! carries a structured discount snapshot rather than an opaque metadata
//! bag, so a later discount edit never changes an already-recorded sale.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed point-of-sale transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub store_id: Uuid,
    pub cashier_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub tax: TaxAmount,
    /// Sum of line totals plus tax
    pub subtotal_price: Decimal,
    /// Subtotal after discount
    pub total_price: Decimal,
    pub discount: DiscountSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a sale, pointing at a single inventory row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub inventory_id: Uuid,
    pub quantity: i64,
    /// Variant price at the time of sale, not client-supplied
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Accepted payment methods
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            _ => None,
        }
    }
}

/// Tax applied to a sale, either a percentage of the line sum or an
/// absolute amount
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum TaxAmount {
    Percent(Decimal),
    Absolute(Decimal),
}

impl TaxAmount {
    /// Tax owed on the given sum of line totals
    pub fn applied_to(&self, line_sum: Decimal) -> Decimal {
        match self {
            TaxAmount::Percent(pct) => line_sum * *pct / Decimal::from(100),
            TaxAmount::Absolute(amount) => *amount,
        }
    }

    pub fn mode_str(&self) -> &'static str {
        match self {
            TaxAmount::Percent(_) => "percent",
            TaxAmount::Absolute(_) => "absolute",
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            TaxAmount::Percent(v) | TaxAmount::Absolute(v) => *v,
        }
    }

    pub fn from_parts(mode: &str, value: Decimal) -> Option<Self> {
        match mode {
            "percent" => Some(TaxAmount::Percent(value)),
            "absolute" => Some(TaxAmount::Absolute(value)),
            _ => None,
        }
    }
}

/// Discount state captured at the time of sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountSnapshot {
    #[default]
    None,
    Percentage {
        code: String,
        percent: Decimal,
    },
}

impl DiscountSnapshot {
    /// Total after applying the discount to the subtotal
    pub fn apply(&self, subtotal: Decimal) -> Decimal {
        match self {
            DiscountSnapshot::None => subtotal,
            DiscountSnapshot::Percentage { percent, .. } => {
                subtotal - subtotal * *percent / Decimal::from(100)
            }
        }
    }

    pub fn percent(&self) -> Option<Decimal> {
        match self {
            DiscountSnapshot::None => None,
            DiscountSnapshot::Percentage { percent, .. } => Some(*percent),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            DiscountSnapshot::None => None,
            DiscountSnapshot::Percentage { code, .. } => Some(code),
        }
    }

    pub fn from_parts(code: Option<String>, percent: Option<Decimal>) -> Self {
        match (code, percent) {
            (Some(code), Some(percent)) => DiscountSnapshot::Percentage { code, percent },
            _ => DiscountSnapshot::None,
        }
    }
}

/// Header totals derived from line totals, tax and discount.
///
/// Subtotal is the sum of line totals plus tax; total is the subtotal after
/// the discount. Callers recompute from the persisted set of lines rather
/// than keeping a running total.
pub fn compute_totals(
    line_totals: &[Decimal],
    tax: &TaxAmount,
    discount: &DiscountSnapshot,
) -> (Decimal, Decimal) {
    let line_sum: Decimal = line_totals.iter().copied().sum();
    let subtotal = line_sum + tax.applied_to(line_sum);
    let total = discount.apply(subtotal);
    (subtotal, total)
}

/// Inventory delta for a line quantity edit: positive means more stock is
/// being consumed, negative means stock flows back to the ledger.
pub fn quantity_delta(previous: i64, requested: i64) -> i64 {
    requested - previous
}
