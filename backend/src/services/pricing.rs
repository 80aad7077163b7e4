//! Pricing and discount lookup
//!
//! The sale engine never trusts client-supplied prices; the unit price on a
//! sale line comes from here at creation time. Discounts are resolved by
//! code and only apply while active and unexpired.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Discount;

/// Pricing source and discount lookup for the sale engine
#[derive(Clone)]
pub struct PricingService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct DiscountRow {
    id: Uuid,
    code: String,
    percentage: Decimal,
    is_active: bool,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<DiscountRow> for Discount {
    fn from(row: DiscountRow) -> Self {
        Discount {
            id: row.id,
            code: row.code,
            percentage: row.percentage,
            is_active: row.is_active,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

impl PricingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Authoritative unit price for a variant at this moment
    pub async fn current_price(&self, product_variant_id: Uuid) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>("SELECT price FROM product_variants WHERE id = $1")
            .bind(product_variant_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product variant".to_string()))
    }

    /// Resolve a discount code to a usable discount.
    ///
    /// Unknown, inactive and expired codes are all validation errors; the
    /// caller raises them before any inventory mutation.
    pub async fn find_active_discount(&self, code: &str) -> AppResult<Discount> {
        let row = sqlx::query_as::<_, DiscountRow>(
            "SELECT id, code, percentage, is_active, expires_at, created_at \
             FROM discounts WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Validation {
            field: "discount_code".to_string(),
            message: format!("Unknown discount code {}", code),
        })?;

        let discount: Discount = row.into();
        if !discount.is_usable(Utc::now()) {
            return Err(AppError::Validation {
                field: "discount_code".to_string(),
                message: format!("Discount code {} is inactive or expired", code),
            });
        }

        Ok(discount)
    }
}
