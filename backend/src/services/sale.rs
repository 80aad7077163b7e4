//! Sale engine
//!
//! Creates and edits point-of-sale transactions. A sale is created in one
//! transaction: lines are priced from the variant's current price,
//! inventory is decremented per line (clamped), and the header totals are
//! derived from the sum of the lines plus tax minus discount. Edits are
//! idempotent deltas: only the difference between the stored and requested
//! quantity moves through the ledger, and totals are always recomputed from
//! the persisted lines rather than a running total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    compute_totals, quantity_delta, DiscountSnapshot, PaginatedResponse, Pagination,
    PaginationMeta, PaymentMethod, Sale, SaleLine, TaxAmount,
};
use crate::services::inventory::InventoryService;
use crate::services::pricing::PricingService;
use shared::validation::{validate_quantity, validate_tax_value};

/// Sale service for transactional sale creation and reconciliation
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
    pricing: PricingService,
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    store_id: Uuid,
    cashier_id: Uuid,
    customer_id: Option<Uuid>,
    payment_method: String,
    tax_mode: String,
    tax_value: Decimal,
    subtotal_price: Decimal,
    total_price: Decimal,
    discount_code: Option<String>,
    discount_percentage: Option<Decimal>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            store_id: row.store_id,
            cashier_id: row.cashier_id,
            customer_id: row.customer_id,
            payment_method: PaymentMethod::from_str(&row.payment_method)
                .unwrap_or(PaymentMethod::Cash),
            tax: TaxAmount::from_parts(&row.tax_mode, row.tax_value)
                .unwrap_or(TaxAmount::Absolute(row.tax_value)),
            subtotal_price: row.subtotal_price,
            total_price: row.total_price,
            discount: DiscountSnapshot::from_parts(row.discount_code, row.discount_percentage),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SaleLineRow {
    id: Uuid,
    sale_id: Uuid,
    inventory_id: Uuid,
    quantity: i64,
    unit_price: Decimal,
    line_total: Decimal,
}

impl From<SaleLineRow> for SaleLine {
    fn from(row: SaleLineRow) -> Self {
        SaleLine {
            id: row.id,
            sale_id: row.sale_id,
            inventory_id: row.inventory_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        }
    }
}

const SALE_COLUMNS: &str = "id, store_id, cashier_id, customer_id, payment_method, tax_mode, \
                            tax_value, subtotal_price, total_price, discount_code, \
                            discount_percentage, created_at, updated_at";

const SALE_LINE_COLUMNS: &str = "id, sale_id, inventory_id, quantity, unit_price, line_total";

/// Input for creating a sale
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub store_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub tax: TaxAmount,
    pub discount_code: Option<String>,
    pub lines: Vec<SaleLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct SaleLineInput {
    pub inventory_id: Uuid,
    pub quantity: i64,
}

/// Input for editing existing line quantities
#[derive(Debug, Deserialize)]
pub struct UpdateSaleInput {
    pub lines: Vec<UpdateSaleLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSaleLineInput {
    pub line_id: Uuid,
    pub quantity: i64,
}

/// A sale with its lines
#[derive(Debug, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

/// Resolved inventory row used while pricing sale lines
#[derive(Debug, FromRow)]
struct PricedInventoryRow {
    id: Uuid,
    price: Decimal,
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool) -> Self {
        let pricing = PricingService::new(db.clone());
        Self { db, pricing }
    }

    /// Create a sale: price lines, decrement inventory, derive totals and
    /// persist header + lines atomically.
    pub async fn create_sale(&self, cashier_id: Uuid, input: CreateSaleInput) -> AppResult<SaleDetail> {
        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "A sale requires at least one line".to_string(),
            });
        }
        for line in &input.lines {
            validate_quantity(line.quantity).map_err(|msg| AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
            })?;
        }
        validate_tax_value(input.tax.value()).map_err(|msg| AppError::Validation {
            field: "tax".to_string(),
            message: msg.to_string(),
        })?;

        // Resolve the discount before any mutation; an expired or inactive
        // code rejects the whole sale with no inventory touched.
        let discount = match &input.discount_code {
            Some(code) => {
                let discount = self.pricing.find_active_discount(code).await?;
                DiscountSnapshot::Percentage {
                    code: discount.code,
                    percent: discount.percentage,
                }
            }
            None => DiscountSnapshot::None,
        };

        let mut tx = self.db.begin().await?;

        // Batch-resolve the requested inventory rows with their current
        // variant price, locking the stock rows for the decrements below.
        let requested_ids: Vec<Uuid> = input.lines.iter().map(|l| l.inventory_id).collect();
        let resolved = sqlx::query_as::<_, PricedInventoryRow>(
            r#"
            SELECT ir.id, pv.price
            FROM inventory_records ir
            JOIN product_variants pv ON pv.id = ir.product_variant_id
            WHERE ir.id = ANY($1)
            FOR UPDATE OF ir
            "#,
        )
        .bind(&requested_ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut priced_lines: Vec<(Uuid, i64, Decimal, Decimal)> = Vec::new();
        for line in &input.lines {
            let Some(row) = resolved.iter().find(|r| r.id == line.inventory_id) else {
                // Stale client line reference; not fatal for the sale
                tracing::warn!(inventory_id = %line.inventory_id, "sale line references unknown inventory, skipping");
                continue;
            };
            let line_total = row.price * Decimal::from(line.quantity);
            priced_lines.push((line.inventory_id, line.quantity, row.price, line_total));
        }

        if priced_lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "No sale line references a known inventory record".to_string(),
            });
        }

        for (inventory_id, quantity, _, _) in &priced_lines {
            InventoryService::decrement_by_id(&mut *tx, *inventory_id, *quantity).await?;
        }

        let line_totals: Vec<Decimal> = priced_lines.iter().map(|l| l.3).collect();
        let (subtotal, total) = compute_totals(&line_totals, &input.tax, &discount);

        let sale_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sales (store_id, cashier_id, customer_id, payment_method, tax_mode,
                               tax_value, subtotal_price, total_price, discount_code,
                               discount_percentage)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(input.store_id)
        .bind(cashier_id)
        .bind(input.customer_id)
        .bind(input.payment_method.as_str())
        .bind(input.tax.mode_str())
        .bind(input.tax.value())
        .bind(subtotal)
        .bind(total)
        .bind(discount.code())
        .bind(discount.percent())
        .fetch_one(&mut *tx)
        .await?;

        for (inventory_id, quantity, unit_price, line_total) in &priced_lines {
            sqlx::query(
                "INSERT INTO sale_lines (sale_id, inventory_id, quantity, unit_price, line_total) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(sale_id)
            .bind(inventory_id)
            .bind(quantity)
            .bind(unit_price)
            .bind(line_total)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_sale(sale_id).await
    }

    /// Edit line quantities on an existing sale.
    ///
    /// Only the delta against the stored quantity moves through the ledger,
    /// never the full new quantity.
    pub async fn update_sale(&self, sale_id: Uuid, input: UpdateSaleInput) -> AppResult<SaleDetail> {
        for line in &input.lines {
            validate_quantity(line.quantity).map_err(|msg| AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
            })?;
        }

        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM sales WHERE id = $1 FOR UPDATE")
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        for edit in &input.lines {
            let line = sqlx::query_as::<_, SaleLineRow>(&format!(
                "SELECT {SALE_LINE_COLUMNS} FROM sale_lines \
                 WHERE id = $1 AND sale_id = $2 FOR UPDATE",
            ))
            .bind(edit.line_id)
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(line) = line else {
                tracing::warn!(line_id = %edit.line_id, "sale line not found, skipping edit");
                continue;
            };

            let delta = quantity_delta(line.quantity, edit.quantity);
            if delta > 0 {
                if InventoryService::decrement_by_id(&mut *tx, line.inventory_id, delta)
                    .await?
                    .is_none()
                {
                    tracing::warn!(inventory_id = %line.inventory_id, "inventory row gone, edit applied without stock movement");
                }
            } else if delta < 0 {
                if !InventoryService::increment_by_id(&mut *tx, line.inventory_id, -delta).await? {
                    tracing::warn!(inventory_id = %line.inventory_id, "inventory row gone, edit applied without stock movement");
                }
            }

            sqlx::query(
                "UPDATE sale_lines SET quantity = $2, line_total = unit_price * $2 WHERE id = $1",
            )
            .bind(line.id)
            .bind(edit.quantity)
            .execute(&mut *tx)
            .await?;
        }

        Self::recompute_totals(&mut *tx, sale_id).await?;
        tx.commit().await?;

        self.get_sale(sale_id).await
    }

    /// Add a line to an existing sale, decrementing its inventory
    pub async fn add_line(&self, sale_id: Uuid, input: SaleLineInput) -> AppResult<SaleDetail> {
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM sales WHERE id = $1)")
            .bind(sale_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Sale".to_string()));
        }

        // Lock the stock row, then price from the authoritative source
        let product_variant_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT product_variant_id FROM inventory_records WHERE id = $1 FOR UPDATE",
        )
        .bind(input.inventory_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        let price = self.pricing.current_price(product_variant_id).await?;

        InventoryService::decrement_by_id(&mut *tx, input.inventory_id, input.quantity).await?;

        sqlx::query(
            "INSERT INTO sale_lines (sale_id, inventory_id, quantity, unit_price, line_total) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(sale_id)
        .bind(input.inventory_id)
        .bind(input.quantity)
        .bind(price)
        .bind(price * Decimal::from(input.quantity))
        .execute(&mut *tx)
        .await?;

        Self::recompute_totals(&mut *tx, sale_id).await?;
        tx.commit().await?;

        self.get_sale(sale_id).await
    }

    /// Delete a line, restoring its quantity to the ledger first
    pub async fn delete_line(&self, sale_id: Uuid, line_id: Uuid) -> AppResult<SaleDetail> {
        let mut tx = self.db.begin().await?;

        let line = sqlx::query_as::<_, SaleLineRow>(&format!(
            "SELECT {SALE_LINE_COLUMNS} FROM sale_lines WHERE id = $1 AND sale_id = $2 FOR UPDATE",
        ))
        .bind(line_id)
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale line".to_string()))?;

        if !InventoryService::increment_by_id(&mut *tx, line.inventory_id, line.quantity).await? {
            tracing::warn!(inventory_id = %line.inventory_id, "inventory row gone, line removed without restock");
        }

        sqlx::query("DELETE FROM sale_lines WHERE id = $1")
            .bind(line.id)
            .execute(&mut *tx)
            .await?;

        Self::recompute_totals(&mut *tx, sale_id).await?;
        tx.commit().await?;

        self.get_sale(sale_id).await
    }

    /// Get a sale with its lines
    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<SaleDetail> {
        let sale = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = $1",
        ))
        .bind(sale_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let lines = sqlx::query_as::<_, SaleLineRow>(&format!(
            "SELECT {SALE_LINE_COLUMNS} FROM sale_lines WHERE sale_id = $1 ORDER BY id",
        ))
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(SaleDetail {
            sale: sale.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        })
    }

    /// List a store's sales, newest first
    pub async fn list_sales(
        &self,
        store_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Sale>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales WHERE store_id = $1")
            .bind(store_id)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE store_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        ))
        .bind(store_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Into::into).collect(),
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Re-derive header totals from the persisted set of lines
    async fn recompute_totals(conn: &mut PgConnection, sale_id: Uuid) -> AppResult<()> {
        let (tax_mode, tax_value, discount_code, discount_percentage) =
            sqlx::query_as::<_, (String, Decimal, Option<String>, Option<Decimal>)>(
                "SELECT tax_mode, tax_value, discount_code, discount_percentage \
                 FROM sales WHERE id = $1",
            )
            .bind(sale_id)
            .fetch_one(&mut *conn)
            .await?;

        let tax = TaxAmount::from_parts(&tax_mode, tax_value)
            .unwrap_or(TaxAmount::Absolute(tax_value));
        let discount = DiscountSnapshot::from_parts(discount_code, discount_percentage);

        let line_sum = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(line_total), 0) FROM sale_lines WHERE sale_id = $1",
        )
        .bind(sale_id)
        .fetch_one(&mut *conn)
        .await?;

        let (subtotal, total) = compute_totals(&[line_sum], &tax, &discount);

        sqlx::query(
            "UPDATE sales SET subtotal_price = $2, total_price = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(sale_id)
        .bind(subtotal)
        .bind(total)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
