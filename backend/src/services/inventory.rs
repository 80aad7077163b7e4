//! Inventory ledger service
//!
//! Owns the per-(store, product variant) quantity counters. The mutation
//! primitives (`increment`, `decrement`, `set_quantity`) operate on a
//! caller-supplied connection so that multi-step read-modify-write
//! sequences run inside the caller's transaction; the ledger itself takes
//! the row lock (`SELECT ... FOR UPDATE`) but provides no other locking.

use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    apply_decrement, InventoryRecord, InventoryStatus, PaginatedResponse, Pagination,
    PaginationMeta,
};

/// Inventory service for ledger mutations and administrative edits
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Database row for an inventory record
#[derive(Debug, FromRow)]
struct InventoryRow {
    id: Uuid,
    store_id: Uuid,
    product_variant_id: Uuid,
    quantity: i64,
    status: String,
    serial_number: Option<String>,
    batch_number: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<InventoryRow> for InventoryRecord {
    fn from(row: InventoryRow) -> Self {
        InventoryRecord {
            id: row.id,
            store_id: row.store_id,
            product_variant_id: row.product_variant_id,
            quantity: row.quantity,
            status: InventoryStatus::from_str(&row.status).unwrap_or(InventoryStatus::OutOfStock),
            serial_number: row.serial_number,
            batch_number: row.batch_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const INVENTORY_COLUMNS: &str = "id, store_id, product_variant_id, quantity, status, \
                                 serial_number, batch_number, created_at, updated_at";

/// Input for creating an inventory record
#[derive(Debug, Deserialize)]
pub struct CreateInventoryInput {
    pub store_id: Uuid,
    pub product_variant_id: Uuid,
    pub quantity: i64,
    pub serial_number: Option<String>,
    pub batch_number: Option<String>,
}

/// Input for administrative edits to an inventory record
#[derive(Debug, Deserialize)]
pub struct UpdateInventoryInput {
    /// Absolute override of the quantity
    pub quantity: Option<i64>,
    pub serial_number: Option<String>,
    pub batch_number: Option<String>,
}

/// Input for a direct ledger adjustment on a (store, variant) counter
#[derive(Debug, Deserialize)]
pub struct AdjustInventoryInput {
    pub op: AdjustOp,
    pub amount: i64,
}

/// Ledger operation selected by an administrative adjustment
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdjustOp {
    Increment,
    Decrement,
    Set,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Ledger primitives (caller provides the transaction)
    // ========================================================================

    /// Add quantity to a (store, variant) counter, creating the row at the
    /// given amount if it does not exist yet. Always succeeds.
    pub async fn increment(
        conn: &mut PgConnection,
        store_id: Uuid,
        product_variant_id: Uuid,
        amount: i64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_records (store_id, product_variant_id, quantity, status)
            VALUES ($1, $2, $3, CASE WHEN $3 > 0 THEN 'available' ELSE 'out_of_stock' END)
            ON CONFLICT (store_id, product_variant_id) DO UPDATE
            SET quantity = inventory_records.quantity + EXCLUDED.quantity,
                status = CASE WHEN inventory_records.quantity + EXCLUDED.quantity > 0
                              THEN 'available' ELSE 'out_of_stock' END,
                updated_at = NOW()
            "#,
        )
        .bind(store_id)
        .bind(product_variant_id)
        .bind(amount)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Subtract quantity from a (store, variant) counter, clamping at zero.
    ///
    /// Returns whether the full amount was applied. Insufficient stock is
    /// not an error; the counter simply bottoms out at zero.
    pub async fn decrement(
        conn: &mut PgConnection,
        store_id: Uuid,
        product_variant_id: Uuid,
        amount: i64,
    ) -> AppResult<bool> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM inventory_records WHERE store_id = $1 AND product_variant_id = $2",
        )
        .bind(store_id)
        .bind(product_variant_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        Self::decrement_by_id(conn, id, amount)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))
    }

    /// Clamped decrement keyed by inventory row id.
    ///
    /// Returns `None` when the row no longer exists so workflow callers can
    /// skip stale line references instead of failing the whole operation.
    pub async fn decrement_by_id(
        conn: &mut PgConnection,
        inventory_id: Uuid,
        amount: i64,
    ) -> AppResult<Option<bool>> {
        let current = sqlx::query_scalar::<_, i64>(
            "SELECT quantity FROM inventory_records WHERE id = $1 FOR UPDATE",
        )
        .bind(inventory_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        let (new_quantity, fully_applied) = apply_decrement(current, amount);
        if !fully_applied {
            tracing::warn!(
                %inventory_id,
                current,
                amount,
                "decrement exceeds on-hand quantity, clamping to zero"
            );
        }

        Self::write_quantity(conn, inventory_id, new_quantity).await?;
        Ok(Some(fully_applied))
    }

    /// Add quantity back to an inventory row by id.
    ///
    /// Returns whether the row existed.
    pub async fn increment_by_id(
        conn: &mut PgConnection,
        inventory_id: Uuid,
        amount: i64,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_records
            SET quantity = quantity + $2,
                status = CASE WHEN quantity + $2 > 0 THEN 'available' ELSE 'out_of_stock' END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(inventory_id)
        .bind(amount)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Absolute set, used for administrative overrides
    pub async fn set_quantity(
        conn: &mut PgConnection,
        store_id: Uuid,
        product_variant_id: Uuid,
        amount: i64,
    ) -> AppResult<()> {
        if amount < 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity cannot be negative".to_string(),
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE inventory_records
            SET quantity = $3,
                status = CASE WHEN $3 > 0 THEN 'available' ELSE 'out_of_stock' END,
                updated_at = NOW()
            WHERE store_id = $1 AND product_variant_id = $2
            "#,
        )
        .bind(store_id)
        .bind(product_variant_id)
        .bind(amount)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Inventory record".to_string()));
        }

        Ok(())
    }

    async fn write_quantity(
        conn: &mut PgConnection,
        inventory_id: Uuid,
        quantity: i64,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE inventory_records SET quantity = $2, status = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(inventory_id)
        .bind(quantity)
        .bind(InventoryStatus::from_quantity(quantity).as_str())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    // ========================================================================
    // Administrative CRUD
    // ========================================================================

    /// Apply one ledger operation to a (store, variant) counter.
    ///
    /// This is the surface behind administrative corrections and batch
    /// imports: increment always succeeds (creating the row if needed),
    /// decrement clamps at zero, set is an absolute override.
    pub async fn adjust(
        &self,
        store_id: Uuid,
        product_variant_id: Uuid,
        input: AdjustInventoryInput,
    ) -> AppResult<InventoryRecord> {
        if input.amount < 0 {
            return Err(AppError::Validation {
                field: "amount".to_string(),
                message: "Adjustment amount cannot be negative".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;
        match input.op {
            AdjustOp::Increment => {
                Self::increment(&mut *tx, store_id, product_variant_id, input.amount).await?;
            }
            AdjustOp::Decrement => {
                Self::decrement(&mut *tx, store_id, product_variant_id, input.amount).await?;
            }
            AdjustOp::Set => {
                Self::set_quantity(&mut *tx, store_id, product_variant_id, input.amount).await?;
            }
        }
        tx.commit().await?;

        self.get_by_store_and_variant(store_id, product_variant_id)
            .await
    }

    /// Create an inventory record for a (store, variant) pair
    pub async fn create_record(&self, input: CreateInventoryInput) -> AppResult<InventoryRecord> {
        if input.quantity < 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity cannot be negative".to_string(),
            });
        }

        // Serialized variants must carry a serial number
        let is_serialized = sqlx::query_scalar::<_, bool>(
            "SELECT is_serialized FROM product_variants WHERE id = $1",
        )
        .bind(input.product_variant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product variant".to_string()))?;

        if is_serialized && input.serial_number.is_none() {
            return Err(AppError::Validation {
                field: "serial_number".to_string(),
                message: "Serial number is required for serialized variants".to_string(),
            });
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventory_records \
             WHERE store_id = $1 AND product_variant_id = $2)",
        )
        .bind(input.store_id)
        .bind(input.product_variant_id)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry("inventory record".to_string()));
        }

        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            INSERT INTO inventory_records (store_id, product_variant_id, quantity, status,
                                           serial_number, batch_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INVENTORY_COLUMNS}
            "#,
        ))
        .bind(input.store_id)
        .bind(input.product_variant_id)
        .bind(input.quantity)
        .bind(InventoryStatus::from_quantity(input.quantity).as_str())
        .bind(&input.serial_number)
        .bind(&input.batch_number)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Administrative edit: absolute quantity override and identification
    /// fields. Workflow mutations go through the ledger primitives instead.
    pub async fn update_record(
        &self,
        inventory_id: Uuid,
        input: UpdateInventoryInput,
    ) -> AppResult<InventoryRecord> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_records WHERE id = $1 FOR UPDATE",
        ))
        .bind(inventory_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        let quantity = input.quantity.unwrap_or(existing.quantity);
        if quantity < 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity cannot be negative".to_string(),
            });
        }

        let serial_number = input.serial_number.or(existing.serial_number);
        let batch_number = input.batch_number.or(existing.batch_number);

        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            UPDATE inventory_records
            SET quantity = $2, status = $3, serial_number = $4, batch_number = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {INVENTORY_COLUMNS}
            "#,
        ))
        .bind(inventory_id)
        .bind(quantity)
        .bind(InventoryStatus::from_quantity(quantity).as_str())
        .bind(&serial_number)
        .bind(&batch_number)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Get an inventory record by id
    pub async fn get_record(&self, inventory_id: Uuid) -> AppResult<InventoryRecord> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_records WHERE id = $1",
        ))
        .bind(inventory_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        Ok(row.into())
    }

    /// Get the record for a (store, variant) pair
    pub async fn get_by_store_and_variant(
        &self,
        store_id: Uuid,
        product_variant_id: Uuid,
    ) -> AppResult<InventoryRecord> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_records \
             WHERE store_id = $1 AND product_variant_id = $2",
        ))
        .bind(store_id)
        .bind(product_variant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        Ok(row.into())
    }

    /// List a store's inventory, paginated
    pub async fn list_store_inventory(
        &self,
        store_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<InventoryRecord>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM inventory_records WHERE store_id = $1",
        )
        .bind(store_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_records \
             WHERE store_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
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
}
