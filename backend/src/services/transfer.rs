//! Stock transfer state machine
//!
//! Moves quantity between two stores' ledgers through the lifecycle
//! new → dispatched → accepted | rejected. The service enforces ordering
//! (`TransferStatus` transitions) and data invariants; permission checks
//! belong to the caller's policy gate. Inventory mutations run inside the
//! transition transaction; only notifications and domain events are
//! deferred through the outbox.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    PaginatedResponse, Pagination, PaginationMeta, StockTransfer, StockTransferLine,
    TransferStatus,
};
use crate::services::inventory::InventoryService;
use crate::services::outbox::OutboxService;
use shared::validation::{validate_phone, validate_quantity, validate_rejection_reason};

/// Stock transfer service
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct TransferRow {
    id: Uuid,
    from_store_id: Uuid,
    to_store_id: Uuid,
    sender_id: Uuid,
    receiver_id: Option<Uuid>,
    driver_name: Option<String>,
    driver_phone: Option<String>,
    status: String,
    dispatched_at: Option<chrono::DateTime<chrono::Utc>>,
    accepted_at: Option<chrono::DateTime<chrono::Utc>>,
    rejected_at: Option<chrono::DateTime<chrono::Utc>>,
    rejection_reason: Option<String>,
    comment: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<TransferRow> for StockTransfer {
    fn from(row: TransferRow) -> Self {
        StockTransfer {
            id: row.id,
            from_store_id: row.from_store_id,
            to_store_id: row.to_store_id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            driver_name: row.driver_name,
            driver_phone: row.driver_phone,
            status: TransferStatus::from_str(&row.status).unwrap_or(TransferStatus::New),
            dispatched_at: row.dispatched_at,
            accepted_at: row.accepted_at,
            rejected_at: row.rejected_at,
            rejection_reason: row.rejection_reason,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TransferLineRow {
    id: Uuid,
    transfer_id: Uuid,
    inventory_id: Uuid,
    quantity: i64,
}

impl From<TransferLineRow> for StockTransferLine {
    fn from(row: TransferLineRow) -> Self {
        StockTransferLine {
            id: row.id,
            transfer_id: row.transfer_id,
            inventory_id: row.inventory_id,
            quantity: row.quantity,
        }
    }
}

const TRANSFER_COLUMNS: &str = "id, from_store_id, to_store_id, sender_id, receiver_id, \
                                driver_name, driver_phone, status, dispatched_at, accepted_at, \
                                rejected_at, rejection_reason, comment, created_at, updated_at";

const TRANSFER_LINE_COLUMNS: &str = "id, transfer_id, inventory_id, quantity";

/// Input for creating a transfer
#[derive(Debug, Deserialize)]
pub struct CreateTransferInput {
    pub from_store_id: Uuid,
    pub to_store_id: Uuid,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub comment: Option<String>,
    pub lines: Vec<TransferLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct TransferLineInput {
    pub inventory_id: Uuid,
    pub quantity: i64,
}

/// Input for rejecting a transfer
#[derive(Debug, Deserialize)]
pub struct RejectTransferInput {
    pub reason: String,
}

/// A transfer with its lines
#[derive(Debug, Serialize)]
pub struct TransferDetail {
    pub transfer: StockTransfer,
    pub lines: Vec<StockTransferLine>,
}

impl TransferService {
    /// Create a new TransferService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a transfer in the `new` state.
    ///
    /// Lines are upserted on (transfer, inventory): resubmitting the same
    /// inventory row within one request replaces the quantity instead of
    /// duplicating the line. Stock stays physically at the source store;
    /// the ledger is untouched until dispatch.
    pub async fn create_transfer(
        &self,
        sender_id: Uuid,
        input: CreateTransferInput,
    ) -> AppResult<TransferDetail> {
        if input.from_store_id == input.to_store_id {
            return Err(AppError::Validation {
                field: "to_store_id".to_string(),
                message: "Source and destination stores must differ".to_string(),
            });
        }
        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "A transfer requires at least one line".to_string(),
            });
        }
        for line in &input.lines {
            validate_quantity(line.quantity).map_err(|msg| AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
            })?;
        }
        if let Some(phone) = &input.driver_phone {
            validate_phone(phone).map_err(|msg| AppError::Validation {
                field: "driver_phone".to_string(),
                message: msg.to_string(),
            })?;
        }

        let mut tx = self.db.begin().await?;

        let transfer_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stock_transfers (from_store_id, to_store_id, sender_id, driver_name,
                                         driver_phone, status, comment)
            VALUES ($1, $2, $3, $4, $5, 'new', $6)
            RETURNING id
            "#,
        )
        .bind(input.from_store_id)
        .bind(input.to_store_id)
        .bind(sender_id)
        .bind(&input.driver_name)
        .bind(&input.driver_phone)
        .bind(&input.comment)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.lines {
            Self::upsert_line(&mut tx, transfer_id, input.from_store_id, line).await?;
        }

        tx.commit().await?;

        self.get_transfer(transfer_id).await
    }

    /// Add or replace a line while the transfer is still `new`
    pub async fn add_line(
        &self,
        transfer_id: Uuid,
        input: TransferLineInput,
    ) -> AppResult<TransferDetail> {
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;
        let transfer = Self::lock_transfer(&mut tx, transfer_id).await?;
        let status = TransferStatus::from_str(&transfer.status).unwrap_or(TransferStatus::New);

        if !matches!(status, TransferStatus::New) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot edit lines of a transfer in status {}",
                status.as_str()
            )));
        }

        Self::upsert_line(&mut tx, transfer_id, transfer.from_store_id, &input).await?;

        tx.commit().await?;
        self.get_transfer(transfer_id).await
    }

    /// Dispatch: new → dispatched.
    ///
    /// The source-store decrement is consistency critical, so it runs in
    /// the same transaction as the status flip; only the notification to
    /// receiving staff goes through the outbox.
    pub async fn dispatch(&self, transfer_id: Uuid) -> AppResult<TransferDetail> {
        let mut tx = self.db.begin().await?;
        let transfer = Self::lock_transfer(&mut tx, transfer_id).await?;
        let status = TransferStatus::from_str(&transfer.status).unwrap_or(TransferStatus::New);

        if !status.can_dispatch() {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot dispatch a transfer in status {}",
                status.as_str()
            )));
        }

        sqlx::query(
            "UPDATE stock_transfers SET status = 'dispatched', dispatched_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(transfer_id)
        .execute(&mut *tx)
        .await?;

        let lines = sqlx::query_as::<_, TransferLineRow>(&format!(
            "SELECT {TRANSFER_LINE_COLUMNS} FROM stock_transfer_lines WHERE transfer_id = $1",
        ))
        .bind(transfer_id)
        .fetch_all(&mut *tx)
        .await?;

        for line in &lines {
            if InventoryService::decrement_by_id(&mut *tx, line.inventory_id, line.quantity)
                .await?
                .is_none()
            {
                tracing::warn!(
                    inventory_id = %line.inventory_id,
                    "transfer line references missing inventory, skipping decrement"
                );
            }
        }

        OutboxService::enqueue(
            &mut *tx,
            "transfer.dispatched",
            serde_json::json!({
                "transfer_id": transfer_id.to_string(),
                "from_store_id": transfer.from_store_id.to_string(),
                "to_store_id": transfer.to_store_id.to_string(),
                "sender_id": transfer.sender_id.to_string(),
            }),
        )
        .await?;

        tx.commit().await?;
        self.get_transfer(transfer_id).await
    }

    /// Accept: dispatched → accepted.
    ///
    /// The destination ledger is reconciled with one set-based upsert that
    /// groups lines by product variant, so two lines targeting the same
    /// (store, variant) pair merge into a single write instead of racing.
    pub async fn accept(&self, transfer_id: Uuid, receiver_id: Uuid) -> AppResult<TransferDetail> {
        let mut tx = self.db.begin().await?;
        let transfer = Self::lock_transfer(&mut tx, transfer_id).await?;
        let status = TransferStatus::from_str(&transfer.status).unwrap_or(TransferStatus::New);

        if !status.can_accept() {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot accept a transfer in status {}",
                status.as_str()
            )));
        }

        sqlx::query(
            "UPDATE stock_transfers SET status = 'accepted', accepted_at = NOW(), \
             receiver_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(transfer_id)
        .bind(receiver_id)
        .execute(&mut *tx)
        .await?;

        // Lines whose source inventory row vanished have no variant to
        // credit; they drop out of the join below.
        let orphaned = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM stock_transfer_lines l
            LEFT JOIN inventory_records src ON src.id = l.inventory_id
            WHERE l.transfer_id = $1 AND src.id IS NULL
            "#,
        )
        .bind(transfer_id)
        .fetch_one(&mut *tx)
        .await?;
        if orphaned > 0 {
            tracing::warn!(%transfer_id, orphaned, "transfer lines reference missing inventory, skipped");
        }

        let touched = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            INSERT INTO inventory_records (store_id, product_variant_id, quantity, status)
            SELECT $2, src.product_variant_id, SUM(l.quantity),
                   CASE WHEN SUM(l.quantity) > 0 THEN 'available' ELSE 'out_of_stock' END
            FROM stock_transfer_lines l
            JOIN inventory_records src ON src.id = l.inventory_id
            WHERE l.transfer_id = $1
            GROUP BY src.product_variant_id
            ON CONFLICT (store_id, product_variant_id) DO UPDATE
            SET quantity = inventory_records.quantity + EXCLUDED.quantity,
                status = CASE WHEN inventory_records.quantity + EXCLUDED.quantity > 0
                              THEN 'available' ELSE 'out_of_stock' END,
                updated_at = NOW()
            RETURNING id, product_variant_id
            "#,
        )
        .bind(transfer_id)
        .bind(transfer.to_store_id)
        .fetch_all(&mut *tx)
        .await?;

        for (inventory_id, product_variant_id) in &touched {
            OutboxService::enqueue(
                &mut *tx,
                "inventory.upserted",
                serde_json::json!({
                    "inventory_id": inventory_id.to_string(),
                    "store_id": transfer.to_store_id.to_string(),
                    "product_variant_id": product_variant_id.to_string(),
                }),
            )
            .await?;
        }

        OutboxService::enqueue(
            &mut *tx,
            "transfer.accepted",
            serde_json::json!({
                "transfer_id": transfer_id.to_string(),
                "sender_id": transfer.sender_id.to_string(),
                "to_store_id": transfer.to_store_id.to_string(),
            }),
        )
        .await?;

        tx.commit().await?;
        self.get_transfer(transfer_id).await
    }

    /// Reject: new | dispatched → rejected.
    ///
    /// A dispatched transfer already took stock out of the source store;
    /// rejection puts it back in the same transaction so the quantity is
    /// never stranded between stores.
    pub async fn reject(
        &self,
        transfer_id: Uuid,
        input: RejectTransferInput,
    ) -> AppResult<TransferDetail> {
        validate_rejection_reason(&input.reason).map_err(|msg| AppError::Validation {
            field: "reason".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;
        let transfer = Self::lock_transfer(&mut tx, transfer_id).await?;
        let status = TransferStatus::from_str(&transfer.status).unwrap_or(TransferStatus::New);

        if !status.can_reject() {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot reject a transfer in status {}",
                status.as_str()
            )));
        }

        if matches!(status, TransferStatus::Dispatched) {
            let lines = sqlx::query_as::<_, TransferLineRow>(&format!(
                "SELECT {TRANSFER_LINE_COLUMNS} FROM stock_transfer_lines WHERE transfer_id = $1",
            ))
            .bind(transfer_id)
            .fetch_all(&mut *tx)
            .await?;

            for line in &lines {
                if !InventoryService::increment_by_id(&mut *tx, line.inventory_id, line.quantity)
                    .await?
                {
                    tracing::warn!(
                        inventory_id = %line.inventory_id,
                        "cannot restore rejected transfer line, inventory row missing"
                    );
                }
            }
        }

        sqlx::query(
            "UPDATE stock_transfers SET status = 'rejected', rejected_at = NOW(), \
             accepted_at = NULL, rejection_reason = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(transfer_id)
        .bind(&input.reason)
        .execute(&mut *tx)
        .await?;

        OutboxService::enqueue(
            &mut *tx,
            "transfer.rejected",
            serde_json::json!({
                "transfer_id": transfer_id.to_string(),
                "sender_id": transfer.sender_id.to_string(),
                "reason": input.reason,
            }),
        )
        .await?;

        tx.commit().await?;
        self.get_transfer(transfer_id).await
    }

    /// Remove a line while the transfer is still mutable, reversing the
    /// source decrement if the transfer was already dispatched.
    pub async fn delete_line(&self, transfer_id: Uuid, line_id: Uuid) -> AppResult<TransferDetail> {
        let mut tx = self.db.begin().await?;
        let transfer = Self::lock_transfer(&mut tx, transfer_id).await?;
        let status = TransferStatus::from_str(&transfer.status).unwrap_or(TransferStatus::New);

        if !status.lines_mutable() {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot edit lines of a transfer in status {}",
                status.as_str()
            )));
        }

        let line = sqlx::query_as::<_, TransferLineRow>(&format!(
            "SELECT {TRANSFER_LINE_COLUMNS} FROM stock_transfer_lines \
             WHERE id = $1 AND transfer_id = $2 FOR UPDATE",
        ))
        .bind(line_id)
        .bind(transfer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer line".to_string()))?;

        if matches!(status, TransferStatus::Dispatched) {
            if !InventoryService::increment_by_id(&mut *tx, line.inventory_id, line.quantity)
                .await?
            {
                tracing::warn!(
                    inventory_id = %line.inventory_id,
                    "cannot restore deleted transfer line, inventory row missing"
                );
            }
        }

        sqlx::query("DELETE FROM stock_transfer_lines WHERE id = $1")
            .bind(line.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.get_transfer(transfer_id).await
    }

    /// Get a transfer with its lines
    pub async fn get_transfer(&self, transfer_id: Uuid) -> AppResult<TransferDetail> {
        let transfer = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers WHERE id = $1",
        ))
        .bind(transfer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transfer".to_string()))?;

        let lines = sqlx::query_as::<_, TransferLineRow>(&format!(
            "SELECT {TRANSFER_LINE_COLUMNS} FROM stock_transfer_lines \
             WHERE transfer_id = $1 ORDER BY id",
        ))
        .bind(transfer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(TransferDetail {
            transfer: transfer.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        })
    }

    /// List transfers touching a store (as source or destination)
    pub async fn list_for_store(
        &self,
        store_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockTransfer>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_transfers WHERE from_store_id = $1 OR to_store_id = $1",
        )
        .bind(store_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers \
             WHERE from_store_id = $1 OR to_store_id = $1 \
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

    /// Lock the transfer header for a state transition
    async fn lock_transfer(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        transfer_id: Uuid,
    ) -> AppResult<TransferRow> {
        sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers WHERE id = $1 FOR UPDATE",
        ))
        .bind(transfer_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transfer".to_string()))
    }

    /// Upsert one transfer line, validating that the inventory row belongs
    /// to the source store.
    async fn upsert_line(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        transfer_id: Uuid,
        from_store_id: Uuid,
        line: &TransferLineInput,
    ) -> AppResult<()> {
        let store_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT store_id FROM inventory_records WHERE id = $1",
        )
        .bind(line.inventory_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        if store_id != from_store_id {
            return Err(AppError::Validation {
                field: "inventory_id".to_string(),
                message: "Transfer lines must reference inventory at the source store".to_string(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO stock_transfer_lines (transfer_id, inventory_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (transfer_id, inventory_id) DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(transfer_id)
        .bind(line.inventory_id)
        .bind(line.quantity)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
