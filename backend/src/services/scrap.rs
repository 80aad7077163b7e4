//! Scrap adjuster
//!
//! Records damaged/returned/other stock adjustments outside the sales
//! channel. Repeated events for the same merge key accumulate on one row
//! via an upsert against partial unique indexes: (inventory, type) for
//! damaged/other, (inventory, type, customer) for returns. Returns do not
//! touch the ledger at creation; stock only comes back through the
//! explicit add-back operation.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{clamp_add_back, Scrap, ScrapType};
use crate::services::customer::CustomerService;
use crate::services::inventory::InventoryService;
use shared::validation::validate_quantity;

/// Scrap service for non-sale inventory adjustments
#[derive(Clone)]
pub struct ScrapService {
    db: PgPool,
    customers: CustomerService,
}

#[derive(Debug, FromRow)]
struct ScrapRow {
    id: Uuid,
    inventory_id: Uuid,
    scrap_type: String,
    customer_id: Option<Uuid>,
    quantity: i64,
    comment: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ScrapRow> for Scrap {
    fn from(row: ScrapRow) -> Self {
        Scrap {
            id: row.id,
            inventory_id: row.inventory_id,
            scrap_type: ScrapType::from_str(&row.scrap_type).unwrap_or(ScrapType::Other),
            customer_id: row.customer_id,
            quantity: row.quantity,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SCRAP_COLUMNS: &str =
    "id, inventory_id, scrap_type, customer_id, quantity, comment, created_at, updated_at";

/// Input for recording a scrap event
#[derive(Debug, Deserialize)]
pub struct RecordScrapInput {
    pub inventory_id: Uuid,
    pub scrap_type: ScrapType,
    pub quantity: i64,
    pub comment: Option<String>,
    /// Existing customer for a return
    pub customer_id: Option<Uuid>,
    /// Contact details to resolve a customer when no id is given
    pub customer: Option<CustomerContactInput>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerContactInput {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Input for pushing scrap quantity back into inventory
#[derive(Debug, Deserialize)]
pub struct AddBackInput {
    /// Defaults to the scrap's full quantity
    pub quantity: Option<i64>,
}

/// Result of an add-back: the quantity moved and what is left of the scrap
#[derive(Debug, Serialize)]
pub struct AddBackResult {
    pub moved_quantity: i64,
    /// None when the scrap was fully consumed and deleted
    pub scrap: Option<Scrap>,
}

impl ScrapService {
    /// Create a new ScrapService instance
    pub fn new(db: PgPool) -> Self {
        let customers = CustomerService::new(db.clone());
        Self { db, customers }
    }

    /// Record a scrap event, accumulating onto an existing row when the
    /// merge key matches.
    pub async fn record_scrap(&self, input: RecordScrapInput) -> AppResult<Scrap> {
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;

        let inventory_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventory_records WHERE id = $1)",
        )
        .bind(input.inventory_id)
        .fetch_one(&self.db)
        .await?;
        if !inventory_exists {
            return Err(AppError::NotFound("Inventory record".to_string()));
        }

        if input.scrap_type.merges_per_customer() {
            self.record_returned(input).await
        } else {
            self.record_non_returned(input).await
        }
    }

    /// Returned branch: the customer is part of the merge key and the
    /// ledger is left alone until an add-back restocks the quantity.
    async fn record_returned(&self, input: RecordScrapInput) -> AppResult<Scrap> {
        let customer_id = match (input.customer_id, &input.customer) {
            (Some(id), _) => self.customers.get(id).await?.id,
            (None, Some(contact)) => {
                self.customers
                    .find_or_create(&contact.email, &contact.phone, &contact.name)
                    .await?
                    .id
            }
            (None, None) => {
                return Err(AppError::Validation {
                    field: "customer".to_string(),
                    message: "A returned scrap requires a customer".to_string(),
                })
            }
        };

        let row = sqlx::query_as::<_, ScrapRow>(&format!(
            r#"
            INSERT INTO scraps (inventory_id, scrap_type, customer_id, quantity, comment)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (inventory_id, scrap_type, customer_id) WHERE customer_id IS NOT NULL
            DO UPDATE SET quantity = scraps.quantity + EXCLUDED.quantity,
                          comment = COALESCE(EXCLUDED.comment, scraps.comment),
                          updated_at = NOW()
            RETURNING {SCRAP_COLUMNS}
            "#,
        ))
        .bind(input.inventory_id)
        .bind(input.scrap_type.as_str())
        .bind(customer_id)
        .bind(input.quantity)
        .bind(&input.comment)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Damaged/other branch: accumulate and decrement the ledger in one
    /// transaction.
    async fn record_non_returned(&self, input: RecordScrapInput) -> AppResult<Scrap> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ScrapRow>(&format!(
            r#"
            INSERT INTO scraps (inventory_id, scrap_type, quantity, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (inventory_id, scrap_type) WHERE customer_id IS NULL
            DO UPDATE SET quantity = scraps.quantity + EXCLUDED.quantity,
                          comment = COALESCE(EXCLUDED.comment, scraps.comment),
                          updated_at = NOW()
            RETURNING {SCRAP_COLUMNS}
            "#,
        ))
        .bind(input.inventory_id)
        .bind(input.scrap_type.as_str())
        .bind(input.quantity)
        .bind(&input.comment)
        .fetch_one(&mut *tx)
        .await?;

        if InventoryService::decrement_by_id(&mut *tx, input.inventory_id, input.quantity)
            .await?
            .is_none()
        {
            tracing::warn!(inventory_id = %input.inventory_id, "inventory row vanished while recording scrap");
        }

        tx.commit().await?;

        Ok(row.into())
    }

    /// Push scrap quantity back into the associated inventory record,
    /// deleting the scrap when fully consumed.
    pub async fn add_to_inventory(
        &self,
        scrap_id: Uuid,
        input: AddBackInput,
    ) -> AppResult<AddBackResult> {
        if let Some(requested) = input.quantity {
            validate_quantity(requested).map_err(|msg| AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
            })?;
        }

        let mut tx = self.db.begin().await?;

        let scrap = sqlx::query_as::<_, ScrapRow>(&format!(
            "SELECT {SCRAP_COLUMNS} FROM scraps WHERE id = $1 FOR UPDATE",
        ))
        .bind(scrap_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Scrap".to_string()))?;

        let moved = clamp_add_back(scrap.quantity, input.quantity);

        if !InventoryService::increment_by_id(&mut *tx, scrap.inventory_id, moved).await? {
            return Err(AppError::NotFound("Inventory record".to_string()));
        }

        let remaining = scrap.quantity - moved;
        let result = if remaining == 0 {
            sqlx::query("DELETE FROM scraps WHERE id = $1")
                .bind(scrap.id)
                .execute(&mut *tx)
                .await?;
            AddBackResult {
                moved_quantity: moved,
                scrap: None,
            }
        } else {
            let row = sqlx::query_as::<_, ScrapRow>(&format!(
                "UPDATE scraps SET quantity = $2, updated_at = NOW() WHERE id = $1 \
                 RETURNING {SCRAP_COLUMNS}",
            ))
            .bind(scrap.id)
            .bind(remaining)
            .fetch_one(&mut *tx)
            .await?;
            AddBackResult {
                moved_quantity: moved,
                scrap: Some(row.into()),
            }
        };

        tx.commit().await?;
        Ok(result)
    }

    /// Get a scrap by id
    pub async fn get_scrap(&self, scrap_id: Uuid) -> AppResult<Scrap> {
        let row = sqlx::query_as::<_, ScrapRow>(&format!(
            "SELECT {SCRAP_COLUMNS} FROM scraps WHERE id = $1",
        ))
        .bind(scrap_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Scrap".to_string()))?;

        Ok(row.into())
    }

    /// List scraps recorded against an inventory record
    pub async fn list_for_inventory(&self, inventory_id: Uuid) -> AppResult<Vec<Scrap>> {
        let rows = sqlx::query_as::<_, ScrapRow>(&format!(
            "SELECT {SCRAP_COLUMNS} FROM scraps WHERE inventory_id = $1 ORDER BY created_at DESC",
        ))
        .bind(inventory_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
