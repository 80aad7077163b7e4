//! Notification dispatch
//!
//! Fans outbox events out to in-app notifications and an optional webhook.
//! Everything here runs after the triggering transaction has committed and
//! is best-effort: a failure is recorded on the outbox row and retried, it
//! never reaches back into workflow results.

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{PaginatedResponse, Pagination, PaginationMeta};

/// Permission required to receive a transfer at the destination store
pub const RECEIVE_PERMISSION: &str = "transfers:receive";

/// Notification service for in-app notifications and webhook fan-out
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    webhook: Option<WebhookClient>,
}

/// Webhook client for external event listeners
#[derive(Clone)]
pub struct WebhookClient {
    url: String,
    http_client: reqwest::Client,
}

/// An in-app notification row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub event_type: String,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl NotificationService {
    pub fn new(db: PgPool, webhook_url: Option<String>) -> Self {
        let webhook = webhook_url.map(|url| WebhookClient {
            url,
            http_client: reqwest::Client::new(),
        });
        Self { db, webhook }
    }

    /// Route one committed outbox event to its recipients.
    ///
    /// `inventory.upserted` has no human recipients; it exists for external
    /// listeners (cache invalidation and the like) via the webhook.
    pub async fn dispatch_event(&self, event_type: &str, payload: &Value) -> anyhow::Result<()> {
        match event_type {
            "transfer.dispatched" => {
                let transfer_id = payload_uuid(payload, "transfer_id")?;
                let to_store_id = payload_uuid(payload, "to_store_id")?;
                let notified = self
                    .notify_store_staff(
                        to_store_id,
                        RECEIVE_PERMISSION,
                        event_type,
                        "Incoming stock transfer",
                        &format!("Stock transfer {} has been dispatched to your store", transfer_id),
                    )
                    .await?;
                tracing::info!(%transfer_id, notified, "notified receiving staff");
            }
            "transfer.accepted" => {
                let transfer_id = payload_uuid(payload, "transfer_id")?;
                let sender_id = payload_uuid(payload, "sender_id")?;
                self.notify_staff(
                    sender_id,
                    event_type,
                    "Stock transfer received",
                    &format!("Stock transfer {} was accepted at the destination store", transfer_id),
                )
                .await?;
            }
            "transfer.rejected" => {
                let transfer_id = payload_uuid(payload, "transfer_id")?;
                let sender_id = payload_uuid(payload, "sender_id")?;
                let reason = payload
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("no reason given");
                self.notify_staff(
                    sender_id,
                    event_type,
                    "Stock transfer rejected",
                    &format!("Stock transfer {} was rejected: {}", transfer_id, reason),
                )
                .await?;
            }
            "inventory.upserted" => {
                tracing::debug!(?payload, "inventory row touched by transfer accept");
            }
            other => {
                tracing::warn!(event_type = other, "unknown outbox event type, skipping");
            }
        }

        if let Some(webhook) = &self.webhook {
            webhook.post(event_type, payload).await?;
        }

        Ok(())
    }

    /// Notify every staff member of a store holding the given permission
    async fn notify_store_staff(
        &self,
        store_id: Uuid,
        permission: &str,
        event_type: &str,
        title: &str,
        body: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (staff_id, event_type, title, body)
            SELECT id, $2, $3, $4 FROM staff
            WHERE store_id = $1 AND $5 = ANY(permissions)
            "#,
        )
        .bind(store_id)
        .bind(event_type)
        .bind(title)
        .bind(body)
        .bind(permission)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Notify a single staff member
    async fn notify_staff(
        &self,
        staff_id: Uuid,
        event_type: &str,
        title: &str,
        body: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications (staff_id, event_type, title, body) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(staff_id)
        .bind(event_type)
        .bind(title)
        .bind(body)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// List a staff member's notifications, newest first
    pub async fn list_for_staff(
        &self,
        staff_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Notification>> {
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE staff_id = $1")
                .bind(staff_id)
                .fetch_one(&self.db)
                .await?;

        let rows = sqlx::query_as::<_, Notification>(
            "SELECT id, staff_id, event_type, title, body, is_read, created_at \
             FROM notifications WHERE staff_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(staff_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows,
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Mark a notification as read
    pub async fn mark_as_read(&self, staff_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE id = $1 AND staff_id = $2",
        )
        .bind(notification_id)
        .bind(staff_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }

        Ok(())
    }
}

impl WebhookClient {
    async fn post(&self, event_type: &str, payload: &Value) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "event_type": event_type,
            "payload": payload,
        });

        self.http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("webhook request failed")?
            .error_for_status()
            .context("webhook returned an error status")?;

        Ok(())
    }
}

fn payload_uuid(payload: &Value, key: &str) -> anyhow::Result<Uuid> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .context("missing payload field")?
        .parse()
        .context("invalid uuid in payload")
}
