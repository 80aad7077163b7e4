//! Transactional outbox for deferred side effects
//!
//! Workflow transactions enqueue events here in the same transaction that
//! mutates the ledger; a background worker drains the table after commit.
//! Notification and webhook failures mark the row and are retried, but the
//! ledger state they describe is already durable.

use serde_json::Value;
use sqlx::{FromRow, PgConnection, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::config::OutboxConfig;
use crate::error::AppResult;
use crate::services::notification::NotificationService;

/// Attempts before an event is parked as failed
const MAX_ATTEMPTS: i32 = 5;

/// Seconds before an unfinished claim counts as abandoned and the event
/// becomes claimable again
const REDELIVERY_TIMEOUT_SECS: i64 = 300;

/// Outbox service: in-transaction enqueue plus the draining worker
#[derive(Clone)]
pub struct OutboxService {
    db: PgPool,
    config: OutboxConfig,
    notifications: NotificationService,
}

#[derive(Debug, FromRow)]
struct OutboxRow {
    id: Uuid,
    event_type: String,
    payload: Value,
    attempts: i32,
}

impl OutboxService {
    pub fn new(db: PgPool, config: OutboxConfig) -> Self {
        let notifications = NotificationService::new(db.clone(), config.webhook_url.clone());
        Self {
            db,
            config,
            notifications,
        }
    }

    /// Enqueue an event inside the caller's workflow transaction so the
    /// event becomes visible if and only if the workflow commits.
    pub async fn enqueue(
        conn: &mut PgConnection,
        event_type: &str,
        payload: Value,
    ) -> AppResult<()> {
        sqlx::query("INSERT INTO outbox_events (event_type, payload) VALUES ($1, $2)")
            .bind(event_type)
            .bind(payload)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Poll loop for the background worker task
    pub async fn run(self) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        loop {
            interval.tick().await;
            match self.process_batch(self.config.batch_size).await {
                Ok(0) => {}
                Ok(processed) => tracing::debug!(processed, "drained outbox events"),
                Err(err) => tracing::error!(error = %err, "outbox batch failed"),
            }
        }
    }

    /// Drain up to `limit` pending events.
    ///
    /// Claiming is a short transaction: eligible rows are locked with SKIP
    /// LOCKED and flipped to 'processing' before any dispatch happens, so no
    /// row lock is held across the webhook round trips. Each outcome is then
    /// written in its own statement; a crash mid-batch keeps already-sent
    /// rows marked sent, and the rest are reclaimed after the redelivery
    /// timeout.
    pub async fn process_batch(&self, limit: i64) -> AppResult<usize> {
        let mut tx = self.db.begin().await?;
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            UPDATE outbox_events
            SET status = 'processing', claimed_at = NOW()
            WHERE id IN (
                SELECT id FROM outbox_events
                WHERE attempts < $2
                  AND (status = 'pending'
                       OR (status = 'processing'
                           AND claimed_at < NOW() - $3 * INTERVAL '1 second'))
                ORDER BY created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, event_type, payload, attempts
            "#,
        )
        .bind(limit)
        .bind(MAX_ATTEMPTS)
        .bind(REDELIVERY_TIMEOUT_SECS)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut processed = 0;
        for row in rows {
            match self
                .notifications
                .dispatch_event(&row.event_type, &row.payload)
                .await
            {
                Ok(()) => {
                    sqlx::query(
                        "UPDATE outbox_events \
                         SET status = 'sent', processed_at = NOW(), last_error = NULL \
                         WHERE id = $1",
                    )
                    .bind(row.id)
                    .execute(&self.db)
                    .await?;
                    processed += 1;
                }
                Err(err) => {
                    let attempts = row.attempts + 1;
                    let status = if attempts >= MAX_ATTEMPTS {
                        "failed"
                    } else {
                        "pending"
                    };
                    tracing::warn!(
                        event_id = %row.id,
                        event_type = %row.event_type,
                        attempts,
                        error = %err,
                        "outbox event dispatch failed"
                    );
                    sqlx::query(
                        "UPDATE outbox_events \
                         SET attempts = $2, status = $3, last_error = $4 \
                         WHERE id = $1",
                    )
                    .bind(row.id)
                    .bind(attempts)
                    .bind(status)
                    .bind(err.to_string())
                    .execute(&self.db)
                    .await?;
                }
            }
        }

        Ok(processed)
    }
}
