//! HTTP handlers for in-app notification endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::PaginationQuery;
use crate::middleware::CurrentUser;
use crate::models::PaginatedResponse;
use crate::services::notification::{Notification, NotificationService};
use crate::AppState;

/// List the current staff member's notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<PaginationQuery>,
) -> AppResult<Json<PaginatedResponse<Notification>>> {
    let service = NotificationService::new(state.db, state.config.outbox.webhook_url.clone());
    let page = service
        .list_for_staff(current_user.0.staff_id, query.into_pagination())
        .await?;
    Ok(Json(page))
}

/// Mark a notification as read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = NotificationService::new(state.db, state.config.outbox.webhook_url.clone());
    service
        .mark_as_read(current_user.0.staff_id, notification_id)
        .await?;
    Ok(Json(()))
}
