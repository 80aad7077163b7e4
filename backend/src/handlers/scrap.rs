//! HTTP handlers for scrap adjustment endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::Scrap;
use crate::services::scrap::{AddBackInput, AddBackResult, RecordScrapInput, ScrapService};
use crate::AppState;

/// Record a scrap event
pub async fn record_scrap(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordScrapInput>,
) -> AppResult<Json<Scrap>> {
    if !current_user.0.has_permission("scraps", "manage") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ScrapService::new(state.db);
    let scrap = service.record_scrap(input).await?;
    Ok(Json(scrap))
}

/// Get a scrap by id
pub async fn get_scrap(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(scrap_id): Path<Uuid>,
) -> AppResult<Json<Scrap>> {
    let service = ScrapService::new(state.db);
    let scrap = service.get_scrap(scrap_id).await?;
    Ok(Json(scrap))
}

/// Push scrap quantity back into its inventory record
pub async fn add_scrap_to_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(scrap_id): Path<Uuid>,
    Json(input): Json<AddBackInput>,
) -> AppResult<Json<AddBackResult>> {
    if !current_user.0.has_permission("scraps", "manage") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ScrapService::new(state.db);
    let result = service.add_to_inventory(scrap_id, input).await?;
    Ok(Json(result))
}

/// List scraps recorded against an inventory record
pub async fn list_inventory_scraps(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<Vec<Scrap>>> {
    let service = ScrapService::new(state.db);
    let scraps = service.list_for_inventory(inventory_id).await?;
    Ok(Json(scraps))
}
