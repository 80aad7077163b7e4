//! HTTP handlers for inventory management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::PaginationQuery;
use crate::middleware::CurrentUser;
use crate::models::{InventoryRecord, PaginatedResponse};
use crate::services::inventory::{
    AdjustInventoryInput, CreateInventoryInput, InventoryService, UpdateInventoryInput,
};
use crate::AppState;

/// Create an inventory record
pub async fn create_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateInventoryInput>,
) -> AppResult<Json<InventoryRecord>> {
    if !current_user.0.has_permission("inventory", "manage") {
        return Err(AppError::InsufficientPermissions);
    }
    if !current_user.0.belongs_to_store(input.store_id) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = InventoryService::new(state.db);
    let record = service.create_record(input).await?;
    Ok(Json(record))
}

/// Get an inventory record by id
pub async fn get_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<InventoryRecord>> {
    let service = InventoryService::new(state.db);
    let record = service.get_record(inventory_id).await?;
    Ok(Json(record))
}

/// Administrative edit of an inventory record
pub async fn update_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
    Json(input): Json<UpdateInventoryInput>,
) -> AppResult<Json<InventoryRecord>> {
    if !current_user.0.has_permission("inventory", "manage") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = InventoryService::new(state.db);
    let record = service.update_record(inventory_id, input).await?;
    Ok(Json(record))
}

/// Apply a direct ledger adjustment to a (store, variant) counter
pub async fn adjust_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, variant_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<AdjustInventoryInput>,
) -> AppResult<Json<InventoryRecord>> {
    if !current_user.0.has_permission("inventory", "manage") {
        return Err(AppError::InsufficientPermissions);
    }
    if !current_user.0.belongs_to_store(store_id) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = InventoryService::new(state.db);
    let record = service.adjust(store_id, variant_id, input).await?;
    Ok(Json(record))
}

/// List a store's inventory
pub async fn list_store_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
) -> AppResult<Json<PaginatedResponse<InventoryRecord>>> {
    let service = InventoryService::new(state.db);
    let page = service
        .list_store_inventory(store_id, query.into_pagination())
        .await?;
    Ok(Json(page))
}
