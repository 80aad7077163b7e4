//! HTTP handlers for point-of-sale endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::PaginationQuery;
use crate::middleware::CurrentUser;
use crate::models::{PaginatedResponse, Sale};
use crate::services::sale::{
    CreateSaleInput, SaleDetail, SaleLineInput, SaleService, UpdateSaleInput,
};
use crate::AppState;

/// Create a sale
pub async fn create_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<Json<SaleDetail>> {
    if !current_user.0.has_permission("sales", "create") {
        return Err(AppError::InsufficientPermissions);
    }
    if !current_user.0.belongs_to_store(input.store_id) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = SaleService::new(state.db);
    let sale = service.create_sale(current_user.0.staff_id, input).await?;
    Ok(Json(sale))
}

/// Get a sale with its lines
pub async fn get_sale(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleDetail>> {
    let service = SaleService::new(state.db);
    let sale = service.get_sale(sale_id).await?;
    Ok(Json(sale))
}

/// Edit line quantities on an existing sale
pub async fn update_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<UpdateSaleInput>,
) -> AppResult<Json<SaleDetail>> {
    if !current_user.0.has_permission("sales", "update") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = SaleService::new(state.db);
    let sale = service.update_sale(sale_id, input).await?;
    Ok(Json(sale))
}

/// Add a line to an existing sale
pub async fn add_sale_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<SaleLineInput>,
) -> AppResult<Json<SaleDetail>> {
    if !current_user.0.has_permission("sales", "update") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = SaleService::new(state.db);
    let sale = service.add_line(sale_id, input).await?;
    Ok(Json(sale))
}

/// Delete a line from an existing sale, restoring its inventory
pub async fn delete_sale_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((sale_id, line_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<SaleDetail>> {
    if !current_user.0.has_permission("sales", "update") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = SaleService::new(state.db);
    let sale = service.delete_line(sale_id, line_id).await?;
    Ok(Json(sale))
}

/// List a store's sales
pub async fn list_sales(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
) -> AppResult<Json<PaginatedResponse<Sale>>> {
    let service = SaleService::new(state.db);
    let page = service.list_sales(store_id, query.into_pagination()).await?;
    Ok(Json(page))
}
