//! HTTP handlers for stock transfer endpoints
//!
//! Policy gates live here: dispatch belongs to the source store, accept to
//! the destination store. The service below only enforces ordering and
//! ledger invariants.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::PaginationQuery;
use crate::middleware::CurrentUser;
use crate::models::{PaginatedResponse, StockTransfer};
use crate::services::transfer::{
    CreateTransferInput, RejectTransferInput, TransferDetail, TransferLineInput, TransferService,
};
use crate::AppState;

/// Create a stock transfer
pub async fn create_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransferInput>,
) -> AppResult<Json<TransferDetail>> {
    if !current_user.0.has_permission("transfers", "dispatch") {
        return Err(AppError::InsufficientPermissions);
    }
    if !current_user.0.belongs_to_store(input.from_store_id) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = TransferService::new(state.db);
    let transfer = service
        .create_transfer(current_user.0.staff_id, input)
        .await?;
    Ok(Json(transfer))
}

/// Get a transfer with its lines
pub async fn get_transfer(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<TransferDetail>> {
    let service = TransferService::new(state.db);
    let transfer = service.get_transfer(transfer_id).await?;
    Ok(Json(transfer))
}

/// Dispatch a transfer from the source store
pub async fn dispatch_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<TransferDetail>> {
    if !current_user.0.has_permission("transfers", "dispatch") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = TransferService::new(state.db);
    let transfer = service.get_transfer(transfer_id).await?;
    if !current_user.0.belongs_to_store(transfer.transfer.from_store_id) {
        return Err(AppError::InsufficientPermissions);
    }

    let transfer = service.dispatch(transfer_id).await?;
    Ok(Json(transfer))
}

/// Accept a transfer at the destination store
pub async fn accept_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<TransferDetail>> {
    if !current_user.0.has_permission("transfers", "receive") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = TransferService::new(state.db);
    let transfer = service.get_transfer(transfer_id).await?;
    if !current_user.0.belongs_to_store(transfer.transfer.to_store_id) {
        return Err(AppError::InsufficientPermissions);
    }

    let transfer = service.accept(transfer_id, current_user.0.staff_id).await?;
    Ok(Json(transfer))
}

/// Reject a transfer.
///
/// Allowed from either end: the source store can cancel what it has not
/// handed over yet, the destination store can refuse what arrived.
pub async fn reject_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<RejectTransferInput>,
) -> AppResult<Json<TransferDetail>> {
    let service = TransferService::new(state.db);
    let transfer = service.get_transfer(transfer_id).await?;

    let from_side = current_user.0.has_permission("transfers", "dispatch")
        && current_user.0.belongs_to_store(transfer.transfer.from_store_id);
    let to_side = current_user.0.has_permission("transfers", "receive")
        && current_user.0.belongs_to_store(transfer.transfer.to_store_id);
    if !from_side && !to_side {
        return Err(AppError::InsufficientPermissions);
    }

    let transfer = service.reject(transfer_id, input).await?;
    Ok(Json(transfer))
}

/// Add or replace a line on a transfer that has not been dispatched
pub async fn add_transfer_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<TransferLineInput>,
) -> AppResult<Json<TransferDetail>> {
    if !current_user.0.has_permission("transfers", "dispatch") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = TransferService::new(state.db);
    let transfer = service.get_transfer(transfer_id).await?;
    if !current_user.0.belongs_to_store(transfer.transfer.from_store_id) {
        return Err(AppError::InsufficientPermissions);
    }

    let transfer = service.add_line(transfer_id, input).await?;
    Ok(Json(transfer))
}

/// Remove a line from a transfer that has not reached a terminal state
pub async fn delete_transfer_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((transfer_id, line_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<TransferDetail>> {
    if !current_user.0.has_permission("transfers", "dispatch") {
        return Err(AppError::InsufficientPermissions);
    }

    let service = TransferService::new(state.db);
    let transfer = service.get_transfer(transfer_id).await?;
    if !current_user.0.belongs_to_store(transfer.transfer.from_store_id) {
        return Err(AppError::InsufficientPermissions);
    }

    let transfer = service.delete_line(transfer_id, line_id).await?;
    Ok(Json(transfer))
}

/// List transfers touching a store
pub async fn list_store_transfers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
) -> AppResult<Json<PaginatedResponse<StockTransfer>>> {
    let service = TransferService::new(state.db);
    let page = service
        .list_for_store(store_id, query.into_pagination())
        .await?;
    Ok(Json(page))
}
