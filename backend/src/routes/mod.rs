//! Route definitions for the Retail Management Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - inventory ledger
        .nest("/inventory", inventory_routes())
        // Protected routes - point of sale
        .nest("/sales", sale_routes())
        // Protected routes - scrap adjustments
        .nest("/scraps", scrap_routes())
        // Protected routes - stock transfers
        .nest("/transfers", transfer_routes())
        // Protected routes - notifications
        .nest("/notifications", notification_routes())
}

/// Inventory ledger routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_inventory))
        .route(
            "/:inventory_id",
            get(handlers::get_inventory).put(handlers::update_inventory),
        )
        .route("/:inventory_id/scraps", get(handlers::list_inventory_scraps))
        .route("/stores/:store_id", get(handlers::list_store_inventory))
        .route(
            "/stores/:store_id/variants/:variant_id/adjust",
            post(handlers::adjust_inventory),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Point-of-sale routes (protected)
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_sale))
        .route(
            "/:sale_id",
            get(handlers::get_sale).put(handlers::update_sale),
        )
        .route("/:sale_id/lines", post(handlers::add_sale_line))
        .route(
            "/:sale_id/lines/:line_id",
            axum::routing::delete(handlers::delete_sale_line),
        )
        .route("/stores/:store_id", get(handlers::list_sales))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Scrap adjustment routes (protected)
fn scrap_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::record_scrap))
        .route("/:scrap_id", get(handlers::get_scrap))
        .route(
            "/:scrap_id/add-to-inventory",
            post(handlers::add_scrap_to_inventory),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock transfer routes (protected)
fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_transfer))
        .route("/:transfer_id", get(handlers::get_transfer))
        .route("/:transfer_id/dispatch", post(handlers::dispatch_transfer))
        .route("/:transfer_id/accept", post(handlers::accept_transfer))
        .route("/:transfer_id/reject", post(handlers::reject_transfer))
        .route("/:transfer_id/lines", post(handlers::add_transfer_line))
        .route(
            "/:transfer_id/lines/:line_id",
            axum::routing::delete(handlers::delete_transfer_line),
        )
        .route("/stores/:store_id", get(handlers::list_store_transfers))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Notification routes (protected)
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route(
            "/:notification_id/read",
            post(handlers::mark_notification_read),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
