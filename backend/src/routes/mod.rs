//! Route definitions for the Wholesale Produce Trading Platform

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Registries
        .nest("/products", product_routes())
        .nest("/companies", company_routes())
        .nest("/warehouses", warehouse_routes())
        // Trade documents
        .nest("/documents", document_routes())
        // Lot store query surface
        .nest("/lots", lot_routes())
        // Matching engine
        .nest("/matchings", matching_routes())
        // Stock movements
        .nest("/transfers", transfer_routes())
        .nest("/productions", production_routes())
        .nest("/adjustments", adjustment_routes())
        .nest("/returns", return_routes())
        // Audit sessions
        .nest("/audits", audit_routes())
        // Integrity checker
        .nest("/integrity", integrity_routes())
        // Stock-event history
        .route("/history", get(handlers::list_stock_events))
}

/// Product registry routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
}

/// Company registry routes
fn company_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_companies).post(handlers::create_company))
        .route(
            "/:company_id",
            get(handlers::get_company).put(handlers::update_company),
        )
}

/// Warehouse registry routes
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses).post(handlers::create_warehouse))
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse).put(handlers::update_warehouse),
        )
}

/// Trade document routes
fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_documents))
        .route("/purchases", post(handlers::create_purchase))
        .route("/sales", post(handlers::create_sale))
        .route("/:document_id", get(handlers::get_document))
        .route("/lines/:line_id", delete(handlers::delete_document_line))
}

/// Lot store routes
fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots))
        .route("/summary", get(handlers::get_stock_summary))
        .route("/available/:product_id", get(handlers::get_available_lots))
        .route("/:lot_id", get(handlers::get_lot))
        .route("/:lot_id/matchings", get(handlers::get_lot_matchings))
        .route("/:lot_id/transfers", get(handlers::get_lot_transfers))
        .route("/:lot_id/adjustments", get(handlers::get_lot_adjustments))
        .route("/:lot_id/returns", get(handlers::get_lot_returns))
}

/// Matching engine routes
fn matching_routes() -> Router<AppState> {
    Router::new()
        .route("/sale-lines/:sale_line_id", get(handlers::get_sale_line_matchings))
        .route("/sale-lines/:sale_line_id/manual", post(handlers::match_manual))
        .route("/sale-lines/:sale_line_id/auto", post(handlers::match_auto))
        .route("/:matching_id", delete(handlers::unmatch))
}

/// Transfer routes
fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_transfer))
        .route("/:transfer_id", get(handlers::get_transfer))
        .route("/:transfer_id/revert", post(handlers::revert_transfer))
}

/// Production routes
fn production_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_productions).post(handlers::create_production))
        .route("/:production_id", get(handlers::get_production))
        .route("/:production_id/cancel", post(handlers::cancel_production))
}

/// Adjustment routes
fn adjustment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_adjustment))
        .route("/:adjustment_id/revert", post(handlers::revert_adjustment))
}

/// Vendor return routes
fn return_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_return))
        .route("/:return_id/revert", post(handlers::revert_return))
}

/// Audit session routes
fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_audits).post(handlers::start_audit))
        .route(
            "/:session_id",
            get(handlers::get_audit).delete(handlers::delete_audit),
        )
        .route("/:session_id/items", put(handlers::update_audit_items))
        .route("/:session_id/items/:item_id/sync", post(handlers::sync_audit_item))
        .route("/:session_id/finalize", post(handlers::finalize_audit))
        .route("/:session_id/revert", post(handlers::revert_audit))
        .route("/:session_id/cancel", post(handlers::cancel_audit))
}

/// Integrity checker routes
fn integrity_routes() -> Router<AppState> {
    Router::new()
        .route("/check", get(handlers::check_integrity))
        .route("/heal", post(handlers::heal_integrity))
}
