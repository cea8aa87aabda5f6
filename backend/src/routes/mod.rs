//! Route definitions for the restaurant inventory API

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/inventory-items", inventory_routes())
        .nest("/stock-transactions", stock_routes())
        .nest("/alerts", alert_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/recipes", recipe_routes())
        .nest("/sales", sale_routes())
        .nest("/users", user_routes())
        .route("/analytics/dashboard", get(handlers::get_dashboard))
        .route("/analytics/categories", get(handlers::get_category_breakdown))
        .route(
            "/reports/supplier-purchases",
            get(handlers::get_supplier_purchase_report),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        .merge(protected)
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::create_item))
        .route("/low-stock", get(handlers::low_stock_items))
        .route(
            "/:item_id",
            get(handlers::get_item)
                .patch(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/:item_id/reconciliation", get(handlers::reconcile_item))
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_transactions).post(handlers::record_transaction),
        )
        .route("/sync", post(handlers::sync_transactions))
        .route(
            "/:transaction_id",
            get(handlers::get_transaction).patch(handlers::update_transaction),
        )
}

fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_alerts))
        .route("/stream", get(handlers::alert_stream))
        .route("/unread-count", get(handlers::unread_count))
        .route("/read-all", post(handlers::mark_all_read))
        .route("/:alert_id", patch(handlers::mark_alert_read))
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_recipes).post(handlers::create_recipe))
        .route(
            "/:recipe_id",
            get(handlers::get_recipe).patch(handlers::update_recipe),
        )
        .route("/:recipe_id/status", post(handlers::set_recipe_status))
}

fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route(
            "/:sale_id",
            get(handlers::get_sale)
                .patch(handlers::update_sale)
                .delete(handlers::delete_sale),
        )
        .route(
            "/:sale_id/mark-inventory-updated",
            post(handlers::mark_inventory_updated),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:user_id",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
