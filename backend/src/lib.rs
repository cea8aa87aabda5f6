//! Restaurant inventory management backend
//!
//! Multi-tenant inventory tracking for restaurants: items and suppliers,
//! a stock transaction ledger, low-stock alerts with a realtime feed,
//! recipes, and sales that deplete their ingredients from stock.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod services;

pub use config::Config;

use repository::Repository;
use services::{AlertFeed, Services};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub services: Services,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire every service to `repo`
    pub fn new(repo: Arc<dyn Repository>, config: Config) -> Self {
        let feed = AlertFeed::new(config.alerts.channel_capacity);
        let services = Services::new(repo.clone(), &config, feed);
        Self {
            repo,
            services,
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Restaurant Inventory API v1"
}
