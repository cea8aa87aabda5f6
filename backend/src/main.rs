//! Restaurant inventory server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rim_backend::{
    create_app,
    repository::{demo, InMemoryRepository, PgRepository, Repository},
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_tracing(&config);

    tracing::info!("Starting restaurant inventory server");
    tracing::info!("Environment: {}", config.environment);

    let repo = connect(&config).await?;
    let state = AppState::new(repo, config.clone());
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Seeded in-memory storage in demo mode, PostgreSQL otherwise
async fn connect(config: &Config) -> anyhow::Result<Arc<dyn Repository>> {
    if config.demo.enabled {
        let repo = InMemoryRepository::new();
        let restaurant = demo::seed(&repo).await?;
        tracing::info!(
            restaurant_id = %restaurant.id,
            manager = demo::DEMO_MANAGER_EMAIL,
            staff = demo::DEMO_STAFF_EMAIL,
            "Demo mode: serving seeded in-memory data"
        );
        return Ok(Arc::new(repo));
    }

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Database connection established");

    if config.database.run_migrations {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations completed");
    }

    Ok(Arc::new(PgRepository::new(pool)))
}
