//! Library catalog server

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_catalog::{
    api,
    config::{AppConfig, StorageBackend},
    repository::Repository,
    services::{redis::RedisService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("library_catalog={},tower_http=debug", config.logging.level).into()
    });

    let json = config.logging.format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Starting library catalog v{}", env!("CARGO_PKG_VERSION"));

    let services = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            tracing::info!("Database migrations completed");

            let redis_service = RedisService::new(&config.redis.url)
                .await
                .context("Failed to connect to Redis")?;

            tracing::info!("Connected to Redis");

            Services::new(Repository::new(pool), Arc::new(redis_service), &config.session)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; accounts and sessions are lost on restart");
            Services::in_memory(&config.session)
        }
    };

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
