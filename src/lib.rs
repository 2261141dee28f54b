pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::SeedError;

// Export all model types
pub use model::*;

// Export seed pipeline
pub use seed::{SeedOrchestrator, SeedPhase, SeedPlan, SeedReport};

// Export store types
pub use store::{AnalyticsStore, MemorySession, PgSeedSession, PostgresStore, SeedSession};

/// Load configuration, connect and serve the analytics API until shutdown.
pub async fn run_server(config: &crate::config::AppConfig) -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    let options = config.connect_options()?;
    let postgres_store = crate::store::PostgresStore::connect(options, &config.database).await?;
    let store = Arc::new(postgres_store);

    let app = crate::api::routes::create_app(store, config.server.cors_permissive);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Analytics API listening on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
