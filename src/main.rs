use std::sync::Arc;

use recommend_api::{
    config::Config,
    create_router,
    db::{
        create_pool, create_redis_client, CacheBackend, EventStore, InMemoryCacheBackend,
        InMemoryEventStore, PgEventStore, RedisCacheBackend,
    },
    services::fixtures,
    AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn EventStore> = match &config.database_url {
        Some(url) => {
            let store = PgEventStore::new(create_pool(url).await?);
            store.migrate().await?;
            tracing::info!("Using PostgreSQL event store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory event store");
            Arc::new(InMemoryEventStore::new())
        }
    };

    let backend: Arc<dyn CacheBackend> = match &config.redis_url {
        Some(url) => Arc::new(RedisCacheBackend::connect(create_redis_client(url)?).await?),
        None => {
            tracing::warn!("REDIS_URL not set, using in-memory cache");
            Arc::new(InMemoryCacheBackend::new())
        }
    };

    if let Some(seed) = config.demo_seed {
        fixtures::seed_store(store.as_ref(), seed).await?;
    }

    let state = AppState::new(store, backend, &config);
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Recommendation API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
