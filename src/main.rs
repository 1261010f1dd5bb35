use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scent_api::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, CacheWriterHandle, MemoryStore, PgStore, ScentStore},
    routes::{create_router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scent_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let store: Arc<dyn ScentStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            info!("Connected to PostgreSQL");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping all data in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let (cache, cache_writer) = match connect_cache(&config).await {
        Some((cache, handle)) => (Some(cache), Some(handle)),
        None => (None, None),
    };

    let state = AppState::new(store, cache, config.clone());

    if config.seed_catalog {
        let seeded = state.catalog.seed_if_empty().await?;
        if seeded > 0 {
            info!(count = seeded, "Seeded the perfume catalog");
        }
    }

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    info!("Server running on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Redis is optional: without REDIS_URL, or when it is unreachable, the catalog is read
/// straight from the store
async fn connect_cache(config: &Config) -> Option<(Cache, CacheWriterHandle)> {
    let url = config.redis_url.as_deref()?;
    let client = match create_redis_client(url) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Catalog caching disabled");
            return None;
        }
    };

    match Cache::connect(client).await {
        Ok(cache) => {
            info!("Redis catalog cache enabled");
            Some(cache)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unreachable, catalog caching disabled");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
