use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recommendation_service::handlers;
use recommendation_service::{
    Config, MemorySetStore, RecommenderService, RedisSetStore, SetStore, StoreBackend,
};
use redis_utils::RedisPool;

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // Initialize tracing
    let json_logs = config.log_format == "json";
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(json_logs.then(|| fmt::layer().json().with_current_span(true)))
        .with((!json_logs).then(|| fmt::layer()))
        .init();

    info!(
        "Starting recommendation-service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let store: Arc<dyn SetStore> = match config.store_backend {
        StoreBackend::Redis => {
            let pool = RedisPool::connect(&config.redis_url)
                .await
                .context("Failed to connect to Redis")?;
            info!(addr = %pool.addr_label(), "Using Redis set store");
            Arc::new(RedisSetStore::new(
                pool.manager(),
                config.redis_command_timeout(),
            ))
        }
        StoreBackend::Memory => {
            info!("Using in-memory set store, data is not persisted");
            Arc::new(MemorySetStore::new())
        }
    };

    let settings = config.engine_settings();
    info!(
        key_prefix = %settings.key_prefix,
        max_neighbors = settings.max_neighbors,
        "Recommendation engine configured"
    );
    let service = web::Data::new(RecommenderService::new(store, settings));

    let bind_addr = format!("{}:{}", config.http_host, config.http_port);
    info!("HTTP server listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(service.clone())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await?;

    info!("recommendation-service stopped");
    Ok(())
}
