use paystack_checkout::api::{self, AppState};
use paystack_checkout::cache::{self, CacheConfig, RedisIntentStore};
use paystack_checkout::config::Config;
use paystack_checkout::database::{self, PgOrderRepository, PgProfileRepository, PoolConfig};
use paystack_checkout::payments::providers::PaystackClient;
use paystack_checkout::payments::ReconciliationEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    let config = Config::load()?;

    tracing::info!("Starting Paystack checkout service");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!(
        "Paystack mode: {:?}, integration: {:?}",
        config.paystack.mode,
        config.paystack.integration_type
    );

    let db_pool = database::init_pool(
        &config.database.url,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            ..Default::default()
        }),
    )
    .await?;

    let redis_pool = cache::init_cache_pool(CacheConfig {
        redis_url: config.redis.url.clone(),
        ..Default::default()
    })
    .await?;

    let gateway = PaystackClient::new(config.paystack.gateway_config())?;

    let engine = ReconciliationEngine::new(
        config.paystack.clone(),
        Arc::new(gateway),
        Arc::new(PgOrderRepository::new(db_pool.clone())),
        Arc::new(PgProfileRepository::new(db_pool)),
        Arc::new(RedisIntentStore::with_ttl(
            redis_pool,
            Duration::from_secs(config.redis.intent_ttl_secs),
        )),
    );

    let app = api::router(AppState::new(
        Arc::new(engine),
        config.server.environment.clone(),
    ));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").map_or(false, |format| format == "json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
