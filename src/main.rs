//! Watchstore storefront backend

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watchstore::api::{self, AppState, Stores};
use watchstore::bus::EventBus;
use watchstore::config::AppConfig;
use watchstore::db::{self, PgOrderStore, PgProductStore, PgPromoStore, PgRateStore, PgShippingRateStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = db::connect(&config.database_url, config.database_max_connections).await?;
    db::migrate(&pool).await?;
    let bus = EventBus::connect(config.nats_url.as_deref()).await;

    let stores = Stores {
        products: Arc::new(PgProductStore::new(pool.clone())),
        orders: Arc::new(PgOrderStore::new(pool.clone())),
        promos: Arc::new(PgPromoStore::new(pool.clone())),
        rates: Arc::new(PgRateStore::new(pool.clone())),
        shipping_rates: Arc::new(PgShippingRateStore::new(pool)),
    };
    let state = AppState::new(stores, config.rates_cache_ttl, config.rates_fetch_timeout, bus);
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("watchstore listening on {addr}");
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
