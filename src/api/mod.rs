//! HTTP surface: shared state, routes and handlers.

pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod rates;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::bus::EventBus;
use crate::services::{
    CatalogService, CheckoutService, ExchangeRateService, OrderStore, OrdersService, ProductStore, PromoStore,
    RateCache, RateStore, ShippingRateStore, ShippingRatesService,
};

pub use error::{ApiError, ApiResult};

/// Store implementations the services are wired onto.
pub struct Stores {
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
    pub promos: Arc<dyn PromoStore>,
    pub rates: Arc<dyn RateStore>,
    pub shipping_rates: Arc<dyn ShippingRateStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub checkout: CheckoutService,
    pub orders: OrdersService,
    pub rates: ExchangeRateService,
    pub shipping_rates: ShippingRatesService,
}

impl AppState {
    pub fn new(stores: Stores, rates_cache_ttl: Duration, rates_fetch_timeout: Duration, bus: EventBus) -> Self {
        let rates = ExchangeRateService::new(
            stores.rates,
            Arc::new(RateCache::new(rates_cache_ttl)),
            rates_fetch_timeout,
            bus.clone(),
        );
        let shipping_rates = ShippingRatesService::new(stores.shipping_rates);
        let checkout = CheckoutService::new(
            stores.products.clone(),
            stores.orders.clone(),
            stores.promos,
            rates.clone(),
            shipping_rates.clone(),
            bus.clone(),
        );
        Self {
            catalog: CatalogService::new(stores.products),
            checkout,
            orders: OrdersService::new(stores.orders, bus),
            rates,
            shipping_rates,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "watchstore"})) }))
        .route("/api/exchange-rates", get(rates::current))
        .route("/api/products", get(catalog::list_products))
        .route("/api/products/:id", get(catalog::get_product))
        .route("/api/cart/quote", post(checkout::quote))
        .route("/api/promo/validate", post(checkout::validate_promo))
        .route("/api/orders", post(checkout::place_order))
        .route("/api/orders/track/:number", get(checkout::track))
        .route("/api/admin/exchange-rates/update", post(rates::update))
        .route("/api/admin/exchange-rates/history", get(rates::history))
        .route("/api/admin/products/reprice", post(catalog::reprice))
        .route("/api/admin/shipping/rates", get(admin::shipping_rates).put(admin::replace_shipping_rates))
        .route("/api/admin/orders", get(admin::list_orders))
        .route("/api/admin/orders/:id", get(admin::get_order))
        .route("/api/admin/orders/:id/status", put(admin::update_order_status))
        .route("/api/admin/orders/:id/commission", get(admin::order_commission))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
