//! Catalog browsing and re-pricing.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::pricing::ExchangeRates;
use crate::StoreError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub collection: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductFilter {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(24).clamp(1, 100) }
    pub fn offset(&self) -> i64 { i64::from(self.page() - 1) * i64::from(self.per_page()) }
}

#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
    pub page: u32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list(&self, filter: &ProductFilter) -> crate::Result<ProductPage>;
    async fn get(&self, id: Uuid) -> crate::Result<Option<Product>>;
    /// Products among `ids`; unknown ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> crate::Result<Vec<Product>>;
    /// Every product carrying a EUR purchase price.
    async fn with_eur_price(&self) -> crate::Result<Vec<Product>>;
    async fn update_prices(&self, products: &[Product]) -> crate::Result<u64>;
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ProductStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self { Self { store } }

    pub async fn list(&self, filter: &ProductFilter) -> Result<ProductPage, StoreError> {
        self.store.list(filter).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, StoreError> {
        self.store.get(id).await?.ok_or(StoreError::NotFound)
    }

    pub async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        self.store.find_many(ids).await
    }

    /// Recomputes ruble prices from EUR prices; returns how many changed.
    #[tracing::instrument(skip(self, rates), fields(eur_rate = rates.eur_rate, rub_rate = rates.rub_rate))]
    pub async fn reprice_all(&self, rates: &ExchangeRates) -> Result<u64, StoreError> {
        let mut products = self.store.with_eur_price().await?;
        let changed: Vec<Product> = products.iter_mut().filter_map(|p| p.reprice(rates).then(|| p.clone())).collect();
        if changed.is_empty() {
            info!("all product prices already up to date");
            return Ok(0);
        }
        let updated = self.store.update_prices(&changed).await?;
        info!(updated, "product prices recalculated");
        Ok(updated)
    }
}
