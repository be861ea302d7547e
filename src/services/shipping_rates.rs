//! Admin-maintained shipping tariff.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::domain::shipping::{ShippingRate, ShippingRateError, ShippingRateTable};
use crate::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShippingRateStore: Send + Sync {
    async fn load(&self) -> crate::Result<Vec<ShippingRate>>;
    /// Replaces the whole table in one transaction.
    async fn replace(&self, rates: &[ShippingRate]) -> crate::Result<()>;
}

#[derive(Debug, Error)]
pub enum ShippingRatesError {
    #[error(transparent)]
    Invalid(#[from] ShippingRateError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct ShippingRatesService {
    store: Arc<dyn ShippingRateStore>,
}

impl ShippingRatesService {
    pub fn new(store: Arc<dyn ShippingRateStore>) -> Self { Self { store } }

    pub async fn table(&self) -> Result<ShippingRateTable, ShippingRatesError> {
        Ok(ShippingRateTable::new(self.store.load().await?)?)
    }

    pub async fn replace(&self, rates: Vec<ShippingRate>) -> Result<ShippingRateTable, ShippingRatesError> {
        let table = ShippingRateTable::new(rates)?;
        self.store.replace(table.rates()).await?;
        info!(bands = table.rates().len(), "shipping tariff replaced");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn band(from: i64, to: i64) -> ShippingRate {
        ShippingRate { id: Uuid::now_v7(), weight_from: Decimal::from(from), weight_to: Decimal::from(to), price: Decimal::from(700) }
    }

    #[tokio::test]
    async fn replace_rejects_overlap_without_touching_store() {
        let mut store = MockShippingRateStore::new();
        store.expect_replace().never();
        let svc = ShippingRatesService::new(Arc::new(store));

        let err = svc.replace(vec![band(0, 2), band(1, 3)]).await.unwrap_err();
        assert!(matches!(err, ShippingRatesError::Invalid(ShippingRateError::Overlap(..))));
    }

    #[tokio::test]
    async fn replace_stores_sorted_table() {
        let mut store = MockShippingRateStore::new();
        store
            .expect_replace()
            .withf(|rates| rates.len() == 2 && rates[0].weight_from == Decimal::ZERO)
            .times(1)
            .returning(|_| Ok(()));
        let svc = ShippingRatesService::new(Arc::new(store));

        let table = svc.replace(vec![band(3, 5), band(0, 2)]).await.unwrap();
        assert_eq!(table.rates()[1].weight_from, Decimal::from(3));
    }
}
