//! Shipping tariff persistence.

use async_trait::async_trait;
use sqlx::{query, query_as, PgPool};

use crate::domain::shipping::ShippingRate;
use crate::services::shipping_rates::ShippingRateStore;

#[derive(Debug, Clone)]
pub struct PgShippingRateStore {
    pool: PgPool,
}

impl PgShippingRateStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ShippingRateStore for PgShippingRateStore {
    async fn load(&self) -> crate::Result<Vec<ShippingRate>> {
        let rows: Vec<(uuid::Uuid, rust_decimal::Decimal, rust_decimal::Decimal, rust_decimal::Decimal)> =
            query_as("SELECT id, weight_from, weight_to, price FROM shipping_rates ORDER BY weight_from")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, weight_from, weight_to, price)| ShippingRate { id, weight_from, weight_to, price })
            .collect())
    }

    async fn replace(&self, rates: &[ShippingRate]) -> crate::Result<()> {
        let mut tx = self.pool.begin().await?;
        query("DELETE FROM shipping_rates").execute(&mut *tx).await?;
        for rate in rates {
            query("INSERT INTO shipping_rates (id, weight_from, weight_to, price) VALUES ($1, $2, $3, $4)")
                .bind(rate.id)
                .bind(rate.weight_from)
                .bind(rate.weight_to)
                .bind(rate.price)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
