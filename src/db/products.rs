//! Product persistence.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::services::catalog::{ProductFilter, ProductPage, ProductStore};

const PRODUCT_COLUMNS: &str =
    "id, sku, name, collection, subcategory, price, original_price_eur, colors, images, in_stock, created_at, updated_at";

// $1 collection, $2 search term; both optional
const FILTER: &str = "($1::text IS NULL OR collection = $1) AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')";

#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self, filter: &ProductFilter) -> crate::Result<ProductPage> {
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let products = query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {FILTER} ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(filter.collection.as_deref())
        .bind(search)
        .bind(i64::from(filter.per_page()))
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {FILTER}"))
            .bind(filter.collection.as_deref())
            .bind(search)
            .fetch_one(&self.pool)
            .await?;

        Ok(ProductPage { products, total, page: filter.page() })
    }

    async fn get(&self, id: Uuid) -> crate::Result<Option<Product>> {
        Ok(query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_many(&self, ids: &[Uuid]) -> crate::Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn with_eur_price(&self) -> crate::Result<Vec<Product>> {
        Ok(query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE original_price_eur IS NOT NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_prices(&self, products: &[Product]) -> crate::Result<u64> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut updated = 0;
        for product in products {
            updated += query("UPDATE products SET price = $2, updated_at = $3 WHERE id = $1")
                .bind(product.id)
                .bind(product.price)
                .bind(now)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(updated)
    }
}
