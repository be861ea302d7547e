//! Order persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{query, query_as, query_scalar, FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::{to_i32, to_u32};
use crate::domain::aggregates::{Customer, Order, OrderItem, OrderRecord, OrderStatus, OrderTotals};
use crate::domain::value_objects::{Money, PromoCodeValue};
use crate::services::orders::{OrderFilter, OrderStore, PromoUsage};
use crate::StoreError;

const ORDER_COLUMNS: &str = "id, order_number, customer_name, email, phone, delivery_point, status, subtotal, shipping, \
     discount, total, promo_code, eur_rate, rub_rate, tracking_number, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    async fn insert_items(tx: &mut Transaction<'_, Postgres>, order: &Order) -> crate::Result<()> {
        for (position, item) in order.items().iter().enumerate() {
            query(
                "INSERT INTO order_items (id, order_id, position, product_id, name, selected_color, quantity, price, original_price_eur) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(Uuid::now_v7())
            .bind(order.id())
            .bind(position as i32)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(&item.selected_color)
            .bind(to_i32("quantity", item.quantity)?)
            .bind(item.price)
            .bind(item.original_price_eur)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Loads the lines of every order in `rows` and assembles the aggregates.
    async fn hydrate(&self, rows: Vec<OrderRow>) -> crate::Result<Vec<Order>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = query_as::<_, ItemRow>(
            "SELECT order_id, product_id, name, selected_color, quantity, price, original_price_eur \
             FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for item in items {
            let order_id = item.order_id;
            by_order.entry(order_id).or_default().push(item.try_into()?);
        }

        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_name: String,
    email: String,
    phone: String,
    delivery_point: Option<String>,
    status: String,
    subtotal: Decimal,
    shipping: Decimal,
    discount: Decimal,
    total: Decimal,
    promo_code: Option<String>,
    eur_rate: Option<f64>,
    rub_rate: Option<f64>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> crate::Result<Order> {
        let status: OrderStatus = self.status.parse().map_err(|e| StoreError::Corrupt(format!("{e}")))?;
        let promo_code = self
            .promo_code
            .map(PromoCodeValue::new)
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Order::from_record(OrderRecord {
            id: self.id,
            order_number: self.order_number,
            customer: Customer { name: self.customer_name, email: self.email, phone: self.phone },
            delivery_point: self.delivery_point,
            status,
            items,
            totals: OrderTotals {
                subtotal: Money::rub(self.subtotal),
                shipping: Money::rub(self.shipping),
                discount: Money::rub(self.discount),
                total: Money::rub(self.total),
            },
            promo_code,
            eur_rate: self.eur_rate,
            rub_rate: self.rub_rate,
            tracking_number: self.tracking_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

#[derive(FromRow)]
struct ItemRow {
    order_id: Uuid,
    product_id: Uuid,
    name: String,
    selected_color: String,
    quantity: i32,
    price: Decimal,
    original_price_eur: Option<f64>,
}

impl TryFrom<ItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(r: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: r.product_id,
            name: r.name,
            selected_color: r.selected_color,
            quantity: to_u32("quantity", i64::from(r.quantity))?,
            price: r.price,
            original_price_eur: r.original_price_eur,
        })
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order, usage: Option<PromoUsage>) -> crate::Result<()> {
        let mut tx = self.pool.begin().await?;
        let totals = order.totals();
        let customer = order.customer();

        query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        ))
        .bind(order.id())
        .bind(order.order_number())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(order.delivery_point())
        .bind(order.status().as_str())
        .bind(totals.subtotal.amount())
        .bind(totals.shipping.amount())
        .bind(totals.discount.amount())
        .bind(totals.total.amount())
        .bind(order.promo_code().map(PromoCodeValue::as_str))
        .bind(order.eur_rate())
        .bind(order.rub_rate())
        .bind(order.tracking_number())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        Self::insert_items(&mut tx, order).await?;

        if let Some(usage) = usage {
            query("INSERT INTO promo_code_usages (id, promo_code_id, email, order_id) VALUES ($1, $2, $3, $4)")
                .bind(Uuid::now_v7())
                .bind(usage.promo_code_id)
                .bind(&usage.email)
                .bind(order.id())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> crate::Result<Option<Order>> {
        let row = query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(self.hydrate(row.into_iter().collect()).await?.pop())
    }

    async fn find_by_number(&self, order_number: &str) -> crate::Result<Option<Order>> {
        let row = query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"))
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(self.hydrate(row.into_iter().collect()).await?.pop())
    }

    async fn list(&self, filter: &OrderFilter) -> crate::Result<(Vec<Order>, i64)> {
        let status = filter.status.map(|s| s.as_str());
        let rows = query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(i64::from(filter.per_page()))
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok((self.hydrate(rows).await?, total))
    }

    async fn count_by_email(&self, email: &str) -> crate::Result<u64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM orders WHERE LOWER(email) = $1 AND status <> 'cancelled'")
            .bind(email.to_lowercase())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn update_status(&self, order: &Order) -> crate::Result<()> {
        let affected = query("UPDATE orders SET status = $2, tracking_number = $3, updated_at = $4 WHERE id = $1")
            .bind(order.id())
            .bind(order.status().as_str())
            .bind(order.tracking_number())
            .bind(order.updated_at())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
