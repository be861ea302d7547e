//! Promo code persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{query_as, query_scalar, FromRow, PgPool};
use uuid::Uuid;

use crate::db::to_u32;
use crate::domain::aggregates::{DiscountType, PromoCode};
use crate::domain::value_objects::PromoCodeValue;
use crate::services::checkout::PromoStore;
use crate::StoreError;

#[derive(Debug, Clone)]
pub struct PgPromoStore {
    pool: PgPool,
}

impl PgPromoStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[derive(FromRow)]
struct PromoRow {
    id: Uuid,
    code: String,
    discount_type: String,
    discount: Decimal,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    min_order_amount: Option<Decimal>,
    first_order_only: bool,
    usage_limit: i32,
    is_active: bool,
}

impl TryFrom<PromoRow> for PromoCode {
    type Error = StoreError;

    fn try_from(r: PromoRow) -> Result<Self, Self::Error> {
        let discount_type = match r.discount_type.as_str() {
            "fixed" => DiscountType::Fixed,
            "percent" => DiscountType::Percent,
            other => return Err(StoreError::Corrupt(format!("unknown discount type {other}"))),
        };
        Ok(Self {
            id: r.id,
            code: PromoCodeValue::new(r.code).map_err(|e| StoreError::Corrupt(e.to_string()))?,
            discount_type,
            discount: r.discount,
            valid_from: r.valid_from,
            valid_until: r.valid_until,
            min_order_amount: r.min_order_amount,
            first_order_only: r.first_order_only,
            usage_limit: to_u32("usage_limit", i64::from(r.usage_limit))?,
            is_active: r.is_active,
        })
    }
}

#[async_trait]
impl PromoStore for PgPromoStore {
    async fn find_by_code(&self, code: &PromoCodeValue) -> crate::Result<Option<PromoCode>> {
        query_as::<_, PromoRow>(
            "SELECT id, code, discount_type, discount, valid_from, valid_until, min_order_amount, \
             first_order_only, usage_limit, is_active FROM promo_codes WHERE UPPER(code) = $1",
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(PromoCode::try_from)
        .transpose()
    }

    async fn count_usage(&self, promo_code_id: Uuid, email: &str) -> crate::Result<u64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM promo_code_usages WHERE promo_code_id = $1 AND LOWER(email) = $2")
            .bind(promo_code_id)
            .bind(email.to_lowercase())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
