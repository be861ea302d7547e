//! Exchange-rate persistence: the `current` row plus its history log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow, PgPool};
use uuid::Uuid;

use crate::domain::pricing::{ExchangeRates, RateHistoryEntry, RateSource};
use crate::services::exchange_rates::RateStore;
use crate::StoreError;

const CURRENT_KEY: &str = "current";

#[derive(Debug, Clone)]
pub struct PgRateStore {
    pool: PgPool,
}

impl PgRateStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[derive(FromRow)]
struct RateRow {
    eur_rate: f64,
    rub_rate: f64,
    updated_at: DateTime<Utc>,
}

impl From<RateRow> for ExchangeRates {
    fn from(r: RateRow) -> Self {
        Self { eur_rate: r.eur_rate, rub_rate: r.rub_rate, updated_at: Some(r.updated_at) }
    }
}

#[derive(FromRow)]
struct HistoryRow {
    id: Uuid,
    eur_rate: f64,
    rub_rate: f64,
    source: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for RateHistoryEntry {
    type Error = StoreError;

    fn try_from(r: HistoryRow) -> Result<Self, Self::Error> {
        let source: RateSource = r.source.parse().map_err(|e| StoreError::Corrupt(format!("{e}")))?;
        Ok(Self { id: r.id, eur_rate: r.eur_rate, rub_rate: r.rub_rate, source, created_at: r.created_at })
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    async fn load_current(&self) -> crate::Result<Option<ExchangeRates>> {
        let row = query_as::<_, RateRow>("SELECT eur_rate, rub_rate, updated_at FROM exchange_rates WHERE id = $1")
            .bind(CURRENT_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn save_current(&self, eur_rate: f64, rub_rate: f64, source: RateSource) -> crate::Result<ExchangeRates> {
        let mut tx = self.pool.begin().await?;

        let row = query_as::<_, RateRow>(
            "INSERT INTO exchange_rates (id, eur_rate, rub_rate, updated_at) VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (id) DO UPDATE SET eur_rate = EXCLUDED.eur_rate, rub_rate = EXCLUDED.rub_rate, updated_at = EXCLUDED.updated_at \
             RETURNING eur_rate, rub_rate, updated_at",
        )
        .bind(CURRENT_KEY)
        .bind(eur_rate)
        .bind(rub_rate)
        .fetch_one(&mut *tx)
        .await?;

        query("INSERT INTO exchange_rate_history (id, eur_rate, rub_rate, source, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(Uuid::now_v7())
            .bind(eur_rate)
            .bind(rub_rate)
            .bind(source.as_str())
            .bind(row.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn history(&self, limit: i64) -> crate::Result<Vec<RateHistoryEntry>> {
        query_as::<_, HistoryRow>(
            "SELECT id, eur_rate, rub_rate, source, created_at FROM exchange_rate_history ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(RateHistoryEntry::try_from)
        .collect()
    }
}
