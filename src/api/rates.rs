use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::error::ApiResult;
use super::AppState;
use crate::domain::pricing::{ExchangeRates, RateHistoryEntry, RateSource};

pub async fn current(State(s): State<AppState>) -> Json<ExchangeRates> {
    Json(s.rates.get_exchange_rates().await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRatesRequest {
    pub eur_rate: f64,
    pub rub_rate: f64,
    #[serde(default = "manual")]
    pub source: RateSource,
}

fn manual() -> RateSource { RateSource::Manual }

pub async fn update(State(s): State<AppState>, Json(r): Json<UpdateRatesRequest>) -> ApiResult<Json<ExchangeRates>> {
    Ok(Json(s.rates.update_exchange_rates(r.eur_rate, r.rub_rate, r.source).await?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

pub async fn history(State(s): State<AppState>, Query(p): Query<HistoryParams>) -> ApiResult<Json<Vec<RateHistoryEntry>>> {
    Ok(Json(s.rates.history(p.limit.unwrap_or(50)).await?))
}
