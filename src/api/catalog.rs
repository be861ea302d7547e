use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::domain::aggregates::Product;
use crate::domain::pricing::ExchangeRates;
use crate::services::catalog::ProductFilter;
use crate::StoreError;

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

pub async fn list_products(State(s): State<AppState>, Query(f): Query<ProductFilter>) -> ApiResult<Json<PaginatedResponse<Product>>> {
    let page = s.catalog.list(&f).await?;
    Ok(Json(PaginatedResponse { data: page.products, total: page.total, page: page.page }))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Product>> {
    match s.catalog.get(id).await {
        Ok(product) => Ok(Json(product)),
        Err(StoreError::NotFound) => Err(ApiError::NotFound("Товар не найден".into())),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepriceResponse {
    pub updated: u64,
    pub rates: ExchangeRates,
}

pub async fn reprice(State(s): State<AppState>) -> ApiResult<Json<RepriceResponse>> {
    let rates = s.rates.current_exchange_rates().await?;
    let updated = s.catalog.reprice_all(&rates).await?;
    Ok(Json(RepriceResponse { updated, rates }))
}
