use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::catalog::PaginatedResponse;
use super::error::ApiResult;
use super::AppState;
use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::pricing::commission::CommissionReport;
use crate::domain::shipping::ShippingRate;
use crate::services::orders::OrderFilter;

pub async fn list_orders(State(s): State<AppState>, Query(f): Query<OrderFilter>) -> ApiResult<Json<PaginatedResponse<Order>>> {
    let (orders, total) = s.orders.list(&f).await?;
    Ok(Json(PaginatedResponse { data: orders, total, page: f.page() }))
}

pub async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    Ok(Json(s.orders.get(id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

pub async fn update_order_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<StatusRequest>,
) -> ApiResult<Json<Order>> {
    let tracking = r.tracking_number.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    Ok(Json(s.orders.change_status(id, r.status, tracking).await?))
}

pub async fn order_commission(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<CommissionReport>> {
    Ok(Json(s.orders.commission(id).await?))
}

pub async fn shipping_rates(State(s): State<AppState>) -> ApiResult<Json<Vec<ShippingRate>>> {
    Ok(Json(s.shipping_rates.table().await?.into_rates()))
}

pub async fn replace_shipping_rates(State(s): State<AppState>, Json(rates): Json<Vec<ShippingRate>>) -> ApiResult<Json<Vec<ShippingRate>>> {
    Ok(Json(s.shipping_rates.replace(rates).await?.into_rates()))
}
