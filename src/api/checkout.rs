use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::ApiResult;
use super::AppState;
use crate::domain::aggregates::{Customer, Order, OrderStatus};
use crate::services::checkout::{AppliedPromo, CartLine, PlaceOrder, Quote};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
    pub promo_code: Option<String>,
    #[validate(email(message = "Некорректный email"))]
    pub email: Option<String>,
}

pub async fn quote(State(s): State<AppState>, Json(r): Json<QuoteRequest>) -> ApiResult<Json<Quote>> {
    r.validate()?;
    Ok(Json(s.checkout.quote(&r.items, r.promo_code.as_deref(), r.email.as_deref()).await?))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoRequest {
    #[validate(length(min = 1, max = 50, message = "Введите промокод"))]
    pub code: String,
    #[validate(email(message = "Некорректный email"))]
    pub email: String,
    pub order_amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoValidation {
    pub valid: bool,
    #[serde(flatten)]
    pub promo: AppliedPromo,
}

pub async fn validate_promo(State(s): State<AppState>, Json(r): Json<ValidatePromoRequest>) -> ApiResult<Json<PromoValidation>> {
    r.validate()?;
    let promo = s.checkout.validate_promo(&r.code, &r.email, r.order_amount).await?;
    Ok(Json(PromoValidation { valid: true, promo }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, max = 200, message = "Укажите имя"))]
    pub customer_name: String,
    #[validate(email(message = "Некорректный email"))]
    pub email: String,
    #[validate(length(min = 5, max = 32, message = "Некорректный телефон"))]
    pub phone: String,
    #[validate(length(max = 500))]
    pub delivery_point: Option<String>,
    #[validate(length(min = 1, message = "Корзина пуста"))]
    pub items: Vec<CartLine>,
    pub promo_code: Option<String>,
}

impl From<PlaceOrderRequest> for PlaceOrder {
    fn from(r: PlaceOrderRequest) -> Self {
        Self {
            customer: Customer { name: r.customer_name.trim().to_string(), email: r.email, phone: r.phone.trim().to_string() },
            delivery_point: r.delivery_point.filter(|d| !d.trim().is_empty()),
            items: r.items,
            promo_code: r.promo_code,
        }
    }
}

pub async fn place_order(State(s): State<AppState>, Json(r): Json<PlaceOrderRequest>) -> ApiResult<(StatusCode, Json<Order>)> {
    r.validate()?;
    let order = s.checkout.place_order(r.into()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Public view of an order; contact data stays out.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingView {
    pub order_number: String,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for TrackingView {
    fn from(o: &Order) -> Self {
        Self {
            order_number: o.order_number().to_string(),
            status: o.status(),
            tracking_number: o.tracking_number().map(str::to_string),
            created_at: o.created_at(),
            updated_at: o.updated_at(),
        }
    }
}

pub async fn track(State(s): State<AppState>, Path(number): Path<String>) -> ApiResult<Json<TrackingView>> {
    let order = s.orders.track(&number).await?;
    Ok(Json(TrackingView::from(&order)))
}
