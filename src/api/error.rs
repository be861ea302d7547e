//! HTTP error mapping.
//!
//! Every failure leaves the API as `{"error": "<message>"}`. Business-rule
//! errors carry their customer-facing message; storage errors are logged
//! and hidden behind a generic 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::checkout::CheckoutError;
use crate::services::exchange_rates::RatesServiceError;
use crate::services::orders::OrdersServiceError;
use crate::services::shipping_rates::ShippingRatesError;
use crate::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound("Не найдено".into()),
            StoreError::Conflict => Self::Conflict("Запись уже существует".into()),
            other => {
                error!(error = %other, "storage failure");
                Self::Internal
            }
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::Store(e) => e.into(),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<OrdersServiceError> for ApiError {
    fn from(e: OrdersServiceError) -> Self {
        match e {
            OrdersServiceError::NotFound => Self::NotFound("Заказ не найден".into()),
            OrdersServiceError::Order(e) => Self::BadRequest(e.to_string()),
            OrdersServiceError::Store(e) => e.into(),
        }
    }
}

impl From<RatesServiceError> for ApiError {
    fn from(e: RatesServiceError) -> Self {
        match e {
            RatesServiceError::Invalid(e) => Self::BadRequest(e.to_string()),
            RatesServiceError::Unavailable => Self::Unavailable(RatesServiceError::Unavailable.to_string()),
            RatesServiceError::Store(e) => e.into(),
        }
    }
}

impl From<ShippingRatesError> for ApiError {
    fn from(e: ShippingRatesError) -> Self {
        match e {
            ShippingRatesError::Invalid(e) => Self::BadRequest(e.to_string()),
            ShippingRatesError::Store(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::BadRequest(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
