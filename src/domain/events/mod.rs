//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;
use crate::domain::pricing::RateSource;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "camelCase")]
pub enum DomainEvent {
    Order(OrderEvent),
    Rates(RatesEvent),
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "watchstore.orders.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "watchstore.orders.status",
            Self::Rates(RatesEvent::Updated { .. }) => "watchstore.rates.updated",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: String, email: String, total: Decimal },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RatesEvent {
    Updated { eur_rate: f64, rub_rate: f64, source: RateSource },
}
