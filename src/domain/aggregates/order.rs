//! Order Aggregate

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::cart::Cart;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::ExchangeRates;
use crate::domain::value_objects::{Money, PromoCodeValue};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub selected_color: String,
    pub quantity: u32,
    /// Ruble price per unit at the time of the order.
    pub price: Decimal,
    pub original_price_eur: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Paid, Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Paid, Processing) | (Processing, Shipped) | (Shipped, Delivered)
                | (Pending | Paid | Processing, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

/// Monetary breakdown fixed at checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Uuid,
    order_number: String,
    customer: Customer,
    delivery_point: Option<String>,
    status: OrderStatus,
    items: Vec<OrderItem>,
    totals: OrderTotals,
    promo_code: Option<PromoCodeValue>,
    eur_rate: Option<f64>,
    rub_rate: Option<f64>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Everything needed to rebuild an order read back from storage.
#[derive(Clone, Debug)]
pub struct OrderRecord {
    pub id: Uuid,
    pub order_number: String,
    pub customer: Customer,
    pub delivery_point: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub promo_code: Option<PromoCodeValue>,
    pub eur_rate: Option<f64>,
    pub rub_rate: Option<f64>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Places an order from a cart, snapshotting the rates in force.
    pub fn place(
        customer: Customer,
        delivery_point: Option<String>,
        cart: &Cart,
        totals: OrderTotals,
        promo_code: Option<PromoCodeValue>,
        rates: &ExchangeRates,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::NoItems); }
        let items = cart
            .items()
            .iter()
            .map(|i| OrderItem {
                product_id: i.product.id,
                name: i.product.name.clone(),
                selected_color: i.selected_color.clone(),
                quantity: i.quantity,
                price: i.product.price,
                original_price_eur: i.product.original_price_eur,
            })
            .collect();

        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut order = Self {
            id, order_number: generate_order_number(), customer, delivery_point,
            status: OrderStatus::Pending, items, totals, promo_code,
            eur_rate: Some(rates.eur_rate), rub_rate: Some(rates.rub_rate), tracking_number: None,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: id,
            order_number: order.order_number.clone(),
            email: order.customer.email.clone(),
            total: order.totals.total.amount(),
        }));
        Ok(order)
    }

    pub fn from_record(r: OrderRecord) -> Self {
        Self {
            id: r.id, order_number: r.order_number, customer: r.customer, delivery_point: r.delivery_point,
            status: r.status, items: r.items, totals: r.totals, promo_code: r.promo_code,
            eur_rate: r.eur_rate, rub_rate: r.rub_rate, tracking_number: r.tracking_number,
            created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn customer(&self) -> &Customer { &self.customer }
    pub fn delivery_point(&self) -> Option<&str> { self.delivery_point.as_deref() }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn totals(&self) -> &OrderTotals { &self.totals }
    pub fn promo_code(&self) -> Option<&PromoCodeValue> { self.promo_code.as_ref() }
    pub fn eur_rate(&self) -> Option<f64> { self.eur_rate }
    pub fn rub_rate(&self) -> Option<f64> { self.rub_rate }
    pub fn tracking_number(&self) -> Option<&str> { self.tracking_number.as_deref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: self.status, to: next });
        }
        let from = self.status;
        self.status = next;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(())
    }

    pub fn ship(&mut self, tracking_number: Option<String>) -> Result<(), OrderError> {
        self.transition(OrderStatus::Shipped)?;
        self.tracking_number = tracking_number;
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn generate_order_number() -> String {
    format!("WS-{:08}", rand::thread_rng().gen_range(0..100_000_000u32))
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Корзина пуста")]
    NoItems,
    #[error("Нельзя перевести заказ из статуса {from} в {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("unknown order status: {0}")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::Product;
    use crate::domain::pricing::commission::commission_report;

    fn totals(amount: i64) -> OrderTotals {
        let m = Money::rub(Decimal::from(amount));
        OrderTotals { subtotal: m.clone(), shipping: Money::default(), discount: Money::default(), total: m }
    }

    fn cart_with(products: Vec<(Product, u32)>) -> Cart {
        let mut cart = Cart::new();
        for (p, q) in products { cart.add_to_cart(p, q, ""); }
        cart
    }

    #[test]
    fn test_order_workflow() {
        let cart = cart_with(vec![(Product::new("W1", "Widget", "Macy", Decimal::from(10_000)), 2)]);
        let mut order = Order::place(Customer::default(), None, &cart, totals(20_000), None, &ExchangeRates::default()).unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.order_number().starts_with("WS-"));
        assert_eq!(order.eur_rate(), Some(ExchangeRates::default().eur_rate));
        assert_eq!(order.take_events().len(), 1);

        order.transition(OrderStatus::Paid).unwrap();
        order.transition(OrderStatus::Processing).unwrap();
        order.ship(Some("TRACK-1".into())).unwrap();
        assert_eq!(order.status(), OrderStatus::Shipped);
        assert_eq!(order.tracking_number(), Some("TRACK-1"));
        assert!(order.transition(OrderStatus::Cancelled).is_err());
        order.transition(OrderStatus::Delivered).unwrap();
        assert_eq!(order.take_events().len(), 4);
    }

    #[test]
    fn test_empty_cart_rejected() {
        let err = Order::place(Customer::default(), None, &Cart::new(), totals(0), None, &ExchangeRates::default()).unwrap_err();
        assert_eq!(err, OrderError::NoItems);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_commission_report() {
        let mut with_eur = Product::new("W1", "Macy", "Macy", Decimal::from(11_200));
        with_eur.original_price_eur = Some(100.0);
        let without_eur = Product::new("W2", "Seiko", "Seiko", Decimal::from(9_000));
        let cart = cart_with(vec![(with_eur, 1), (without_eur, 1)]);
        let rates = ExchangeRates::new(0.8, 80.0).unwrap();

        let order = Order::place(Customer::default(), None, &cart, totals(20_200), None, &rates).unwrap();
        let report = commission_report(&order);
        assert_eq!(report.lines.len(), 2);
        assert_eq!(report.lines[0].commission, Some(Decimal::from(1_200)));
        assert_eq!(report.lines[1].commission, None);
        assert_eq!(report.total, Some(Decimal::from(1_200)));
    }

    #[test]
    fn test_commission_report_without_snapshot() {
        let mut p = Product::new("W1", "Macy", "Macy", Decimal::from(11_200));
        p.original_price_eur = Some(100.0);
        let placed = Order::place(Customer::default(), None, &cart_with(vec![(p, 1)]), totals(11_200), None, &ExchangeRates::default()).unwrap();

        let record = OrderRecord {
            id: placed.id(), order_number: placed.order_number().into(), customer: Customer::default(),
            delivery_point: None, status: OrderStatus::Pending, items: placed.items().to_vec(),
            totals: placed.totals().clone(), promo_code: None, eur_rate: None, rub_rate: None,
            tracking_number: None, created_at: placed.created_at(), updated_at: placed.updated_at(),
        };
        let report = commission_report(&Order::from_record(record));
        assert_eq!(report.lines[0].commission, None);
        assert_eq!(report.total, None);
    }

    #[test]
    fn test_commission_total_never_negative() {
        let mut p = Product::new("W1", "Macy", "Macy", Decimal::from(1_000));
        p.original_price_eur = Some(500.0);
        let order = Order::place(Customer::default(), None, &cart_with(vec![(p, 2)]), totals(2_000), None, &ExchangeRates::default()).unwrap();
        assert_eq!(commission_report(&order).total, Some(Decimal::ZERO));
    }
}
