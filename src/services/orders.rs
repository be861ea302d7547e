//! Order tracking and the admin order view.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::domain::aggregates::{Order, OrderError, OrderStatus};
use crate::domain::pricing::commission::{commission_report, CommissionReport};
use crate::StoreError;

/// A promo redemption written together with its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoUsage {
    pub promo_code_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderFilter {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(20).clamp(1, 100) }
    pub fn offset(&self) -> i64 { i64::from(self.page() - 1) * i64::from(self.per_page()) }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts the order, its lines and the promo usage in one transaction.
    async fn insert(&self, order: &Order, usage: Option<PromoUsage>) -> crate::Result<()>;
    async fn get(&self, id: Uuid) -> crate::Result<Option<Order>>;
    async fn find_by_number(&self, order_number: &str) -> crate::Result<Option<Order>>;
    async fn list(&self, filter: &OrderFilter) -> crate::Result<(Vec<Order>, i64)>;
    async fn count_by_email(&self, email: &str) -> crate::Result<u64>;
    async fn update_status(&self, order: &Order) -> crate::Result<()>;
}

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error("order not found")]
    NotFound,
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct OrdersService {
    store: Arc<dyn OrderStore>,
    bus: EventBus,
}

impl OrdersService {
    pub fn new(store: Arc<dyn OrderStore>, bus: EventBus) -> Self { Self { store, bus } }

    pub async fn list(&self, filter: &OrderFilter) -> Result<(Vec<Order>, i64), OrdersServiceError> {
        Ok(self.store.list(filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Order, OrdersServiceError> {
        self.store.get(id).await?.ok_or(OrdersServiceError::NotFound)
    }

    pub async fn track(&self, order_number: &str) -> Result<Order, OrdersServiceError> {
        let number = order_number.trim().to_uppercase();
        self.store.find_by_number(&number).await?.ok_or(OrdersServiceError::NotFound)
    }

    #[tracing::instrument(skip(self, tracking_number))]
    pub async fn change_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<Order, OrdersServiceError> {
        let mut order = self.get(id).await?;
        if status == OrderStatus::Shipped {
            order.ship(tracking_number)?;
        } else {
            order.transition(status)?;
        }
        self.store.update_status(&order).await?;
        info!(order_number = order.order_number(), %status, "order status changed");

        self.bus.publish_all(order.take_events()).await;
        Ok(order)
    }

    pub async fn commission(&self, id: Uuid) -> Result<CommissionReport, OrdersServiceError> {
        Ok(commission_report(&self.get(id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Cart, Customer, OrderTotals, Product};
    use crate::domain::pricing::ExchangeRates;
    use crate::domain::value_objects::Money;
    use rust_decimal::Decimal;

    fn pending_order() -> Order {
        let mut cart = Cart::new();
        cart.add_to_cart(Product::new("W1", "Macy", "Macy", Decimal::from(11_200)), 1, "");
        let total = Money::rub(Decimal::from(11_200));
        let totals = OrderTotals { subtotal: total.clone(), shipping: Money::default(), discount: Money::default(), total };
        Order::place(Customer::default(), None, &cart, totals, None, &ExchangeRates::default()).unwrap()
    }

    #[test]
    fn filter_offset_for_huge_page() {
        let f = OrderFilter { page: Some(u32::MAX), per_page: Some(100), ..Default::default() };
        assert_eq!(f.offset(), i64::from(u32::MAX - 1) * 100);
        assert_eq!(OrderFilter::default().offset(), 0);
    }

    #[tokio::test]
    async fn change_status_persists_valid_transition() {
        let order = pending_order();
        let id = order.id();
        let mut store = MockOrderStore::new();
        store.expect_get().returning(move |_| Ok(Some(order.clone())));
        store.expect_update_status().withf(|o| o.status() == OrderStatus::Paid).times(1).returning(|_| Ok(()));

        let svc = OrdersService::new(Arc::new(store), EventBus::disabled());
        let updated = svc.change_status(id, OrderStatus::Paid, None).await.unwrap();
        assert_eq!(updated.status(), OrderStatus::Paid);
    }

    #[tokio::test]
    async fn change_status_rejects_invalid_transition() {
        let order = pending_order();
        let id = order.id();
        let mut store = MockOrderStore::new();
        store.expect_get().returning(move |_| Ok(Some(order.clone())));
        store.expect_update_status().never();

        let svc = OrdersService::new(Arc::new(store), EventBus::disabled());
        let err = svc.change_status(id, OrderStatus::Delivered, None).await.unwrap_err();
        assert!(matches!(err, OrdersServiceError::Order(OrderError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn track_normalises_number() {
        let mut store = MockOrderStore::new();
        store.expect_find_by_number().withf(|n| n == "WS-00000042").times(1).returning(|_| Ok(None));
        let svc = OrdersService::new(Arc::new(store), EventBus::disabled());
        assert!(matches!(svc.track(" ws-00000042 ").await, Err(OrdersServiceError::NotFound)));
    }
}
