//! Cart quotes, promo validation and order placement.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bus::EventBus;
use crate::domain::aggregates::{
    AddOutcome, Cart, Customer, Order, OrderError, OrderTotals, PromoCode, PromoContext, PromoError,
};
use crate::domain::shipping::{calculate_shipping, ShippingQuote};
use crate::domain::value_objects::{Money, PromoCodeValue};
use crate::services::catalog::ProductStore;
use crate::services::exchange_rates::ExchangeRateService;
use crate::services::orders::{OrderStore, PromoUsage};
use crate::services::shipping_rates::ShippingRatesService;
use crate::StoreError;

/// Attempts at inserting an order before a number collision is reported.
const PLACE_ATTEMPTS: usize = 3;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PromoStore: Send + Sync {
    async fn find_by_code(&self, code: &PromoCodeValue) -> crate::Result<Option<PromoCode>>;
    /// Times `email` has redeemed the code.
    async fn count_usage(&self, promo_code_id: Uuid, email: &str) -> crate::Result<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub selected_color: String,
}

/// A line whose requested quantity was cut by the customs limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub product_id: Uuid,
    pub selected_color: String,
    pub requested: u32,
    pub accepted: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromo {
    pub code: PromoCodeValue,
    pub discount: Money,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub cart: Cart,
    pub adjustments: Vec<Adjustment>,
    pub shipping: ShippingQuote,
    /// Price of the same weight in the admin tariff, when a band covers it.
    pub tariff_price: Option<Money>,
    pub promo: Option<AppliedPromo>,
    pub totals: OrderTotals,
    #[serde(skip)]
    promo_code_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer: Customer,
    pub delivery_point: Option<String>,
    pub items: Vec<CartLine>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Товар не найден: {0}")]
    UnknownProduct(Uuid),
    #[error("Товар «{0}» закончился")]
    OutOfStock(String),
    #[error("Укажите email, чтобы применить промокод")]
    EmailRequired,
    #[error(transparent)]
    Promo(#[from] PromoError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct CheckoutService {
    products: Arc<dyn ProductStore>,
    orders: Arc<dyn OrderStore>,
    promos: Arc<dyn PromoStore>,
    rates: ExchangeRateService,
    shipping_rates: ShippingRatesService,
    bus: EventBus,
}

impl CheckoutService {
    pub fn new(
        products: Arc<dyn ProductStore>,
        orders: Arc<dyn OrderStore>,
        promos: Arc<dyn PromoStore>,
        rates: ExchangeRateService,
        shipping_rates: ShippingRatesService,
        bus: EventBus,
    ) -> Self {
        Self { products, orders, promos, rates, shipping_rates, bus }
    }

    /// Rebuilds the cart from server-side product data, then prices it.
    pub async fn quote(&self, lines: &[CartLine], promo_code: Option<&str>, email: Option<&str>) -> Result<Quote, CheckoutError> {
        let (cart, adjustments) = self.build_cart(lines).await?;
        let subtotal = cart.subtotal();
        let shipping = calculate_shipping(cart.items());
        let tariff_price = self.tariff_price(shipping.total_weight).await;

        let (promo, promo_code_id) = match promo_code.filter(|c| !c.trim().is_empty()) {
            Some(code) => {
                let email = email.map(str::trim).filter(|e| !e.is_empty()).ok_or(CheckoutError::EmailRequired)?;
                let (promo, discount) = self.apply_promo(code, email, &subtotal).await?;
                (Some(AppliedPromo { code: promo.code, discount }), Some(promo.id))
            }
            None => (None, None),
        };

        let discount = promo.as_ref().map(|p| p.discount.clone()).unwrap_or_default();
        let total = Money::rub(subtotal.amount() - discount.amount() + shipping.total_cost.amount());
        let totals = OrderTotals { subtotal, shipping: shipping.total_cost.clone(), discount, total };

        Ok(Quote { cart, adjustments, shipping, tariff_price, promo, totals, promo_code_id })
    }

    /// Checks a code against an order amount without placing anything.
    pub async fn validate_promo(&self, code: &str, email: &str, order_amount: Decimal) -> Result<AppliedPromo, CheckoutError> {
        let (promo, discount) = self.apply_promo(code, email, &Money::rub(order_amount)).await?;
        Ok(AppliedPromo { code: promo.code, discount })
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.customer.email, lines = request.items.len()))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order, CheckoutError> {
        let email = request.customer.email.trim().to_lowercase();
        let quote = self.quote(&request.items, request.promo_code.as_deref(), Some(&email)).await?;
        if !quote.adjustments.is_empty() {
            info!(adjustments = quote.adjustments.len(), "cart truncated by customs limit at checkout");
        }

        let read = self.rates.read_exchange_rates().await;
        if read.degraded {
            warn!(eur_rate = read.rates.eur_rate, rub_rate = read.rates.rub_rate, "order snapshots fallback exchange rates");
        }
        let customer = Customer { email: email.clone(), ..request.customer };
        let promo_code = quote.promo.as_ref().map(|p| p.code.clone());
        let usage = quote.promo_code_id.map(|promo_code_id| PromoUsage { promo_code_id, email });

        // order numbers are random; a taken one is retried with a fresh number
        let mut attempt = 1;
        let mut order = loop {
            let order = Order::place(
                customer.clone(),
                request.delivery_point.clone(),
                &quote.cart,
                quote.totals.clone(),
                promo_code.clone(),
                &read.rates,
            )?;
            match self.orders.insert(&order, usage.clone()).await {
                Ok(()) => break order,
                Err(StoreError::Conflict) if attempt < PLACE_ATTEMPTS => {
                    warn!(order_number = order.order_number(), attempt, "order number already taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };
        info!(order_number = order.order_number(), total = %order.totals().total, "order placed");

        self.bus.publish_all(order.take_events()).await;
        Ok(order)
    }

    async fn build_cart(&self, lines: &[CartLine]) -> Result<(Cart, Vec<Adjustment>), CheckoutError> {
        let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<Uuid, _> = self.products.find_many(&ids).await?.into_iter().map(|p| (p.id, p)).collect();

        let mut cart = Cart::new();
        let mut adjustments = Vec::new();
        for line in lines {
            let product = products.get(&line.product_id).ok_or(CheckoutError::UnknownProduct(line.product_id))?;
            if !product.in_stock {
                return Err(CheckoutError::OutOfStock(product.name.clone()));
            }
            let accepted = match cart.add_to_cart(product.clone(), line.quantity, line.selected_color.clone()) {
                AddOutcome::Added { .. } => continue,
                AddOutcome::Truncated { added, .. } => added,
                AddOutcome::LimitReached { .. } => 0,
            };
            adjustments.push(Adjustment {
                product_id: line.product_id,
                selected_color: line.selected_color.clone(),
                requested: line.quantity,
                accepted,
            });
        }
        Ok((cart, adjustments))
    }

    async fn apply_promo(&self, code: &str, email: &str, subtotal: &Money) -> Result<(PromoCode, Money), CheckoutError> {
        let code = PromoCodeValue::new(code).map_err(|_| PromoError::NotFound)?;
        let promo = self.promos.find_by_code(&code).await?.ok_or(PromoError::NotFound)?;
        let email = email.trim().to_lowercase();

        let previous_orders = if promo.first_order_only { self.orders.count_by_email(&email).await? } else { 0 };
        let previous_uses = if promo.usage_limit > 0 { self.promos.count_usage(promo.id, &email).await? } else { 0 };
        let ctx = PromoContext { now: Utc::now(), subtotal: subtotal.clone(), previous_orders, previous_uses };

        let discount = promo.apply(&ctx)?;
        Ok((promo, discount))
    }

    async fn tariff_price(&self, weight: Decimal) -> Option<Money> {
        match self.shipping_rates.table().await {
            Ok(table) => table.price_for(weight),
            Err(e) => {
                warn!(error = %e, "shipping tariff unavailable");
                None
            }
        }
    }
}
