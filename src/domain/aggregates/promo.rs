//! Promo code aggregate

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{Money, PromoCodeValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Rubles off the subtotal.
    Fixed,
    /// Percent off the subtotal.
    Percent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub id: Uuid,
    pub code: PromoCodeValue,
    pub discount_type: DiscountType,
    pub discount: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub min_order_amount: Option<Decimal>,
    pub first_order_only: bool,
    /// Uses allowed per customer e-mail; 0 means unlimited.
    pub usage_limit: u32,
    pub is_active: bool,
}

/// Facts about the customer and order a code is checked against.
#[derive(Clone, Debug)]
pub struct PromoContext {
    pub now: DateTime<Utc>,
    pub subtotal: Money,
    pub previous_orders: u64,
    pub previous_uses: u64,
}

impl PromoCode {
    pub fn validate(&self, ctx: &PromoContext) -> Result<(), PromoError> {
        if !self.is_active { return Err(PromoError::Inactive); }
        if ctx.now < self.valid_from { return Err(PromoError::NotStarted); }
        if ctx.now > self.valid_until { return Err(PromoError::Expired); }
        if let Some(min) = self.min_order_amount {
            if ctx.subtotal.amount() < min { return Err(PromoError::BelowMinimum(min)); }
        }
        if self.first_order_only && ctx.previous_orders > 0 { return Err(PromoError::FirstOrderOnly); }
        if self.usage_limit > 0 && ctx.previous_uses >= u64::from(self.usage_limit) {
            return Err(PromoError::UsageLimitReached);
        }
        Ok(())
    }

    /// Discount on `subtotal`, never more than the subtotal itself.
    pub fn discount_for(&self, subtotal: &Money) -> Money {
        let amount = match self.discount_type {
            DiscountType::Fixed => self.discount,
            DiscountType::Percent => (subtotal.amount() * self.discount / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(0, RoundingStrategy::ToZero),
        };
        Money::new(amount.max(Decimal::ZERO).min(subtotal.amount()), subtotal.currency())
    }

    /// Validates and returns the discount in one step.
    pub fn apply(&self, ctx: &PromoContext) -> Result<Money, PromoError> {
        self.validate(ctx)?;
        Ok(self.discount_for(&ctx.subtotal))
    }
}

/// Rejection reasons, worded for the customer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PromoError {
    #[error("Промокод не найден")]
    NotFound,
    #[error("Промокод неактивен")]
    Inactive,
    #[error("Промокод еще не действует")]
    NotStarted,
    #[error("Срок действия промокода истек")]
    Expired,
    #[error("Минимальная сумма заказа для этого промокода: {0} ₽")]
    BelowMinimum(Decimal),
    #[error("Промокод действует только на первый заказ")]
    FirstOrderOnly,
    #[error("Промокод уже использован")]
    UsageLimitReached,
}
