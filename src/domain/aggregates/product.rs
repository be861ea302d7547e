//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::pricing::ExchangeRates;
use crate::domain::value_objects::Money;
use crate::domain::{is_jewelry, JEWELRY_COLLECTION};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    /// Brand collection for watches, `Украшения` for all jewelry.
    pub collection: String,
    pub subcategory: Option<String>,
    /// Shelf price in rubles.
    pub price: Decimal,
    /// Purchase price in euros, when imported from a supplier feed.
    pub original_price_eur: Option<f64>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Grouping used for the customs limit on units per parcel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "name")]
pub enum CustomsCategory {
    Watches,
    Jewelry(String),
}

impl Product {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, collection: impl Into<String>, price: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), sku: sku.into(), name: name.into(), collection: collection.into(),
            subcategory: None, price, original_price_eur: None, colors: vec![], images: vec![],
            in_stock: true, created_at: now, updated_at: now,
        }
    }

    pub fn is_jewelry(&self) -> bool { is_jewelry(&self.collection) }
    pub fn price_money(&self) -> Money { Money::rub(self.price) }

    pub fn customs_category(&self) -> CustomsCategory {
        if !self.is_jewelry() {
            return CustomsCategory::Watches;
        }
        let name = self.subcategory.as_deref().filter(|s| !s.is_empty()).unwrap_or(JEWELRY_COLLECTION);
        CustomsCategory::Jewelry(name.to_string())
    }

    /// Recomputes the ruble price from the EUR price. Returns whether it changed.
    pub fn reprice(&mut self, rates: &ExchangeRates) -> bool {
        let Some(price_eur) = self.original_price_eur else { return false };
        let Some(price) = rates.convert(price_eur, &self.collection) else {
            warn!(sku = %self.sku, price_eur, "skipping reprice of invalid EUR price");
            return false;
        };
        if price == self.price {
            return false;
        }
        self.price = price;
        self.touch();
        true
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
