//! Shipping weight and cost.
//!
//! Two sources exist: the fixed per-unit table used at checkout, and the
//! weight-band tariff the admin maintains for reference.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::cart::CartItem;
use crate::domain::is_jewelry;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitShipping {
    /// Kilograms per unit.
    pub weight_per_unit: Decimal,
    /// Rubles per unit.
    pub cost_per_unit: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ShippingConfig {
    pub watches: UnitShipping,
    pub jewelry: UnitShipping,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            watches: UnitShipping { weight_per_unit: Decimal::new(3, 1), cost_per_unit: Decimal::from(1540) },
            jewelry: UnitShipping { weight_per_unit: Decimal::new(1, 1), cost_per_unit: Decimal::from(1290) },
        }
    }
}

impl ShippingConfig {
    pub fn for_collection(&self, collection: &str) -> &UnitShipping {
        if is_jewelry(collection) { &self.jewelry } else { &self.watches }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub total_weight: Decimal,
    pub total_cost: Money,
}

/// Sums per-unit weight and cost over every cart line.
pub fn calculate_shipping(items: &[CartItem]) -> ShippingQuote {
    let config = ShippingConfig::default();
    let (weight, cost) = items.iter().fold((Decimal::ZERO, Decimal::ZERO), |(w, c), item| {
        let unit = config.for_collection(&item.product.collection);
        let qty = Decimal::from(item.quantity);
        (w + unit.weight_per_unit * qty, c + unit.cost_per_unit * qty)
    });
    ShippingQuote { total_weight: weight, total_cost: Money::rub(cost) }
}

/// One weight band of the admin tariff, bounds inclusive, in kilograms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRate {
    #[serde(default = "Uuid::now_v7")]
    pub id: Uuid,
    pub weight_from: Decimal,
    pub weight_to: Decimal,
    pub price: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShippingRateTable {
    rates: Vec<ShippingRate>,
}

impl ShippingRateTable {
    /// Sorts the bands by lower bound and rejects malformed tables.
    pub fn new(mut rates: Vec<ShippingRate>) -> Result<Self, ShippingRateError> {
        rates.sort_by(|a, b| a.weight_from.cmp(&b.weight_from));
        for rate in &rates {
            if rate.weight_from.is_sign_negative() || rate.price.is_sign_negative() {
                return Err(ShippingRateError::Negative(rate.id));
            }
            if rate.weight_from >= rate.weight_to {
                return Err(ShippingRateError::EmptyBand(rate.id));
            }
        }
        if let Some(pair) = rates.windows(2).find(|w| w[1].weight_from <= w[0].weight_to) {
            return Err(ShippingRateError::Overlap(pair[0].id, pair[1].id));
        }
        Ok(Self { rates })
    }

    pub fn rates(&self) -> &[ShippingRate] { &self.rates }
    pub fn into_rates(self) -> Vec<ShippingRate> { self.rates }

    pub fn price_for(&self, weight: Decimal) -> Option<Money> {
        self.rates
            .iter()
            .find(|r| r.weight_from <= weight && weight <= r.weight_to)
            .map(|r| Money::rub(r.price))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShippingRateError {
    #[error("rate {0} has a negative weight or price")]
    Negative(Uuid),
    #[error("rate {0} has weightFrom >= weightTo")]
    EmptyBand(Uuid),
    #[error("rates {0} and {1} overlap")]
    Overlap(Uuid, Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::Product;
    use crate::domain::JEWELRY_COLLECTION;

    fn line(collection: &str, quantity: u32) -> CartItem {
        let mut product = Product::new("SKU", "Item", collection, Decimal::from(10_000));
        product.subcategory = Some("Кольца".into());
        CartItem { product, quantity, selected_color: String::new() }
    }

    fn band(from: i64, to: i64, price: i64) -> ShippingRate {
        ShippingRate { id: Uuid::now_v7(), weight_from: Decimal::new(from, 1), weight_to: Decimal::new(to, 1), price: Decimal::from(price) }
    }

    #[test]
    fn test_calculate_shipping_mixed_cart() {
        let quote = calculate_shipping(&[line("Macy", 2), line(JEWELRY_COLLECTION, 3)]);
        assert_eq!(quote.total_weight, Decimal::new(9, 1));
        assert_eq!(quote.total_cost.amount(), Decimal::from(2 * 1540 + 3 * 1290));
    }

    #[test]
    fn test_calculate_shipping_empty() {
        let quote = calculate_shipping(&[]);
        assert!(quote.total_weight.is_zero());
        assert!(quote.total_cost.is_zero());
    }

    #[test]
    fn test_calculate_shipping_linear_in_quantity() {
        for collection in ["Seiko", JEWELRY_COLLECTION] {
            let single = calculate_shipping(&[line(collection, 1)]);
            let double = calculate_shipping(&[line(collection, 2)]);
            assert_eq!(double.total_weight, single.total_weight * Decimal::from(2));
            assert_eq!(double.total_cost.amount(), single.total_cost.amount() * Decimal::from(2));
        }
    }

    #[test]
    fn test_rate_table_lookup() {
        let table = ShippingRateTable::new(vec![band(6, 10, 900), band(0, 5, 500)]).unwrap();
        assert_eq!(table.rates()[0].price, Decimal::from(500));
        assert_eq!(table.price_for(Decimal::new(3, 1)).unwrap().amount(), Decimal::from(500));
        assert_eq!(table.price_for(Decimal::new(10, 1)).unwrap().amount(), Decimal::from(900));
        assert!(table.price_for(Decimal::new(55, 2)).is_none());
        assert!(table.price_for(Decimal::from(2)).is_none());
    }

    #[test]
    fn test_rate_table_rejects_bad_bands() {
        assert!(matches!(ShippingRateTable::new(vec![band(5, 5, 100)]), Err(ShippingRateError::EmptyBand(_))));
        assert!(matches!(ShippingRateTable::new(vec![band(-1, 5, 100)]), Err(ShippingRateError::Negative(_))));
        assert!(matches!(ShippingRateTable::new(vec![band(0, 5, 100), band(5, 9, 200)]), Err(ShippingRateError::Overlap(..))));
    }
}
