//! Exchange rates and the EUR → RUB shelf price formula.
//!
//! Prices are computed in `f64` in a fixed order of operations so that the
//! rubles shown in the shop stay identical across recalculations. Only the
//! final, rounded amount is turned into a [`Decimal`].

pub mod commission;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::is_jewelry;

/// RUB per USD used when nothing has ever been stored.
pub const DEFAULT_RUB_RATE: f64 = 80.0;
/// EUR per USD used when nothing has ever been stored.
pub const DEFAULT_EUR_RATE: f64 = 80.0 / 95.0;

/// Margin applied on top of the USD price.
const MARGIN_FACTOR: f64 = 1.01;
/// Rubles added to the RUB/USD rate before conversion.
const RUB_RATE_SURCHARGE: f64 = 5.0;
const WATCH_MARKUP_RUB: f64 = 1000.0;
const JEWELRY_MARKUP_RUB: f64 = 500.0;
const PRICE_STEP_RUB: f64 = 100.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRates {
    pub eur_rate: f64,
    pub rub_rate: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ExchangeRates {
    fn default() -> Self {
        Self { eur_rate: DEFAULT_EUR_RATE, rub_rate: DEFAULT_RUB_RATE, updated_at: None }
    }
}

impl ExchangeRates {
    pub fn new(eur_rate: f64, rub_rate: f64) -> Result<Self, RateError> {
        let rates = Self { eur_rate, rub_rate, updated_at: None };
        rates.validate()?;
        Ok(rates)
    }

    /// Both rates must be finite and strictly positive.
    pub fn validate(&self) -> Result<(), RateError> {
        if !(self.eur_rate.is_finite() && self.eur_rate > 0.0) {
            return Err(RateError::InvalidRate { name: "eurRate", value: self.eur_rate });
        }
        if !(self.rub_rate.is_finite() && self.rub_rate > 0.0) {
            return Err(RateError::InvalidRate { name: "rubRate", value: self.rub_rate });
        }
        Ok(())
    }

    /// Shelf price for a stored EUR price. `None` when the EUR price is
    /// negative or not finite, or the rates are invalid.
    pub fn convert(&self, price_eur: f64, collection: &str) -> Option<Decimal> {
        if !(price_eur.is_finite() && price_eur >= 0.0) || self.validate().is_err() {
            return None;
        }
        Decimal::from_f64(shelf_price_rub(price_eur, self.eur_rate, self.rub_rate, collection))
    }
}

/// Where a stored rate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Cbr,
    Manual,
    Default,
}

impl RateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cbr => "cbr",
            Self::Manual => "manual",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for RateSource {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cbr" => Ok(Self::Cbr),
            "manual" => Ok(Self::Manual),
            "default" => Ok(Self::Default),
            other => Err(RateError::UnknownSource(other.to_string())),
        }
    }
}

/// One row of the append-only rate log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateHistoryEntry {
    pub id: Uuid,
    pub eur_rate: f64,
    pub rub_rate: f64,
    pub source: RateSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RateError {
    #[error("{name} must be a positive number, got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("unknown rate source: {0}")]
    UnknownSource(String),
}

/// Flat ruble markup added per collection.
pub fn category_markup(collection: &str) -> f64 {
    if is_jewelry(collection) { JEWELRY_MARKUP_RUB } else { WATCH_MARKUP_RUB }
}

/// Converts a EUR purchase price into the RUB shelf price.
///
/// `eur_rate` is EUR per USD and `rub_rate` RUB per USD. The total is
/// rounded up to the next 100 rubles.
///
/// Callers pass a finite, non-negative price and valid rates; anything the
/// result cannot represent comes back as zero. Stored prices go through
/// [`ExchangeRates::convert`], which rejects such input instead.
pub fn convert_price(price_eur: f64, eur_rate: f64, rub_rate: f64, collection: &str) -> Decimal {
    Decimal::from_f64(shelf_price_rub(price_eur, eur_rate, rub_rate, collection)).unwrap_or_default()
}

fn shelf_price_rub(price_eur: f64, eur_rate: f64, rub_rate: f64, collection: &str) -> f64 {
    let price_in_usd = price_eur / eur_rate;
    let with_margin = price_in_usd * MARGIN_FACTOR;
    let price_in_rub = with_margin * (rub_rate + RUB_RATE_SURCHARGE);
    let total = price_in_rub + category_markup(collection);
    (total / PRICE_STEP_RUB).ceil() * PRICE_STEP_RUB
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JEWELRY_COLLECTION;

    #[test]
    fn test_convert_price_watches() {
        // 100 / 0.842 * 1.01 * 85 + 1000 = 11195.96..
        assert_eq!(convert_price(100.0, 0.842, 80.0, "Macy"), Decimal::from(11200));
    }

    #[test]
    fn test_convert_price_jewelry() {
        // 10195.96.. + 500 = 10695.96..
        assert_eq!(convert_price(100.0, 0.842, 80.0, JEWELRY_COLLECTION), Decimal::from(10700));
    }

    #[test]
    fn test_convert_price_exact_hundred_is_not_bumped() {
        // 0 EUR leaves just the markup, already a multiple of 100
        assert_eq!(convert_price(0.0, 1.0, 80.0, "Macy"), Decimal::from(1000));
        assert_eq!(convert_price(0.0, 1.0, 80.0, JEWELRY_COLLECTION), Decimal::from(500));
    }

    #[test]
    fn test_convert_rejects_bad_input() {
        let rates = ExchangeRates::new(0.842, 80.0).unwrap();
        assert_eq!(rates.convert(100.0, "Macy"), Some(Decimal::from(11200)));
        assert_eq!(rates.convert(-1.0, "Macy"), None);
        assert_eq!(rates.convert(f64::NAN, "Macy"), None);
        assert_eq!(rates.convert(f64::INFINITY, "Macy"), None);
        // beyond what a Decimal holds
        assert_eq!(rates.convert(1e300, "Macy"), None);

        let broken = ExchangeRates { eur_rate: 0.0, rub_rate: 80.0, updated_at: None };
        assert_eq!(broken.convert(100.0, "Macy"), None);
    }

    #[test]
    fn test_convert_price_large_values_are_not_truncated() {
        // past i64::MAX, still representable as a Decimal
        let price = convert_price(1e20, 1.0, 80.0, "Macy");
        assert!(price > Decimal::from(i64::MAX));
    }

    #[test]
    fn test_category_markup() {
        for collection in ["Macy", "Seiko", "", "украшения", "Украшения "] {
            assert_eq!(category_markup(collection), 1000.0, "collection {collection:?}");
        }
        assert_eq!(category_markup(JEWELRY_COLLECTION), 500.0);
    }

    #[test]
    fn test_defaults() {
        let rates = ExchangeRates::default();
        assert_eq!(rates.rub_rate, 80.0);
        assert!((rates.eur_rate - 0.842).abs() < 0.001);
        assert!(rates.updated_at.is_none());
    }

    #[test]
    fn test_rates_validation() {
        assert!(ExchangeRates::new(0.9, 90.0).is_ok());
        assert!(matches!(ExchangeRates::new(0.0, 90.0), Err(RateError::InvalidRate { name: "eurRate", .. })));
        assert!(matches!(ExchangeRates::new(0.9, -1.0), Err(RateError::InvalidRate { name: "rubRate", .. })));
        assert!(ExchangeRates::new(f64::NAN, 90.0).is_err());
        assert!(ExchangeRates::new(0.9, f64::INFINITY).is_err());
    }

    #[test]
    fn test_rate_source_round_trip() {
        for source in [RateSource::Cbr, RateSource::Manual, RateSource::Default] {
            assert_eq!(source.as_str().parse::<RateSource>().unwrap(), source);
        }
        assert!("ecb".parse::<RateSource>().is_err());
    }
}
