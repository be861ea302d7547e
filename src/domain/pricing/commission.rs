//! Commission (reward) earned on an order: resale price minus the EUR
//! purchase price converted with the rates captured when the order was placed.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::order::{Order, OrderItem};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    /// `None` when the line has no EUR price or the order no rate snapshot.
    pub commission: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionReport {
    pub order_id: Uuid,
    pub lines: Vec<CommissionLine>,
    /// Sum over lines with data; `None` if no line had any.
    pub total: Option<Decimal>,
}

/// Commission for a single line, clamped at zero.
pub fn line_commission(
    price_rub: Decimal,
    quantity: u32,
    original_price_eur: Option<f64>,
    eur_rate: Option<f64>,
    rub_rate: Option<f64>,
) -> Option<Decimal> {
    let original_price_eur = original_price_eur?;
    let (eur_rate, rub_rate) = (eur_rate?, rub_rate?);
    if eur_rate <= 0.0 {
        return None;
    }

    let original_price_in_usd = original_price_eur / eur_rate;
    let original_price_in_rub = original_price_in_usd * rub_rate;
    let price = price_rub.to_f64()?;
    let commission = ((price - original_price_in_rub) * f64::from(quantity)).max(0.0);

    Decimal::from_f64(commission).map(|c| c.round_dp(2))
}

pub fn commission_report(order: &Order) -> CommissionReport {
    let lines: Vec<CommissionLine> = order
        .items()
        .iter()
        .map(|item: &OrderItem| CommissionLine {
            product_id: item.product_id,
            name: item.name.clone(),
            quantity: item.quantity,
            commission: line_commission(
                item.price,
                item.quantity,
                item.original_price_eur,
                order.eur_rate(),
                order.rub_rate(),
            ),
        })
        .collect();

    let total = lines
        .iter()
        .filter_map(|l| l.commission)
        .fold(None, |acc: Option<Decimal>, c| Some(acc.unwrap_or_default() + c));

    CommissionReport { order_id: order.id(), lines, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_commission() {
        // 100 EUR / 0.8 = 125 USD * 80 = 10000 RUB; (11200 - 10000) * 2
        let c = line_commission(Decimal::from(11200), 2, Some(100.0), Some(0.8), Some(80.0));
        assert_eq!(c, Some(Decimal::from(2400)));
    }

    #[test]
    fn test_line_commission_clamped() {
        let c = line_commission(Decimal::from(5000), 1, Some(100.0), Some(0.8), Some(80.0));
        assert_eq!(c, Some(Decimal::ZERO));
    }

    #[test]
    fn test_line_commission_missing_data() {
        assert_eq!(line_commission(Decimal::from(5000), 1, None, Some(0.8), Some(80.0)), None);
        assert_eq!(line_commission(Decimal::from(5000), 1, Some(10.0), None, Some(80.0)), None);
        assert_eq!(line_commission(Decimal::from(5000), 1, Some(10.0), Some(0.8), None), None);
    }
}
