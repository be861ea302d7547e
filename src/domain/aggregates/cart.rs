//! Cart Aggregate
//!
//! Customs rules allow at most [`CUSTOMS_LIMIT`] units of the same customs
//! category per parcel. Requests above that are truncated, never rejected
//! with an error; the returned outcome lets the caller show a hint.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::product::{CustomsCategory, Product};
use crate::domain::value_objects::Money;

/// Units allowed per customs category.
pub const CUSTOMS_LIMIT: u32 = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
    #[serde(default)]
    pub selected_color: String,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.product.price_money().multiply(self.quantity) }
    fn is(&self, product_id: Uuid, selected_color: &str) -> bool {
        self.product.id == product_id && self.selected_color == selected_color
    }
}

/// Result of [`Cart::add_to_cart`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum AddOutcome {
    Added { quantity: u32 },
    /// Only part of the request fit under the limit.
    Truncated { requested: u32, added: u32 },
    /// The category is already full; the cart is unchanged.
    LimitReached { category: CustomsCategory },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredCart", into = "StoredCart")]
pub struct Cart {
    items: Vec<CartItem>,
}

/// Shape of a cart as kept in client storage.
#[derive(Serialize, Deserialize)]
struct StoredCart {
    items: Vec<CartItem>,
}

impl From<StoredCart> for Cart {
    fn from(stored: StoredCart) -> Self { Cart::restore(stored.items) }
}

impl From<Cart> for StoredCart {
    fn from(cart: Cart) -> Self { Self { items: cart.items } }
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Rebuilds a cart from untrusted lines, replaying each through the limit.
    pub fn restore(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            cart.add_to_cart(item.product, item.quantity, item.selected_color);
        }
        cart
    }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn total_items(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }

    pub fn subtotal(&self) -> Money {
        Money::rub(self.items.iter().map(|i| i.product.price * Decimal::from(i.quantity)).sum())
    }

    pub fn category_total(&self, category: &CustomsCategory) -> u32 {
        self.items.iter().filter(|i| &i.product.customs_category() == category).map(|i| i.quantity).sum()
    }

    /// Units of `product`'s category that can still be added.
    pub fn remaining_for(&self, product: &Product) -> u32 {
        CUSTOMS_LIMIT.saturating_sub(self.category_total(&product.customs_category()))
    }

    pub fn add_to_cart(&mut self, product: Product, quantity: u32, selected_color: impl Into<String>) -> AddOutcome {
        let selected_color = selected_color.into();
        let category = product.customs_category();
        let room = self.remaining_for(&product);
        let can_add = quantity.min(room);
        if can_add == 0 {
            return if room == 0 { AddOutcome::LimitReached { category } } else { AddOutcome::Added { quantity: 0 } };
        }

        let added = match self.items.iter_mut().find(|i| i.is(product.id, &selected_color)) {
            Some(existing) => {
                let before = existing.quantity;
                existing.quantity = (before + can_add).min(CUSTOMS_LIMIT);
                existing.quantity - before
            }
            None => {
                self.items.push(CartItem { product, quantity: can_add, selected_color });
                can_add
            }
        };

        if added < quantity {
            AddOutcome::Truncated { requested: quantity, added }
        } else {
            AddOutcome::Added { quantity: added }
        }
    }

    /// Sets a line's quantity, capped by the other lines of its category.
    /// Zero or less removes the line. Returns the quantity actually stored.
    pub fn update_quantity(&mut self, product_id: Uuid, selected_color: &str, quantity: i64) -> Result<u32, CartError> {
        let idx = self.items.iter().position(|i| i.is(product_id, selected_color)).ok_or(CartError::ItemNotFound)?;
        if quantity <= 0 {
            self.items.remove(idx);
            return Ok(0);
        }

        let category = self.items[idx].product.customs_category();
        let others: u32 = self
            .items
            .iter()
            .enumerate()
            .filter(|(i, item)| *i != idx && item.product.customs_category() == category)
            .map(|(_, item)| item.quantity)
            .sum();
        let max_allowed = i64::from(CUSTOMS_LIMIT.saturating_sub(others));
        let capped = quantity.min(max_allowed);

        if capped <= 0 {
            self.items.remove(idx);
            return Ok(0);
        }
        // capped is within 1..=CUSTOMS_LIMIT here
        let capped = capped as u32;
        self.items[idx].quantity = capped;
        Ok(capped)
    }

    pub fn remove_item(&mut self, product_id: Uuid, selected_color: &str) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| !i.is(product_id, selected_color));
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("item not found in cart")]
    ItemNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JEWELRY_COLLECTION;

    fn watch(name: &str) -> Product { Product::new(name, name, "Macy", Decimal::from(10_000)) }

    fn jewel(subcategory: &str) -> Product {
        let mut p = Product::new(subcategory, subcategory, JEWELRY_COLLECTION, Decimal::from(4_000));
        p.subcategory = Some(subcategory.to_string());
        p
    }

    #[test]
    fn test_add_merges_same_product_and_color() {
        let mut cart = Cart::new();
        let w = watch("A");
        assert_eq!(cart.add_to_cart(w.clone(), 1, "black"), AddOutcome::Added { quantity: 1 });
        assert_eq!(cart.add_to_cart(w.clone(), 1, "black"), AddOutcome::Added { quantity: 1 });
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);

        cart.add_to_cart(w, 1, "gold");
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn test_add_truncates_to_category_limit() {
        let mut cart = Cart::new();
        cart.add_to_cart(watch("A"), 2, "");
        let outcome = cart.add_to_cart(watch("B"), 5, "");
        assert_eq!(outcome, AddOutcome::Truncated { requested: 5, added: 1 });
        assert_eq!(cart.category_total(&CustomsCategory::Watches), 3);

        let outcome = cart.add_to_cart(watch("C"), 1, "");
        assert_eq!(outcome, AddOutcome::LimitReached { category: CustomsCategory::Watches });
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_limit_is_per_category() {
        let mut cart = Cart::new();
        cart.add_to_cart(watch("A"), 3, "");
        cart.add_to_cart(jewel("Кольца"), 3, "");
        cart.add_to_cart(jewel("Серьги"), 2, "");
        assert_eq!(cart.total_items(), 8);
        assert_eq!(cart.add_to_cart(jewel("Кольца"), 1, ""), AddOutcome::LimitReached { category: CustomsCategory::Jewelry("Кольца".into()) });
    }

    #[test]
    fn test_update_quantity_capped_by_other_lines() {
        let mut cart = Cart::new();
        let a = watch("A");
        let b = watch("B");
        cart.add_to_cart(a.clone(), 1, "");
        cart.add_to_cart(b.clone(), 1, "");

        assert_eq!(cart.update_quantity(a.id, "", 10).unwrap(), 2);
        assert_eq!(cart.category_total(&CustomsCategory::Watches), 3);
        assert_eq!(cart.update_quantity(b.id, "", 1).unwrap(), 1);
        assert_eq!(cart.update_quantity(a.id, "", 1).unwrap(), 1);
        assert_eq!(cart.update_quantity(b.id, "", 3).unwrap(), 2);
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new();
        let a = watch("A");
        cart.add_to_cart(a.clone(), 2, "red");
        assert_eq!(cart.update_quantity(a.id, "red", 0).unwrap(), 0);
        assert!(cart.is_empty());
        assert_eq!(cart.update_quantity(a.id, "red", 1), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_update_quantity_negative_removes() {
        let mut cart = Cart::new();
        let a = watch("A");
        cart.add_to_cart(a.clone(), 1, "");
        assert_eq!(cart.update_quantity(a.id, "", -4).unwrap(), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal_and_remove() {
        let mut cart = Cart::new();
        let a = watch("A");
        cart.add_to_cart(a.clone(), 2, "");
        cart.add_to_cart(jewel("Кольца"), 1, "");
        assert_eq!(cart.subtotal().amount(), Decimal::from(24_000));

        cart.remove_item(a.id, "").unwrap();
        assert_eq!(cart.subtotal().amount(), Decimal::from(4_000));
        assert_eq!(cart.remove_item(a.id, ""), Err(CartError::ItemNotFound));
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_restore_enforces_limit() {
        let a = watch("A");
        let b = watch("B");
        let stored = vec![
            CartItem { product: a, quantity: 7, selected_color: String::new() },
            CartItem { product: b, quantity: 2, selected_color: String::new() },
        ];
        let cart = Cart::restore(stored);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_deserialize_goes_through_restore() {
        let a = watch("A");
        let json = serde_json::json!({
            "items": [{ "product": a, "quantity": 9, "selectedColor": "black" }]
        });
        let cart: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(cart.total_items(), 3);

        let back = serde_json::to_value(&cart).unwrap();
        assert_eq!(back["items"][0]["quantity"], 3);
        assert_eq!(back["items"][0]["selectedColor"], "black");
    }
}
