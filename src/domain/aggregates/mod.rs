//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;
pub mod promo;

pub use cart::{AddOutcome, Cart, CartError, CartItem, CUSTOMS_LIMIT};
pub use order::{Customer, Order, OrderError, OrderItem, OrderRecord, OrderStatus, OrderTotals};
pub use product::{CustomsCategory, Product};
pub use promo::{DiscountType, PromoCode, PromoContext, PromoError};
