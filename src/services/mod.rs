//! Application services. Each owns its store traits; Postgres
//! implementations live in [`crate::db`].

pub mod catalog;
pub mod checkout;
pub mod exchange_rates;
pub mod orders;
pub mod shipping_rates;

pub use catalog::{CatalogService, ProductFilter, ProductStore};
pub use checkout::{CheckoutError, CheckoutService, PromoStore};
pub use exchange_rates::{ExchangeRateService, RateCache, RateStore, RatesRead};
pub use orders::{OrderStore, OrdersService, OrdersServiceError};
pub use shipping_rates::{ShippingRateStore, ShippingRatesService};
