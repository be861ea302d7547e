//! PostgreSQL implementations of the service stores.

pub mod orders;
pub mod products;
pub mod promos;
pub mod rates;
pub mod shipping;

pub use orders::PgOrderStore;
pub use products::PgProductStore;
pub use promos::PgPromoStore;
pub use rates::PgRateStore;
pub use shipping::PgShippingRateStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::StoreError;

/// Connect to `PostgreSQL`.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new().max_connections(max_connections).connect(database_url).await
}

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Narrows a stored integer column into `u32`.
pub(crate) fn to_u32(column: &str, value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

pub(crate) fn to_i32(column: &str, value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}
