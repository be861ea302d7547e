//! Watchstore Storefront Backend
//!
//! Resale storefront for watches and jewelry, priced in rubles from
//! European purchase prices.
//!
//! ## Features
//! - Currency-converted pricing with a cached exchange-rate source
//! - Category-based shipping calculation and an admin tariff table
//! - Cart with the customs cap (3 units per customs category)
//! - Promo codes, checkout and order lifecycle tracking
//! - Commission report for the admin order view

pub mod api;
pub mod bus;
pub mod config;
pub mod db;
pub mod domain;
pub mod services;

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Persistence failure raised by any store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    #[error("stored data is invalid: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if matches!(error, sqlx::Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(|e| e.kind()) {
            Some(sqlx::error::ErrorKind::UniqueViolation) => Self::Conflict,
            _ => Self::Database(error),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
