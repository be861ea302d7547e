//! Exchange-rate service: cached reads and write-through updates.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::bus::EventBus;
use crate::domain::events::{DomainEvent, RatesEvent};
use crate::domain::pricing::{ExchangeRates, RateError, RateHistoryEntry, RateSource};
use crate::StoreError;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateStore: Send + Sync {
    /// The `current` row, if one was ever written.
    async fn load_current(&self) -> crate::Result<Option<ExchangeRates>>;

    /// Upserts the `current` row and appends a history entry atomically.
    async fn save_current(&self, eur_rate: f64, rub_rate: f64, source: RateSource) -> crate::Result<ExchangeRates>;

    /// Newest entries first.
    async fn history(&self, limit: i64) -> crate::Result<Vec<RateHistoryEntry>>;
}

#[derive(Debug)]
struct CachedRates {
    rates: ExchangeRates,
    fetched_at: Instant,
}

/// Single-entry memo of the last rates read or written.
#[derive(Debug)]
pub struct RateCache {
    ttl: Duration,
    entry: RwLock<Option<CachedRates>>,
}

impl Default for RateCache {
    fn default() -> Self { Self::new(DEFAULT_CACHE_TTL) }
}

impl RateCache {
    pub fn new(ttl: Duration) -> Self { Self { ttl, entry: RwLock::new(None) } }

    /// Cached rates younger than the TTL.
    pub async fn fresh(&self) -> Option<ExchangeRates> {
        let entry = self.entry.read().await;
        entry.as_ref().filter(|c| c.fetched_at.elapsed() < self.ttl).map(|c| c.rates.clone())
    }

    /// Cached rates regardless of age.
    pub async fn last(&self) -> Option<ExchangeRates> {
        self.entry.read().await.as_ref().map(|c| c.rates.clone())
    }

    pub async fn put(&self, rates: ExchangeRates) {
        *self.entry.write().await = Some(CachedRates { rates, fetched_at: Instant::now() });
    }
}

#[derive(Debug, Error)]
pub enum RatesServiceError {
    #[error(transparent)]
    Invalid(#[from] RateError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Курсы валют временно недоступны")]
    Unavailable,
}

/// Outcome of a rate read. `degraded` is set when the store failed or
/// timed out and the rates came from a stale cache or the defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct RatesRead {
    pub rates: ExchangeRates,
    pub degraded: bool,
}

#[derive(Clone)]
pub struct ExchangeRateService {
    store: Arc<dyn RateStore>,
    cache: Arc<RateCache>,
    fetch_timeout: Duration,
    bus: EventBus,
}

impl ExchangeRateService {
    pub fn new(store: Arc<dyn RateStore>, cache: Arc<RateCache>, fetch_timeout: Duration, bus: EventBus) -> Self {
        Self { store, cache, fetch_timeout, bus }
    }

    /// Current rates. Degrades to stale cache, then to defaults; never fails.
    pub async fn get_exchange_rates(&self) -> ExchangeRates {
        self.read_exchange_rates().await.rates
    }

    /// Rates for persistent writes: fails instead of degrading when the
    /// store could not be read.
    pub async fn current_exchange_rates(&self) -> Result<ExchangeRates, RatesServiceError> {
        let read = self.read_exchange_rates().await;
        if read.degraded {
            return Err(RatesServiceError::Unavailable);
        }
        Ok(read.rates)
    }

    pub async fn read_exchange_rates(&self) -> RatesRead {
        if let Some(rates) = self.cache.fresh().await {
            return RatesRead { rates, degraded: false };
        }

        match tokio::time::timeout(self.fetch_timeout, self.store.load_current()).await {
            Ok(Ok(Some(rates))) => {
                self.cache.put(rates.clone()).await;
                RatesRead { rates, degraded: false }
            }
            Ok(Ok(None)) => {
                info!("no exchange rates stored yet, using defaults");
                let rates = ExchangeRates::default();
                self.cache.put(rates.clone()).await;
                RatesRead { rates, degraded: false }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "failed to load exchange rates");
                self.fallback().await
            }
            Err(_) => {
                warn!(timeout_ms = self.fetch_timeout.as_millis() as u64, "timed out loading exchange rates");
                self.fallback().await
            }
        }
    }

    async fn fallback(&self) -> RatesRead {
        RatesRead { rates: self.cache.last().await.unwrap_or_default(), degraded: true }
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_exchange_rates(
        &self,
        eur_rate: f64,
        rub_rate: f64,
        source: RateSource,
    ) -> Result<ExchangeRates, RatesServiceError> {
        ExchangeRates::new(eur_rate, rub_rate)?;
        let saved = self.store.save_current(eur_rate, rub_rate, source).await?;
        self.cache.put(saved.clone()).await;
        info!(eur_rate, rub_rate, %source, "exchange rates updated");

        self.bus.publish(&DomainEvent::Rates(RatesEvent::Updated { eur_rate, rub_rate, source })).await;
        Ok(saved)
    }

    pub async fn history(&self, limit: i64) -> Result<Vec<RateHistoryEntry>, RatesServiceError> {
        Ok(self.store.history(limit.clamp(1, 500)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stored(eur_rate: f64, rub_rate: f64) -> ExchangeRates {
        ExchangeRates { eur_rate, rub_rate, updated_at: Some(Utc::now()) }
    }

    fn service(store: impl RateStore + 'static) -> ExchangeRateService {
        ExchangeRateService::new(Arc::new(store), Arc::new(RateCache::default()), DEFAULT_FETCH_TIMEOUT, EventBus::disabled())
    }

    struct SlowStore;

    /// Answers the first read at once, then hangs.
    struct StallingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateStore for StallingStore {
        async fn load_current(&self) -> crate::Result<Option<ExchangeRates>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(Some(stored(0.9, 92.0)))
        }
        async fn save_current(&self, eur_rate: f64, rub_rate: f64, _: RateSource) -> crate::Result<ExchangeRates> {
            Ok(stored(eur_rate, rub_rate))
        }
        async fn history(&self, _: i64) -> crate::Result<Vec<RateHistoryEntry>> { Ok(vec![]) }
    }

    #[async_trait]
    impl RateStore for SlowStore {
        async fn load_current(&self) -> crate::Result<Option<ExchangeRates>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some(stored(1.0, 1.0)))
        }
        async fn save_current(&self, eur_rate: f64, rub_rate: f64, _: RateSource) -> crate::Result<ExchangeRates> {
            Ok(stored(eur_rate, rub_rate))
        }
        async fn history(&self, _: i64) -> crate::Result<Vec<RateHistoryEntry>> { Ok(vec![]) }
    }

    #[tokio::test(start_paused = true)]
    async fn second_read_within_ttl_hits_cache() {
        let mut store = MockRateStore::new();
        store.expect_load_current().times(1).returning(|| Ok(Some(stored(0.9, 92.0))));
        let svc = service(store);

        let first = svc.get_exchange_rates().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        let second = svc.get_exchange_rates().await;

        assert_eq!(first, second);
        assert_eq!(first.rub_rate, 92.0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_cache_reloads() {
        let mut store = MockRateStore::new();
        let mut seq = mockall::Sequence::new();
        store.expect_load_current().times(1).in_sequence(&mut seq).returning(|| Ok(Some(stored(0.9, 92.0))));
        store.expect_load_current().times(1).in_sequence(&mut seq).returning(|| Ok(Some(stored(0.95, 99.0))));
        let svc = service(store);

        assert_eq!(svc.get_exchange_rates().await.rub_rate, 92.0);
        tokio::time::advance(DEFAULT_CACHE_TTL + Duration::from_secs(1)).await;
        assert_eq!(svc.get_exchange_rates().await.rub_rate, 99.0);
    }

    #[tokio::test(start_paused = true)]
    async fn store_error_serves_stale_cache() {
        let mut store = MockRateStore::new();
        let mut seq = mockall::Sequence::new();
        store.expect_load_current().times(1).in_sequence(&mut seq).returning(|| Ok(Some(stored(0.9, 92.0))));
        store.expect_load_current().times(1).in_sequence(&mut seq).returning(|| Err(StoreError::Corrupt("boom".into())));
        let svc = service(store);

        svc.get_exchange_rates().await;
        tokio::time::advance(DEFAULT_CACHE_TTL * 2).await;
        assert_eq!(svc.get_exchange_rates().await.rub_rate, 92.0);
    }

    #[tokio::test]
    async fn store_error_without_cache_serves_defaults() {
        let mut store = MockRateStore::new();
        store.expect_load_current().times(2).returning(|| Err(StoreError::NotFound));
        let svc = service(store);

        assert_eq!(svc.get_exchange_rates().await, ExchangeRates::default());
        // failures are not cached, the next call asks the store again
        assert_eq!(svc.get_exchange_rates().await, ExchangeRates::default());
    }

    #[tokio::test]
    async fn empty_store_serves_defaults() {
        let mut store = MockRateStore::new();
        store.expect_load_current().times(1).returning(|| Ok(None));
        let svc = service(store);

        assert_eq!(svc.get_exchange_rates().await, ExchangeRates::default());
        assert_eq!(svc.get_exchange_rates().await, ExchangeRates::default());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_times_out_to_defaults() {
        let svc = service(SlowStore);
        assert_eq!(svc.get_exchange_rates().await, ExchangeRates::default());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_with_expired_cache_serves_stale_value() {
        let svc = service(StallingStore { calls: AtomicUsize::new(0) });

        assert_eq!(svc.get_exchange_rates().await.rub_rate, 92.0);
        tokio::time::advance(DEFAULT_CACHE_TTL + Duration::from_secs(1)).await;

        let read = svc.read_exchange_rates().await;
        assert!(read.degraded);
        assert_eq!((read.rates.eur_rate, read.rates.rub_rate), (0.9, 92.0));
    }

    #[tokio::test]
    async fn strict_read_fails_when_store_is_down() {
        let mut store = MockRateStore::new();
        store.expect_load_current().returning(|| Err(StoreError::Corrupt("boom".into())));
        let svc = service(store);

        assert!(matches!(svc.current_exchange_rates().await, Err(RatesServiceError::Unavailable)));
    }

    #[tokio::test]
    async fn strict_read_accepts_defaults_of_an_empty_store() {
        let mut store = MockRateStore::new();
        store.expect_load_current().times(1).returning(|| Ok(None));
        let svc = service(store);

        assert_eq!(svc.current_exchange_rates().await.unwrap(), ExchangeRates::default());
    }

    #[tokio::test]
    async fn update_writes_through_cache() {
        let mut store = MockRateStore::new();
        store
            .expect_save_current()
            .withf(|eur, rub, source| *eur == 0.91 && *rub == 95.5 && *source == RateSource::Manual)
            .times(1)
            .returning(|eur, rub, _| Ok(stored(eur, rub)));
        store.expect_load_current().never();
        let svc = service(store);

        svc.update_exchange_rates(0.91, 95.5, RateSource::Manual).await.unwrap();
        let rates = svc.get_exchange_rates().await;
        assert_eq!((rates.eur_rate, rates.rub_rate), (0.91, 95.5));
    }

    #[tokio::test]
    async fn update_rejects_invalid_rates() {
        let mut store = MockRateStore::new();
        store.expect_save_current().never();
        let svc = service(store);

        let err = svc.update_exchange_rates(0.0, 95.5, RateSource::Manual).await.unwrap_err();
        assert!(matches!(err, RatesServiceError::Invalid(_)));
    }
}
