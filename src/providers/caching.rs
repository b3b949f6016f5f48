//! Per-run memoization decorators. The same ticker/window pair is often
//! requested more than once within a single evaluation (duplicate holdings),
//! and the spot rate never changes intra-run, so both are cached for the
//! lifetime of the wrapper.

use crate::core::market::{
    ClosingPrice, CurrencyRateProvider, DividendEvent, MarketDataProvider,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

fn window_key(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!("{symbol}:{start}:{end}")
}

// Caching for MarketDataProvider
pub struct CachingMarketProvider<T: MarketDataProvider> {
    inner: T,
    prices: Arc<Mutex<HashMap<String, Result<Option<ClosingPrice>, String>>>>,
    dividends: Arc<Mutex<HashMap<String, Result<Vec<DividendEvent>, String>>>>,
}

impl<T: MarketDataProvider> CachingMarketProvider<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            prices: Arc::new(Mutex::new(HashMap::new())),
            dividends: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl<T: MarketDataProvider> MarketDataProvider for CachingMarketProvider<T> {
    async fn closing_price(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<ClosingPrice>> {
        let key = window_key(symbol, start, end);
        let mut cache = self.prices.lock().await;
        if let Some(cached) = cache.get(&key) {
            debug!("Cache hit for price window: {}", key);
            return match cached {
                Ok(price) => Ok(*price),
                Err(e) => Err(anyhow!(e.clone())),
            };
        }
        debug!("Cache miss for price window: {}", key);
        let result = self.inner.closing_price(symbol, start, end).await;
        cache.insert(
            key,
            result.as_ref().map(|v| *v).map_err(|e| e.to_string()),
        );
        result
    }

    async fn dividends(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DividendEvent>> {
        let key = window_key(symbol, start, end);
        let mut cache = self.dividends.lock().await;
        if let Some(cached) = cache.get(&key) {
            debug!("Cache hit for dividend window: {}", key);
            return match cached {
                Ok(events) => Ok(events.clone()),
                Err(e) => Err(anyhow!(e.clone())),
            };
        }
        debug!("Cache miss for dividend window: {}", key);
        let result = self.inner.dividends(symbol, start, end).await;
        cache.insert(
            key,
            result.as_ref().map(|v| v.clone()).map_err(|e| e.to_string()),
        );
        result
    }
}

// Caching for CurrencyRateProvider
pub struct CachingCurrencyRateProvider<T: CurrencyRateProvider> {
    inner: T,
    cache: Arc<Mutex<HashMap<String, Result<f64, String>>>>,
}

impl<T: CurrencyRateProvider> CachingCurrencyRateProvider<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl<T: CurrencyRateProvider> CurrencyRateProvider for CachingCurrencyRateProvider<T> {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let key = format!("{from}-{to}");
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(&key) {
            debug!("Cache hit for currency rate: {}", key);
            return match cached {
                Ok(rate) => Ok(*rate),
                Err(e) => Err(anyhow!(e.clone())),
            };
        }
        debug!("Cache miss for currency rate: {}", key);
        let result = self.inner.get_rate(from, to).await;
        cache.insert(key, result.as_ref().map(|r| *r).map_err(|e| e.to_string()));
        result
    }
}
