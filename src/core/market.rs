//! Market data abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Close resolved for a symbol within a date window: the first row of the
/// window that carries a close, not the latest one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosingPrice {
    pub price: f64,
    pub date: NaiveDate,
}

/// A single cash dividend event, per-share amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DividendEvent {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Time-series source for prices and dividend history, queried by symbol
/// and date window. An empty window is not an error: `closing_price`
/// returns `Ok(None)` and `dividends` returns an empty series.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn closing_price(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<ClosingPrice>>;

    async fn dividends(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DividendEvent>>;
}

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}
