//! Valuation of a holdings list against market data: per-holding profit and
//! dividend figures, portfolio totals, and conversion into a target currency.
//!
//! Every holding is evaluated independently and the results are assembled in
//! input order, so a failing ticker never disturbs its neighbours.

use crate::core::holdings::HoldingRecord;
use crate::core::market::{CurrencyRateProvider, MarketDataProvider};
use chrono::{Datelike, Duration, NaiveDate};
use futures::future::join_all;
use tracing::{debug, warn};

/// Per-holding valuation. `profit_usd` and `profit_ratio_pct` are jointly
/// present or jointly absent, gated by whether a close was resolved.
/// `asset_value` is the cost basis (purchase price x quantity) and never
/// depends on market data.
#[derive(Debug, Clone)]
pub struct ValuationRecord {
    pub ticker: String,
    pub purchase_price: f64,
    pub quantity: f64,
    pub closing_price: Option<f64>,
    pub asset_value: f64,
    pub profit_usd: Option<f64>,
    pub profit_jpy: Option<f64>,
    pub profit_ratio_pct: Option<f64>,
    pub annual_dividend_usd: f64,
    pub dividend_yield_pct: f64,
    pub error: Option<String>,
}

/// Portfolio-level totals. Ratio fields are `None` when the total asset
/// value is zero; converted fields are `None` when no rate was available.
#[derive(Debug, Clone)]
pub struct PortfolioTotals {
    pub total_asset_value: f64,
    pub total_profit_usd: f64,
    pub total_profit_jpy: Option<f64>,
    pub total_profit_ratio_pct: Option<f64>,
    pub total_annual_dividend_usd: f64,
    pub total_annual_dividend_jpy: Option<f64>,
    pub total_dividend_yield_pct: Option<f64>,
}

#[derive(Debug)]
pub struct PortfolioReport {
    pub records: Vec<ValuationRecord>,
    pub totals: PortfolioTotals,
    pub target_currency: String,
    pub as_of: NaiveDate,
}

/// Window used to resolve a close: ends the day before the evaluation date
/// and reaches back `lookback_days`. The default single-day lookback
/// tolerates one non-trading day but not a longer market holiday.
pub fn price_window(as_of: NaiveDate, lookback_days: i64) -> (NaiveDate, NaiveDate) {
    let end = as_of - Duration::days(1);
    (end - Duration::days(lookback_days), end)
}

/// Trailing calendar-year window for dividends: ends the day before the
/// evaluation date, starts on the same month/day one year earlier. A
/// Feb 29 end falls back to Feb 28 of the prior year.
pub fn dividend_window(as_of: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = as_of - Duration::days(1);
    let start = end
        .with_year(end.year() - 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(end.year() - 1, 2, 28).expect("valid date"));
    (start, end)
}

pub struct ValuationEngine<'a> {
    market: &'a dyn MarketDataProvider,
    rates: &'a dyn CurrencyRateProvider,
    price_lookback_days: i64,
    base_currency: String,
    target_currency: String,
}

impl<'a> ValuationEngine<'a> {
    pub fn new(
        market: &'a dyn MarketDataProvider,
        rates: &'a dyn CurrencyRateProvider,
        price_lookback_days: i64,
        base_currency: &str,
        target_currency: &str,
    ) -> Self {
        ValuationEngine {
            market,
            rates,
            price_lookback_days,
            base_currency: base_currency.to_string(),
            target_currency: target_currency.to_string(),
        }
    }

    /// Evaluates every holding as of `as_of` and folds the results into
    /// portfolio totals. Holdings are fetched concurrently; the output
    /// keeps the input order. `progress` is invoked once per holding.
    pub async fn evaluate(
        &self,
        holdings: &[HoldingRecord],
        as_of: NaiveDate,
        progress: &(dyn Fn() + Sync),
    ) -> PortfolioReport {
        // The spot rate does not change within a run, so resolve it once up
        // front. An unavailable rate degrades to absent converted figures.
        let rate = match self
            .rates
            .get_rate(&self.base_currency, &self.target_currency)
            .await
        {
            Ok(rate) => Some(rate),
            Err(e) => {
                warn!(
                    "{}/{} rate unavailable, converted figures omitted: {e}",
                    self.base_currency, self.target_currency
                );
                None
            }
        };

        let record_futures = holdings.iter().map(|holding| async move {
            let record = self.evaluate_holding(holding, as_of, rate).await;
            progress();
            record
        });
        let records = join_all(record_futures).await;

        let totals = aggregate(&records, rate);
        PortfolioReport {
            records,
            totals,
            target_currency: self.target_currency.clone(),
            as_of,
        }
    }

    async fn evaluate_holding(
        &self,
        holding: &HoldingRecord,
        as_of: NaiveDate,
        rate: Option<f64>,
    ) -> ValuationRecord {
        let mut record = ValuationRecord {
            ticker: holding.ticker.clone(),
            purchase_price: holding.purchase_price,
            quantity: holding.quantity,
            closing_price: None,
            asset_value: holding.purchase_price * holding.quantity,
            profit_usd: None,
            profit_jpy: None,
            profit_ratio_pct: None,
            annual_dividend_usd: 0.0,
            dividend_yield_pct: 0.0,
            error: None,
        };

        let (price_start, price_end) = price_window(as_of, self.price_lookback_days);
        match self
            .market
            .closing_price(&holding.ticker, price_start, price_end)
            .await
        {
            Ok(Some(close)) => {
                record.closing_price = Some(close.price);
                record.profit_usd = Some((close.price - holding.purchase_price) * holding.quantity);
                record.profit_ratio_pct =
                    Some(((close.price / holding.purchase_price) - 1.0) * 100.0);
                record.profit_jpy = match (record.profit_usd, rate) {
                    (Some(profit), Some(rate)) => Some(profit * rate),
                    _ => None,
                };
            }
            Ok(None) => {
                debug!(
                    "No close for {} between {price_start} and {price_end}",
                    holding.ticker
                );
            }
            Err(e) => {
                debug!("Price fetch error for {}: {e}", holding.ticker);
                record.error = Some(format!("Price fetch failed: {e}"));
            }
        }

        let (div_start, div_end) = dividend_window(as_of);
        match self
            .market
            .dividends(&holding.ticker, div_start, div_end)
            .await
        {
            Ok(events) => {
                // A ticker with no dividend history sums to zero, which is a
                // valid result rather than a failure.
                let per_share_total: f64 = events
                    .iter()
                    .filter(|event| event.date >= div_start && event.date <= div_end)
                    .map(|event| event.amount)
                    .sum();
                record.annual_dividend_usd = per_share_total * holding.quantity;
                record.dividend_yield_pct = (per_share_total / holding.purchase_price) * 100.0;
            }
            Err(e) => {
                debug!("Dividend fetch error for {}: {e}", holding.ticker);
                let message = format!("Dividend fetch failed: {e}");
                record.error = Some(match record.error.take() {
                    Some(existing) => format!("{existing}; {message}"),
                    None => message,
                });
            }
        }

        record
    }
}

/// Folds per-holding records into portfolio totals. Absent profits
/// contribute zero to the numerator while their asset value still feeds
/// the ratio denominator.
fn aggregate(records: &[ValuationRecord], rate: Option<f64>) -> PortfolioTotals {
    let total_asset_value: f64 = records.iter().map(|r| r.asset_value).sum();
    let total_profit_usd: f64 = records.iter().filter_map(|r| r.profit_usd).sum();
    let total_annual_dividend_usd: f64 = records.iter().map(|r| r.annual_dividend_usd).sum();

    let (total_profit_ratio_pct, total_dividend_yield_pct) = if total_asset_value > 0.0 {
        (
            Some((total_profit_usd / total_asset_value) * 100.0),
            Some((total_annual_dividend_usd / total_asset_value) * 100.0),
        )
    } else {
        (None, None)
    };

    PortfolioTotals {
        total_asset_value,
        total_profit_usd,
        total_profit_jpy: rate.map(|r| total_profit_usd * r),
        total_profit_ratio_pct,
        total_annual_dividend_usd,
        total_annual_dividend_jpy: rate.map(|r| total_annual_dividend_usd * r),
        total_dividend_yield_pct,
    }
}
