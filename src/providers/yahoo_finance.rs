use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration as StdDuration;
use tracing::{debug, instrument, warn};

use crate::core::market::{
    ClosingPrice, CurrencyRateProvider, DividendEvent, MarketDataProvider,
};
use crate::providers::util::with_retry;

const USER_AGENT: &str = "divfolio/0.1";
const RETRIES: usize = 2;
const RETRY_DELAY_MS: u64 = 500;

fn is_timeout(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<reqwest::Error>()
        .is_some_and(reqwest::Error::is_timeout)
}

fn to_naive_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

// Chart API payload, shared by the price window and dividend queries.
#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    #[serde(default)]
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
    events: Option<ChartEvents>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct ChartEvents {
    dividends: Option<HashMap<String, DividendItem>>,
}

#[derive(Deserialize, Debug)]
struct DividendItem {
    amount: f64,
    date: i64,
}

/// Price and dividend source backed by the Yahoo Finance chart API.
pub struct YahooMarketProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooMarketProvider {
    pub fn new(base_url: &str, timeout: StdDuration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(YahooMarketProvider {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// Fetches the chart for `symbol` over an inclusive date window.
    /// Unknown symbols, timeouts and empty results all map to `Ok(None)`.
    async fn fetch_chart(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<ChartItem>> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=div",
            self.base_url, symbol, period1, period2
        );
        debug!("Requesting chart data from {}", url);

        let response = match with_retry(
            || async { self.client.get(&url).send().await },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        {
            Ok(response) => response,
            Err(e) if is_timeout(&e) => {
                warn!("Request timed out for {symbol}, treating as no data");
                return Ok(None);
            }
            Err(e) => {
                return Err(anyhow!("Request error: {e} for symbol: {symbol} URL: {url}"));
            }
        };

        // Yahoo answers 404 with a chart error body for unknown symbols.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Symbol {} not found", symbol);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: ChartResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse chart response for {}: {}", symbol, e))?;

        Ok(data.chart.result.and_then(|items| items.into_iter().next()))
    }
}

#[async_trait]
impl MarketDataProvider for YahooMarketProvider {
    #[instrument(name = "YahooClosingPrice", skip(self), fields(symbol = %symbol))]
    async fn closing_price(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<ClosingPrice>> {
        let Some(item) = self.fetch_chart(symbol, start, end).await? else {
            return Ok(None);
        };

        let timestamps = item.timestamp.unwrap_or_default();
        let closes = item
            .indicators
            .and_then(|inds| inds.quote.into_iter().next())
            .and_then(|quote| quote.close)
            .unwrap_or_default();

        let close = timestamps
            .iter()
            .zip(closes.iter())
            .filter_map(|(ts, close)| {
                let date = to_naive_date(*ts)?;
                let price = (*close)?;
                (date >= start && date <= end).then_some(ClosingPrice { price, date })
            })
            .next();

        debug!("Resolved close for {}: {:?}", symbol, close);
        Ok(close)
    }

    #[instrument(name = "YahooDividends", skip(self), fields(symbol = %symbol))]
    async fn dividends(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DividendEvent>> {
        let Some(item) = self.fetch_chart(symbol, start, end).await? else {
            return Ok(Vec::new());
        };

        let mut events: Vec<DividendEvent> = item
            .events
            .and_then(|events| events.dividends)
            .unwrap_or_default()
            .into_values()
            .filter_map(|item| {
                to_naive_date(item.date).map(|date| DividendEvent {
                    date,
                    amount: item.amount,
                })
            })
            .collect();
        events.sort_by_key(|event| event.date);

        debug!("Resolved {} dividend events for {}", events.len(), symbol);
        Ok(events)
    }
}

/// Spot rate source backed by the Yahoo Finance `{FROM}{TO}=X` symbols.
pub struct YahooCurrencyProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooCurrencyProvider {
    pub fn new(base_url: &str, timeout: StdDuration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(YahooCurrencyProvider {
            base_url: base_url.to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CurrencyResponse {
    chart: CurrencyChartResult,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartResult {
    #[serde(default)]
    result: Option<Vec<CurrencyChartItem>>,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartItem {
    meta: CurrencyChartMeta,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
}

#[async_trait]
impl CurrencyRateProvider for YahooCurrencyProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let symbol = format!("{from}{to}=X");
        let url = format!("{}/v8/finance/chart/{symbol}", self.base_url);
        debug!("Requesting currency rate from {}", url);

        let response = with_retry(
            || async { self.client.get(&url).send().await },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(|e| anyhow!("Request error: {e} for currency pair: {symbol}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: CurrencyResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", symbol))?;

        Ok(item.meta.regular_market_price)
    }
}
