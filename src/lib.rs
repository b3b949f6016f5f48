pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::valuation::ValuationEngine;
use crate::core::{export, holdings};
use crate::providers::caching::{CachingCurrencyRateProvider, CachingMarketProvider};
use crate::providers::yahoo_finance::{YahooCurrencyProvider, YahooMarketProvider};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct RunOptions {
    /// Path to the holdings CSV (`ticker,getPrice,quantity`).
    pub holdings_path: String,
    /// Optional path to export the report as CSV.
    pub output_path: Option<String>,
    /// Evaluation date; defaults to today's UTC date.
    pub as_of: Option<NaiveDate>,
    /// Optional configuration file path.
    pub config_path: Option<String>,
}

pub async fn run(options: RunOptions) -> Result<()> {
    info!("Portfolio analyzer starting...");

    let config = match &options.config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    // Malformed input aborts here, before any market data is fetched.
    let holdings = holdings::load_holdings(&options.holdings_path)?;

    let base_url = config
        .providers
        .yahoo
        .as_ref()
        .map_or("https://query1.finance.yahoo.com", |p| &p.base_url);
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let market = CachingMarketProvider::new(YahooMarketProvider::new(base_url, timeout)?);
    let rates = CachingCurrencyRateProvider::new(YahooCurrencyProvider::new(base_url, timeout)?);

    let engine = ValuationEngine::new(
        &market,
        &rates,
        config.price_lookback_days,
        &config.base_currency,
        &config.target_currency,
    );

    let as_of = options.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let pb = cli::ui::new_progress_bar(holdings.len() as u64, true);
    pb.set_message("Fetching market data...");
    let report = engine.evaluate(&holdings, as_of, &|| pb.inc(1)).await;
    pb.finish_and_clear();

    println!("{}", report.display_as_table());

    if let Some(output_path) = &options.output_path {
        export::export_report(&report.records, output_path)?;
        println!("Report written to {output_path}");
    }

    Ok(())
}
