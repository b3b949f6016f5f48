//! Holdings input: strict CSV with columns `ticker,getPrice,quantity`.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const EXPECTED_HEADERS: [&str; 3] = ["ticker", "getPrice", "quantity"];

/// A single holding as supplied by the user. Duplicate tickers are allowed
/// and treated as independent rows.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HoldingRecord {
    pub ticker: String,
    #[serde(rename = "getPrice")]
    pub purchase_price: f64,
    pub quantity: f64,
}

/// Reads and validates holdings. Any format violation is fatal and reported
/// before any market data is fetched.
pub fn read_holdings<R: Read>(reader: R) -> Result<Vec<HoldingRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let headers = csv_reader.headers().context("Failed to read CSV header")?;
    if headers.iter().collect::<Vec<_>>() != EXPECTED_HEADERS {
        bail!(
            "Invalid holdings header: expected exactly '{}', got '{}'",
            EXPECTED_HEADERS.join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        );
    }

    let mut holdings = Vec::new();
    for (index, row) in csv_reader.deserialize::<HoldingRecord>().enumerate() {
        let line = index + 2; // 1-based, after the header
        let holding = row.with_context(|| format!("Invalid holdings row at line {line}"))?;

        if holding.ticker.trim().is_empty() {
            bail!("Empty ticker at line {line}");
        }
        if !holding.purchase_price.is_finite() || holding.purchase_price <= 0.0 {
            bail!(
                "getPrice must be a positive number at line {line}, got {}",
                holding.purchase_price
            );
        }
        if !holding.quantity.is_finite() || holding.quantity <= 0.0 {
            bail!(
                "quantity must be a positive number at line {line}, got {}",
                holding.quantity
            );
        }
        holdings.push(holding);
    }

    debug!("Loaded {} holdings", holdings.len());
    Ok(holdings)
}

pub fn load_holdings<P: AsRef<Path>>(path: P) -> Result<Vec<HoldingRecord>> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open holdings file: {}", path.as_ref().display()))?;
    read_holdings(file)
        .with_context(|| format!("Malformed holdings file: {}", path.as_ref().display()))
}
