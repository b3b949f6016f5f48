//! Report export: one CSV row per holding, totals are not rows.

use crate::core::valuation::ValuationRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// A flattened valuation row using the column names of the holdings input
/// plus the derived figures. Absent values serialize as empty fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportRow {
    pub ticker: String,
    #[serde(rename = "getPrice")]
    pub get_price: f64,
    pub quantity: f64,
    #[serde(rename = "nowPrice")]
    pub now_price: Option<f64>,
    #[serde(rename = "assetValue")]
    pub asset_value: f64,
    pub profit: Option<f64>,
    #[serde(rename = "profitRatio")]
    pub profit_ratio: Option<f64>,
    #[serde(rename = "annualDividend")]
    pub annual_dividend: f64,
    #[serde(rename = "dividendYield")]
    pub dividend_yield: f64,
}

impl From<&ValuationRecord> for ReportRow {
    fn from(record: &ValuationRecord) -> Self {
        ReportRow {
            ticker: record.ticker.clone(),
            get_price: record.purchase_price,
            quantity: record.quantity,
            now_price: record.closing_price,
            asset_value: record.asset_value,
            profit: record.profit_usd,
            profit_ratio: record.profit_ratio_pct,
            annual_dividend: record.annual_dividend_usd,
            dividend_yield: record.dividend_yield_pct,
        }
    }
}

pub fn write_report<W: Write>(records: &[ValuationRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer
            .serialize(ReportRow::from(record))
            .with_context(|| format!("Failed to write report row for {}", record.ticker))?;
    }
    csv_writer.flush().context("Failed to flush report")?;
    Ok(())
}

pub fn export_report<P: AsRef<Path>>(records: &[ValuationRecord], path: P) -> Result<()> {
    let file = File::create(path.as_ref())
        .with_context(|| format!("Failed to create report file: {}", path.as_ref().display()))?;
    write_report(records, file)?;
    debug!("Report written to {}", path.as_ref().display());
    Ok(())
}

/// Parses a previously exported report, e.g. to feed other tooling.
pub fn read_report<R: Read>(reader: R) -> Result<Vec<ReportRow>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize::<ReportRow>() {
        rows.push(row.context("Invalid report row")?);
    }
    Ok(rows)
}
