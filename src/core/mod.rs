//! Core business logic abstractions

pub mod config;
pub mod export;
pub mod holdings;
pub mod log;
pub mod market;
pub mod valuation;

// Re-export main types for cleaner imports
pub use market::{ClosingPrice, CurrencyRateProvider, DividendEvent, MarketDataProvider};
pub use valuation::{PortfolioReport, PortfolioTotals, ValuationEngine, ValuationRecord};
