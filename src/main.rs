use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use divfolio::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Holdings CSV file with columns: ticker,getPrice,quantity
    holdings: String,

    /// Write the report as CSV to this file
    #[arg(short, long)]
    output: Option<String>,

    /// Evaluation date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Path to optional configuration file
    #[arg(short, long)]
    config_path: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = divfolio::run(divfolio::RunOptions {
        holdings_path: cli.holdings,
        output_path: cli.output,
        as_of: cli.as_of,
        config_path: cli.config_path,
    })
    .await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
