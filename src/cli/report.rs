use super::ui;
use crate::core::valuation::{PortfolioReport, PortfolioTotals};
use comfy_table::Cell;

fn format_converted(amount: Option<f64>, currency: &str) -> String {
    match amount {
        Some(amount) => format!("{amount:.2} {currency}"),
        None => "N/A".to_string(),
    }
}

impl PortfolioReport {
    /// Renders the per-holding table followed by the aggregate block.
    /// Per-holding errors are listed under the table so partial data is
    /// never silently dropped.
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Ticker"),
            ui::header_cell("Buy"),
            ui::header_cell("Qty"),
            ui::header_cell("Close"),
            ui::header_cell("Cost (USD)"),
            ui::header_cell("Profit (USD)"),
            ui::header_cell(&format!("Profit ({})", self.target_currency)),
            ui::header_cell("Profit (%)"),
            ui::header_cell("Dividend (USD)"),
            ui::header_cell("Yield (%)"),
        ]);

        for record in &self.records {
            table.add_row(vec![
                Cell::new(&record.ticker),
                Cell::new(format!("{:.2}", record.purchase_price)),
                Cell::new(format!("{:.2}", record.quantity)),
                ui::format_optional_cell(record.closing_price, |p| format!("{p:.2}")),
                Cell::new(format!("{:.2}", record.asset_value)),
                ui::optional_change_cell(record.profit_usd, |p| format!("{p:.2}")),
                ui::optional_change_cell(record.profit_jpy, |p| format!("{p:.2}")),
                ui::optional_change_cell(record.profit_ratio_pct, |r| format!("{r:.2}%")),
                ui::change_cell(record.annual_dividend_usd, |d| format!("{d:.2}")),
                ui::change_cell(record.dividend_yield_pct, |y| format!("{y:.2}%")),
            ]);
        }

        let mut output = format!(
            "Valuation as of {}\n\n",
            ui::style_text(&self.as_of.to_string(), ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        for record in &self.records {
            if let Some(error) = &record.error {
                output.push_str(&format!(
                    "\n{}: {}",
                    record.ticker,
                    ui::style_text(error, ui::StyleType::Error)
                ));
            }
        }

        output.push('\n');
        output.push_str(&display_totals(&self.totals, &self.target_currency));
        output
    }
}

fn display_totals(totals: &PortfolioTotals, target_currency: &str) -> String {
    let total_line = |label: &str, value: &str, applicable: bool| {
        format!(
            "{}: {}\n",
            ui::style_text(label, ui::StyleType::TotalLabel),
            ui::style_text(
                value,
                if applicable {
                    ui::StyleType::TotalValue
                } else {
                    ui::StyleType::Error
                }
            )
        )
    };

    let mut output = String::new();
    output.push_str(&total_line(
        "Total Profit",
        &format!(
            "{:.2} USD ({})",
            totals.total_profit_usd,
            format_converted(totals.total_profit_jpy, target_currency)
        ),
        true,
    ));
    output.push_str(&total_line(
        "Total Profit Ratio",
        &totals
            .total_profit_ratio_pct
            .map_or("N/A".to_string(), |r| format!("{r:.2}%")),
        totals.total_profit_ratio_pct.is_some(),
    ));
    output.push_str(&total_line(
        "Total Dividends",
        &format!(
            "{:.2} USD ({})",
            totals.total_annual_dividend_usd,
            format_converted(totals.total_annual_dividend_jpy, target_currency)
        ),
        true,
    ));
    output.push_str(&total_line(
        "Total Dividend Yield",
        &totals
            .total_dividend_yield_pct
            .map_or("N/A".to_string(), |y| format!("{y:.2}%")),
        totals.total_dividend_yield_pct.is_some(),
    ));
    output
}
