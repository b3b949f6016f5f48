use chrono::{NaiveDate, NaiveTime};
use std::fs;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_chart(mock_server: &MockServer, symbol: &str, mock_response: &str) {
        let url_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(&url_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(mock_server)
            .await;
    }

    pub async fn mount_rate(mock_server: &MockServer, pair: &str, rate: f64) {
        let mock_response = format!(
            r#"{{"chart": {{"result": [{{"meta": {{"regularMarketPrice": {rate}}}}}]}}}}"#
        );
        mount_chart(mock_server, pair, &mock_response).await;
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn midnight_ts(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn write_config(mock_server_uri: &str) -> tempfile::NamedTempFile {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
providers:
  yahoo:
    base_url: {mock_server_uri}
"#,
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");
    config_file
}

fn write_holdings(content: &str) -> tempfile::NamedTempFile {
    let holdings_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(holdings_file.path(), content).expect("Failed to write holdings file");
    holdings_file
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let as_of = date(2024, 6, 15);
    // Price window is June 13-14; one bar inside it.
    let ts_close = midnight_ts(date(2024, 6, 13));
    // Two dividend events inside the trailing year.
    let ts_div_1 = midnight_ts(date(2023, 9, 1));
    let ts_div_2 = midnight_ts(date(2024, 3, 1));

    let chart_response = format!(
        r#"
    {{
        "chart": {{
            "result": [
                {{
                    "timestamp": [{ts_close}],
                    "indicators": {{
                        "quote": [{{
                            "close": [120.0]
                        }}]
                    }},
                    "events": {{
                        "dividends": {{
                            "{ts_div_1}": {{"amount": 2.0, "date": {ts_div_1}}},
                            "{ts_div_2}": {{"amount": 2.0, "date": {ts_div_2}}}
                        }}
                    }}
                }}
            ]
        }}
    }}"#,
    );

    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_chart(&mock_server, "AAPL", &chart_response).await;
    test_utils::mount_rate(&mock_server, "USDJPY=X", 150.0).await;

    let config_file = write_config(&mock_server.uri());
    let holdings_file = write_holdings("ticker,getPrice,quantity\nAAPL,100.0,10\n");
    let output_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");

    let result = divfolio::run(divfolio::RunOptions {
        holdings_path: holdings_file.path().to_str().unwrap().to_string(),
        output_path: Some(output_file.path().to_str().unwrap().to_string()),
        as_of: Some(as_of),
        config_path: Some(config_file.path().to_str().unwrap().to_string()),
    })
    .await;
    assert!(result.is_ok(), "Run failed with: {:?}", result.err());

    let rows = divfolio::core::export::read_report(
        fs::File::open(output_file.path()).expect("Report file missing"),
    )
    .expect("Failed to parse exported report");
    info!(?rows, "Parsed exported report");

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.ticker, "AAPL");
    assert!((row.get_price - 100.0).abs() < 1e-6);
    assert!((row.quantity - 10.0).abs() < 1e-6);
    assert!((row.now_price.unwrap() - 120.0).abs() < 1e-6);
    assert!((row.asset_value - 1000.0).abs() < 1e-6);
    assert!((row.profit.unwrap() - 200.0).abs() < 1e-6);
    assert!((row.profit_ratio.unwrap() - 20.0).abs() < 1e-6);
    assert!((row.annual_dividend - 40.0).abs() < 1e-6);
    assert!((row.dividend_yield - 4.0).abs() < 1e-6);
}

#[test_log::test(tokio::test)]
async fn test_ticker_without_data_still_reported() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_chart(&mock_server, "GHOST", r#"{"chart": {"result": []}}"#).await;
    test_utils::mount_rate(&mock_server, "USDJPY=X", 150.0).await;

    let config_file = write_config(&mock_server.uri());
    let holdings_file = write_holdings("ticker,getPrice,quantity\nGHOST,50.0,4\n");
    let output_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");

    let result = divfolio::run(divfolio::RunOptions {
        holdings_path: holdings_file.path().to_str().unwrap().to_string(),
        output_path: Some(output_file.path().to_str().unwrap().to_string()),
        as_of: Some(date(2024, 6, 15)),
        config_path: Some(config_file.path().to_str().unwrap().to_string()),
    })
    .await;
    assert!(result.is_ok(), "Run failed with: {:?}", result.err());

    let rows = divfolio::core::export::read_report(
        fs::File::open(output_file.path()).expect("Report file missing"),
    )
    .expect("Failed to parse exported report");

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.ticker, "GHOST");
    // Cost basis survives missing market data; profit fields stay absent.
    assert!((row.asset_value - 200.0).abs() < 1e-6);
    assert!(row.now_price.is_none());
    assert!(row.profit.is_none());
    assert!(row.profit_ratio.is_none());
    assert_eq!(row.annual_dividend, 0.0);
    assert_eq!(row.dividend_yield, 0.0);
}

#[test_log::test(tokio::test)]
async fn test_rate_unavailable_does_not_abort_run() {
    let ts_close = midnight_ts(date(2024, 6, 13));
    let chart_response = format!(
        r#"{{
            "chart": {{
                "result": [{{
                    "timestamp": [{ts_close}],
                    "indicators": {{"quote": [{{"close": [120.0]}}]}}
                }}]
            }}
        }}"#,
    );

    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_chart(&mock_server, "AAPL", &chart_response).await;
    // No USDJPY=X mock mounted; wiremock answers 404 and the rate lookup
    // fails, which must only blank the converted figures.

    let config_file = write_config(&mock_server.uri());
    let holdings_file = write_holdings("ticker,getPrice,quantity\nAAPL,100.0,10\n");
    let output_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");

    let result = divfolio::run(divfolio::RunOptions {
        holdings_path: holdings_file.path().to_str().unwrap().to_string(),
        output_path: Some(output_file.path().to_str().unwrap().to_string()),
        as_of: Some(date(2024, 6, 15)),
        config_path: Some(config_file.path().to_str().unwrap().to_string()),
    })
    .await;
    assert!(result.is_ok(), "Run failed with: {:?}", result.err());

    let rows = divfolio::core::export::read_report(
        fs::File::open(output_file.path()).expect("Report file missing"),
    )
    .expect("Failed to parse exported report");
    assert!((rows[0].profit.unwrap() - 200.0).abs() < 1e-6);
}

#[test_log::test(tokio::test)]
async fn test_malformed_holdings_aborts_before_any_fetch() {
    let mock_server = wiremock::MockServer::start().await;

    let config_file = write_config(&mock_server.uri());
    let holdings_file = write_holdings("ticker,getPrice\nAAPL,100.0\n");

    let result = divfolio::run(divfolio::RunOptions {
        holdings_path: holdings_file.path().to_str().unwrap().to_string(),
        output_path: None,
        as_of: Some(date(2024, 6, 15)),
        config_path: Some(config_file.path().to_str().unwrap().to_string()),
    })
    .await;

    let error = result.expect_err("Malformed holdings must be fatal");
    assert!(format!("{error:#}").contains("Invalid holdings header"));
    // No market data request was made.
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_empty_holdings_reports_not_applicable() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_rate(&mock_server, "USDJPY=X", 150.0).await;

    let config_file = write_config(&mock_server.uri());
    let holdings_file = write_holdings("ticker,getPrice,quantity\n");
    let output_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");

    let result = divfolio::run(divfolio::RunOptions {
        holdings_path: holdings_file.path().to_str().unwrap().to_string(),
        output_path: Some(output_file.path().to_str().unwrap().to_string()),
        as_of: Some(date(2024, 6, 15)),
        config_path: Some(config_file.path().to_str().unwrap().to_string()),
    })
    .await;
    assert!(result.is_ok(), "Run failed with: {:?}", result.err());

    let rows = divfolio::core::export::read_report(
        fs::File::open(output_file.path()).expect("Report file missing"),
    )
    .expect("Failed to parse exported report");
    assert!(rows.is_empty());
}
