//! Yahoo Finance quote gateway.
//!
//! Reads the current price from the chart endpoint's `meta` block. Bare NSE
//! symbols get the configured exchange suffix (`INFY` becomes `INFY.NS`).

use crate::config::QuoteConfig;
use crate::error::{Result, TradeError};
use crate::services::quotes::QuoteGateway;
use crate::types::Quote;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
}

/// Exchange-qualified symbol for the chart endpoint.
fn qualify_symbol(symbol: &str, suffix: &str) -> String {
    let symbol = symbol.trim().to_uppercase();
    if symbol.starts_with('^') || symbol.contains('.') || suffix.is_empty() {
        symbol
    } else {
        format!("{}{}", symbol, suffix)
    }
}

fn parse_chart(symbol: &str, data: YahooChartResponse) -> Result<Quote> {
    let unavailable = |reason: String| TradeError::QuoteUnavailable {
        symbol: symbol.to_string(),
        reason,
    };

    if let Some(error) = data.chart.error {
        return Err(unavailable(format!(
            "Yahoo API error: {} - {}",
            error.code, error.description
        )));
    }

    let meta = data
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .map(|result| result.meta)
        .ok_or_else(|| unavailable("empty chart result".to_string()))?;

    let price = meta
        .regular_market_price
        .ok_or_else(|| unavailable("no regularMarketPrice".to_string()))?;

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        previous_close: meta.previous_close.or(meta.chart_previous_close),
    })
}

/// Yahoo Finance chart client.
pub struct YahooQuoteGateway {
    client: Client,
    base_url: String,
    symbol_suffix: String,
}

impl YahooQuoteGateway {
    pub fn new(config: &QuoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| TradeError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            symbol_suffix: config.symbol_suffix.clone(),
        })
    }
}

#[async_trait]
impl QuoteGateway for YahooQuoteGateway {
    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let unavailable = |reason: String| TradeError::QuoteUnavailable {
            symbol: symbol.to_string(),
            reason,
        };

        let url = format!(
            "{}/{}?range=1d&interval=1d",
            self.base_url,
            qualify_symbol(symbol, &self.symbol_suffix)
        );
        debug!("Fetching Yahoo quote: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("API error: {}", response.status())));
        }

        let data: YahooChartResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("parse error: {}", e)))?;

        parse_chart(symbol, data)
    }
}
