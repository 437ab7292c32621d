use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A live quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<f64>,
}

impl Quote {
    pub fn new(symbol: &str, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            previous_close: None,
        }
    }

    /// Percent change against the previous close, if known.
    pub fn change_percent(&self) -> Option<f64> {
        self.previous_close
            .filter(|close| *close > 0.0)
            .map(|close| (self.price - close) / close * 100.0)
    }
}

/// Prices keyed by symbol, taken once per valuation pass.
pub type QuoteSnapshot = HashMap<String, f64>;
