//! Options and Futures Types

use super::ledger::Side;
use serde::{Deserialize, Serialize};

/// Derivative instrument kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DerivativeKind {
    Option,
    Future,
}

impl std::fmt::Display for DerivativeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DerivativeKind::Option => write!(f, "OPTION"),
            DerivativeKind::Future => write!(f, "FUTURE"),
        }
    }
}

/// Option type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Intrinsic value at the given underlying price.
    pub fn intrinsic(&self, underlying: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (underlying - strike).max(0.0),
            OptionType::Put => (strike - underlying).max(0.0),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => write!(f, "CALL"),
            OptionType::Put => write!(f, "PUT"),
        }
    }
}

/// An option or futures position held in a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativePosition {
    pub id: String,
    pub kind: DerivativeKind,
    pub side: Side,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_type: Option<OptionType>,
    pub lot_size: u64,
    /// Number of lots
    pub quantity: u64,
    /// Premium for options, contract price for futures
    pub entry_price: f64,
    pub current_price: f64,
    pub pnl: f64,
    /// Margin debited when a future was opened
    pub margin_blocked: f64,
    pub opened_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
    pub is_open: bool,
}

impl DerivativePosition {
    /// Contract units covered by the position.
    pub fn units(&self) -> f64 {
        self.lot_size as f64 * self.quantity as f64
    }

    /// Mark the position and recompute its P&L.
    pub fn mark(&mut self, price: f64) {
        self.current_price = price;
        self.pnl = (self.current_price - self.entry_price) * self.units() * self.side.direction();
    }

    pub fn is_option(&self) -> bool {
        self.kind == DerivativeKind::Option
    }
}

/// Order to open an option position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionOrder {
    pub symbol: String,
    pub strike: f64,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub premium: f64,
    #[serde(default)]
    pub lot_size: Option<u64>,
    #[serde(default)]
    pub quantity: Option<u64>,
    #[serde(default)]
    pub expiry: Option<i64>,
}

/// Order to open a futures position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FutureOrder {
    pub symbol: String,
    pub price: f64,
    #[serde(default)]
    pub lot_size: Option<u64>,
    #[serde(default)]
    pub quantity: Option<u64>,
    #[serde(default)]
    pub margin_percent: Option<f64>,
    #[serde(default)]
    pub expiry: Option<i64>,
}

/// Either kind of derivative order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DerivativeOrder {
    Option(OptionOrder),
    Future(FutureOrder),
}

impl DerivativeOrder {
    pub fn symbol(&self) -> &str {
        match self {
            DerivativeOrder::Option(o) => &o.symbol,
            DerivativeOrder::Future(f) => &f.symbol,
        }
    }

    pub fn kind(&self) -> DerivativeKind {
        match self {
            DerivativeOrder::Option(_) => DerivativeKind::Option,
            DerivativeOrder::Future(_) => DerivativeKind::Future,
        }
    }
}

// =============================================================================
// Contract listings
// =============================================================================

/// Premium and implied volatility for one side of a chain row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainQuote {
    pub premium: f64,
    /// Implied volatility (percent)
    pub iv: f64,
    /// Black-Scholes delta at the chain's expiry
    pub delta: f64,
}

/// One strike of an option chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChainRow {
    pub strike: f64,
    pub call: ChainQuote,
    pub put: ChainQuote,
}

/// Option chain generated around a spot price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChain {
    pub symbol: String,
    pub expiry: i64,
    pub spot: f64,
    pub lot_size: u64,
    pub rows: Vec<OptionChainRow>,
}

/// A listed futures contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesContract {
    pub symbol: String,
    pub expiry: i64,
    pub lot_size: u64,
    pub price: f64,
    pub margin_percent: f64,
    pub underlying_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn future(side: Side) -> DerivativePosition {
        DerivativePosition {
            id: "d1".to_string(),
            kind: DerivativeKind::Future,
            side,
            symbol: "NIFTY".to_string(),
            expiry: None,
            strike: None,
            option_type: None,
            lot_size: 25,
            quantity: 2,
            entry_price: 20_000.0,
            current_price: 20_000.0,
            pnl: 0.0,
            margin_blocked: 150_000.0,
            opened_at: 0,
            closed_at: None,
            is_open: true,
        }
    }

    #[test]
    fn test_intrinsic_value() {
        assert_eq!(OptionType::Call.intrinsic(110.0, 100.0), 10.0);
        assert_eq!(OptionType::Call.intrinsic(90.0, 100.0), 0.0);
        assert_eq!(OptionType::Put.intrinsic(90.0, 100.0), 10.0);
        assert_eq!(OptionType::Put.intrinsic(110.0, 100.0), 0.0);
    }

    #[test]
    fn test_mark_long_and_short() {
        let mut long = future(Side::Buy);
        long.mark(20_100.0);
        assert_eq!(long.pnl, 5_000.0);

        let mut short = future(Side::Sell);
        short.mark(20_100.0);
        assert_eq!(short.pnl, -5_000.0);
    }

    #[test]
    fn test_units_do_not_wrap() {
        let mut position = future(Side::Buy);
        position.lot_size = u64::MAX;
        position.quantity = 4;

        assert!(position.units() > u64::MAX as f64);
    }

    #[test]
    fn test_order_tagging() {
        let json = r#"{"kind":"OPTION","symbol":"NIFTY","strike":20000,"type":"PUT","premium":120}"#;
        let order: DerivativeOrder = serde_json::from_str(json).unwrap();

        assert_eq!(order.kind(), DerivativeKind::Option);
        assert_eq!(order.symbol(), "NIFTY");
        match order {
            DerivativeOrder::Option(o) => {
                assert_eq!(o.option_type, OptionType::Put);
                assert_eq!(o.lot_size, None);
            }
            DerivativeOrder::Future(_) => panic!("expected option order"),
        }
    }
}
