//! Ledger Types
//!
//! Balances, equity holdings, the transaction log and aggregate metrics for a
//! standing portfolio or a contest entry.

use super::derivative::DerivativePosition;
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Trade side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Sign applied to long-side P&L.
    pub fn direction(&self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// What a ledger belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerScope {
    /// The user's non-contest portfolio
    Standing,
    /// Participation in one contest
    #[serde(rename_all = "camelCase")]
    Contest { contest_id: String },
}

/// Instrument mix a ledger trades in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryStrategy {
    Equity,
    Options,
    Futures,
    Mixed,
}

impl Default for PrimaryStrategy {
    fn default() -> Self {
        PrimaryStrategy::Equity
    }
}

// =============================================================================
// Positions
// =============================================================================

/// An equity holding valued with weighted-average cost basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    /// Units held, always positive while the position exists
    pub quantity: u64,
    /// Weighted-average entry price
    pub average_price: f64,
    /// quantity * average_price
    pub invested_amount: f64,
    /// Last known market price
    pub current_price: f64,
    /// quantity * current_price
    pub current_value: f64,
    /// current_value - invested_amount
    pub profit_loss: f64,
    /// profit_loss as a percentage of invested_amount
    pub profit_loss_percent: f64,
}

impl Position {
    /// Open a new position at the given price.
    pub fn open(symbol: String, quantity: u64, price: f64) -> Self {
        let mut position = Self {
            symbol,
            quantity,
            average_price: price,
            invested_amount: 0.0,
            current_price: price,
            current_value: 0.0,
            profit_loss: 0.0,
            profit_loss_percent: 0.0,
        };
        position.refresh();
        position
    }

    /// Revalue against a new market price.
    pub fn mark(&mut self, price: f64) {
        self.current_price = price;
        self.refresh();
    }

    /// Recompute every derived field from quantity, average and current price.
    pub fn refresh(&mut self) {
        let quantity = self.quantity as f64;
        self.invested_amount = quantity * self.average_price;
        self.current_value = quantity * self.current_price;
        self.profit_loss = self.current_value - self.invested_amount;
        self.profit_loss_percent = if self.invested_amount > 0.0 {
            self.profit_loss / self.invested_amount * 100.0
        } else {
            0.0
        };
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Immutable record of an executed equity trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "type")]
    pub side: Side,
    pub symbol: String,
    pub quantity: u64,
    pub price: f64,
    pub total_amount: f64,
    /// Execution time (ms)
    pub timestamp: i64,
}

impl Transaction {
    pub fn new(side: Side, symbol: String, quantity: u64, price: f64, timestamp: i64) -> Self {
        Self {
            side,
            symbol,
            quantity,
            price,
            total_amount: quantity as f64 * price,
            timestamp,
        }
    }
}

/// Request to buy or sell an equity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub symbol: String,
    pub quantity: u64,
    /// Execution price; the live quote is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub side: Side,
}

impl TradeRequest {
    pub fn buy(symbol: &str, quantity: u64, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
            price: Some(price),
            side: Side::Buy,
        }
    }

    pub fn sell(symbol: &str, quantity: u64, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
            price: Some(price),
            side: Side::Sell,
        }
    }

    /// Same request executed at the live quote.
    pub fn at_market(mut self) -> Self {
        self.price = None;
        self
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Aggregate performance of a ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerMetrics {
    pub portfolio_value: f64,
    pub total_value: f64,
    pub total_returns: f64,
    pub total_returns_percent: f64,
    pub total_trades: u64,
    pub profitable_trades: u64,
    pub win_rate: f64,
}

/// A user's balance and holdings, scoped to the standing portfolio or a contest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    pub id: String,
    pub user_id: String,
    pub scope: LedgerScope,
    pub initial_balance: f64,
    /// Cash available for trading
    pub balance: f64,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub derivative_positions: Vec<DerivativePosition>,
    #[serde(default)]
    pub metrics: LedgerMetrics,
    /// Leaderboard rank, assigned only by a ranking pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Names of achievements unlocked through this ledger
    #[serde(default)]
    pub achievements_earned: Vec<String>,
    #[serde(default)]
    pub primary_strategy: PrimaryStrategy,
    /// Bumped by every persisted mutation
    #[serde(default)]
    pub version: u64,
    pub joined_at: i64,
    pub last_updated: i64,
}

impl Ledger {
    fn with_scope(user_id: String, scope: LedgerScope, initial_balance: f64) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            scope,
            initial_balance,
            balance: initial_balance,
            positions: Vec::new(),
            transactions: Vec::new(),
            derivative_positions: Vec::new(),
            metrics: LedgerMetrics {
                total_value: initial_balance,
                ..LedgerMetrics::default()
            },
            rank: None,
            achievements_earned: Vec::new(),
            primary_strategy: PrimaryStrategy::default(),
            version: 0,
            joined_at: now,
            last_updated: now,
        }
    }

    /// Create a user's standing portfolio.
    pub fn standing(user_id: String, initial_balance: f64) -> Self {
        Self::with_scope(user_id, LedgerScope::Standing, initial_balance)
    }

    /// Create a contest entry.
    pub fn contest_entry(user_id: String, contest_id: String, initial_balance: f64) -> Self {
        Self::with_scope(user_id, LedgerScope::Contest { contest_id }, initial_balance)
    }

    /// Contest this ledger participates in, if any.
    pub fn contest_id(&self) -> Option<&str> {
        match &self.scope {
            LedgerScope::Contest { contest_id } => Some(contest_id),
            LedgerScope::Standing => None,
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }

    /// Symbols of all open equity positions.
    pub fn symbols(&self) -> Vec<String> {
        self.positions.iter().map(|p| p.symbol.clone()).collect()
    }

    pub fn open_derivatives(&self) -> impl Iterator<Item = &DerivativePosition> {
        self.derivative_positions.iter().filter(|d| d.is_open)
    }

    pub fn derivative(&self, position_id: &str) -> Option<&DerivativePosition> {
        self.derivative_positions.iter().find(|d| d.id == position_id)
    }
}

/// Standing portfolio view with invested and current totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub balance: f64,
    pub total_invested: f64,
    pub total_current_value: f64,
    pub total_profit_loss: f64,
    pub total_profit_loss_percent: f64,
    pub positions: Vec<Position>,
}
