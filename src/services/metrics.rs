//! Metrics Recomputation
//!
//! Marks equity positions to a quote snapshot and derives the ledger's
//! aggregate returns. Pure: no clock, no I/O.

use crate::error::{Result, TradeError};
use crate::types::{
    DerivativeKind, Ledger, LedgerMetrics, PortfolioSummary, PrimaryStrategy, QuoteSnapshot,
    Side,
};
use tracing::debug;

/// Revalue every equity position from `quotes` and recompute `ledger.metrics`.
///
/// A missing or non-positive quote keeps the position's previous mark.
/// Profitable trades are counted as SELL transactions.
pub fn recompute_metrics(ledger: &mut Ledger, quotes: &QuoteSnapshot) -> Result<LedgerMetrics> {
    if !ledger.initial_balance.is_finite() || ledger.initial_balance <= 0.0 {
        return Err(TradeError::Configuration(format!(
            "ledger {} has initial balance {}",
            ledger.id, ledger.initial_balance
        )));
    }

    for position in ledger.positions.iter_mut() {
        match quotes.get(&position.symbol) {
            Some(&price) if price.is_finite() && price > 0.0 => position.mark(price),
            _ => {
                debug!("No fresh quote for {}, keeping {:.2}", position.symbol, position.current_price);
                position.refresh();
            }
        }
    }

    let portfolio_value: f64 = ledger.positions.iter().map(|p| p.current_value).sum();
    let total_value = ledger.balance + portfolio_value;
    let total_returns = total_value - ledger.initial_balance;
    let total_trades = ledger.transactions.len() as u64;
    let profitable_trades = ledger
        .transactions
        .iter()
        .filter(|t| t.side == Side::Sell)
        .count() as u64;
    let win_rate = if total_trades > 0 {
        profitable_trades as f64 / total_trades as f64 * 100.0
    } else {
        0.0
    };

    let metrics = LedgerMetrics {
        portfolio_value,
        total_value,
        total_returns,
        total_returns_percent: total_returns / ledger.initial_balance * 100.0,
        total_trades,
        profitable_trades,
        win_rate,
    };

    ledger.metrics = metrics.clone();
    ledger.primary_strategy = primary_strategy(ledger);
    Ok(metrics)
}

/// Standing portfolio view over the current marks.
pub fn summarize(ledger: &Ledger) -> PortfolioSummary {
    let total_invested: f64 = ledger.positions.iter().map(|p| p.invested_amount).sum();
    let total_current_value: f64 = ledger.positions.iter().map(|p| p.current_value).sum();
    let total_profit_loss = total_current_value - total_invested;

    PortfolioSummary {
        balance: ledger.balance,
        total_invested,
        total_current_value,
        total_profit_loss,
        total_profit_loss_percent: if total_invested > 0.0 {
            total_profit_loss / total_invested * 100.0
        } else {
            0.0
        },
        positions: ledger.positions.clone(),
    }
}

/// Classify what the ledger trades, from its equity trades and derivative history.
pub fn primary_strategy(ledger: &Ledger) -> PrimaryStrategy {
    let equity = !ledger.transactions.is_empty();
    let options = ledger
        .derivative_positions
        .iter()
        .any(|d| d.kind == DerivativeKind::Option);
    let futures = ledger
        .derivative_positions
        .iter()
        .any(|d| d.kind == DerivativeKind::Future);

    match (equity, options, futures) {
        (_, true, true) | (true, true, false) | (true, false, true) => PrimaryStrategy::Mixed,
        (false, true, false) => PrimaryStrategy::Options,
        (false, false, true) => PrimaryStrategy::Futures,
        (_, false, false) => PrimaryStrategy::Equity,
    }
}
