//! Position Ledger
//!
//! Equity trade execution with weighted-average cost basis. Every check runs
//! before the first mutation, so a rejected trade leaves the ledger untouched.

use crate::error::{Result, TradeError};
use crate::types::{Ledger, Position, Side, Transaction};
use tracing::debug;

/// A validated, priced equity order.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub symbol: String,
    pub quantity: u64,
    pub price: f64,
    pub side: Side,
}

impl Execution {
    pub fn new(symbol: &str, quantity: u64, price: f64, side: Side) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
            price,
            side,
        }
    }

    fn validate(&self) -> Result<String> {
        let symbol = self.symbol.trim();
        if symbol.is_empty() {
            return Err(TradeError::Validation("symbol must not be empty".to_string()));
        }
        if self.quantity == 0 {
            return Err(TradeError::Validation("quantity must be positive".to_string()));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(TradeError::Validation(format!(
                "price must be a positive number, got {}",
                self.price
            )));
        }
        Ok(symbol.to_string())
    }

    pub fn total(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// Apply a BUY or SELL to the ledger and append the transaction.
///
/// The touched position is marked to the execution price; other positions
/// keep their last mark until the next recomputation.
pub fn execute_trade(ledger: &mut Ledger, execution: &Execution, now: i64) -> Result<Transaction> {
    let symbol = execution.validate()?;
    let amount = execution.total();
    let index = ledger.positions.iter().position(|p| p.symbol == symbol);

    match execution.side {
        Side::Buy => {
            if ledger.balance < amount {
                return Err(TradeError::InsufficientFunds {
                    needed: amount,
                    available: ledger.balance,
                });
            }

            let held = index.map(|i| ledger.positions[i].quantity).unwrap_or(0);
            let new_quantity = held.checked_add(execution.quantity).ok_or_else(|| {
                TradeError::Validation(format!(
                    "buying {} more {} overflows the position quantity",
                    execution.quantity, symbol
                ))
            })?;

            ledger.balance -= amount;
            match index {
                Some(i) => {
                    let position = &mut ledger.positions[i];
                    position.average_price = (position.quantity as f64 * position.average_price
                        + amount)
                        / new_quantity as f64;
                    position.quantity = new_quantity;
                    position.mark(execution.price);
                    debug!(
                        "Added {} {} to position, avg {:.2}",
                        execution.quantity, symbol, position.average_price
                    );
                }
                None => {
                    ledger
                        .positions
                        .push(Position::open(symbol.clone(), execution.quantity, execution.price));
                    debug!("Opened {} {} @ {:.2}", execution.quantity, symbol, execution.price);
                }
            }
        }
        Side::Sell => {
            let held = index.map(|i| ledger.positions[i].quantity).unwrap_or(0);
            let i = match index {
                Some(i) if held >= execution.quantity => i,
                _ => {
                    return Err(TradeError::InsufficientHoldings {
                        symbol,
                        requested: execution.quantity,
                        held,
                    })
                }
            };

            ledger.balance += amount;
            let remaining = held - execution.quantity;
            if remaining == 0 {
                ledger.positions.remove(i);
                debug!("Closed position in {}", symbol);
            } else {
                let position = &mut ledger.positions[i];
                position.quantity = remaining;
                position.mark(execution.price);
                debug!("Reduced {} to {}", symbol, remaining);
            }
        }
    }

    let transaction = Transaction::new(
        execution.side,
        symbol,
        execution.quantity,
        execution.price,
        now,
    );
    ledger.transactions.push(transaction.clone());
    ledger.last_updated = now;

    Ok(transaction)
}
