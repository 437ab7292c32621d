//! Options and futures positions.
//!
//! Opening never nets against existing positions. Long options debit the
//! premium, written options credit it, and futures block margin.

use crate::config::TradingDefaults;
use crate::error::{Result, TradeError};
use crate::types::{DerivativeKind, DerivativeOrder, DerivativePosition, Ledger, Side};
use tracing::{debug, info};

fn require_price(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TradeError::Validation(format!(
            "{} must be a positive number, got {}",
            name, value
        )));
    }
    Ok(())
}

fn require_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(TradeError::Validation("symbol must not be empty".to_string()));
    }
    Ok(symbol.to_string())
}

fn require_count(name: &str, value: u64) -> Result<u64> {
    if value == 0 {
        return Err(TradeError::Validation(format!("{} must be positive", name)));
    }
    Ok(value)
}

/// Contract units for `quantity` lots, rejected if the count overflows.
fn contract_units(lot_size: u64, quantity: u64) -> Result<u64> {
    lot_size.checked_mul(quantity).ok_or_else(|| {
        TradeError::Validation(format!(
            "{} lots of {} overflows the contract count",
            quantity, lot_size
        ))
    })
}

/// Validate an order and build the position it would open, without touching the ledger.
fn build_position(
    order: &DerivativeOrder,
    side: Side,
    defaults: &TradingDefaults,
    now: i64,
) -> Result<DerivativePosition> {
    let position = match order {
        DerivativeOrder::Option(o) => {
            let symbol = require_symbol(&o.symbol)?;
            require_price("strike", o.strike)?;
            require_price("premium", o.premium)?;
            let lot_size = require_count("lotSize", o.lot_size.unwrap_or(defaults.lot_size))?;
            let quantity = require_count("quantity", o.quantity.unwrap_or(1))?;
            contract_units(lot_size, quantity)?;

            DerivativePosition {
                id: uuid::Uuid::new_v4().to_string(),
                kind: DerivativeKind::Option,
                side,
                symbol,
                expiry: o.expiry,
                strike: Some(o.strike),
                option_type: Some(o.option_type),
                lot_size,
                quantity,
                entry_price: o.premium,
                current_price: o.premium,
                pnl: 0.0,
                margin_blocked: 0.0,
                opened_at: now,
                closed_at: None,
                is_open: true,
            }
        }
        DerivativeOrder::Future(f) => {
            let symbol = require_symbol(&f.symbol)?;
            require_price("price", f.price)?;
            let lot_size = require_count("lotSize", f.lot_size.unwrap_or(defaults.lot_size))?;
            let quantity = require_count("quantity", f.quantity.unwrap_or(1))?;
            let margin_percent = f.margin_percent.unwrap_or(defaults.margin_percent);
            if !margin_percent.is_finite() || margin_percent <= 0.0 || margin_percent > 100.0 {
                return Err(TradeError::Validation(format!(
                    "marginPercent must be in (0, 100], got {}",
                    margin_percent
                )));
            }

            let notional = f.price * contract_units(lot_size, quantity)? as f64;
            DerivativePosition {
                id: uuid::Uuid::new_v4().to_string(),
                kind: DerivativeKind::Future,
                side,
                symbol,
                expiry: f.expiry,
                strike: None,
                option_type: None,
                lot_size,
                quantity,
                entry_price: f.price,
                current_price: f.price,
                pnl: 0.0,
                margin_blocked: notional * margin_percent / 100.0,
                opened_at: now,
                closed_at: None,
                is_open: true,
            }
        }
    };
    Ok(position)
}

/// Open a new option or futures position.
pub fn open_derivative(
    ledger: &mut Ledger,
    order: &DerivativeOrder,
    side: Side,
    defaults: &TradingDefaults,
    now: i64,
) -> Result<DerivativePosition> {
    let position = build_position(order, side, defaults, now)?;

    match (position.kind, side) {
        (DerivativeKind::Option, Side::Buy) => {
            let cost = position.entry_price * position.units();
            if ledger.balance < cost {
                return Err(TradeError::InsufficientFunds {
                    needed: cost,
                    available: ledger.balance,
                });
            }
            ledger.balance -= cost;
        }
        // Written options carry no margin requirement
        (DerivativeKind::Option, Side::Sell) => {
            ledger.balance += position.entry_price * position.units();
        }
        (DerivativeKind::Future, _) => {
            if ledger.balance < position.margin_blocked {
                return Err(TradeError::InsufficientFunds {
                    needed: position.margin_blocked,
                    available: ledger.balance,
                });
            }
            ledger.balance -= position.margin_blocked;
        }
    }

    info!(
        "Opened {} {} {} x{} lots of {} @ {:.2}",
        side, position.kind, position.symbol, position.quantity, position.lot_size,
        position.entry_price
    );

    ledger.derivative_positions.push(position.clone());
    ledger.last_updated = now;
    Ok(position)
}

/// Mark a derivative position to a new price.
pub fn mark_derivative(position: &mut DerivativePosition, price: f64) -> Result<()> {
    require_price("mark price", price)?;
    position.mark(price);
    Ok(())
}

/// Settle an open position at `exit_price`.
pub fn close_derivative(
    ledger: &mut Ledger,
    position_id: &str,
    exit_price: f64,
    now: i64,
) -> Result<DerivativePosition> {
    if !exit_price.is_finite() || exit_price < 0.0 {
        return Err(TradeError::Validation(format!(
            "exit price must be a non-negative number, got {}",
            exit_price
        )));
    }

    let index = ledger
        .derivative_positions
        .iter()
        .position(|d| d.id == position_id)
        .ok_or_else(|| TradeError::PositionNotFound(position_id.to_string()))?;

    let mut settled = ledger.derivative_positions[index].clone();
    if !settled.is_open {
        return Err(TradeError::Validation(format!(
            "position {} is already closed",
            position_id
        )));
    }
    settled.mark(exit_price);

    // Signed cash movement for the ledger balance
    let cash = match (settled.kind, settled.side) {
        (DerivativeKind::Option, Side::Buy) => exit_price * settled.units(),
        (DerivativeKind::Option, Side::Sell) => -(exit_price * settled.units()),
        (DerivativeKind::Future, _) => settled.margin_blocked + settled.pnl,
    };

    if ledger.balance + cash < 0.0 {
        return Err(TradeError::InsufficientFunds {
            needed: -cash,
            available: ledger.balance,
        });
    }

    ledger.balance += cash;
    settled.is_open = false;
    settled.closed_at = Some(now);
    ledger.derivative_positions[index] = settled.clone();
    ledger.last_updated = now;

    debug!("Closed {} with pnl {:.2}", settled.id, settled.pnl);
    Ok(settled)
}
