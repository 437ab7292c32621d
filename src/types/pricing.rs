//! Pricing request and result types.

use super::derivative::OptionType;
use super::ledger::Side;
use serde::{Deserialize, Serialize};

fn default_rate() -> f64 {
    0.06
}

fn default_lot_size() -> u64 {
    25
}

fn default_side() -> Side {
    Side::Buy
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Option sensitivities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Greeks {
    /// Price sensitivity to underlying price change (dV/dS)
    pub delta: f64,
    /// Rate of change of delta (d²V/dS²)
    pub gamma: f64,
    /// Time decay per day (dV/dt)
    pub theta: f64,
    /// Sensitivity to a 1% volatility change
    pub vega: f64,
    /// Sensitivity to a 1% rate change
    pub rho: f64,
}

impl Greeks {
    pub fn new(delta: f64, gamma: f64, theta: f64, vega: f64, rho: f64) -> Self {
        Self { delta, gamma, theta, vega, rho }
    }

    /// Display precision: 2 decimals, gamma 4.
    pub fn rounded(&self) -> Self {
        Self {
            delta: round_to(self.delta, 2),
            gamma: round_to(self.gamma, 4),
            theta: round_to(self.theta, 2),
            vega: round_to(self.vega, 2),
            rho: round_to(self.rho, 2),
        }
    }
}

/// Inputs for a Black-Scholes Greeks calculation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreeksRequest {
    pub spot: f64,
    pub strike: f64,
    /// Implied volatility in percent (20 = 20%)
    #[serde(rename = "iv")]
    pub iv_percent: f64,
    pub time_days: f64,
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(rename = "type")]
    pub option_type: OptionType,
}

/// One sample of a payoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoffPoint {
    /// Underlying price at expiry
    pub price: f64,
    pub pnl: f64,
}

/// Inputs for an option payoff curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionPayoffRequest {
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub strike: f64,
    pub premium: f64,
    #[serde(default = "default_side")]
    pub side: Side,
    #[serde(default = "default_lot_size")]
    pub lot_size: u64,
}

/// Inputs for a futures payoff curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturePayoffRequest {
    pub entry_price: f64,
    #[serde(default = "default_lot_size")]
    pub lot_size: u64,
    #[serde(default = "default_side")]
    pub side: Side,
}
