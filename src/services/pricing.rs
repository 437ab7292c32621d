//! Pricing Engine
//!
//! Pure pricing functions for options and futures:
//! - Black-Scholes price and Greeks for European options
//! - Option and futures payoff curves at expiry
//! - Option chain and futures contract generation around a spot price

use crate::config::TradingDefaults;
use crate::error::{Result, TradeError};
use crate::types::{
    ChainQuote, FuturePayoffRequest, FuturesContract, Greeks, GreeksRequest, OptionChain,
    OptionChainRow, OptionPayoffRequest, OptionType, PayoffPoint,
};
use std::f64::consts::{E, PI};
use tracing::debug;

/// Floor applied to time to expiry (years).
const MIN_TIME_YEARS: f64 = 1e-6;

/// Strikes generated on each side of spot.
const CHAIN_STRIKES_PER_SIDE: i64 = 6;

const CHAIN_EXPIRY_DAYS: i64 = 14;
const FUTURES_EXPIRY_DAYS: i64 = 30;

/// Tolerance, in steps, for the inclusive end of a payoff range.
const RANGE_EPSILON: f64 = 1e-6;

fn require_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TradeError::InvalidInput(format!(
            "{} must be a positive number, got {}",
            name, value
        )));
    }
    Ok(())
}

// =============================================================================
// Black-Scholes
// =============================================================================

fn d1(spot: f64, strike: f64, time: f64, sigma: f64, rate: f64) -> f64 {
    ((spot / strike).ln() + (rate + 0.5 * sigma.powi(2)) * time) / (sigma * time.sqrt())
}

fn d2(d1: f64, sigma: f64, time: f64) -> f64 {
    d1 - sigma * time.sqrt()
}

/// Standard normal cumulative distribution function.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / 2.0_f64.sqrt()))
}

/// Standard normal probability density function.
pub fn norm_pdf(x: f64) -> f64 {
    E.powf(-x.powi(2) / 2.0) / (2.0 * PI).sqrt()
}

/// Error function, Abramowitz-Stegun 7.1.26 (max error 1.5e-7).
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * E.powf(-x * x);

    sign * y
}

fn validate_greeks_request(request: &GreeksRequest) -> Result<()> {
    require_positive("spot", request.spot)?;
    require_positive("strike", request.strike)?;
    require_positive("iv", request.iv_percent)?;
    if !request.time_days.is_finite() {
        return Err(TradeError::InvalidInput("timeDays must be finite".to_string()));
    }
    if !request.rate.is_finite() {
        return Err(TradeError::InvalidInput("rate must be finite".to_string()));
    }
    Ok(())
}

/// Theoretical Black-Scholes premium for a European option.
pub fn black_scholes_price(request: &GreeksRequest) -> Result<f64> {
    validate_greeks_request(request)?;

    let time = (request.time_days / 365.0).max(MIN_TIME_YEARS);
    let sigma = request.iv_percent / 100.0;
    let rate = request.rate;
    let (spot, strike) = (request.spot, request.strike);

    let d1 = d1(spot, strike, time, sigma, rate);
    let d2 = d2(d1, sigma, time);
    let discount = E.powf(-rate * time);

    let price = match request.option_type {
        OptionType::Call => spot * norm_cdf(d1) - strike * discount * norm_cdf(d2),
        OptionType::Put => strike * discount * norm_cdf(-d2) - spot * norm_cdf(-d1),
    };

    Ok(price.max(0.0))
}

/// Black-Scholes Greeks at full precision.
///
/// Theta is per calendar day; vega and rho are per 1% move.
pub fn compute_greeks(request: &GreeksRequest) -> Result<Greeks> {
    validate_greeks_request(request)?;

    let time = (request.time_days / 365.0).max(MIN_TIME_YEARS);
    let sigma = request.iv_percent / 100.0;
    let rate = request.rate;
    let (spot, strike) = (request.spot, request.strike);

    let d1 = d1(spot, strike, time, sigma, rate);
    let d2 = d2(d1, sigma, time);
    let discount = E.powf(-rate * time);
    let sqrt_t = time.sqrt();
    let pdf_d1 = norm_pdf(d1);

    // Delta
    let delta = match request.option_type {
        OptionType::Call => norm_cdf(d1),
        OptionType::Put => norm_cdf(d1) - 1.0,
    };

    // Gamma (same for calls and puts)
    let gamma = pdf_d1 / (spot * sigma * sqrt_t);

    // Theta (per day)
    let decay = -(spot * pdf_d1 * sigma) / (2.0 * sqrt_t);
    let theta = match request.option_type {
        OptionType::Call => (decay - rate * strike * discount * norm_cdf(d2)) / 365.0,
        OptionType::Put => (decay + rate * strike * discount * (1.0 - norm_cdf(d2))) / 365.0,
    };

    // Vega (for 1% change in volatility)
    let vega = spot * pdf_d1 * sqrt_t / 100.0;

    // Rho (for 1% change in interest rate)
    let rho = match request.option_type {
        OptionType::Call => strike * time * discount * norm_cdf(d2) / 100.0,
        OptionType::Put => -strike * time * discount * (1.0 - norm_cdf(d2)) / 100.0,
    };

    Ok(Greeks::new(delta, gamma, theta, vega, rho))
}

// =============================================================================
// Payoff curves
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum PayoffShape {
    Option {
        option_type: OptionType,
        strike: f64,
        premium: f64,
    },
    Future {
        entry_price: f64,
    },
}

/// Expiry payoff sampled over a fixed price range.
///
/// The curve is a description, not a buffer: each call to [`PayoffCurve::iter`]
/// starts a fresh pass over the same samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoffCurve {
    shape: PayoffShape,
    start: f64,
    step: f64,
    count: usize,
    /// Contract units times the side sign
    multiplier: f64,
}

impl PayoffCurve {
    fn new(shape: PayoffShape, start: f64, end: f64, step: f64, multiplier: f64) -> Self {
        let count = ((end - start) / step + RANGE_EPSILON).floor() as usize + 1;
        Self {
            shape,
            start,
            step,
            count,
            multiplier,
        }
    }

    /// Number of samples in one pass.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> PayoffIter {
        PayoffIter {
            curve: *self,
            index: 0,
        }
    }

    /// P&L at a single underlying price.
    pub fn pnl_at(&self, underlying: f64) -> f64 {
        let per_unit = match self.shape {
            PayoffShape::Option {
                option_type,
                strike,
                premium,
            } => option_type.intrinsic(underlying, strike) - premium,
            PayoffShape::Future { entry_price } => underlying - entry_price,
        };
        per_unit * self.multiplier
    }
}

impl<'a> IntoIterator for &'a PayoffCurve {
    type Item = PayoffPoint;
    type IntoIter = PayoffIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`PayoffCurve`].
#[derive(Debug, Clone)]
pub struct PayoffIter {
    curve: PayoffCurve,
    index: usize,
}

impl Iterator for PayoffIter {
    type Item = PayoffPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.curve.count {
            return None;
        }
        let price = self.curve.start + self.index as f64 * self.curve.step;
        self.index += 1;
        Some(PayoffPoint {
            price,
            pnl: self.curve.pnl_at(price),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.curve.count.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PayoffIter {}

/// Option P&L at expiry over `[0.6 * strike, 1.4 * strike]`.
pub fn option_payoff(request: &OptionPayoffRequest) -> Result<PayoffCurve> {
    require_positive("strike", request.strike)?;
    if !request.premium.is_finite() || request.premium < 0.0 {
        return Err(TradeError::InvalidInput(format!(
            "premium must be a non-negative number, got {}",
            request.premium
        )));
    }
    if request.lot_size == 0 {
        return Err(TradeError::InvalidInput("lotSize must be positive".to_string()));
    }

    let strike = request.strike;
    let step = (strike * 0.02).max(1.0);
    let shape = PayoffShape::Option {
        option_type: request.option_type,
        strike,
        premium: request.premium,
    };
    let multiplier = request.lot_size as f64 * request.side.direction();

    Ok(PayoffCurve::new(shape, strike * 0.6, strike * 1.4, step, multiplier))
}

/// Futures P&L over `[0.9 * entry, 1.1 * entry]` in 1% steps.
pub fn future_payoff(request: &FuturePayoffRequest) -> Result<PayoffCurve> {
    require_positive("entryPrice", request.entry_price)?;
    if request.lot_size == 0 {
        return Err(TradeError::InvalidInput("lotSize must be positive".to_string()));
    }

    let entry = request.entry_price;
    let shape = PayoffShape::Future { entry_price: entry };
    let multiplier = request.lot_size as f64 * request.side.direction();

    Ok(PayoffCurve::new(shape, entry * 0.9, entry * 1.1, entry * 0.01, multiplier))
}

// =============================================================================
// Contract generation
// =============================================================================

/// Generates option chains and futures contracts from a spot price.
#[derive(Debug, Clone)]
pub struct PricingService {
    risk_free_rate: f64,
    lot_size: u64,
    margin_percent: f64,
}

impl PricingService {
    pub fn new(defaults: &TradingDefaults) -> Self {
        Self {
            risk_free_rate: defaults.risk_free_rate,
            lot_size: defaults.lot_size,
            margin_percent: defaults.margin_percent,
        }
    }

    /// Greeks using the configured risk-free rate.
    pub fn greeks(
        &self,
        spot: f64,
        strike: f64,
        iv_percent: f64,
        time_days: f64,
        option_type: OptionType,
    ) -> Result<Greeks> {
        compute_greeks(&GreeksRequest {
            spot,
            strike,
            iv_percent,
            time_days,
            rate: self.risk_free_rate,
            option_type,
        })
    }

    /// Thirteen strikes centred on spot with moneyness-scaled volatility.
    /// Strikes that would fall to zero or below are left out.
    pub fn option_chain(&self, symbol: &str, spot: f64, now: i64) -> Result<OptionChain> {
        require_positive("spot", spot)?;

        let step = (spot * 0.01).round().max(5.0);
        let rows = (-CHAIN_STRIKES_PER_SIDE..=CHAIN_STRIKES_PER_SIDE)
            .map(|i| (spot + i as f64 * step).round())
            .filter(|&strike| strike > 0.0)
            .map(|strike| {
                let moneyness = (strike - spot).abs() / spot;
                let iv_base = 0.18 + moneyness * 0.6;
                let iv = (iv_base * 10_000.0).round() / 100.0;
                let time_value = iv_base * spot * 0.05;

                let call_premium = ((spot - strike).max(0.0) * 0.5 + time_value).round().max(2.0);
                let put_premium = ((strike - spot).max(0.0) * 0.5 + time_value).round().max(2.0);
                let days = CHAIN_EXPIRY_DAYS as f64;
                let call_delta = self.greeks(spot, strike, iv, days, OptionType::Call)?;
                let put_delta = self.greeks(spot, strike, iv, days, OptionType::Put)?;

                Ok(OptionChainRow {
                    strike,
                    call: ChainQuote {
                        premium: call_premium,
                        iv,
                        delta: call_delta.rounded().delta,
                    },
                    put: ChainQuote {
                        premium: put_premium,
                        iv,
                        delta: put_delta.rounded().delta,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Generated {} strikes for {} around {:.2}", rows.len(), symbol, spot);

        Ok(OptionChain {
            symbol: symbol.to_string(),
            expiry: now + chrono::Duration::days(CHAIN_EXPIRY_DAYS).num_milliseconds(),
            spot,
            lot_size: self.lot_size,
            rows,
        })
    }

    /// Near-month future priced at spot plus a 1% basis.
    pub fn futures_contract(&self, symbol: &str, spot: f64, now: i64) -> Result<FuturesContract> {
        require_positive("spot", spot)?;

        let price = ((spot * 1.01) * 100.0).round() / 100.0;
        Ok(FuturesContract {
            symbol: symbol.to_string(),
            expiry: now + chrono::Duration::days(FUTURES_EXPIRY_DAYS).num_milliseconds(),
            lot_size: self.lot_size,
            price,
            margin_percent: self.margin_percent,
            underlying_price: spot,
        })
    }
}
