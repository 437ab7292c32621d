//! Black-Scholes and payoff calculators.

use tradearena::config::TradingDefaults;
use tradearena::services::{compute_greeks, future_payoff, option_payoff, PricingService};
use tradearena::types::*;
use tradearena::TradeError;

fn atm_call() -> GreeksRequest {
    GreeksRequest {
        spot: 100.0,
        strike: 100.0,
        iv_percent: 20.0,
        time_days: 30.0,
        rate: 0.06,
        option_type: OptionType::Call,
    }
}

#[test]
fn test_atm_call_greeks() {
    let greeks = compute_greeks(&atm_call()).unwrap();

    assert!(greeks.delta > 0.5 && greeks.delta < 0.6);
    assert!(greeks.gamma > 0.0);
    assert!(greeks.theta < 0.0);
    assert!(greeks.vega > 0.0);
    assert!(greeks.rho > 0.0);
}

#[test]
fn test_put_call_delta_parity() {
    let call = compute_greeks(&atm_call()).unwrap();
    let put = compute_greeks(&GreeksRequest {
        option_type: OptionType::Put,
        ..atm_call()
    })
    .unwrap();

    assert!((call.delta - put.delta - 1.0).abs() < 1e-9);
    assert!((call.gamma - put.gamma).abs() < 1e-12);
    assert!(put.rho < 0.0);
}

#[test]
fn test_expired_option_stays_finite() {
    let greeks = compute_greeks(&GreeksRequest {
        time_days: 0.0,
        ..atm_call()
    })
    .unwrap();

    assert!(greeks.delta.is_finite());
    assert!(greeks.gamma.is_finite());
    assert!(greeks.theta.is_finite());
}

#[test]
fn test_degenerate_inputs_rejected() {
    for request in [
        GreeksRequest { spot: 0.0, ..atm_call() },
        GreeksRequest { strike: -1.0, ..atm_call() },
        GreeksRequest { iv_percent: 0.0, ..atm_call() },
    ] {
        assert!(matches!(compute_greeks(&request), Err(TradeError::InvalidInput(_))));
    }
}

#[test]
fn test_long_call_payoff() {
    let curve = option_payoff(&OptionPayoffRequest {
        option_type: OptionType::Call,
        strike: 100.0,
        premium: 5.0,
        side: Side::Buy,
        lot_size: 25,
    })
    .unwrap();

    let points: Vec<PayoffPoint> = curve.iter().collect();
    assert_eq!(points.len(), 41);
    assert_eq!(points[0].pnl, -125.0);
    assert!((points.last().unwrap().price - 140.0).abs() < 1e-9);
    assert!((points.last().unwrap().pnl - 875.0).abs() < 1e-9);

    // Restartable
    assert_eq!(curve.iter().count(), points.len());
}

#[test]
fn test_short_put_payoff_is_negated() {
    let long = option_payoff(&OptionPayoffRequest {
        option_type: OptionType::Put,
        strike: 200.0,
        premium: 8.0,
        side: Side::Buy,
        lot_size: 50,
    })
    .unwrap();
    let short = option_payoff(&OptionPayoffRequest {
        side: Side::Sell,
        option_type: OptionType::Put,
        strike: 200.0,
        premium: 8.0,
        lot_size: 50,
    })
    .unwrap();

    for (l, s) in long.iter().zip(short.iter()) {
        assert_eq!(l.price, s.price);
        assert_eq!(l.pnl, -s.pnl);
    }
}

#[test]
fn test_future_payoff() {
    let curve = future_payoff(&FuturePayoffRequest {
        entry_price: 1000.0,
        lot_size: 10,
        side: Side::Sell,
    })
    .unwrap();

    let points: Vec<PayoffPoint> = curve.iter().collect();
    assert_eq!(points.len(), 21);
    assert!((points[0].pnl - 1000.0).abs() < 1e-6);
    assert!((points[20].pnl + 1000.0).abs() < 1e-6);
}

#[test]
fn test_option_chain_is_centered_on_spot() {
    let pricing = PricingService::new(&TradingDefaults::default());
    let chain = pricing
        .option_chain("NIFTY", 20_000.0, 1_700_000_000_000)
        .unwrap();

    assert_eq!(chain.rows.len(), 13);
    assert_eq!(chain.lot_size, 25);
    assert!(chain.rows.windows(2).all(|w| w[0].strike < w[1].strike));
    assert!(chain.rows.iter().all(|r| r.call.premium > 0.0 && r.put.premium > 0.0));
}

#[test]
fn test_option_chain_deltas_follow_moneyness() {
    let pricing = PricingService::new(&TradingDefaults::default());
    let chain = pricing.option_chain("NIFTY", 20_000.0, 0).unwrap();

    let atm = &chain.rows[6];
    assert!(atm.call.delta > 0.4 && atm.call.delta < 0.65);
    assert!(atm.put.delta < 0.0);
    assert!(chain.rows.windows(2).all(|w| w[0].call.delta >= w[1].call.delta));
}

#[test]
fn test_option_chain_skips_non_positive_strikes() {
    let pricing = PricingService::new(&TradingDefaults::default());
    let chain = pricing.option_chain("PENNY", 20.0, 0).unwrap();

    // Step is 5, so -10, -5 and 0 are dropped
    assert_eq!(chain.rows.len(), 10);
    assert_eq!(chain.rows[0].strike, 5.0);
    assert!(chain.rows.iter().all(|r| (0.0..=1.0).contains(&r.call.delta)));
    assert_eq!(chain.rows[0].call.delta, 1.0);
}
