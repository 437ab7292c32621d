//! Watchlist alert evaluation.

use crate::services::quotes::QuoteFetcher;
use crate::types::{AlertReport, AlertResult, Quote, Watchlist};
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Check every enabled alert of `watchlist` against live quotes.
///
/// Each symbol is fetched once. A failed quote is reported for the rules on
/// that symbol and does not stop the rest. Triggered rules get
/// `lastTriggeredAt = now`.
pub async fn evaluate_alerts(
    watchlist: &mut Watchlist,
    quotes: &QuoteFetcher,
    now: i64,
) -> AlertReport {
    let symbols: HashSet<String> = watchlist
        .alerts
        .iter()
        .filter(|a| a.enabled)
        .map(|a| a.symbol.clone())
        .collect();

    let fetched: HashMap<String, Result<Quote, String>> =
        join_all(symbols.into_iter().map(|symbol| async move {
            let quote = quotes.quote(&symbol).await.map_err(|e| e.to_string());
            (symbol, quote)
        }))
        .await
        .into_iter()
        .collect();

    let mut results = Vec::new();
    for rule in watchlist.alerts.iter_mut().filter(|a| a.enabled) {
        match fetched.get(&rule.symbol) {
            Some(Ok(quote)) => {
                let triggered = rule.is_triggered(quote);
                if triggered {
                    rule.last_triggered_at = Some(now);
                    debug!(
                        "Alert {} {} {} fired at {:.2}",
                        rule.symbol, rule.condition, rule.threshold, quote.price
                    );
                }
                results.push(AlertResult::Checked {
                    symbol: rule.symbol.clone(),
                    condition: rule.condition,
                    threshold: rule.threshold,
                    price: quote.price,
                    triggered,
                });
            }
            Some(Err(error)) => {
                warn!("Skipping alert on {}: {}", rule.symbol, error);
                results.push(AlertResult::Failed {
                    symbol: rule.symbol.clone(),
                    condition: rule.condition,
                    error: error.clone(),
                });
            }
            None => {}
        }
    }

    if results.iter().any(AlertResult::triggered) {
        watchlist.updated_at = now;
    }

    AlertReport {
        watchlist_id: watchlist.id.clone(),
        results,
    }
}
