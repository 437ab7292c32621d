//! Quote Gateway
//!
//! Live prices come from an unreliable collaborator. Every call is bounded by
//! a timeout, and batch snapshots degrade to the last price seen for a symbol
//! instead of failing.

use crate::error::{Result, TradeError};
use crate::types::{Quote, QuoteSnapshot};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Source of live quotes.
#[async_trait]
pub trait QuoteGateway: Send + Sync {
    async fn get_quote(&self, symbol: &str) -> Result<Quote>;
}

// =============================================================================
// In-memory gateway
// =============================================================================

/// Gateway backed by a price table. Used in tests and offline runs.
#[derive(Debug, Default)]
pub struct MemoryQuoteGateway {
    quotes: DashMap<String, Quote>,
    delays: DashMap<String, Duration>,
}

impl MemoryQuoteGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(prices: &[(&str, f64)]) -> Self {
        let gateway = Self::new();
        for (symbol, price) in prices {
            gateway.set_price(symbol, *price);
        }
        gateway
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.quotes.insert(symbol.to_string(), Quote::new(symbol, price));
    }

    pub fn set_quote(&self, quote: Quote) {
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    pub fn remove(&self, symbol: &str) {
        self.quotes.remove(symbol);
    }

    /// Delay every answer for `symbol`.
    pub fn set_delay(&self, symbol: &str, delay: Duration) {
        self.delays.insert(symbol.to_string(), delay);
    }
}

#[async_trait]
impl QuoteGateway for MemoryQuoteGateway {
    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let delay = self.delays.get(symbol).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.quotes
            .get(symbol)
            .map(|q| q.clone())
            .ok_or_else(|| TradeError::QuoteUnavailable {
                symbol: symbol.to_string(),
                reason: "no price listed".to_string(),
            })
    }
}

// =============================================================================
// TTL cache
// =============================================================================

struct CachedQuote {
    quote: Quote,
    expires_at: Instant,
}

/// Wraps a gateway and reuses answers for `ttl`.
pub struct CachedQuoteGateway<G> {
    inner: G,
    entries: DashMap<String, CachedQuote>,
    ttl: Duration,
}

impl<G: QuoteGateway> CachedQuoteGateway<G> {
    pub fn new(inner: G, ttl: Duration) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            ttl,
        }
    }

    fn cached(&self, symbol: &str) -> Option<Quote> {
        let entry = self.entries.get(symbol)?;
        if entry.expires_at > Instant::now() {
            Some(entry.quote.clone())
        } else {
            drop(entry);
            self.entries.remove(symbol);
            None
        }
    }

    /// Drop expired entries.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl<G: QuoteGateway> QuoteGateway for CachedQuoteGateway<G> {
    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        if let Some(quote) = self.cached(symbol) {
            return Ok(quote);
        }
        let quote = self.inner.get_quote(symbol).await?;
        self.entries.insert(
            symbol.to_string(),
            CachedQuote {
                quote: quote.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(quote)
    }
}

// =============================================================================
// Bounded fetching
// =============================================================================

/// Timeout-bounded access to a gateway, remembering the last good price.
pub struct QuoteFetcher {
    gateway: Arc<dyn QuoteGateway>,
    timeout: Duration,
    last_known: DashMap<String, f64>,
}

impl QuoteFetcher {
    pub fn new(gateway: Arc<dyn QuoteGateway>, timeout: Duration) -> Self {
        Self {
            gateway,
            timeout,
            last_known: DashMap::new(),
        }
    }

    /// Fetch one quote. A timeout or a non-positive price is `QuoteUnavailable`.
    pub async fn quote(&self, symbol: &str) -> Result<Quote> {
        let quote = match tokio::time::timeout(self.timeout, self.gateway.get_quote(symbol)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(TradeError::QuoteUnavailable {
                    symbol: symbol.to_string(),
                    reason: format!("timed out after {}ms", self.timeout.as_millis()),
                })
            }
        };

        if !quote.price.is_finite() || quote.price <= 0.0 {
            return Err(TradeError::QuoteUnavailable {
                symbol: symbol.to_string(),
                reason: format!("invalid price {}", quote.price),
            });
        }

        self.last_known.insert(symbol.to_string(), quote.price);
        Ok(quote)
    }

    /// Fetch all symbols concurrently.
    ///
    /// Failed symbols fall back to their last known price, or are left out so
    /// that positions keep their previous mark.
    pub async fn snapshot<I, S>(&self, symbols: I) -> QuoteSnapshot
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: HashSet<String> = symbols
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        let results = join_all(unique.iter().map(|symbol| async move {
            (symbol.clone(), self.quote(symbol).await)
        }))
        .await;

        let mut snapshot = QuoteSnapshot::new();
        for (symbol, result) in results {
            match result {
                Ok(quote) => {
                    snapshot.insert(symbol, quote.price);
                }
                Err(e) => {
                    let fallback = self.last_known.get(&symbol).map(|p| *p);
                    warn!("Quote for {} unavailable ({}), fallback {:?}", symbol, e, fallback);
                    if let Some(price) = fallback {
                        snapshot.insert(symbol, price);
                    }
                }
            }
        }

        debug!("Quote snapshot with {} of {} symbols", snapshot.len(), unique.len());
        snapshot
    }

    pub fn last_known(&self, symbol: &str) -> Option<f64> {
        self.last_known.get(symbol).map(|p| *p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGateway {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteGateway for CountingGateway {
        async fn get_quote(&self, symbol: &str) -> Result<Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Quote::new(symbol, 42.0))
        }
    }

    #[tokio::test]
    async fn test_memory_gateway() {
        let gateway = MemoryQuoteGateway::with_prices(&[("INFY", 1500.0)]);

        let quote = tokio_test::assert_ok!(gateway.get_quote("INFY").await);
        assert_eq!(quote.price, 1500.0);
        let err = tokio_test::assert_err!(gateway.get_quote("TCS").await);
        assert!(matches!(err, TradeError::QuoteUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_cache_reuses_quotes() {
        let gateway = CachedQuoteGateway::new(
            CountingGateway {
                calls: AtomicUsize::new(0),
            },
            Duration::from_secs(60),
        );

        gateway.get_quote("INFY").await.unwrap();
        gateway.get_quote("INFY").await.unwrap();
        gateway.get_quote("TCS").await.unwrap();

        assert_eq!(gateway.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.len(), 2);
    }

    #[tokio::test]
    async fn test_cache_expires() {
        let gateway = CachedQuoteGateway::new(
            CountingGateway {
                calls: AtomicUsize::new(0),
            },
            Duration::from_millis(0),
        );

        gateway.get_quote("INFY").await.unwrap();
        gateway.get_quote("INFY").await.unwrap();

        assert_eq!(gateway.inner.calls.load(Ordering::SeqCst), 2);
        gateway.cleanup();
        assert!(gateway.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let gateway = MemoryQuoteGateway::with_prices(&[("SLOW", 10.0)]);
        gateway.set_delay("SLOW", Duration::from_millis(200));
        let fetcher = QuoteFetcher::new(Arc::new(gateway), Duration::from_millis(20));

        let err = fetcher.quote("SLOW").await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_price() {
        let fetcher = QuoteFetcher::new(
            Arc::new(MemoryQuoteGateway::with_prices(&[("ZERO", 0.0)])),
            Duration::from_millis(100),
        );
        assert!(fetcher.quote("ZERO").await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_falls_back_to_last_known() {
        let gateway = Arc::new(MemoryQuoteGateway::with_prices(&[
            ("INFY", 1500.0),
            ("TCS", 3500.0),
        ]));
        let fetcher = QuoteFetcher::new(gateway.clone(), Duration::from_millis(50));

        let first = fetcher.snapshot(["INFY", "TCS"]).await;
        assert_eq!(first.len(), 2);

        gateway.set_price("INFY", 1550.0);
        gateway.set_delay("TCS", Duration::from_millis(500));
        let second = fetcher.snapshot(["INFY", "TCS", "NEW"]).await;

        assert_eq!(second.get("INFY"), Some(&1550.0));
        assert_eq!(second.get("TCS"), Some(&3500.0));
        assert_eq!(second.get("NEW"), None);
    }
}
