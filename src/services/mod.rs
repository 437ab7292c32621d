pub mod achievements;
pub mod catalog;
pub mod derivatives;
pub mod ledger;
pub mod metrics;
pub mod pricing;
pub mod quotes;
pub mod ranking;
pub mod sqlite_store;
pub mod trading;
pub mod watchlist;

pub use achievements::{evaluate_achievements, AwardRegistry};
pub use catalog::default_catalog;
pub use derivatives::{close_derivative, mark_derivative, open_derivative};
pub use ledger::{execute_trade, Execution};
pub use metrics::{primary_strategy, recompute_metrics, summarize};
pub use pricing::{
    black_scholes_price, compute_greeks, future_payoff, option_payoff, PayoffCurve, PricingService,
};
pub use quotes::{CachedQuoteGateway, MemoryQuoteGateway, QuoteFetcher, QuoteGateway};
pub use ranking::{leaderboard_entry, rank_entries};
pub use sqlite_store::SqliteStore;
pub use trading::TradingService;
pub use watchlist::evaluate_alerts;
