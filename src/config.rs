use std::env;
use std::time::Duration;

/// Quote gateway configuration.
#[derive(Debug, Clone)]
pub struct QuoteConfig {
    /// Base URL of the chart endpoint.
    pub base_url: String,
    /// Exchange suffix appended to bare symbols (e.g. ".NS").
    pub symbol_suffix: String,
    /// Upper bound for a single quote request.
    pub timeout_ms: u64,
    /// How long a fetched quote is reused.
    pub cache_ttl_ms: u64,
}

impl QuoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            symbol_suffix: ".NS".to_string(),
            timeout_ms: 3_000,
            cache_ttl_ms: 5_000,
        }
    }
}

/// Contract and account defaults.
#[derive(Debug, Clone)]
pub struct TradingDefaults {
    /// Annual risk-free rate used for Greeks.
    pub risk_free_rate: f64,
    /// Contract multiplier when an order does not specify one.
    pub lot_size: u64,
    /// Futures margin as a percentage of notional.
    pub margin_percent: f64,
    /// Starting balance for new contests.
    pub contest_balance: f64,
    /// Starting balance for a user's standing portfolio.
    pub standing_balance: f64,
}

impl Default for TradingDefaults {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.06,
            lot_size: 25,
            margin_percent: 15.0,
            contest_balance: 100_000.0,
            standing_balance: 100_000.0,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file.
    pub database_path: String,
    /// Seconds between contest revaluation passes.
    pub revaluation_interval_secs: u64,
    /// Insert the default achievement catalog on startup.
    pub seed_catalog: bool,
    /// Quote gateway configuration.
    pub quotes: QuoteConfig,
    /// Contract and account defaults.
    pub trading: TradingDefaults,
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn parse_flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| v == "true" || v == "1")
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let quote_defaults = QuoteConfig::default();
        let trading_defaults = TradingDefaults::default();

        Self {
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "tradearena.db".to_string()),
            revaluation_interval_secs: parse_env("REVALUATION_INTERVAL_SECS").unwrap_or(60),
            seed_catalog: parse_flag("SEED_CATALOG").unwrap_or(true),
            quotes: QuoteConfig {
                base_url: env::var("QUOTE_BASE_URL").unwrap_or(quote_defaults.base_url),
                symbol_suffix: env::var("QUOTE_SYMBOL_SUFFIX")
                    .unwrap_or(quote_defaults.symbol_suffix),
                timeout_ms: parse_env("QUOTE_TIMEOUT_MS").unwrap_or(quote_defaults.timeout_ms),
                cache_ttl_ms: parse_env("QUOTE_CACHE_TTL_MS")
                    .unwrap_or(quote_defaults.cache_ttl_ms),
            },
            trading: TradingDefaults {
                risk_free_rate: parse_env("RISK_FREE_RATE")
                    .unwrap_or(trading_defaults.risk_free_rate),
                lot_size: parse_env("DEFAULT_LOT_SIZE").unwrap_or(trading_defaults.lot_size),
                margin_percent: parse_env("DEFAULT_MARGIN_PERCENT")
                    .unwrap_or(trading_defaults.margin_percent),
                contest_balance: parse_env("DEFAULT_CONTEST_BALANCE")
                    .unwrap_or(trading_defaults.contest_balance),
                standing_balance: parse_env("STANDING_BALANCE")
                    .unwrap_or(trading_defaults.standing_balance),
            },
        }
    }

    /// Interval between contest revaluation passes.
    pub fn revaluation_interval(&self) -> Duration {
        Duration::from_secs(self.revaluation_interval_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "tradearena.db".to_string(),
            revaluation_interval_secs: 60,
            seed_catalog: true,
            quotes: QuoteConfig::default(),
            trading: TradingDefaults::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_trading_values() {
        let defaults = TradingDefaults::default();

        assert_eq!(defaults.risk_free_rate, 0.06);
        assert_eq!(defaults.lot_size, 25);
        assert_eq!(defaults.margin_percent, 15.0);
        assert_eq!(defaults.contest_balance, 100_000.0);
    }

    #[test]
    fn test_quote_durations() {
        let quotes = QuoteConfig {
            timeout_ms: 250,
            cache_ttl_ms: 1_500,
            ..QuoteConfig::default()
        };

        assert_eq!(quotes.timeout(), Duration::from_millis(250));
        assert_eq!(quotes.cache_ttl(), Duration::from_millis(1_500));
    }

    #[test]
    fn test_revaluation_interval_never_zero() {
        let config = Config {
            revaluation_interval_secs: 0,
            ..Config::default()
        };

        assert_eq!(config.revaluation_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        let cloned = config.clone();

        assert_eq!(cloned.database_path, config.database_path);
        assert_eq!(cloned.quotes.symbol_suffix, ".NS");
    }
}
