//! Watchlists and price alert rules.

use super::quote::Quote;
use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// When an alert fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertCondition {
    /// Price strictly above the threshold
    Above,
    /// Price strictly below the threshold
    Below,
    /// Day change at least `threshold` percent
    PercentUp,
    /// Day change at most `-|threshold|` percent
    PercentDown,
}

impl AlertCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCondition::Above => "above",
            AlertCondition::Below => "below",
            AlertCondition::PercentUp => "percentUp",
            AlertCondition::PercentDown => "percentDown",
        }
    }
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A price alert on one symbol. Unique per (symbol, condition) in a watchlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub symbol: String,
    pub condition: AlertCondition,
    pub threshold: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered_at: Option<i64>,
}

impl AlertRule {
    pub fn new(symbol: &str, condition: AlertCondition, threshold: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            condition,
            threshold,
            enabled: true,
            last_triggered_at: None,
        }
    }

    /// Whether `quote` meets the rule. Percent rules need a positive previous close.
    pub fn is_triggered(&self, quote: &Quote) -> bool {
        match self.condition {
            AlertCondition::Above => quote.price > self.threshold,
            AlertCondition::Below => quote.price < self.threshold,
            AlertCondition::PercentUp => quote
                .change_percent()
                .map(|pct| pct >= self.threshold)
                .unwrap_or(false),
            AlertCondition::PercentDown => quote
                .change_percent()
                .map(|pct| pct <= -self.threshold.abs())
                .unwrap_or(false),
        }
    }
}

/// A named list of symbols with alert rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watchlist {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub alerts: Vec<AlertRule>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Watchlist {
    pub fn new(user_id: String, name: String, symbols: Vec<String>, now: i64) -> Self {
        let mut watchlist = Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            name,
            symbols: Vec::new(),
            alerts: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        watchlist.set_symbols(symbols);
        watchlist
    }

    /// Replace the symbol list, dropping blanks and duplicates.
    pub fn set_symbols(&mut self, symbols: Vec<String>) {
        self.symbols.clear();
        for symbol in symbols {
            self.add_symbol(&symbol);
        }
    }

    /// Returns false if the symbol was already listed.
    pub fn add_symbol(&mut self, symbol: &str) -> bool {
        let symbol = symbol.trim();
        if symbol.is_empty() || self.symbols.iter().any(|s| s == symbol) {
            return false;
        }
        self.symbols.push(symbol.to_string());
        true
    }

    pub fn remove_symbol(&mut self, symbol: &str) -> bool {
        let before = self.symbols.len();
        self.symbols.retain(|s| s != symbol);
        self.symbols.len() != before
    }

    /// Insert a rule, or update the threshold and flag of the existing rule
    /// for the same symbol and condition.
    pub fn upsert_alert(&mut self, rule: AlertRule) {
        match self
            .alerts
            .iter_mut()
            .find(|a| a.symbol == rule.symbol && a.condition == rule.condition)
        {
            Some(existing) => {
                existing.threshold = rule.threshold;
                existing.enabled = rule.enabled;
            }
            None => self.alerts.push(rule),
        }
    }
}

/// Outcome of checking one alert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlertResult {
    Checked {
        symbol: String,
        condition: AlertCondition,
        threshold: f64,
        price: f64,
        triggered: bool,
    },
    Failed {
        symbol: String,
        condition: AlertCondition,
        error: String,
    },
}

impl AlertResult {
    pub fn symbol(&self) -> &str {
        match self {
            AlertResult::Checked { symbol, .. } | AlertResult::Failed { symbol, .. } => symbol,
        }
    }

    pub fn triggered(&self) -> bool {
        matches!(self, AlertResult::Checked { triggered: true, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertReport {
    pub watchlist_id: String,
    pub results: Vec<AlertResult>,
}
