use thiserror::Error;

/// Errors raised by ledger, pricing and contest operations.
#[derive(Error, Debug)]
pub enum TradeError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Insufficient funds: need {needed:.2}, have {available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Insufficient holdings of {symbol}: requested {requested}, held {held}")]
    InsufficientHoldings {
        symbol: String,
        requested: u64,
        held: u64,
    },

    #[error("Quote unavailable for {symbol}: {reason}")]
    QuoteUnavailable { symbol: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ledger not found: {0}")]
    LedgerNotFound(String),

    #[error("Contest not found: {0}")]
    ContestNotFound(String),

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Watchlist not found: {0}")]
    WatchlistNotFound(String),

    #[error("Contest {0} is not active")]
    ContestNotActive(String),

    #[error("Contest {0} is not open for joining")]
    ContestNotOpen(String),

    #[error("User {user_id} already joined contest {contest_id}")]
    AlreadyJoined { user_id: String, contest_id: String },

    #[error("Contest {0} is full")]
    ContestFull(String),

    #[error("Ledger {id} changed concurrently (expected version {expected})")]
    StaleLedger { id: String, expected: u64 },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl TradeError {
    /// Whether the error is transient and the caller may fall back or retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TradeError::QuoteUnavailable { .. } | TradeError::StaleLedger { .. }
        )
    }

    /// Whether the error rejected a request before any state changed.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TradeError::Validation(_)
                | TradeError::InsufficientFunds { .. }
                | TradeError::InsufficientHoldings { .. }
                | TradeError::InvalidInput(_)
                | TradeError::ContestNotActive(_)
                | TradeError::ContestNotOpen(_)
                | TradeError::AlreadyJoined { .. }
                | TradeError::ContestFull(_)
        )
    }
}

impl From<rusqlite::Error> for TradeError {
    fn from(e: rusqlite::Error) -> Self {
        TradeError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for TradeError {
    fn from(e: serde_json::Error) -> Self {
        TradeError::Storage(format!("document encoding: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, TradeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_message() {
        let err = TradeError::InsufficientFunds {
            needed: 1500.0,
            available: 1000.0,
        };
        assert_eq!(err.to_string(), "Insufficient funds: need 1500.00, have 1000.00");
        assert!(err.is_rejection());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_quote_unavailable_is_transient() {
        let err = TradeError::QuoteUnavailable {
            symbol: "TCS".to_string(),
            reason: "timed out".to_string(),
        };
        assert!(err.is_transient());
        assert!(err.to_string().contains("TCS"));
    }

    #[test]
    fn test_rusqlite_error_maps_to_storage() {
        let err: TradeError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, TradeError::Storage(_)));
    }
}
