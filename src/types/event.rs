use super::achievement::AchievementAward;
use super::derivative::DerivativePosition;
use super::ledger::Transaction;
use serde::{Deserialize, Serialize};

/// Broadcast after a ledger or contest changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    #[serde(rename_all = "camelCase")]
    TradeExecuted {
        ledger_id: String,
        user_id: String,
        transaction: Transaction,
        balance: f64,
    },
    #[serde(rename_all = "camelCase")]
    DerivativeOpened {
        ledger_id: String,
        position: DerivativePosition,
        balance: f64,
    },
    #[serde(rename_all = "camelCase")]
    DerivativeClosed {
        ledger_id: String,
        position: DerivativePosition,
        balance: f64,
    },
    #[serde(rename_all = "camelCase")]
    AchievementUnlocked { award: AchievementAward },
    #[serde(rename_all = "camelCase")]
    ContestRanked {
        contest_id: String,
        entries: usize,
        skipped: usize,
    },
}
