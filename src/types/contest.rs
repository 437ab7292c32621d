//! Contest Types
//!
//! Time-boxed competitions whose entries are ranked by return.

use serde::{Deserialize, Serialize};

/// Contest lifecycle state, derived from its dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Upcoming,
    Active,
    Completed,
}

impl ContestStatus {
    /// Status at `now` for a contest spanning `[start, end]` (ms).
    pub fn at(start: i64, end: i64, now: i64) -> Self {
        if now < start {
            ContestStatus::Upcoming
        } else if now <= end {
            ContestStatus::Active
        } else {
            ContestStatus::Completed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContestStatus::Upcoming => "upcoming",
            ContestStatus::Active => "active",
            ContestStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestType {
    Weekly,
    Monthly,
    Custom,
}

impl Default for ContestType {
    fn default() -> Self {
        ContestType::Custom
    }
}

/// A contest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Start time (ms)
    pub start_date: i64,
    /// End time (ms)
    pub end_date: i64,
    pub status: ContestStatus,
    /// Starting balance of every entry
    pub initial_balance: f64,
    #[serde(default)]
    pub prize_pool: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub contest_type: ContestType,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub participant_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: i64,
}

impl Contest {
    /// Re-derive the status from the dates. Returns true if it changed.
    pub fn update_status(&mut self, now: i64) -> bool {
        let status = ContestStatus::at(self.start_date, self.end_date, now);
        let changed = status != self.status;
        self.status = status;
        changed
    }

    pub fn is_full(&self) -> bool {
        self.max_participants
            .map(|max| self.participant_count >= max)
            .unwrap_or(false)
    }

    /// Whether new entries are accepted.
    pub fn is_open(&self) -> bool {
        matches!(self.status, ContestStatus::Upcoming | ContestStatus::Active)
    }
}

/// Parameters for creating a contest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_date: i64,
    pub end_date: i64,
    #[serde(default)]
    pub initial_balance: Option<f64>,
    #[serde(default)]
    pub prize_pool: f64,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub contest_type: ContestType,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Rules applied when a contest is created without any.
pub fn default_rules() -> Vec<String> {
    vec![
        "Trade only during market hours".to_string(),
        "No short selling of equities".to_string(),
        "Ranking is by total return percentage".to_string(),
    ]
}

// =============================================================================
// Leaderboard
// =============================================================================

/// A ranked contest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub ledger_id: String,
    pub user_id: String,
    pub total_value: f64,
    pub total_returns: f64,
    pub total_returns_percent: f64,
    pub total_trades: u64,
    pub win_rate: f64,
    /// Number of open equity positions
    pub positions: usize,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

/// One page of a stored leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    pub entries: Vec<LeaderboardEntry>,
    pub pagination: Pagination,
}
