//! Achievement catalog and award types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Trading,
    Performance,
    Risk,
    Milestone,
    Social,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Metric an achievement criterion is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaType {
    TradesCount,
    WinRate,
    ReturnsPercent,
    ContestRank,
    Drawdown,
    SharpeRatio,
    OptionsTrades,
    Custom,
}

impl CriteriaType {
    /// Whether a ledger metric exists for this criterion.
    pub fn is_evaluable(&self) -> bool {
        matches!(
            self,
            CriteriaType::TradesCount
                | CriteriaType::WinRate
                | CriteriaType::ReturnsPercent
                | CriteriaType::ContestRank
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    GreaterThan,
    LessThan,
    Equals,
    GreaterEqual,
    LessEqual,
}

impl Comparison {
    pub fn matches(&self, actual: f64, target: f64) -> bool {
        match self {
            Comparison::GreaterThan => actual > target,
            Comparison::LessThan => actual < target,
            Comparison::Equals => actual == target,
            Comparison::GreaterEqual => actual >= target,
            Comparison::LessEqual => actual <= target,
        }
    }
}

impl Default for Comparison {
    fn default() -> Self {
        Comparison::GreaterEqual
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(rename = "type")]
    pub kind: CriteriaType,
    pub value: f64,
    #[serde(default)]
    pub comparison: Comparison,
}

/// A catalog achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    /// Unique name
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: Category,
    pub tier: Tier,
    pub criteria: Criteria,
    pub points: u32,
    pub rarity: Rarity,
    pub is_active: bool,
}

/// Metrics captured when an achievement was unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardSnapshot {
    pub returns_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    pub win_rate: f64,
    pub total_trades: u64,
}

/// An unlocked achievement. At most one per (user, achievement).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementAward {
    pub user_id: String,
    pub achievement_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<String>,
    pub earned_at: i64,
    pub snapshot: AwardSnapshot,
}
