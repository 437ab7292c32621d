//! Achievement Engine
//!
//! Evaluates catalog criteria against a ledger's metrics and hands out each
//! achievement at most once per user, across all contests.

use crate::types::{
    AchievementAward, Achievement, AwardSnapshot, CriteriaType, Ledger,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

/// Claimed `(user, achievement)` keys.
///
/// Claiming goes through the map's entry API, so two concurrent evaluations
/// of the same key cannot both succeed.
#[derive(Debug, Default)]
pub struct AwardRegistry {
    claimed: DashMap<(String, String), i64>,
}

impl AwardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with awards already granted.
    pub fn from_awards<'a>(awards: impl IntoIterator<Item = &'a AchievementAward>) -> Self {
        let registry = Self::new();
        for award in awards {
            registry
                .claimed
                .insert((award.user_id.clone(), award.achievement_name.clone()), award.earned_at);
        }
        registry
    }

    /// Claim a key. Returns false if it was already claimed.
    pub fn claim(&self, user_id: &str, achievement: &str, now: i64) -> bool {
        match self
            .claimed
            .entry((user_id.to_string(), achievement.to_string()))
        {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Undo a claim whose award could not be recorded.
    pub fn release(&self, user_id: &str, achievement: &str) {
        self.claimed
            .remove(&(user_id.to_string(), achievement.to_string()));
    }

    pub fn contains(&self, user_id: &str, achievement: &str) -> bool {
        self.claimed
            .contains_key(&(user_id.to_string(), achievement.to_string()))
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

/// Value of the metric a criterion refers to, if this ledger has one.
fn metric_value(ledger: &Ledger, kind: CriteriaType) -> Option<f64> {
    match kind {
        CriteriaType::TradesCount => Some(ledger.metrics.total_trades as f64),
        CriteriaType::WinRate => Some(ledger.metrics.win_rate),
        CriteriaType::ReturnsPercent => Some(ledger.metrics.total_returns_percent),
        CriteriaType::ContestRank => ledger.rank.map(f64::from),
        CriteriaType::Drawdown
        | CriteriaType::SharpeRatio
        | CriteriaType::OptionsTrades
        | CriteriaType::Custom => None,
    }
}

/// Whether the ledger currently meets an achievement's criterion.
pub fn qualifies(ledger: &Ledger, achievement: &Achievement) -> bool {
    let criteria = &achievement.criteria;
    metric_value(ledger, criteria.kind)
        .map(|value| criteria.comparison.matches(value, criteria.value))
        .unwrap_or(false)
}

/// Award every active achievement the ledger newly qualifies for.
///
/// Only keys successfully claimed in `registry` produce an award; the
/// achievement name is appended to `achievementsEarned` for each.
pub fn evaluate_achievements(
    ledger: &mut Ledger,
    catalog: &[Achievement],
    registry: &AwardRegistry,
    now: i64,
) -> Vec<AchievementAward> {
    let snapshot = AwardSnapshot {
        returns_percent: ledger.metrics.total_returns_percent,
        rank: ledger.rank,
        win_rate: ledger.metrics.win_rate,
        total_trades: ledger.metrics.total_trades,
    };

    let mut awards = Vec::new();
    for achievement in catalog.iter().filter(|a| a.is_active) {
        if registry.contains(&ledger.user_id, &achievement.name) || !qualifies(ledger, achievement) {
            continue;
        }
        if !registry.claim(&ledger.user_id, &achievement.name, now) {
            continue;
        }

        info!("User {} unlocked {}", ledger.user_id, achievement.name);
        if !ledger.achievements_earned.contains(&achievement.name) {
            ledger.achievements_earned.push(achievement.name.clone());
        }
        awards.push(AchievementAward {
            user_id: ledger.user_id.clone(),
            achievement_name: achievement.name.clone(),
            contest_id: ledger.contest_id().map(str::to_string),
            earned_at: now,
            snapshot,
        });
    }
    awards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::default_catalog;
    use std::sync::Arc;

    fn entry(trades: u64, returns_percent: f64, rank: Option<u32>) -> Ledger {
        let mut ledger = Ledger::contest_entry("user-1".to_string(), "c1".to_string(), 100_000.0);
        ledger.metrics.total_trades = trades;
        ledger.metrics.total_returns_percent = returns_percent;
        ledger.rank = rank;
        ledger
    }

    fn names(awards: &[AchievementAward]) -> Vec<&str> {
        awards.iter().map(|a| a.achievement_name.as_str()).collect()
    }

    #[test]
    fn test_first_trade_awarded_once() {
        let catalog = default_catalog();
        let registry = AwardRegistry::new();
        let mut ledger = entry(1, 0.0, None);

        let first = evaluate_achievements(&mut ledger, &catalog, &registry, 10);
        let second = evaluate_achievements(&mut ledger, &catalog, &registry, 11);

        assert_eq!(names(&first), vec!["First Trade"]);
        assert!(second.is_empty());
        assert_eq!(ledger.achievements_earned, vec!["First Trade".to_string()]);
        assert_eq!(first[0].contest_id.as_deref(), Some("c1"));
        assert_eq!(first[0].snapshot.total_trades, 1);
    }

    #[test]
    fn test_award_is_global_across_contests() {
        let catalog = default_catalog();
        let registry = AwardRegistry::new();
        let mut contest_a = entry(1, 0.0, None);
        let mut contest_b =
            Ledger::contest_entry("user-1".to_string(), "c2".to_string(), 100_000.0);
        contest_b.metrics.total_trades = 3;

        assert_eq!(evaluate_achievements(&mut contest_a, &catalog, &registry, 0).len(), 1);
        assert!(evaluate_achievements(&mut contest_b, &catalog, &registry, 0).is_empty());
        assert!(contest_b.achievements_earned.is_empty());
    }

    #[test]
    fn test_rank_criteria() {
        let catalog = default_catalog();
        let registry = AwardRegistry::new();

        let mut unranked = entry(0, 0.0, None);
        assert!(evaluate_achievements(&mut unranked, &catalog, &registry, 0).is_empty());

        let mut winner = entry(0, 0.0, Some(1));
        let awards = evaluate_achievements(&mut winner, &catalog, &registry, 0);
        assert_eq!(names(&awards), vec!["Podium Finish", "Champion"]);
        assert_eq!(awards[1].snapshot.rank, Some(1));
    }

    #[test]
    fn test_returns_thresholds() {
        let catalog = default_catalog();
        let registry = AwardRegistry::new();
        let mut ledger = entry(0, 12.0, None);

        let awards = evaluate_achievements(&mut ledger, &catalog, &registry, 0);
        assert_eq!(names(&awards), vec!["Profitable Trader", "Double Digit Returns"]);
    }

    #[test]
    fn test_unevaluable_and_inactive_never_match() {
        let mut catalog = default_catalog();
        for achievement in catalog.iter_mut() {
            if achievement.name == "First Trade" {
                achievement.is_active = false;
            }
        }
        let registry = AwardRegistry::new();
        // Zero drawdown would satisfy Risk Manager if it were evaluable
        let mut ledger = entry(1, 0.0, None);

        let awards = evaluate_achievements(&mut ledger, &catalog, &registry, 0);
        assert!(awards.is_empty());
    }

    #[test]
    fn test_preloaded_registry_blocks_award() {
        let catalog = default_catalog();
        let existing = AchievementAward {
            user_id: "user-1".to_string(),
            achievement_name: "First Trade".to_string(),
            contest_id: None,
            earned_at: 0,
            snapshot: AwardSnapshot {
                returns_percent: 0.0,
                rank: None,
                win_rate: 0.0,
                total_trades: 1,
            },
        };
        let registry = AwardRegistry::from_awards([&existing]);
        let mut ledger = entry(1, 0.0, None);

        assert!(evaluate_achievements(&mut ledger, &catalog, &registry, 0).is_empty());
    }

    #[test]
    fn test_claim_and_release() {
        let registry = AwardRegistry::new();
        assert!(registry.claim("u", "First Trade", 0));
        assert!(!registry.claim("u", "First Trade", 1));
        registry.release("u", "First Trade");
        assert!(registry.claim("u", "First Trade", 2));
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let registry = Arc::new(AwardRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.claim("u", "Champion", i))
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
