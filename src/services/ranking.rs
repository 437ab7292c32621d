//! Contest ranking.

use crate::types::{Ledger, LeaderboardEntry};
use std::cmp::Ordering;

/// Rank entries by `totalReturnsPercent`, best first.
///
/// Sort is stable, so tied entries keep their input order. Ranks start at 1.
pub fn rank_entries(entries: &mut [Ledger]) {
    entries.sort_by(|a, b| {
        b.metrics
            .total_returns_percent
            .partial_cmp(&a.metrics.total_returns_percent)
            .unwrap_or(Ordering::Equal)
    });

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = Some(i as u32 + 1);
    }
}

/// Leaderboard row for a ranked ledger.
pub fn leaderboard_entry(ledger: &Ledger) -> LeaderboardEntry {
    LeaderboardEntry {
        rank: ledger.rank.unwrap_or(0),
        ledger_id: ledger.id.clone(),
        user_id: ledger.user_id.clone(),
        total_value: ledger.metrics.total_value,
        total_returns: ledger.metrics.total_returns,
        total_returns_percent: ledger.metrics.total_returns_percent,
        total_trades: ledger.metrics.total_trades,
        win_rate: ledger.metrics.win_rate,
        positions: ledger.positions.len(),
        achievements: ledger.achievements_earned.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user: &str, returns_percent: f64) -> Ledger {
        let mut ledger = Ledger::contest_entry(user.to_string(), "c1".to_string(), 100_000.0);
        ledger.metrics.total_returns_percent = returns_percent;
        ledger
    }

    #[test]
    fn test_stable_tie_break() {
        let mut entries = vec![entry("A", 5.0), entry("B", 5.0), entry("C", 10.0)];
        rank_entries(&mut entries);

        let order: Vec<_> = entries
            .iter()
            .map(|e| (e.user_id.as_str(), e.rank))
            .collect();
        assert_eq!(order, vec![("C", Some(1)), ("A", Some(2)), ("B", Some(3))]);
    }

    #[test]
    fn test_negative_returns_rank_last() {
        let mut entries = vec![entry("A", -3.0), entry("B", 0.0), entry("C", 1.5)];
        rank_entries(&mut entries);

        assert_eq!(entries[0].user_id, "C");
        assert_eq!(entries[2].user_id, "A");
        assert_eq!(entries[2].rank, Some(3));
    }

    #[test]
    fn test_empty() {
        let mut entries: Vec<Ledger> = Vec::new();
        rank_entries(&mut entries);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_leaderboard_entry() {
        let mut entries = vec![entry("A", 4.0)];
        rank_entries(&mut entries);
        let row = leaderboard_entry(&entries[0]);

        assert_eq!(row.rank, 1);
        assert_eq!(row.user_id, "A");
        assert_eq!(row.total_returns_percent, 4.0);
    }
}
