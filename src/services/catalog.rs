use crate::types::{Achievement, Category, Comparison, Criteria, CriteriaType, Rarity, Tier};

#[allow(clippy::too_many_arguments)]
fn achievement(
    name: &str,
    description: &str,
    icon: &str,
    category: Category,
    tier: Tier,
    criteria: (CriteriaType, f64, Comparison),
    points: u32,
    rarity: Rarity,
) -> Achievement {
    let (kind, value, comparison) = criteria;
    Achievement {
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        category,
        tier,
        criteria: Criteria {
            kind,
            value,
            comparison,
        },
        points,
        rarity,
        is_active: true,
    }
}

/// The achievements seeded into a fresh store.
pub fn default_catalog() -> Vec<Achievement> {
    use CriteriaType::*;

    vec![
        achievement(
            "First Trade",
            "Execute your first trade",
            "🎯",
            Category::Milestone,
            Tier::Bronze,
            (TradesCount, 1.0, Comparison::GreaterEqual),
            10,
            Rarity::Common,
        ),
        achievement(
            "Active Trader",
            "Execute 10 trades",
            "📈",
            Category::Trading,
            Tier::Silver,
            (TradesCount, 10.0, Comparison::GreaterEqual),
            25,
            Rarity::Common,
        ),
        achievement(
            "Day Trader",
            "Execute 50 trades",
            "⚡",
            Category::Trading,
            Tier::Gold,
            (TradesCount, 50.0, Comparison::GreaterEqual),
            50,
            Rarity::Rare,
        ),
        achievement(
            "Profitable Trader",
            "Achieve positive returns",
            "💰",
            Category::Performance,
            Tier::Silver,
            (ReturnsPercent, 0.0, Comparison::GreaterThan),
            20,
            Rarity::Common,
        ),
        achievement(
            "Double Digit Returns",
            "Achieve 10% or higher returns",
            "🚀",
            Category::Performance,
            Tier::Gold,
            (ReturnsPercent, 10.0, Comparison::GreaterEqual),
            50,
            Rarity::Rare,
        ),
        achievement(
            "Master Trader",
            "Achieve 25% or higher returns",
            "👑",
            Category::Performance,
            Tier::Platinum,
            (ReturnsPercent, 25.0, Comparison::GreaterEqual),
            100,
            Rarity::Legendary,
        ),
        achievement(
            "Consistent Winner",
            "Maintain a 60% or higher win rate",
            "🎖️",
            Category::Performance,
            Tier::Gold,
            (WinRate, 60.0, Comparison::GreaterEqual),
            75,
            Rarity::Epic,
        ),
        achievement(
            "Podium Finish",
            "Finish in the top 3 of a contest",
            "🥉",
            Category::Milestone,
            Tier::Gold,
            (ContestRank, 3.0, Comparison::LessEqual),
            100,
            Rarity::Epic,
        ),
        achievement(
            "Champion",
            "Win a contest",
            "🏆",
            Category::Milestone,
            Tier::Platinum,
            (ContestRank, 1.0, Comparison::Equals),
            200,
            Rarity::Legendary,
        ),
        achievement(
            "Options Enthusiast",
            "Trade your first option",
            "📊",
            Category::Trading,
            Tier::Silver,
            (OptionsTrades, 1.0, Comparison::GreaterEqual),
            30,
            Rarity::Common,
        ),
        achievement(
            "Risk Manager",
            "Keep maximum drawdown at or below 5%",
            "🛡️",
            Category::Risk,
            Tier::Gold,
            (Drawdown, 5.0, Comparison::LessEqual),
            60,
            Rarity::Rare,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_unique() {
        let catalog = default_catalog();
        let names: HashSet<_> = catalog.iter().map(|a| a.name.as_str()).collect();

        assert_eq!(catalog.len(), 11);
        assert_eq!(names.len(), catalog.len());
    }

    #[test]
    fn test_catalog_all_active() {
        assert!(default_catalog().iter().all(|a| a.is_active));
    }

    #[test]
    fn test_catalog_serializes_snake_case() {
        let catalog = default_catalog();
        let champion = catalog.iter().find(|a| a.name == "Champion").unwrap();
        let json = serde_json::to_value(champion).unwrap();

        assert_eq!(json["criteria"]["type"], "contest_rank");
        assert_eq!(json["criteria"]["comparison"], "equals");
        assert_eq!(json["rarity"], "legendary");
        assert_eq!(json["isActive"], true);
    }
}
