//! Contest lifecycle, ranking passes and awards through `TradingService`.

use std::sync::Arc;
use std::time::Duration;
use tradearena::config::Config;
use tradearena::services::{MemoryQuoteGateway, SqliteStore, TradingService};
use tradearena::types::*;
use tradearena::TradeError;

const HOUR_MS: i64 = 3_600_000;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.quotes.timeout_ms = 50;
    config
}

fn create_test_service() -> (TradingService, Arc<SqliteStore>, Arc<MemoryQuoteGateway>) {
    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let gateway = Arc::new(MemoryQuoteGateway::new());
    let service = TradingService::new(store.clone(), gateway.clone(), &test_config()).unwrap();
    service.seed_catalog().unwrap();
    (service, store, gateway)
}

fn contest(name: &str, start: i64, end: i64) -> NewContest {
    NewContest {
        name: name.to_string(),
        start_date: start,
        end_date: end,
        ..Default::default()
    }
}

fn active_contest(service: &TradingService) -> Contest {
    let now = now_ms();
    service
        .create_contest(contest("Weekly Sprint", now - HOUR_MS, now + 24 * HOUR_MS))
        .unwrap()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_create_contest_defaults() {
    let (service, _, _) = create_test_service();
    let created = active_contest(&service);

    assert_eq!(created.status, ContestStatus::Active);
    assert_eq!(created.initial_balance, 100_000.0);
    assert!(!created.rules.is_empty());
    assert_eq!(service.active_contests().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_contest_validation() {
    let (service, _, _) = create_test_service();
    let now = now_ms();

    let backwards = service.create_contest(contest("Backwards", now, now - 1));
    assert!(matches!(backwards, Err(TradeError::Validation(_))));

    let broke = service.create_contest(NewContest {
        initial_balance: Some(0.0),
        ..contest("Broke", now, now + HOUR_MS)
    });
    assert!(matches!(broke, Err(TradeError::Validation(_))));
    assert!(service.list_contests().unwrap().is_empty());
}

#[tokio::test]
async fn test_join_contest() {
    let (service, _, _) = create_test_service();
    let created = active_contest(&service);

    let entry = service.join_contest(&created.id, "alice").await.unwrap();
    assert_eq!(entry.balance, created.initial_balance);
    assert_eq!(entry.contest_id(), Some(created.id.as_str()));

    let again = service.join_contest(&created.id, "alice").await;
    assert!(matches!(again, Err(TradeError::AlreadyJoined { .. })));

    assert_eq!(service.get_contest(&created.id).unwrap().participant_count, 1);
    assert_eq!(service.contests_for_user("alice").unwrap().len(), 1);
    assert!(service.contests_for_user("bob").unwrap().is_empty());
}

#[tokio::test]
async fn test_join_full_contest() {
    let (service, _, _) = create_test_service();
    let now = now_ms();
    let created = service
        .create_contest(NewContest {
            max_participants: Some(1),
            ..contest("Duel", now - HOUR_MS, now + HOUR_MS)
        })
        .unwrap();

    service.join_contest(&created.id, "alice").await.unwrap();
    let err = service.join_contest(&created.id, "bob").await.unwrap_err();

    assert!(matches!(err, TradeError::ContestFull(_)));
}

#[tokio::test]
async fn test_completed_contest_rejects_join() {
    let (service, _, _) = create_test_service();
    let now = now_ms();
    let created = service
        .create_contest(contest("Last Week", now - 48 * HOUR_MS, now - 24 * HOUR_MS))
        .unwrap();

    assert_eq!(created.status, ContestStatus::Completed);
    let err = service.join_contest(&created.id, "alice").await.unwrap_err();
    assert!(matches!(err, TradeError::ContestNotOpen(_)));
}

#[tokio::test]
async fn test_upcoming_contest_rejects_trades() {
    let (service, _, _) = create_test_service();
    let now = now_ms();
    let created = service
        .create_contest(contest("Next Week", now + 24 * HOUR_MS, now + 48 * HOUR_MS))
        .unwrap();

    let entry = service.join_contest(&created.id, "alice").await.unwrap();
    let err = service
        .execute_trade(&entry.id, TradeRequest::buy("INFY", 1, 100.0))
        .await
        .unwrap_err();

    assert!(matches!(err, TradeError::ContestNotActive(_)));
}

// =============================================================================
// Trading
// =============================================================================

#[tokio::test]
async fn test_concurrent_trades_serialize_per_ledger() {
    let (service, _, _) = create_test_service();
    let ledger = service.standing_ledger("alice").unwrap();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let service = service.clone();
            let id = ledger.id.clone();
            tokio::spawn(async move {
                service
                    .execute_trade(&id, TradeRequest::buy("INFY", 1, 100.0))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = service.get_ledger(&ledger.id).unwrap();
    assert_eq!(stored.position("INFY").unwrap().quantity, 20);
    assert_eq!(stored.balance, 100_000.0 - 2000.0);
    assert_eq!(stored.transactions.len(), 20);
    // One save per trade plus one each for First Trade and Active Trader
    assert_eq!(stored.version, 22);
}

#[tokio::test]
async fn test_derivative_round_trips() {
    let (service, _, gateway) = create_test_service();
    let ledger = service.standing_ledger("alice").unwrap();

    let option = service
        .open_derivative(
            &ledger.id,
            DerivativeOrder::Option(OptionOrder {
                symbol: "NIFTY".to_string(),
                strike: 20_000.0,
                option_type: OptionType::Call,
                premium: 10.0,
                lot_size: Some(25),
                quantity: Some(1),
                expiry: None,
            }),
            Side::Buy,
        )
        .await
        .unwrap();
    assert_eq!(service.get_ledger(&ledger.id).unwrap().balance, 100_000.0 - 250.0);

    let closed = service
        .close_derivative(&ledger.id, &option.id, Some(20.0))
        .await
        .unwrap();
    assert!(!closed.is_open);
    assert_eq!(closed.pnl, 250.0);
    assert_eq!(service.get_ledger(&ledger.id).unwrap().balance, 100_000.0 + 250.0);

    let future = service
        .open_derivative(
            &ledger.id,
            DerivativeOrder::Future(FutureOrder {
                symbol: "TCS".to_string(),
                price: 100.0,
                lot_size: Some(25),
                quantity: Some(1),
                margin_percent: Some(15.0),
                expiry: None,
            }),
            Side::Buy,
        )
        .await
        .unwrap();
    assert_eq!(future.margin_blocked, 375.0);

    gateway.set_price("TCS", 110.0);
    let closed = service
        .close_derivative(&ledger.id, &future.id, None)
        .await
        .unwrap();
    assert_eq!(closed.pnl, 250.0);
    assert_eq!(service.get_ledger(&ledger.id).unwrap().balance, 100_000.0 + 500.0);

    let again = service.close_derivative(&ledger.id, &future.id, Some(1.0)).await;
    assert!(matches!(again, Err(TradeError::Validation(_))));
}

#[tokio::test]
async fn test_option_close_needs_exit_premium() {
    let (service, _, _) = create_test_service();
    let ledger = service.standing_ledger("alice").unwrap();
    let option = service
        .open_derivative(
            &ledger.id,
            DerivativeOrder::Option(OptionOrder {
                symbol: "NIFTY".to_string(),
                strike: 20_000.0,
                option_type: OptionType::Put,
                premium: 12.0,
                lot_size: None,
                quantity: None,
                expiry: None,
            }),
            Side::Sell,
        )
        .await
        .unwrap();

    let err = service
        .close_derivative(&ledger.id, &option.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::Validation(_)));
}

// =============================================================================
// Ranking
// =============================================================================

async fn ranked_contest() -> (TradingService, Arc<SqliteStore>, Arc<MemoryQuoteGateway>, Contest, Vec<Ledger>) {
    let (service, store, gateway) = create_test_service();
    let created = active_contest(&service);

    let mut entries = Vec::new();
    for (user, symbol) in [("A", "INFY"), ("B", "INFY"), ("C", "TCS")] {
        let entry = service.join_contest(&created.id, user).await.unwrap();
        let entry = service
            .execute_trade(&entry.id, TradeRequest::buy(symbol, 100, 100.0))
            .await
            .unwrap();
        entries.push(entry);
    }

    gateway.set_price("INFY", 150.0);
    gateway.set_price("TCS", 200.0);
    (service, store, gateway, created, entries)
}

#[tokio::test]
async fn test_ranking_pass() {
    let (service, _, _, created, _) = ranked_contest().await;
    let mut events = service.subscribe();

    let board = service.leaderboard(&created.id, 10).await.unwrap();

    let order: Vec<(&str, u32)> = board.iter().map(|e| (e.user_id.as_str(), e.rank)).collect();
    assert_eq!(order, vec![("C", 1), ("A", 2), ("B", 3)]);
    assert!((board[0].total_returns_percent - 10.0).abs() < 1e-9);
    assert!((board[1].total_returns_percent - 5.0).abs() < 1e-9);

    let page = service.leaderboard_page(&created.id, 1, 2).unwrap();
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.entries[0].user_id, "C");
    assert_eq!(page.entries[1].user_id, "A");

    let mut ranked_events = 0;
    while let Ok(event) = events.try_recv() {
        if let LedgerEvent::ContestRanked { entries, skipped, .. } = event {
            assert_eq!((entries, skipped), (3, 0));
            ranked_events += 1;
        }
    }
    assert_eq!(ranked_events, 1);
}

#[tokio::test]
async fn test_ranking_awards_once() {
    let (service, store, _, created, _) = ranked_contest().await;

    service.rank_contest(&created.id).await.unwrap();
    service.rank_contest(&created.id).await.unwrap();

    let champion: Vec<_> = store
        .all_awards()
        .unwrap()
        .into_iter()
        .filter(|a| a.achievement_name == "Champion")
        .collect();
    assert_eq!(champion.len(), 1);
    assert_eq!(champion[0].user_id, "C");
    assert_eq!(champion[0].snapshot.rank, Some(1));

    let first_trades = service
        .user_awards("A")
        .unwrap()
        .into_iter()
        .filter(|a| a.achievement_name == "First Trade")
        .count();
    assert_eq!(first_trades, 1);
}

#[tokio::test]
async fn test_slow_quote_keeps_last_price() {
    let (service, _, gateway, created, _) = ranked_contest().await;
    service.rank_contest(&created.id).await.unwrap();

    gateway.set_price("INFY", 10.0);
    gateway.set_delay("INFY", Duration::from_millis(500));
    let board = service.rank_contest(&created.id).await.unwrap();

    let a = board.iter().find(|e| e.user_id == "A").unwrap();
    assert!((a.total_returns_percent - 5.0).abs() < 1e-9);
    assert_eq!(board.len(), 3);
}

#[tokio::test]
async fn test_awards_survive_restart() {
    let (service, store, gateway) = create_test_service();
    let ledger = service.standing_ledger("alice").unwrap();
    service
        .execute_trade(&ledger.id, TradeRequest::buy("INFY", 1, 100.0))
        .await
        .unwrap();
    drop(service);

    let restarted = TradingService::new(store.clone(), gateway, &test_config()).unwrap();
    let created = active_contest(&restarted);
    let entry = restarted.join_contest(&created.id, "alice").await.unwrap();
    let entry = restarted
        .execute_trade(&entry.id, TradeRequest::buy("INFY", 1, 100.0))
        .await
        .unwrap();

    assert!(entry.achievements_earned.is_empty());
    assert_eq!(restarted.user_awards("alice").unwrap().len(), 1);
}

#[tokio::test]
async fn test_portfolio_summary_uses_fresh_quotes() {
    let (service, _, gateway) = create_test_service();
    gateway.set_price("INFY", 100.0);
    let ledger = service.standing_ledger("alice").unwrap();
    service
        .execute_trade(&ledger.id, TradeRequest::buy("INFY", 10, 100.0))
        .await
        .unwrap();

    gateway.set_price("INFY", 120.0);
    let summary = service.portfolio_summary("alice").await.unwrap();

    assert_eq!(summary.balance, 99_000.0);
    assert_eq!(summary.total_invested, 1000.0);
    assert!((summary.total_current_value - 1200.0).abs() < 1e-9);
    assert!((summary.total_profit_loss - 200.0).abs() < 1e-9);
    assert!((summary.total_profit_loss_percent - 20.0).abs() < 1e-9);
    assert_eq!(summary.positions[0].current_price, 120.0);
}

#[tokio::test]
async fn test_portfolio_summary_without_positions() {
    let (service, _, _) = create_test_service();

    let summary = service.portfolio_summary("bob").await.unwrap();

    assert_eq!(summary.balance, 100_000.0);
    assert!(summary.positions.is_empty());
    assert_eq!(summary.total_profit_loss_percent, 0.0);
}
