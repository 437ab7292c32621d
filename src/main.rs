use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tradearena::services::{CachedQuoteGateway, SqliteStore, TradingService};
use tradearena::sources::YahooQuoteGateway;
use tradearena::types::LedgerEvent;
use tradearena::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradearena=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env());
    info!("Starting TradeArena with database {}", config.database_path);

    let store = Arc::new(SqliteStore::new(&config.database_path)?);

    let yahoo = YahooQuoteGateway::new(&config.quotes)?;
    let gateway = Arc::new(CachedQuoteGateway::new(yahoo, config.quotes.cache_ttl()));

    let service = TradingService::new(store, gateway, &config)?;
    if config.seed_catalog {
        service.seed_catalog()?;
    }

    // Log events
    let mut events = service.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                LedgerEvent::AchievementUnlocked { award } => {
                    info!("{} unlocked {}", award.user_id, award.achievement_name)
                }
                other => debug!("Event: {:?}", other),
            }
        }
    });

    let mut interval = tokio::time::interval(config.revaluation_interval());
    info!(
        "Ranking active contests every {}s",
        config.revaluation_interval().as_secs()
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match service.revalue_active_contests().await {
                    Ok(count) => debug!("Ranked {} active contests", count),
                    Err(e) => error!("Ranking pass failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
