//! Trading Service
//!
//! Orchestrates ledgers, contests and achievements:
//! - Equity trades and derivative positions, one writer per ledger
//! - Contest creation, joining and status tracking
//! - Ranking passes over a single quote snapshot
//! - Achievement awards and event broadcast
//! - Watchlists and on-demand price alerts
//!
//! Quote I/O happens before a ledger lock is taken; the ledger is reloaded
//! under the lock and saved with an optimistic version check.

use crate::config::{Config, TradingDefaults};
use crate::error::{Result, TradeError};
use crate::services::achievements::{evaluate_achievements, AwardRegistry};
use crate::services::derivatives;
use crate::services::ledger::{self, Execution};
use crate::services::metrics::{recompute_metrics, summarize};
use crate::services::pricing::PricingService;
use crate::services::quotes::{QuoteFetcher, QuoteGateway};
use crate::services::ranking::{leaderboard_entry, rank_entries};
use crate::services::watchlist::evaluate_alerts;
use crate::services::SqliteStore;
use crate::types::{
    default_rules, AchievementAward, AlertCondition, AlertReport, AlertRule, Contest,
    ContestStatus, DerivativeKind, DerivativeOrder, DerivativePosition, FuturesContract,
    LeaderboardEntry, LeaderboardPage, Ledger, LedgerEvent, NewContest, OptionChain, Pagination,
    PortfolioSummary, QuoteSnapshot, Side, TradeRequest, Watchlist,
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Paper trading service.
#[derive(Clone)]
pub struct TradingService {
    /// SQLite store for persistence
    store: Arc<SqliteStore>,
    /// Timeout-bounded quote access
    quotes: Arc<QuoteFetcher>,
    pricing: PricingService,
    defaults: TradingDefaults,
    /// One mutex per ledger id, per contest for joins, per watchlist for edits
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    /// Claimed (user, achievement) keys
    awards: Arc<AwardRegistry>,
    event_tx: broadcast::Sender<LedgerEvent>,
}

impl TradingService {
    /// Create a service over `store`, loading previously granted awards.
    pub fn new(
        store: Arc<SqliteStore>,
        gateway: Arc<dyn QuoteGateway>,
        config: &Config,
    ) -> Result<Self> {
        let (event_tx, _) = broadcast::channel(1024);
        let granted = store.all_awards()?;
        let awards = AwardRegistry::from_awards(&granted);
        debug!("Loaded {} granted awards", awards.len());

        Ok(Self {
            store,
            quotes: Arc::new(QuoteFetcher::new(gateway, config.quotes.timeout())),
            pricing: PricingService::new(&config.trading),
            defaults: config.trading.clone(),
            locks: Arc::new(DashMap::new()),
            awards: Arc::new(awards),
            event_tx,
        })
    }

    /// Subscribe to ledger and contest events.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.event_tx.subscribe()
    }

    fn publish(&self, event: LedgerEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop lock entries nobody holds or waits on.
    ///
    /// `lock_for` clones under the shard lock, so an entry with a single
    /// reference cannot be handed out while it is being removed.
    fn prune_locks(&self) {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let pruned = before.saturating_sub(self.locks.len());
        if pruned > 0 {
            debug!("Pruned {} idle locks", pruned);
        }
    }

    /// Insert the default achievement catalog where missing.
    pub fn seed_catalog(&self) -> Result<usize> {
        let added = self
            .store
            .seed_achievements(&crate::services::catalog::default_catalog())?;
        if added > 0 {
            info!("Seeded {} achievements", added);
        }
        Ok(added)
    }

    // ========== Contests ==========

    /// Create a contest. Status is derived from its dates.
    pub fn create_contest(&self, new: NewContest) -> Result<Contest> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(TradeError::Validation("contest name must not be empty".to_string()));
        }
        if new.end_date <= new.start_date {
            return Err(TradeError::Validation(
                "contest must end after it starts".to_string(),
            ));
        }
        let initial_balance = new.initial_balance.unwrap_or(self.defaults.contest_balance);
        if !initial_balance.is_finite() || initial_balance <= 0.0 {
            return Err(TradeError::Validation(format!(
                "initial balance must be positive, got {}",
                initial_balance
            )));
        }

        let now = now_ms();
        let contest = Contest {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: new.description,
            start_date: new.start_date,
            end_date: new.end_date,
            status: ContestStatus::at(new.start_date, new.end_date, now),
            initial_balance,
            prize_pool: new.prize_pool,
            max_participants: new.max_participants,
            contest_type: new.contest_type,
            rules: if new.rules.is_empty() {
                default_rules()
            } else {
                new.rules
            },
            participant_count: 0,
            created_by: new.created_by,
            created_at: now,
        };

        self.store.save_contest(&contest)?;
        info!("Created contest {} ({})", contest.name, contest.id);
        Ok(contest)
    }

    fn refresh_status(&self, mut contest: Contest) -> Result<Contest> {
        if contest.update_status(now_ms()) {
            info!("Contest {} is now {}", contest.id, contest.status);
            // Status column only: joins may be rewriting the rest of the document
            self.store.update_contest_status(&contest.id, contest.status)?;
        }
        Ok(contest)
    }

    pub fn get_contest(&self, contest_id: &str) -> Result<Contest> {
        let contest = self
            .store
            .get_contest(contest_id)?
            .ok_or_else(|| TradeError::ContestNotFound(contest_id.to_string()))?;
        self.refresh_status(contest)
    }

    pub fn list_contests(&self) -> Result<Vec<Contest>> {
        self.store
            .list_contests()?
            .into_iter()
            .map(|c| self.refresh_status(c))
            .collect()
    }

    pub fn active_contests(&self) -> Result<Vec<Contest>> {
        Ok(self
            .list_contests()?
            .into_iter()
            .filter(|c| c.status == ContestStatus::Active)
            .collect())
    }

    /// Contests the user has an entry in.
    pub fn contests_for_user(&self, user_id: &str) -> Result<Vec<Contest>> {
        self.store
            .ledgers_for_user(user_id)?
            .iter()
            .filter_map(|l| l.contest_id())
            .map(|id| self.get_contest(id))
            .collect()
    }

    /// Join a contest, creating the user's entry with the contest balance.
    pub async fn join_contest(&self, contest_id: &str, user_id: &str) -> Result<Ledger> {
        let lock = self.lock_for(&format!("contest:{}", contest_id));
        let _guard = lock.lock().await;

        let mut contest = self.get_contest(contest_id)?;
        if !contest.is_open() {
            return Err(TradeError::ContestNotOpen(contest_id.to_string()));
        }
        let already_joined = || TradeError::AlreadyJoined {
            user_id: user_id.to_string(),
            contest_id: contest_id.to_string(),
        };
        if self.store.find_ledger(user_id, Some(contest_id))?.is_some() {
            return Err(already_joined());
        }
        if contest.is_full() {
            return Err(TradeError::ContestFull(contest_id.to_string()));
        }

        let entry = Ledger::contest_entry(
            user_id.to_string(),
            contest_id.to_string(),
            contest.initial_balance,
        );
        if !self.store.insert_ledger(&entry)? {
            return Err(already_joined());
        }

        contest.participant_count = self.store.count_ledgers(contest_id)? as u32;
        self.store.save_contest(&contest)?;

        info!("User {} joined contest {}", user_id, contest_id);
        Ok(entry)
    }

    // ========== Ledgers ==========

    pub fn get_ledger(&self, ledger_id: &str) -> Result<Ledger> {
        self.store
            .get_ledger(ledger_id)?
            .ok_or_else(|| TradeError::LedgerNotFound(ledger_id.to_string()))
    }

    /// The user's standing portfolio, created on first use.
    pub fn standing_ledger(&self, user_id: &str) -> Result<Ledger> {
        if let Some(ledger) = self.store.find_ledger(user_id, None)? {
            return Ok(ledger);
        }

        let ledger = Ledger::standing(user_id.to_string(), self.defaults.standing_balance);
        if self.store.insert_ledger(&ledger)? {
            info!("Created standing portfolio for {}", user_id);
            return Ok(ledger);
        }
        // Lost a creation race
        self.store
            .find_ledger(user_id, None)?
            .ok_or_else(|| TradeError::LedgerNotFound(format!("standing:{}", user_id)))
    }

    /// Contest entries only trade while their contest is active.
    fn ensure_tradable(&self, ledger: &Ledger) -> Result<()> {
        if let Some(contest_id) = ledger.contest_id() {
            let contest = self.get_contest(contest_id)?;
            if contest.status != ContestStatus::Active {
                return Err(TradeError::ContestNotActive(contest_id.to_string()));
            }
        }
        Ok(())
    }

    /// Evaluate the catalog against a ledger that was just saved and record
    /// new awards. Returns the recorded ones.
    ///
    /// When something is recorded the ledger is saved again to persist
    /// `achievementsEarned`. If that save fails the award rows are deleted,
    /// their registry claims released and the ledger's list restored, so the
    /// next evaluation can grant them again.
    fn record_awards(&self, ledger: &mut Ledger, now: i64) -> Vec<AchievementAward> {
        let catalog = match self.store.list_achievements() {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Skipping achievements for {}: {}", ledger.id, e);
                return Vec::new();
            }
        };

        let earned_before = ledger.achievements_earned.clone();
        let mut recorded = Vec::new();
        for award in evaluate_achievements(ledger, &catalog, &self.awards, now) {
            match self.store.insert_award(&award) {
                Ok(true) => recorded.push(award),
                Ok(false) => {
                    debug!("{} already holds {}", award.user_id, award.achievement_name);
                    ledger
                        .achievements_earned
                        .retain(|name| name != &award.achievement_name);
                }
                Err(e) => {
                    error!("Failed to record {} for {}: {}", award.achievement_name, award.user_id, e);
                    self.awards.release(&award.user_id, &award.achievement_name);
                    ledger
                        .achievements_earned
                        .retain(|name| name != &award.achievement_name);
                }
            }
        }
        if recorded.is_empty() {
            ledger.achievements_earned = earned_before;
            return recorded;
        }

        if let Err(e) = self.store.save_ledger(ledger) {
            error!("Failed to save awards on ledger {}: {}", ledger.id, e);
            for award in &recorded {
                match self.store.delete_award(&award.user_id, &award.achievement_name) {
                    Ok(_) => self.awards.release(&award.user_id, &award.achievement_name),
                    // Row still there, so the claim stays too
                    Err(e) => error!(
                        "Failed to withdraw {} for {}: {}",
                        award.achievement_name, award.user_id, e
                    ),
                }
            }
            ledger.achievements_earned = earned_before;
            return Vec::new();
        }
        recorded
    }

    fn publish_awards(&self, awards: Vec<AchievementAward>) {
        for award in awards {
            self.publish(LedgerEvent::AchievementUnlocked { award });
        }
    }

    /// Execute an equity trade. Without a price the live quote is used.
    pub async fn execute_trade(&self, ledger_id: &str, request: TradeRequest) -> Result<Ledger> {
        self.ensure_tradable(&self.get_ledger(ledger_id)?)?;

        let price = match request.price {
            Some(price) => price,
            None => self.quotes.quote(request.symbol.trim()).await?.price,
        };
        let execution = Execution::new(&request.symbol, request.quantity, price, request.side);

        let lock = self.lock_for(ledger_id);
        let _guard = lock.lock().await;

        let mut ledger = self.get_ledger(ledger_id)?;
        let now = now_ms();
        let transaction = ledger::execute_trade(&mut ledger, &execution, now)?;

        let mut marks = QuoteSnapshot::new();
        marks.insert(transaction.symbol.clone(), price);
        recompute_metrics(&mut ledger, &marks)?;
        self.store.save_ledger(&mut ledger)?;
        let awards = self.record_awards(&mut ledger, now);

        info!(
            "{} {} {} @ {:.2} on ledger {}",
            transaction.side, transaction.quantity, transaction.symbol, price, ledger.id
        );
        self.publish(LedgerEvent::TradeExecuted {
            ledger_id: ledger.id.clone(),
            user_id: ledger.user_id.clone(),
            transaction,
            balance: ledger.balance,
        });
        self.publish_awards(awards);

        Ok(ledger)
    }

    /// Open an option or futures position.
    pub async fn open_derivative(
        &self,
        ledger_id: &str,
        order: DerivativeOrder,
        side: Side,
    ) -> Result<DerivativePosition> {
        self.ensure_tradable(&self.get_ledger(ledger_id)?)?;

        let lock = self.lock_for(ledger_id);
        let _guard = lock.lock().await;

        let mut ledger = self.get_ledger(ledger_id)?;
        let position = derivatives::open_derivative(&mut ledger, &order, side, &self.defaults, now_ms())?;
        recompute_metrics(&mut ledger, &QuoteSnapshot::new())?;
        self.store.save_ledger(&mut ledger)?;

        info!(
            "{} {} {} x{} on ledger {}",
            side,
            order.kind(),
            order.symbol(),
            position.quantity,
            ledger.id
        );

        self.publish(LedgerEvent::DerivativeOpened {
            ledger_id: ledger.id.clone(),
            position: position.clone(),
            balance: ledger.balance,
        });
        Ok(position)
    }

    /// Close a derivative position.
    ///
    /// Futures may close at the live underlying quote; options need an explicit
    /// exit premium.
    pub async fn close_derivative(
        &self,
        ledger_id: &str,
        position_id: &str,
        exit_price: Option<f64>,
    ) -> Result<DerivativePosition> {
        let ledger = self.get_ledger(ledger_id)?;
        self.ensure_tradable(&ledger)?;

        let exit_price = match exit_price {
            Some(price) => price,
            None => {
                let position = ledger
                    .derivative(position_id)
                    .ok_or_else(|| TradeError::PositionNotFound(position_id.to_string()))?;
                if position.is_option() {
                    return Err(TradeError::Validation(
                        "exit premium is required to close an option".to_string(),
                    ));
                }
                self.quotes.quote(&position.symbol).await?.price
            }
        };

        let lock = self.lock_for(ledger_id);
        let _guard = lock.lock().await;

        let mut ledger = self.get_ledger(ledger_id)?;
        let position = derivatives::close_derivative(&mut ledger, position_id, exit_price, now_ms())?;
        recompute_metrics(&mut ledger, &QuoteSnapshot::new())?;
        self.store.save_ledger(&mut ledger)?;

        self.publish(LedgerEvent::DerivativeClosed {
            ledger_id: ledger.id.clone(),
            position: position.clone(),
            balance: ledger.balance,
        });
        Ok(position)
    }

    /// Recompute one ledger under its lock against `snapshot`.
    async fn revalue_with(&self, ledger_id: &str, snapshot: &QuoteSnapshot) -> Result<Ledger> {
        let lock = self.lock_for(ledger_id);
        let _guard = lock.lock().await;

        let mut ledger = self.get_ledger(ledger_id)?;
        recompute_metrics(&mut ledger, snapshot)?;
        for position in ledger.derivative_positions.iter_mut().filter(|d| d.is_open) {
            if position.kind == DerivativeKind::Future {
                if let Some(&price) = snapshot.get(&position.symbol) {
                    derivatives::mark_derivative(position, price)?;
                }
            }
        }
        self.store.save_ledger(&mut ledger)?;
        Ok(ledger)
    }

    fn quoted_symbols(ledger: &Ledger) -> Vec<String> {
        let mut symbols = ledger.symbols();
        symbols.extend(
            ledger
                .open_derivatives()
                .filter(|d| d.kind == DerivativeKind::Future)
                .map(|d| d.symbol.clone()),
        );
        symbols
    }

    /// Revalue a single ledger against fresh quotes.
    pub async fn revalue_ledger(&self, ledger_id: &str) -> Result<Ledger> {
        let ledger = self.get_ledger(ledger_id)?;
        let snapshot = self.quotes.snapshot(Self::quoted_symbols(&ledger)).await;
        self.revalue_with(ledger_id, &snapshot).await
    }

    /// Revalued view of the user's standing portfolio.
    pub async fn portfolio_summary(&self, user_id: &str) -> Result<PortfolioSummary> {
        let ledger = self.standing_ledger(user_id)?;
        let ledger = self.revalue_ledger(&ledger.id).await?;
        Ok(summarize(&ledger))
    }

    pub fn user_awards(&self, user_id: &str) -> Result<Vec<AchievementAward>> {
        self.store.awards_for_user(user_id)
    }

    // ========== Ranking ==========

    /// Write a rank unless the ledger changed since it was revalued.
    async fn write_rank(&self, ranked: &Ledger) -> Result<Option<(Ledger, Vec<AchievementAward>)>> {
        let lock = self.lock_for(&ranked.id);
        let _guard = lock.lock().await;

        let mut ledger = self.get_ledger(&ranked.id)?;
        if ledger.version != ranked.version {
            debug!("Ledger {} moved on, keeping its rank for the next pass", ledger.id);
            return Ok(None);
        }

        ledger.rank = ranked.rank;
        self.store.save_ledger(&mut ledger)?;
        let awards = self.record_awards(&mut ledger, now_ms());
        Ok(Some((ledger, awards)))
    }

    /// Revalue every entry of a contest with one quote snapshot, rank them,
    /// and evaluate achievements. Entries that fail are skipped.
    pub async fn rank_contest(&self, contest_id: &str) -> Result<Vec<LeaderboardEntry>> {
        self.get_contest(contest_id)?;
        let entries = self.store.ledgers_for_contest(contest_id)?;

        let symbols: Vec<String> = entries.iter().flat_map(Self::quoted_symbols).collect();
        let snapshot = self.quotes.snapshot(symbols).await;

        let mut skipped = 0;
        let mut revalued = Vec::with_capacity(entries.len());
        for entry in &entries {
            match self.revalue_with(&entry.id, &snapshot).await {
                Ok(ledger) => revalued.push(ledger),
                Err(e) => {
                    warn!("Skipping entry {} in contest {}: {}", entry.id, contest_id, e);
                    skipped += 1;
                }
            }
        }

        rank_entries(&mut revalued);

        let mut awards = Vec::new();
        for ranked in revalued.iter_mut() {
            match self.write_rank(ranked).await {
                Ok(Some((ledger, new_awards))) => {
                    *ranked = ledger;
                    awards.extend(new_awards);
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to store rank for {}: {}", ranked.id, e),
            }
        }

        info!(
            "Ranked contest {}: {} entries, {} skipped",
            contest_id,
            revalued.len(),
            skipped
        );
        self.publish(LedgerEvent::ContestRanked {
            contest_id: contest_id.to_string(),
            entries: revalued.len(),
            skipped,
        });
        self.publish_awards(awards);
        self.prune_locks();

        Ok(revalued.iter().map(leaderboard_entry).collect())
    }

    /// Fresh ranking, top `limit` entries.
    pub async fn leaderboard(&self, contest_id: &str, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut entries = self.rank_contest(contest_id).await?;
        entries.truncate(limit);
        Ok(entries)
    }

    /// Stored ranking without revaluation. Pages start at 1.
    pub fn leaderboard_page(
        &self,
        contest_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<LeaderboardPage> {
        if page == 0 || limit == 0 {
            return Err(TradeError::Validation(
                "page and limit must be positive".to_string(),
            ));
        }
        self.get_contest(contest_id)?;

        let mut entries = self.store.ledgers_for_contest(contest_id)?;
        entries.sort_by_key(|l| l.rank.unwrap_or(u32::MAX));

        let total = entries.len();
        let rows = entries
            .iter()
            .skip((page - 1) * limit)
            .take(limit)
            .map(leaderboard_entry)
            .collect();

        Ok(LeaderboardPage {
            entries: rows,
            pagination: Pagination {
                total,
                page,
                limit,
                total_pages: (total + limit - 1) / limit,
            },
        })
    }

    /// Rank every active contest. Returns how many were ranked.
    pub async fn revalue_active_contests(&self) -> Result<usize> {
        let contests = self.active_contests()?;
        let mut ranked = 0;
        for contest in &contests {
            match self.rank_contest(&contest.id).await {
                Ok(_) => ranked += 1,
                Err(e) => error!("Ranking contest {} failed: {}", contest.id, e),
            }
        }
        Ok(ranked)
    }

    // ========== Watchlists ==========

    /// The user's watchlist, or `WatchlistNotFound` if it belongs to someone else.
    fn owned_watchlist(&self, user_id: &str, watchlist_id: &str) -> Result<Watchlist> {
        self.store
            .get_watchlist(watchlist_id)?
            .filter(|w| w.user_id == user_id)
            .ok_or_else(|| TradeError::WatchlistNotFound(watchlist_id.to_string()))
    }

    /// Load, mutate and save one of the user's watchlists under its lock.
    async fn edit_watchlist<F>(&self, user_id: &str, watchlist_id: &str, edit: F) -> Result<Watchlist>
    where
        F: FnOnce(&mut Watchlist) -> Result<()>,
    {
        let lock = self.lock_for(&format!("watchlist:{}", watchlist_id));
        let _guard = lock.lock().await;

        let mut watchlist = self.owned_watchlist(user_id, watchlist_id)?;
        edit(&mut watchlist)?;
        watchlist.updated_at = now_ms();
        self.store.save_watchlist(&watchlist)?;
        Ok(watchlist)
    }

    pub fn create_watchlist(
        &self,
        user_id: &str,
        name: &str,
        symbols: Vec<String>,
    ) -> Result<Watchlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TradeError::Validation("watchlist name is required".to_string()));
        }
        let watchlist = Watchlist::new(user_id.to_string(), name.to_string(), symbols, now_ms());
        self.store.save_watchlist(&watchlist)?;
        info!("Created watchlist {} for {}", watchlist.id, user_id);
        Ok(watchlist)
    }

    pub fn watchlists(&self, user_id: &str) -> Result<Vec<Watchlist>> {
        self.store.watchlists_for_user(user_id)
    }

    pub fn get_watchlist(&self, user_id: &str, watchlist_id: &str) -> Result<Watchlist> {
        self.owned_watchlist(user_id, watchlist_id)
    }

    /// Rename and/or replace the symbol list. A blank name is ignored.
    pub async fn update_watchlist(
        &self,
        user_id: &str,
        watchlist_id: &str,
        name: Option<String>,
        symbols: Option<Vec<String>>,
    ) -> Result<Watchlist> {
        self.edit_watchlist(user_id, watchlist_id, |watchlist| {
            if let Some(name) = name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                watchlist.name = name.to_string();
            }
            if let Some(symbols) = symbols {
                watchlist.set_symbols(symbols);
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_watchlist(&self, user_id: &str, watchlist_id: &str) -> Result<()> {
        let lock = self.lock_for(&format!("watchlist:{}", watchlist_id));
        let _guard = lock.lock().await;

        self.owned_watchlist(user_id, watchlist_id)?;
        self.store.delete_watchlist(watchlist_id)?;
        info!("Deleted watchlist {}", watchlist_id);
        Ok(())
    }

    pub async fn add_watch_symbol(
        &self,
        user_id: &str,
        watchlist_id: &str,
        symbol: &str,
    ) -> Result<Watchlist> {
        if symbol.trim().is_empty() {
            return Err(TradeError::Validation("symbol is required".to_string()));
        }
        self.edit_watchlist(user_id, watchlist_id, |watchlist| {
            watchlist.add_symbol(symbol);
            Ok(())
        })
        .await
    }

    pub async fn remove_watch_symbol(
        &self,
        user_id: &str,
        watchlist_id: &str,
        symbol: &str,
    ) -> Result<Watchlist> {
        self.edit_watchlist(user_id, watchlist_id, |watchlist| {
            watchlist.remove_symbol(symbol);
            Ok(())
        })
        .await
    }

    /// Create or update the alert for the rule's symbol and condition.
    pub async fn set_alert(
        &self,
        user_id: &str,
        watchlist_id: &str,
        mut rule: AlertRule,
    ) -> Result<Watchlist> {
        rule.symbol = rule.symbol.trim().to_string();
        if rule.symbol.is_empty() {
            return Err(TradeError::Validation("alert symbol is required".to_string()));
        }
        if !rule.threshold.is_finite() {
            return Err(TradeError::Validation(format!(
                "alert threshold must be a number, got {}",
                rule.threshold
            )));
        }
        if matches!(rule.condition, AlertCondition::Above | AlertCondition::Below)
            && rule.threshold <= 0.0
        {
            return Err(TradeError::Validation(format!(
                "price alert threshold must be positive, got {}",
                rule.threshold
            )));
        }
        self.edit_watchlist(user_id, watchlist_id, |watchlist| {
            watchlist.upsert_alert(rule);
            Ok(())
        })
        .await
    }

    /// Check the watchlist's enabled alerts against live quotes and store
    /// the trigger times.
    pub async fn evaluate_watchlist(&self, user_id: &str, watchlist_id: &str) -> Result<AlertReport> {
        let lock = self.lock_for(&format!("watchlist:{}", watchlist_id));
        let _guard = lock.lock().await;

        let mut watchlist = self.owned_watchlist(user_id, watchlist_id)?;
        let report = evaluate_alerts(&mut watchlist, &self.quotes, now_ms()).await;
        self.store.save_watchlist(&watchlist)?;

        let fired = report.results.iter().filter(|r| r.triggered()).count();
        info!(
            "Evaluated {} alerts on watchlist {}: {} fired",
            report.results.len(),
            watchlist_id,
            fired
        );
        Ok(report)
    }

    // ========== Contracts ==========

    /// Option chain around the live spot price.
    pub async fn option_chain(&self, symbol: &str) -> Result<OptionChain> {
        let spot = self.quotes.quote(symbol).await?.price;
        self.pricing.option_chain(symbol, spot, now_ms())
    }

    /// Near-month futures contract for the live spot price.
    pub async fn futures_contract(&self, symbol: &str) -> Result<FuturesContract> {
        let spot = self.quotes.quote(symbol).await?.price;
        self.pricing.futures_contract(symbol, spot, now_ms())
    }
}
