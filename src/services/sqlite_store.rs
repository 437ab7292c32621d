//! SQLite persistence layer.
//!
//! Contests, ledgers, the achievement catalog and awards are stored as JSON
//! documents next to the columns needed for lookups and constraints:
//! - Ledgers carry a `version` column for optimistic concurrency
//! - Awards are unique on `(user_id, achievement_name)`
//! - Watchlists are keyed by id and indexed by owner

use crate::error::{Result, TradeError};
use crate::types::{Achievement, AchievementAward, Contest, ContestStatus, Ledger, Watchlist};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// SQLite store for contests, ledgers and achievements.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn decode<T: DeserializeOwned>(docs: Vec<String>) -> Result<Vec<T>> {
    docs.iter()
        .map(|doc| serde_json::from_str(doc).map_err(TradeError::from))
        .collect()
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("SQLite store initialized");
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory SQLite store initialized");
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TradeError::Storage("connection mutex poisoned".to_string()))
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS contests (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                start_date INTEGER NOT NULL,
                end_date INTEGER NOT NULL,
                doc TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ledgers (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                scope_key TEXT NOT NULL,
                version INTEGER NOT NULL,
                doc TEXT NOT NULL,
                UNIQUE(user_id, scope_key)
            );

            CREATE INDEX IF NOT EXISTS idx_ledgers_scope ON ledgers(scope_key);

            CREATE TABLE IF NOT EXISTS achievements (
                name TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS achievement_awards (
                user_id TEXT NOT NULL,
                achievement_name TEXT NOT NULL,
                contest_id TEXT,
                earned_at INTEGER NOT NULL,
                doc TEXT NOT NULL,
                UNIQUE(user_id, achievement_name)
            );

            CREATE TABLE IF NOT EXISTS watchlists (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                doc TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_watchlists_user ON watchlists(user_id);",
        )?;

        info!("SQLite schema initialized");
        Ok(())
    }

    // ========== Contest Methods ==========

    /// Insert or replace a contest.
    pub fn save_contest(&self, contest: &Contest) -> Result<()> {
        let doc = serde_json::to_string(contest)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO contests (id, status, start_date, end_date, doc)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                doc = excluded.doc",
            params![
                contest.id,
                contest.status.as_str(),
                contest.start_date,
                contest.end_date,
                doc
            ],
        )?;
        Ok(())
    }

    /// Update only the status of a stored contest, leaving the rest of the document alone.
    pub fn update_contest_status(&self, id: &str, status: ContestStatus) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE contests SET status = ?1, doc = json_set(doc, '$.status', ?1) WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(updated == 1)
    }

    pub fn get_contest(&self, id: &str) -> Result<Option<Contest>> {
        let conn = self.conn()?;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM contests WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        drop(conn);

        doc.map(|d| serde_json::from_str(&d).map_err(TradeError::from))
            .transpose()
    }

    /// All contests, earliest start first.
    pub fn list_contests(&self) -> Result<Vec<Contest>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT doc FROM contests ORDER BY start_date, id")?;
        let docs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode(docs)
    }

    // ========== Ledger Methods ==========

    fn scope_key(contest_id: Option<&str>) -> &str {
        contest_id.unwrap_or("")
    }

    /// Insert a new ledger. Returns false if the user already has one in that scope.
    pub fn insert_ledger(&self, ledger: &Ledger) -> Result<bool> {
        let doc = serde_json::to_string(ledger)?;
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO ledgers (id, user_id, scope_key, version, doc)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                ledger.id,
                ledger.user_id,
                Self::scope_key(ledger.contest_id()),
                ledger.version as i64,
                doc
            ],
        )?;
        Ok(inserted == 1)
    }

    pub fn get_ledger(&self, id: &str) -> Result<Option<Ledger>> {
        let conn = self.conn()?;
        let doc: Option<String> = conn
            .query_row("SELECT doc FROM ledgers WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        drop(conn);

        doc.map(|d| serde_json::from_str(&d).map_err(TradeError::from))
            .transpose()
    }

    /// A user's ledger in a contest, or their standing ledger when `contest_id` is None.
    pub fn find_ledger(&self, user_id: &str, contest_id: Option<&str>) -> Result<Option<Ledger>> {
        let conn = self.conn()?;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM ledgers WHERE user_id = ?1 AND scope_key = ?2",
                params![user_id, Self::scope_key(contest_id)],
                |row| row.get(0),
            )
            .optional()?;
        drop(conn);

        doc.map(|d| serde_json::from_str(&d).map_err(TradeError::from))
            .transpose()
    }

    /// Entries of a contest in join order.
    pub fn ledgers_for_contest(&self, contest_id: &str) -> Result<Vec<Ledger>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT doc FROM ledgers WHERE scope_key = ?1 ORDER BY rowid")?;
        let docs = stmt
            .query_map(params![contest_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode(docs)
    }

    pub fn ledgers_for_user(&self, user_id: &str) -> Result<Vec<Ledger>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT doc FROM ledgers WHERE user_id = ?1 ORDER BY rowid")?;
        let docs = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode(docs)
    }

    pub fn count_ledgers(&self, contest_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ledgers WHERE scope_key = ?1",
            params![contest_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Persist a mutated ledger if nobody saved it since it was loaded.
    ///
    /// Bumps `ledger.version` on success; leaves it untouched on `StaleLedger`.
    pub fn save_ledger(&self, ledger: &mut Ledger) -> Result<u64> {
        let conn = self.conn()?;
        let expected = ledger.version;
        ledger.version = expected + 1;
        let doc = match serde_json::to_string(ledger) {
            Ok(doc) => doc,
            Err(e) => {
                ledger.version = expected;
                return Err(e.into());
            }
        };

        let updated = conn.execute(
            "UPDATE ledgers SET version = ?1, doc = ?2 WHERE id = ?3 AND version = ?4",
            params![ledger.version as i64, doc, ledger.id, expected as i64],
        );

        match updated {
            Ok(1) => Ok(ledger.version),
            Ok(_) => {
                ledger.version = expected;
                Err(TradeError::StaleLedger {
                    id: ledger.id.clone(),
                    expected,
                })
            }
            Err(e) => {
                ledger.version = expected;
                Err(e.into())
            }
        }
    }

    // ========== Achievement Methods ==========

    /// Insert catalog entries that do not exist yet. Returns how many were added.
    pub fn seed_achievements(&self, catalog: &[Achievement]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut added = 0;
        for achievement in catalog {
            let doc = serde_json::to_string(achievement)?;
            added += tx.execute(
                "INSERT OR IGNORE INTO achievements (name, doc) VALUES (?1, ?2)",
                params![achievement.name, doc],
            )?;
        }
        tx.commit()?;
        Ok(added)
    }

    pub fn list_achievements(&self) -> Result<Vec<Achievement>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT doc FROM achievements ORDER BY rowid")?;
        let docs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode(docs)
    }

    /// Record an award. Returns false if the user already holds it.
    pub fn insert_award(&self, award: &AchievementAward) -> Result<bool> {
        let doc = serde_json::to_string(award)?;
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO achievement_awards
                (user_id, achievement_name, contest_id, earned_at, doc)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                award.user_id,
                award.achievement_name,
                award.contest_id,
                award.earned_at,
                doc
            ],
        )?;
        Ok(inserted == 1)
    }

    /// Remove an award. Returns false if there was none.
    pub fn delete_award(&self, user_id: &str, achievement_name: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM achievement_awards WHERE user_id = ?1 AND achievement_name = ?2",
            params![user_id, achievement_name],
        )?;
        Ok(deleted == 1)
    }

    pub fn awards_for_user(&self, user_id: &str) -> Result<Vec<AchievementAward>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT doc FROM achievement_awards WHERE user_id = ?1 ORDER BY earned_at, rowid",
        )?;
        let docs = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode(docs)
    }

    pub fn all_awards(&self) -> Result<Vec<AchievementAward>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT doc FROM achievement_awards ORDER BY rowid")?;
        let docs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode(docs)
    }

    // ========== Watchlist Methods ==========

    /// Insert or replace a watchlist.
    pub fn save_watchlist(&self, watchlist: &Watchlist) -> Result<()> {
        let doc = serde_json::to_string(watchlist)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO watchlists (id, user_id, doc) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET doc = excluded.doc",
            params![watchlist.id, watchlist.user_id, doc],
        )?;
        Ok(())
    }

    pub fn get_watchlist(&self, id: &str) -> Result<Option<Watchlist>> {
        let conn = self.conn()?;
        let doc: Option<String> = conn
            .query_row("SELECT doc FROM watchlists WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        drop(conn);

        doc.map(|d| serde_json::from_str(&d).map_err(TradeError::from))
            .transpose()
    }

    pub fn watchlists_for_user(&self, user_id: &str) -> Result<Vec<Watchlist>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT doc FROM watchlists WHERE user_id = ?1 ORDER BY rowid")?;
        let docs = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode(docs)
    }

    /// Returns false if no such watchlist existed.
    pub fn delete_watchlist(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM watchlists WHERE id = ?1", params![id])?;
        Ok(deleted == 1)
    }
}
