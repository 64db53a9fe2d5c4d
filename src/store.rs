// src/store.rs
//! Durable state shared by the feedback service and the batch digest run:
//! processed-story markers (deduplication), feedback history (classifier
//! exemplars) and the interest profile terms.
//!
//! Two independent processes open the same SQLite file. Atomic upserts and
//! one explicit transaction (replace-all) are the only synchronization the
//! design needs; there is no coordination beyond the store.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS processed_stories (
    story_id     TEXT PRIMARY KEY,
    processed_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS feedback_history (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    story_id   TEXT NOT NULL,
    title      TEXT NOT NULL,
    url        TEXT,
    rating     TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS interests (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    interest   TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS not_interested (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    term       TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);
"#;

/// One user judgment on a story. Append-only; multiple records may exist
/// for the same story and none of them is privileged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub story_id: String,
    pub title: String,
    pub url: Option<String>,
    pub rating: Rating,
    pub created_at: i64, // unix seconds
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Positive,
    Negative,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Positive => "positive",
            Rating::Negative => "negative",
        }
    }
}

impl FromStr for Rating {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "positive" => Ok(Rating::Positive),
            "negative" => Ok(Rating::Negative),
            other => anyhow::bail!("rating must be 'positive' or 'negative', got '{other}'"),
        }
    }
}

/// Feedback history split by rating, each list in creation order (ascending).
#[derive(Debug, Clone, Default)]
pub struct FeedbackLog {
    pub positive: Vec<FeedbackRecord>,
    pub negative: Vec<FeedbackRecord>,
}

pub struct ItemStore {
    conn: Mutex<Connection>,
}

impl ItemStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).with_context(|| {
            format!("open digest store at {}", path.as_ref().display())
        })?;
        Self::init(conn)
    }

    /// In-memory store; handy for tests and local experiments.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("open in-memory store")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // The feedback service and a batch run can hit the file at once.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA).context("apply store schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }

    // ---- Processed markers ----

    /// All live markers: story id -> unix seconds it was evaluated.
    pub fn processed_markers(&self) -> Result<HashMap<String, i64>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT story_id, processed_at FROM processed_stories")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        let mut out = HashMap::new();
        for row in rows {
            let (id, ts) = row?;
            out.insert(id, ts);
        }
        Ok(out)
    }

    /// Record that a story was evaluated. Idempotent: a second call for the
    /// same id is a no-op and the original timestamp is kept.
    pub fn mark_processed(&self, story_id: &str) -> Result<()> {
        self.mark_processed_at(story_id, chrono::Utc::now().timestamp())
    }

    pub fn mark_processed_at(&self, story_id: &str, ts: i64) -> Result<()> {
        self.lock()
            .execute(
                "INSERT OR IGNORE INTO processed_stories (story_id, processed_at) VALUES (?1, ?2)",
                params![story_id, ts],
            )
            .with_context(|| format!("mark story {story_id} processed"))?;
        Ok(())
    }

    /// Delete markers older than `window_days`; returns how many were removed.
    pub fn purge_expired(&self, window_days: i64) -> Result<usize> {
        let cutoff = chrono::Utc::now().timestamp() - window_days * 86_400;
        let removed = self
            .lock()
            .execute(
                "DELETE FROM processed_stories WHERE processed_at < ?1",
                params![cutoff],
            )
            .context("purge expired markers")?;
        Ok(removed)
    }

    // ---- Feedback history ----

    pub fn append_feedback(
        &self,
        story_id: &str,
        title: &str,
        url: Option<&str>,
        rating: Rating,
    ) -> Result<()> {
        self.lock()
            .execute(
                "INSERT INTO feedback_history (story_id, title, url, rating, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![story_id, title, url, rating.as_str(), chrono::Utc::now().timestamp()],
            )
            .with_context(|| format!("append feedback for story {story_id}"))?;
        Ok(())
    }

    /// Full feedback history, split by rating, oldest first. A row with an
    /// unparseable rating is dropped (and logged) rather than failing the load.
    pub fn load_feedback(&self) -> Result<FeedbackLog> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT story_id, title, url, rating, created_at FROM feedback_history ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, i64>(4)?,
            ))
        })?;

        let mut log = FeedbackLog::default();
        for row in rows {
            let (story_id, title, url, rating_raw, created_at) = row?;
            let rating = match rating_raw.parse::<Rating>() {
                Ok(r) => r,
                Err(_) => {
                    tracing::error!(story_id = %story_id, rating = %rating_raw,
                        "malformed feedback row in store, skipping");
                    continue;
                }
            };
            let rec = FeedbackRecord {
                story_id,
                title,
                url,
                rating,
                created_at,
            };
            match rating {
                Rating::Positive => log.positive.push(rec),
                Rating::Negative => log.negative.push(rec),
            }
        }
        Ok(log)
    }

    // ---- Interest terms ----

    pub fn load_interests(&self) -> Result<Vec<String>> {
        self.load_terms("SELECT interest FROM interests ORDER BY id ASC")
    }

    /// Replace the whole interest set atomically: either every new term is
    /// visible afterwards or the original set is fully intact.
    pub fn replace_interests(&self, terms: &[String]) -> Result<()> {
        self.replace_terms("interests", "interest", terms)
    }

    pub fn add_interest(&self, term: &str) -> Result<()> {
        self.add_term("interests", "interest", term)
    }

    pub fn remove_interest(&self, term: &str) -> Result<bool> {
        self.remove_term("interests", "interest", term)
    }

    // ---- Excluded (not-interested) terms ----

    pub fn load_excluded(&self) -> Result<Vec<String>> {
        self.load_terms("SELECT term FROM not_interested ORDER BY id ASC")
    }

    pub fn replace_excluded(&self, terms: &[String]) -> Result<()> {
        self.replace_terms("not_interested", "term", terms)
    }

    pub fn add_excluded(&self, term: &str) -> Result<()> {
        self.add_term("not_interested", "term", term)
    }

    pub fn remove_excluded(&self, term: &str) -> Result<bool> {
        self.remove_term("not_interested", "term", term)
    }

    // ---- shared term helpers ----

    fn load_terms(&self, sql: &str) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn replace_terms(&self, table: &str, column: &str, terms: &[String]) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction().context("begin replace-all")?;
        let now = chrono::Utc::now().timestamp();
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        for term in terms {
            // Plain INSERT: a duplicate in the new list violates UNIQUE and
            // rolls the whole replace back.
            tx.execute(
                &format!("INSERT INTO {table} ({column}, created_at) VALUES (?1, ?2)"),
                params![term, now],
            )
            .with_context(|| format!("insert term '{term}' into {table}"))?;
        }
        tx.commit().context("commit replace-all")?;
        Ok(())
    }

    fn add_term(&self, table: &str, column: &str, term: &str) -> Result<()> {
        self.lock()
            .execute(
                &format!("INSERT OR IGNORE INTO {table} ({column}, created_at) VALUES (?1, ?2)"),
                params![term, chrono::Utc::now().timestamp()],
            )
            .with_context(|| format!("add term '{term}' to {table}"))?;
        Ok(())
    }

    fn remove_term(&self, table: &str, column: &str, term: &str) -> Result<bool> {
        let removed = self
            .lock()
            .execute(
                &format!("DELETE FROM {table} WHERE {column} = ?1"),
                params![term],
            )
            .with_context(|| format!("remove term '{term}' from {table}"))?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Needs the private connection to plant a row no public API can write.
    #[test]
    fn load_feedback_skips_rows_with_unknown_rating() {
        let store = ItemStore::open_in_memory().unwrap();
        store
            .append_feedback("1", "Good story", None, Rating::Positive)
            .unwrap();
        store
            .lock()
            .execute(
                "INSERT INTO feedback_history (story_id, title, url, rating, created_at) \
                 VALUES ('2', 'Corrupt row', NULL, 'maybe', 0)",
                [],
            )
            .unwrap();

        let log = store.load_feedback().expect("load survives bad row");
        assert_eq!(log.positive.len(), 1);
        assert_eq!(log.positive[0].story_id, "1");
        assert!(log.negative.is_empty());
    }
}
