// SQLite persistence for users, official results and predictions.
//
// Only raw score inputs are stored. Resolved brackets are always recomputed
// from them, so there is no derived table to drift out of sync.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use prode_core::bracket::MatchId;
use prode_core::ranking::Entrant;
use prode_core::score::{ScoreInput, ScoreSet};
use rusqlite::{params, Connection, Row};

use crate::import::PredictionRow;

/// SQLite-backed store for the pool.
pub struct Database {
    conn: Mutex<Connection>,
}

/// Column order shared by every score query: home, away, pen home, pen away.
fn score_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ScoreInput> {
    Ok(ScoreInput {
        home_goals: row.get(offset)?,
        away_goals: row.get(offset + 1)?,
        penalty_home: row.get(offset + 2)?,
        penalty_away: row.get(offset + 3)?,
    })
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id           TEXT PRIMARY KEY,
                display_name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS official_results (
                match_id     INTEGER PRIMARY KEY,
                home_goals   INTEGER,
                away_goals   INTEGER,
                penalty_home INTEGER,
                penalty_away INTEGER,
                updated_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS predictions (
                user_id      TEXT NOT NULL REFERENCES users(id),
                match_id     INTEGER NOT NULL,
                home_goals   INTEGER,
                away_goals   INTEGER,
                penalty_home INTEGER,
                penalty_away INTEGER,
                updated_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (user_id, match_id)
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Insert a user or rename an existing one.
    pub fn upsert_user(&self, user_id: &str, display_name: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (id, display_name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
            params![user_id, display_name],
        )
        .context("failed to upsert user")?;
        Ok(())
    }

    /// All users as `(id, display_name)`, ordered by id.
    pub fn list_users(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, display_name FROM users ORDER BY id")
            .context("failed to prepare list_users query")?;
        let users = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("failed to query users")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map user rows")?;
        Ok(users)
    }

    pub fn display_name(&self, user_id: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT display_name FROM users WHERE id = ?1")
            .context("failed to prepare display_name query")?;
        let mut rows = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))
            .context("failed to query user")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read user row")?)),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Official results
    // ------------------------------------------------------------------

    /// Record (or overwrite) the official score of one match.
    pub fn record_official(&self, match_id: MatchId, score: &ScoreInput) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO official_results
                (match_id, home_goals, away_goals, penalty_home, penalty_away)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                match_id,
                score.home_goals,
                score.away_goals,
                score.penalty_home,
                score.penalty_away,
            ],
        )
        .context("failed to record official result")?;
        Ok(())
    }

    /// Record several official scores in one transaction.
    pub fn record_official_batch(&self, results: &[(MatchId, ScoreInput)]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        for (match_id, score) in results {
            tx.execute(
                "INSERT OR REPLACE INTO official_results
                    (match_id, home_goals, away_goals, penalty_home, penalty_away)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    match_id,
                    score.home_goals,
                    score.away_goals,
                    score.penalty_home,
                    score.penalty_away,
                ],
            )
            .context("failed to record official result in batch")?;
        }
        tx.commit().context("failed to commit official results")?;
        Ok(())
    }

    /// Remove a mistakenly entered official result.
    pub fn clear_official(&self, match_id: MatchId) -> Result<bool> {
        let conn = self.conn();
        let removed = conn
            .execute(
                "DELETE FROM official_results WHERE match_id = ?1",
                params![match_id],
            )
            .context("failed to clear official result")?;
        Ok(removed > 0)
    }

    pub fn load_official(&self) -> Result<ScoreSet> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT match_id, home_goals, away_goals, penalty_home, penalty_away
                 FROM official_results ORDER BY match_id",
            )
            .context("failed to prepare load_official query")?;
        let scores = stmt
            .query_map([], |row| Ok((row.get::<_, MatchId>(0)?, score_from_row(row, 1)?)))
            .context("failed to query official results")?
            .collect::<std::result::Result<ScoreSet, _>>()
            .context("failed to map official result rows")?;
        Ok(scores)
    }

    // ------------------------------------------------------------------
    // Predictions
    // ------------------------------------------------------------------

    /// Record (or overwrite) one user's prediction for one match. The user
    /// must already exist.
    pub fn record_prediction(&self, user_id: &str, match_id: MatchId, score: &ScoreInput) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO predictions
                (user_id, match_id, home_goals, away_goals, penalty_home, penalty_away)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                match_id,
                score.home_goals,
                score.away_goals,
                score.penalty_home,
                score.penalty_away,
            ],
        )
        .context("failed to record prediction")?;
        Ok(())
    }

    /// Import prediction rows in a single transaction, creating or renaming
    /// users as they appear.
    pub fn import_predictions(&self, rows: &[PredictionRow]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for row in rows {
            tx.execute(
                "INSERT INTO users (id, display_name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
                params![row.user_id, row.display_name],
            )
            .context("failed to upsert user in batch")?;
            tx.execute(
                "INSERT OR REPLACE INTO predictions
                    (user_id, match_id, home_goals, away_goals, penalty_home, penalty_away)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.user_id,
                    row.match_id,
                    row.score.home_goals,
                    row.score.away_goals,
                    row.score.penalty_home,
                    row.score.penalty_away,
                ],
            )
            .context("failed to insert prediction in batch")?;
        }

        tx.commit().context("failed to commit prediction import")?;
        Ok(())
    }

    pub fn load_predictions(&self, user_id: &str) -> Result<ScoreSet> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT match_id, home_goals, away_goals, penalty_home, penalty_away
                 FROM predictions WHERE user_id = ?1 ORDER BY match_id",
            )
            .context("failed to prepare load_predictions query")?;
        let scores = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, MatchId>(0)?, score_from_row(row, 1)?))
            })
            .context("failed to query predictions")?
            .collect::<std::result::Result<ScoreSet, _>>()
            .context("failed to map prediction rows")?;
        Ok(scores)
    }

    /// Every user with their full prediction set. Users without any
    /// prediction are included with an empty set.
    pub fn load_entrants(&self) -> Result<Vec<Entrant>> {
        let users = self.list_users()?;

        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT user_id, match_id, home_goals, away_goals, penalty_home, penalty_away
                 FROM predictions ORDER BY user_id, match_id",
            )
            .context("failed to prepare load_entrants query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, MatchId>(1)?,
                    score_from_row(row, 2)?,
                ))
            })
            .context("failed to query all predictions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map prediction rows")?;

        let mut by_user: BTreeMap<String, ScoreSet> = BTreeMap::new();
        for (user_id, match_id, score) in rows {
            by_user.entry(user_id).or_default().insert(match_id, score);
        }

        Ok(users
            .into_iter()
            .map(|(user_id, display_name)| {
                let predictions = by_user.remove(&user_id).unwrap_or_default();
                Entrant {
                    user_id,
                    display_name,
                    predictions,
                }
            })
            .collect())
    }
}
