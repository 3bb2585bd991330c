// Pool service: wires config, template, store and the scoring engine together.
//
// Every query re-reads the raw inputs from the database and derives the
// brackets from scratch; the fixture cache only saves re-resolving the
// official side when it has not changed between calls.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use prode_core::bracket::{BracketTemplate, MatchId};
use prode_core::cache::FixtureCache;
use prode_core::ranking::{build_ranking_against, RankedEntry};
use prode_core::resolver::{resolve_fixture, VirtualFixture};
use prode_core::scoring::{score_fixtures, UserScore};
use tracing::info;

use crate::config::Config;
use crate::db::Database;
use crate::import;
use crate::template::load_template;

pub struct Pool {
    pub config: Config,
    db: Database,
    cache: FixtureCache,
}

impl Pool {
    /// Load the template named in `config` and open its database.
    pub fn open(config: Config) -> Result<Self> {
        let template = load_template(&config.template_path)
            .context("failed to load bracket template")?;
        let db = Database::open(&config.db_path).context("failed to open database")?;
        info!("Database opened at {}", config.db_path);
        Ok(Self::from_parts(config, template, db))
    }

    /// Assemble a pool from already-loaded pieces. The template must have
    /// passed validation.
    pub fn from_parts(config: Config, template: BracketTemplate, db: Database) -> Self {
        Pool {
            config,
            db,
            cache: FixtureCache::new(template),
        }
    }

    pub fn template(&self) -> &BracketTemplate {
        self.cache.template()
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Official bracket as it stands with the results entered so far.
    pub fn official_fixture(&mut self) -> Result<VirtualFixture> {
        let official = self.db.load_official()?;
        self.cache
            .resolve(&official)
            .context("failed to resolve official fixture")
    }

    /// One user's own virtual bracket.
    pub fn user_fixture(&self, user_id: &str) -> Result<VirtualFixture> {
        self.require_user(user_id)?;
        let predictions = self.db.load_predictions(user_id)?;
        resolve_fixture(self.template(), &predictions)
            .with_context(|| format!("failed to resolve fixture for {user_id}"))
    }

    /// Leaderboard over every registered user.
    pub fn rank(&mut self) -> Result<Vec<RankedEntry>> {
        let official = self.official_fixture()?;
        let entrants = self.db.load_entrants()?;
        let ranking = build_ranking_against(&entrants, self.template(), &official, &self.config.scoring)
            .context("failed to build ranking")?;
        info!("Ranked {} entrants", ranking.len());
        Ok(ranking)
    }

    /// Full score breakdown for one user, with their display name.
    pub fn points(&mut self, user_id: &str) -> Result<(String, UserScore)> {
        let display_name = self.require_user(user_id)?;
        let official = self.official_fixture()?;
        let user = self.user_fixture(user_id)?;
        Ok((display_name, score_fixtures(&user, &official, &self.config.scoring)))
    }

    /// Matches whose kickoff is before `now` but have no complete official
    /// score yet.
    pub fn overdue_matches(&self, now: DateTime<Utc>) -> Result<Vec<MatchId>> {
        let official = self.db.load_official()?;
        Ok(self
            .template()
            .matches
            .iter()
            .filter(|m| m.kickoff.is_some_and(|k| k < now))
            .filter(|m| official.get(&m.id).and_then(|s| s.goals()).is_none())
            .map(|m| m.id)
            .collect())
    }

    fn require_user(&self, user_id: &str) -> Result<String> {
        match self.db.display_name(user_id)? {
            Some(name) => Ok(name),
            None => bail!("unknown user '{user_id}'"),
        }
    }

    // ------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------

    /// Import official results from CSV. Returns the number of rows stored.
    pub fn import_results(&mut self, path: &Path) -> Result<usize> {
        let results = import::load_results(path, self.template())?;
        self.db.record_official_batch(&results)?;
        info!("Imported {} official results from {}", results.len(), path.display());
        Ok(results.len())
    }

    /// Import predictions from CSV. Returns the number of rows stored.
    pub fn import_predictions(&mut self, path: &Path) -> Result<usize> {
        let rows = import::load_predictions(path, self.template())?;
        self.db.import_predictions(&rows)?;
        info!("Imported {} predictions from {}", rows.len(), path.display());
        Ok(rows.len())
    }
}
