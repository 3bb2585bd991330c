// CSV import of official results and user predictions.
//
// Blank goal or penalty cells mean "not entered" and stay `None`. Rows that
// fail to parse or name a match outside the template are logged and skipped.

use std::io::Read;
use std::path::Path;

use prode_core::bracket::{BracketTemplate, MatchId};
use prode_core::score::ScoreInput;
use serde::Deserialize;
use tracing::warn;

/// Goal and penalty counts above this are treated as data-entry mistakes.
const MAX_GOALS: u32 = 99;

fn within_range(score: &ScoreInput) -> bool {
    [
        score.home_goals,
        score.away_goals,
        score.penalty_home,
        score.penalty_away,
    ]
    .into_iter()
    .flatten()
    .all(|g| g <= MAX_GOALS)
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// One imported prediction line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRow {
    pub user_id: String,
    pub display_name: String,
    pub match_id: MatchId,
    pub score: ScoreInput,
}

// ---------------------------------------------------------------------------
// Raw CSV rows (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawResult {
    match_id: MatchId,
    home_goals: Option<u32>,
    away_goals: Option<u32>,
    #[serde(default)]
    penalty_home: Option<u32>,
    #[serde(default)]
    penalty_away: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    user_id: String,
    #[serde(default)]
    display_name: String,
    match_id: MatchId,
    home_goals: Option<u32>,
    away_goals: Option<u32>,
    #[serde(default)]
    penalty_home: Option<u32>,
    #[serde(default)]
    penalty_away: Option<u32>,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, testable without temp files)
// ---------------------------------------------------------------------------

fn results_from_reader<R: Read>(
    rdr: R,
    template: &BracketTemplate,
) -> Result<Vec<(MatchId, ScoreInput)>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut results: Vec<(MatchId, ScoreInput)> = Vec::new();
    for result in reader.deserialize::<RawResult>() {
        match result {
            Ok(raw) => {
                if !template.contains_match(raw.match_id) {
                    warn!("skipping result for unknown match {}", raw.match_id);
                    continue;
                }
                let score = ScoreInput {
                    home_goals: raw.home_goals,
                    away_goals: raw.away_goals,
                    penalty_home: raw.penalty_home,
                    penalty_away: raw.penalty_away,
                };
                if !within_range(&score) {
                    warn!("skipping result for match {}: more than {} goals", raw.match_id, MAX_GOALS);
                    continue;
                }
                if let Some(existing) = results.iter_mut().find(|(id, _)| *id == raw.match_id) {
                    warn!("duplicate result for match {}, using latest value", raw.match_id);
                    existing.1 = score;
                } else {
                    results.push((raw.match_id, score));
                }
            }
            Err(e) => {
                warn!("skipping malformed result row: {}", e);
            }
        }
    }
    Ok(results)
}

fn predictions_from_reader<R: Read>(
    rdr: R,
    template: &BracketTemplate,
) -> Result<Vec<PredictionRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawPrediction>() {
        match result {
            Ok(raw) => {
                if raw.user_id.is_empty() {
                    warn!("skipping prediction for match {}: empty user_id", raw.match_id);
                    continue;
                }
                if !template.contains_match(raw.match_id) {
                    warn!(
                        "skipping prediction by '{}' for unknown match {}",
                        raw.user_id, raw.match_id
                    );
                    continue;
                }
                let score = ScoreInput {
                    home_goals: raw.home_goals,
                    away_goals: raw.away_goals,
                    penalty_home: raw.penalty_home,
                    penalty_away: raw.penalty_away,
                };
                if !within_range(&score) {
                    warn!(
                        "skipping prediction by '{}' for match {}: more than {} goals",
                        raw.user_id, raw.match_id, MAX_GOALS
                    );
                    continue;
                }
                let display_name = if raw.display_name.is_empty() {
                    raw.user_id.clone()
                } else {
                    raw.display_name
                };
                rows.push(PredictionRow {
                    user_id: raw.user_id,
                    display_name,
                    match_id: raw.match_id,
                    score,
                });
            }
            Err(e) => {
                warn!("skipping malformed prediction row: {}", e);
            }
        }
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load official results from a CSV file with columns
/// `match_id,home_goals,away_goals,penalty_home,penalty_away`.
pub fn load_results(
    path: &Path,
    template: &BracketTemplate,
) -> Result<Vec<(MatchId, ScoreInput)>, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    results_from_reader(file, template).map_err(|e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load predictions from a CSV file with columns
/// `user_id,display_name,match_id,home_goals,away_goals,penalty_home,penalty_away`.
pub fn load_predictions(
    path: &Path,
    template: &BracketTemplate,
) -> Result<Vec<PredictionRow>, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    predictions_from_reader(file, template).map_err(|e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
