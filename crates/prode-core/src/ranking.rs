// Aggregation: per-user totals and the pool leaderboard.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bracket::{BracketTemplate, Round};
use crate::error::TemplateError;
use crate::resolver::{resolve_fixture, VirtualFixture};
use crate::rules::ScoringRules;
use crate::score::ScoreSet;
use crate::scoring::{score_fixtures, UserScore};

/// One pool participant with their raw predictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub user_id: String,
    pub display_name: String,
    pub predictions: ScoreSet,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// Competition ranking: equal totals share a position and the next
    /// position skips accordingly (1, 1, 3).
    pub position: usize,
    pub user_id: String,
    pub display_name: String,
    pub total: u32,
    pub by_round: BTreeMap<Round, u32>,
}

/// Build the leaderboard for every entrant.
pub fn build_ranking(
    entrants: &[Entrant],
    template: &BracketTemplate,
    official: &ScoreSet,
    rules: &ScoringRules,
) -> Result<Vec<RankedEntry>, TemplateError> {
    let official_fixture = resolve_fixture(template, official)?;
    build_ranking_against(entrants, template, &official_fixture, rules)
}

/// Same as [`build_ranking`] with the official fixture already resolved
/// (e.g. taken from a `FixtureCache`).
pub fn build_ranking_against(
    entrants: &[Entrant],
    template: &BracketTemplate,
    official: &VirtualFixture,
    rules: &ScoringRules,
) -> Result<Vec<RankedEntry>, TemplateError> {
    let mut scored: Vec<(&Entrant, UserScore)> = Vec::with_capacity(entrants.len());
    for entrant in entrants {
        let user_fixture = resolve_fixture(template, &entrant.predictions)?;
        let score = score_fixtures(&user_fixture, official, rules);
        debug!("{} scored {} points", entrant.user_id, score.total);
        scored.push((entrant, score));
    }
    Ok(rank(scored))
}

fn rank(mut scored: Vec<(&Entrant, UserScore)>) -> Vec<RankedEntry> {
    scored.sort_by(|(ea, sa), (eb, sb)| compare(ea, sa.total, eb, sb.total));

    let mut entries: Vec<RankedEntry> = Vec::with_capacity(scored.len());
    for (idx, (entrant, score)) in scored.into_iter().enumerate() {
        let position = match entries.last() {
            Some(prev) if prev.total == score.total => prev.position,
            _ => idx + 1,
        };
        entries.push(RankedEntry {
            position,
            user_id: entrant.user_id.clone(),
            display_name: entrant.display_name.clone(),
            total: score.total,
            by_round: score
                .by_round()
                .into_iter()
                .map(|(round, subtotal)| (round, subtotal.total()))
                .collect(),
        });
    }
    entries
}

/// Total descending, then display name ascending. The user id settles the
/// order of namesakes so output never depends on input order.
fn compare(a: &Entrant, a_total: u32, b: &Entrant, b_total: u32) -> Ordering {
    b_total
        .cmp(&a_total)
        .then_with(|| a.display_name.cmp(&b.display_name))
        .then_with(|| a.user_id.cmp(&b.user_id))
}
