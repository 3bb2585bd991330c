// Raw score inputs: the only source of truth for predictions and results.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bracket::MatchId;

/// Goals and (optional) penalty shoot-out for one match. `None` means the
/// value has not been entered yet; it is never read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_goals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_goals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty_home: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty_away: Option<u32>,
}

impl ScoreInput {
    pub fn new(home_goals: u32, away_goals: u32) -> Self {
        ScoreInput {
            home_goals: Some(home_goals),
            away_goals: Some(away_goals),
            penalty_home: None,
            penalty_away: None,
        }
    }

    pub fn with_penalties(mut self, home: u32, away: u32) -> Self {
        self.penalty_home = Some(home);
        self.penalty_away = Some(away);
        self
    }

    /// Both goal values, if both have been entered.
    pub fn goals(&self) -> Option<(u32, u32)> {
        Some((self.home_goals?, self.away_goals?))
    }

    /// Both penalty values, if both have been entered.
    pub fn penalties(&self) -> Option<(u32, u32)> {
        Some((self.penalty_home?, self.penalty_away?))
    }

    /// Home win / draw / away win, from the goals alone.
    pub fn sign(&self) -> Option<Ordering> {
        self.goals().map(|(h, a)| h.cmp(&a))
    }

    /// Home goals minus away goals.
    pub fn goal_difference(&self) -> Option<i64> {
        self.goals().map(|(h, a)| i64::from(h) - i64::from(a))
    }
}

/// Score inputs for a whole bracket, keyed by match id. A `BTreeMap` keeps
/// iteration (and hashing) order deterministic.
pub type ScoreSet = BTreeMap<MatchId, ScoreInput>;
