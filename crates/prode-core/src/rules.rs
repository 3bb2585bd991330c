// Point table for the knockout stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bracket::Round;

/// Points per accuracy tier for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPoints {
    /// Correct winner/draw.
    pub sign: u32,
    /// Correct goal difference.
    pub difference: u32,
    /// Exact score.
    pub exact: u32,
    /// Correctly predicted team advancing from a tie. Unused for the Final.
    pub qualifier: u32,
}

impl RoundPoints {
    pub const fn new(sign: u32, difference: u32, exact: u32, qualifier: u32) -> Self {
        RoundPoints {
            sign,
            difference,
            exact,
            qualifier,
        }
    }

    /// Default table for the continental cup.
    pub fn default_for(round: Round) -> Self {
        match round {
            Round::PlayoffRound => RoundPoints::new(1, 3, 5, 2),
            Round::RoundOf16 => RoundPoints::new(1, 3, 5, 3),
            Round::QuarterFinal => RoundPoints::new(2, 4, 6, 3),
            Round::SemiFinal => RoundPoints::new(2, 4, 6, 5),
            Round::Final => RoundPoints::new(4, 7, 10, 0),
        }
    }
}

/// How the score-accuracy tiers combine for a single match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierMode {
    /// Only the best tier reached counts.
    #[default]
    Highest,
    /// Every tier reached is added (an exact score also earns the
    /// difference and sign points).
    Cumulative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    #[serde(default)]
    pub tier_mode: TierMode,
    /// Per-round overrides; rounds missing here use `RoundPoints::default_for`.
    #[serde(default)]
    pub rounds: BTreeMap<Round, RoundPoints>,
    pub champion_bonus: u32,
    pub runner_up_bonus: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        ScoringRules {
            tier_mode: TierMode::Highest,
            rounds: Round::ALL
                .iter()
                .map(|&r| (r, RoundPoints::default_for(r)))
                .collect(),
            champion_bonus: 15,
            runner_up_bonus: 10,
        }
    }
}

impl ScoringRules {
    pub fn points(&self, round: Round) -> RoundPoints {
        self.rounds
            .get(&round)
            .copied()
            .unwrap_or_else(|| RoundPoints::default_for(round))
    }
}
