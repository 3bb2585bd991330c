// Scoring engine: compares a user's bracket against the official one.
//
// Both sides are resolved with the same template first, so qualifier and
// champion checks see the teams each bracket actually advanced.

use std::collections::{BTreeMap, HashMap};
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::bracket::{BracketTemplate, MatchId, Round, Slot, TeamName};
use crate::error::TemplateError;
use crate::resolver::{resolve_fixture, VirtualFixture};
use crate::rules::{RoundPoints, ScoringRules, TierMode};
use crate::score::{ScoreInput, ScoreSet};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Best score-accuracy tier a prediction reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Sign,
    Difference,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Official result and prediction both present.
    Scored,
    /// No official result yet; contributes nothing and costs nothing.
    Pending,
    /// Official result present but the user left the match blank.
    NotPredicted,
}

/// Points earned on one match. Every field is already multiplied where the
/// rules call for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub sign_points: u32,
    pub difference_points: u32,
    pub exact_points: u32,
    pub qualifier_bonus: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.sign_points
            .saturating_add(self.difference_points)
            .saturating_add(self.exact_points)
            .saturating_add(self.qualifier_bonus)
    }
}

impl Add for ScoreBreakdown {
    type Output = ScoreBreakdown;

    fn add(self, other: ScoreBreakdown) -> ScoreBreakdown {
        ScoreBreakdown {
            sign_points: self.sign_points.saturating_add(other.sign_points),
            difference_points: self.difference_points.saturating_add(other.difference_points),
            exact_points: self.exact_points.saturating_add(other.exact_points),
            qualifier_bonus: self.qualifier_bonus.saturating_add(other.qualifier_bonus),
        }
    }
}

impl AddAssign for ScoreBreakdown {
    fn add_assign(&mut self, other: ScoreBreakdown) {
        *self = *self + other;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    pub match_id: MatchId,
    pub round: Round,
    pub slot: Slot,
    pub leg: u8,
    pub multiplier: u32,
    pub status: MatchStatus,
    pub tier: Option<Tier>,
    pub breakdown: ScoreBreakdown,
}

/// Who the user sent through one tie versus who actually went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifierResult {
    pub slot: Slot,
    pub round: Round,
    pub predicted: Option<TeamName>,
    pub official: Option<TeamName>,
    pub bonus: u32,
}

/// Terminal bonuses attached to the Final.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalBonus {
    pub predicted_champion: Option<TeamName>,
    pub official_champion: Option<TeamName>,
    pub predicted_runner_up: Option<TeamName>,
    pub official_runner_up: Option<TeamName>,
    pub champion_bonus: u32,
    pub runner_up_bonus: u32,
}

impl FinalBonus {
    pub fn total(&self) -> u32 {
        self.champion_bonus.saturating_add(self.runner_up_bonus)
    }
}

/// Subtotal for one round; the Final also carries the terminal bonuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSubtotal {
    pub breakdown: ScoreBreakdown,
    pub champion_bonus: u32,
    pub runner_up_bonus: u32,
}

impl RoundSubtotal {
    pub fn total(&self) -> u32 {
        self.breakdown
            .total()
            .saturating_add(self.champion_bonus)
            .saturating_add(self.runner_up_bonus)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScore {
    pub per_match: Vec<MatchScore>,
    pub qualifiers: Vec<QualifierResult>,
    pub final_bonus: FinalBonus,
    pub total: u32,
}

impl UserScore {
    /// Per-round subtotals for drill-down views. Rounds with no matches in
    /// the template are absent.
    pub fn by_round(&self) -> BTreeMap<Round, RoundSubtotal> {
        let mut rounds: BTreeMap<Round, RoundSubtotal> = BTreeMap::new();
        for score in &self.per_match {
            rounds.entry(score.round).or_default().breakdown += score.breakdown;
        }
        if let Some(final_round) = rounds.get_mut(&Round::Final) {
            final_round.champion_bonus = self.final_bonus.champion_bonus;
            final_round.runner_up_bonus = self.final_bonus.runner_up_bonus;
        }
        rounds
    }

    pub fn scored_matches(&self) -> usize {
        self.per_match
            .iter()
            .filter(|m| m.status == MatchStatus::Scored)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score one user's predictions against the official results.
pub fn score_user(
    template: &BracketTemplate,
    predictions: &ScoreSet,
    official: &ScoreSet,
    rules: &ScoringRules,
) -> Result<UserScore, TemplateError> {
    let official_fixture = resolve_fixture(template, official)?;
    let user_fixture = resolve_fixture(template, predictions)?;
    Ok(score_fixtures(&user_fixture, &official_fixture, rules))
}

/// Score two fixtures already resolved from the same template.
pub fn score_fixtures(
    user: &VirtualFixture,
    official: &VirtualFixture,
    rules: &ScoringRules,
) -> UserScore {
    let predicted: HashMap<MatchId, &ScoreInput> = user
        .matches
        .iter()
        .filter_map(|m| m.score.as_ref().map(|s| (m.id, s)))
        .collect();

    let mut per_match: Vec<MatchScore> = official
        .matches
        .iter()
        .map(|m| {
            let points = rules.points(m.round);
            let (status, tier, breakdown) = score_match(
                predicted.get(&m.id).copied(),
                m.score.as_ref(),
                &points,
                m.bonus_multiplier,
                rules.tier_mode,
            );
            MatchScore {
                match_id: m.id,
                round: m.round,
                slot: m.slot.clone(),
                leg: m.leg,
                multiplier: m.bonus_multiplier,
                status,
                tier,
                breakdown,
            }
        })
        .collect();

    let mut qualifiers = Vec::new();
    for tie in official.ties.iter().filter(|t| t.round != Round::Final) {
        let official_winner = tie.outcome.winner();
        let predicted_winner = user.winner_of(&tie.slot);
        let bonus = match (official_winner, predicted_winner) {
            (Some(o), Some(p)) if o == p => rules.points(tie.round).qualifier,
            _ => 0,
        };
        // Booked once per tie, on the deciding leg, never multiplied.
        if bonus > 0 {
            if let Some(score) = tie
                .legs
                .last()
                .and_then(|id| per_match.iter_mut().find(|s| s.match_id == *id))
            {
                score.breakdown.qualifier_bonus = score.breakdown.qualifier_bonus.saturating_add(bonus);
            }
        }
        qualifiers.push(QualifierResult {
            slot: tie.slot.clone(),
            round: tie.round,
            predicted: predicted_winner.map(str::to_string),
            official: official_winner.map(str::to_string),
            bonus,
        });
    }

    let final_bonus = final_bonus(user, official, rules);
    // Point tables come from config, so totals saturate rather than wrap.
    let total = per_match
        .iter()
        .fold(final_bonus.total(), |acc, s| acc.saturating_add(s.breakdown.total()));

    UserScore {
        per_match,
        qualifiers,
        final_bonus,
        total,
    }
}

fn final_bonus(user: &VirtualFixture, official: &VirtualFixture, rules: &ScoringRules) -> FinalBonus {
    let mut bonus = FinalBonus {
        predicted_champion: user.champion().map(str::to_string),
        official_champion: official.champion().map(str::to_string),
        predicted_runner_up: user.runner_up().map(str::to_string),
        official_runner_up: official.runner_up().map(str::to_string),
        champion_bonus: 0,
        runner_up_bonus: 0,
    };
    if bonus.official_champion.is_some() && bonus.predicted_champion == bonus.official_champion {
        bonus.champion_bonus = rules.champion_bonus;
    }
    if bonus.official_runner_up.is_some() && bonus.predicted_runner_up == bonus.official_runner_up {
        bonus.runner_up_bonus = rules.runner_up_bonus;
    }
    bonus
}

/// Score-accuracy points for one match (no qualifier bonus).
pub fn score_match(
    predicted: Option<&ScoreInput>,
    official: Option<&ScoreInput>,
    points: &RoundPoints,
    multiplier: u32,
    mode: TierMode,
) -> (MatchStatus, Option<Tier>, ScoreBreakdown) {
    let Some(official) = official.filter(|o| o.goals().is_some()) else {
        return (MatchStatus::Pending, None, ScoreBreakdown::default());
    };
    let Some(predicted) = predicted.filter(|p| p.goals().is_some()) else {
        return (MatchStatus::NotPredicted, None, ScoreBreakdown::default());
    };

    let exact = predicted.goals() == official.goals();
    let difference = predicted.goal_difference() == official.goal_difference();
    let sign = predicted.sign() == official.sign();

    let tier = if exact {
        Some(Tier::Exact)
    } else if difference {
        Some(Tier::Difference)
    } else if sign {
        Some(Tier::Sign)
    } else {
        None
    };

    let mut breakdown = ScoreBreakdown::default();
    match mode {
        TierMode::Highest => match tier {
            Some(Tier::Exact) => breakdown.exact_points = points.exact.saturating_mul(multiplier),
            Some(Tier::Difference) => {
                breakdown.difference_points = points.difference.saturating_mul(multiplier)
            }
            Some(Tier::Sign) => breakdown.sign_points = points.sign.saturating_mul(multiplier),
            None => {}
        },
        TierMode::Cumulative => {
            if exact {
                breakdown.exact_points = points.exact.saturating_mul(multiplier);
            }
            if difference {
                breakdown.difference_points = points.difference.saturating_mul(multiplier);
            }
            if sign {
                breakdown.sign_points = points.sign.saturating_mul(multiplier);
            }
        }
    }

    (MatchStatus::Scored, tier, breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{MatchTemplate, ParticipantRef};

    fn pts() -> RoundPoints {
        RoundPoints::default_for(Round::PlayoffRound)
    }

    fn highest(p: ScoreInput, o: ScoreInput, multiplier: u32) -> (MatchStatus, Option<Tier>, ScoreBreakdown) {
        score_match(Some(&p), Some(&o), &pts(), multiplier, TierMode::Highest)
    }

    #[test]
    fn exact_score_awards_only_exact_points() {
        let (status, tier, b) = highest(ScoreInput::new(2, 1), ScoreInput::new(2, 1), 1);
        assert_eq!(status, MatchStatus::Scored);
        assert_eq!(tier, Some(Tier::Exact));
        assert_eq!(b.exact_points, 5);
        assert_eq!(b.difference_points, 0);
        assert_eq!(b.sign_points, 0);
        assert_eq!(b.total(), 5);
    }

    #[test]
    fn cumulative_mode_sums_every_tier() {
        let (_, _, b) = score_match(
            Some(&ScoreInput::new(2, 1)),
            Some(&ScoreInput::new(2, 1)),
            &pts(),
            1,
            TierMode::Cumulative,
        );
        assert_eq!(b.total(), 1 + 3 + 5);
    }

    #[test]
    fn goal_difference_tier() {
        let (_, tier, b) = highest(ScoreInput::new(3, 2), ScoreInput::new(1, 0), 1);
        assert_eq!(tier, Some(Tier::Difference));
        assert_eq!(b.total(), 3);
    }

    #[test]
    fn different_draws_share_goal_difference() {
        let (_, tier, _) = highest(ScoreInput::new(1, 1), ScoreInput::new(0, 0), 1);
        assert_eq!(tier, Some(Tier::Difference));
    }

    #[test]
    fn sign_only_is_multiplied() {
        let (_, tier, b) = highest(ScoreInput::new(3, 0), ScoreInput::new(1, 0), 3);
        assert_eq!(tier, Some(Tier::Sign));
        assert_eq!(b.sign_points, 3);
    }

    #[test]
    fn oversized_point_table_saturates() {
        let huge = RoundPoints::new(1, 3, u32::MAX, 2);
        let (_, tier, b) = score_match(
            Some(&ScoreInput::new(2, 1)),
            Some(&ScoreInput::new(2, 1)),
            &huge,
            10,
            TierMode::Cumulative,
        );
        assert_eq!(tier, Some(Tier::Exact));
        assert_eq!(b.exact_points, u32::MAX);
        assert_eq!(b.total(), u32::MAX);
        assert_eq!((b + b).exact_points, u32::MAX);
    }

    #[test]
    fn wrong_sign_scores_nothing() {
        let (status, tier, b) = highest(ScoreInput::new(0, 1), ScoreInput::new(1, 0), 1);
        assert_eq!(status, MatchStatus::Scored);
        assert_eq!(tier, None);
        assert_eq!(b.total(), 0);
    }

    #[test]
    fn missing_official_result_is_pending() {
        let partial = ScoreInput {
            home_goals: Some(1),
            ..ScoreInput::default()
        };
        let (status, _, b) = score_match(
            Some(&ScoreInput::new(1, 0)),
            Some(&partial),
            &pts(),
            1,
            TierMode::Highest,
        );
        assert_eq!(status, MatchStatus::Pending);
        assert_eq!(b.total(), 0);
    }

    #[test]
    fn blank_prediction_is_not_predicted() {
        let (status, _, _) = score_match(None, Some(&ScoreInput::new(1, 0)), &pts(), 1, TierMode::Highest);
        assert_eq!(status, MatchStatus::NotPredicted);
    }

    fn template_with_multiplier(multiplier: u32) -> BracketTemplate {
        let leg = |id, leg, home: &str, away: &str| MatchTemplate {
            id,
            round: Round::QuarterFinal,
            slot: Slot::new("WC1"),
            leg,
            home: ParticipantRef::team(home),
            away: ParticipantRef::team(away),
            kickoff: None,
            bonus_multiplier: multiplier,
        };
        BracketTemplate::new("test", vec![leg(1, 0, "A", "B"), leg(2, 1, "B", "A")])
    }

    #[test]
    fn qualifier_bonus_is_booked_once_and_never_multiplied() {
        let template = template_with_multiplier(3);
        let official: ScoreSet = [(1, ScoreInput::new(1, 0)), (2, ScoreInput::new(0, 0))].into();
        // Right qualifier, sign right on leg 0, wrong sign on leg 1.
        let predicted: ScoreSet = [(1, ScoreInput::new(3, 0)), (2, ScoreInput::new(0, 1))].into();

        let score = score_user(&template, &predicted, &official, &ScoringRules::default()).unwrap();
        let qf = RoundPoints::default_for(Round::QuarterFinal);

        assert_eq!(score.per_match[0].breakdown.sign_points, qf.sign * 3);
        assert_eq!(score.per_match[0].breakdown.qualifier_bonus, 0);
        assert_eq!(score.per_match[1].breakdown.qualifier_bonus, qf.qualifier);
        assert_eq!(score.qualifiers.len(), 1);
        assert_eq!(score.qualifiers[0].predicted.as_deref(), Some("A"));
        assert_eq!(score.total, qf.sign * 3 + qf.qualifier);
    }

    #[test]
    fn oversized_multiplier_is_refused_before_scoring() {
        let template = template_with_multiplier(u32::MAX);
        let scores: ScoreSet = [(1, ScoreInput::new(1, 0)), (2, ScoreInput::new(0, 0))].into();
        let err = score_user(&template, &scores, &scores, &ScoringRules::default()).unwrap_err();
        assert!(matches!(err, TemplateError::MultiplierTooLarge { id: 1, .. }));
    }

    #[test]
    fn no_qualifier_bonus_while_official_tie_is_open() {
        let template = template_with_multiplier(1);
        let official: ScoreSet = [(1, ScoreInput::new(1, 0))].into();
        let predicted: ScoreSet = [(1, ScoreInput::new(1, 0)), (2, ScoreInput::new(0, 0))].into();

        let score = score_user(&template, &predicted, &official, &ScoringRules::default()).unwrap();
        assert_eq!(score.qualifiers[0].bonus, 0);
        assert_eq!(score.qualifiers[0].official, None);
        assert_eq!(score.per_match[1].status, MatchStatus::Pending);
        assert_eq!(score.total, 6);
    }

    #[test]
    fn by_round_sums_to_total() {
        let template = template_with_multiplier(2);
        let official: ScoreSet = [(1, ScoreInput::new(2, 2)), (2, ScoreInput::new(1, 0))].into();
        let predicted: ScoreSet = [(1, ScoreInput::new(2, 2)), (2, ScoreInput::new(2, 0))].into();

        let score = score_user(&template, &predicted, &official, &ScoringRules::default()).unwrap();
        let rounds = score.by_round();
        let sum: u32 = rounds.values().map(RoundSubtotal::total).sum();
        assert_eq!(sum, score.total);
        assert_eq!(score.scored_matches(), 2);
    }
}
