// Tie outcome calculator: who advances from one single- or two-legged tie.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::bracket::{ParticipantRef, Slot, TeamName};
use crate::error::TemplateError;
use crate::score::ScoreInput;

/// One leg as seen by the calculator: participants after slot substitution
/// plus whatever score was entered for it.
#[derive(Debug, Clone, Copy)]
pub struct LegView<'a> {
    pub home: &'a ParticipantRef,
    pub away: &'a ParticipantRef,
    pub score: Option<&'a ScoreInput>,
}

/// What settled a decided tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecidedBy {
    /// Single leg won on goals.
    Goals,
    /// Two legs won on aggregate goals.
    Aggregate,
    Penalties,
}

/// Why a tie has no winner yet. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndeterminedReason {
    /// A goal or a needed penalty value has not been entered.
    IncompleteData,
    /// Level after goals and penalties.
    Level,
    /// Penalties are present but the second leg's home/away sides could not
    /// be mapped back onto the first leg's participants.
    AmbiguousPenaltyMapping,
    /// The side that would advance is still an unresolved slot.
    UnresolvedParticipant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TieOutcome {
    Decided {
        winner: TeamName,
        loser: TeamName,
        decided_by: DecidedBy,
    },
    Undetermined {
        reason: UndeterminedReason,
    },
}

impl TieOutcome {
    fn undetermined(reason: UndeterminedReason) -> Self {
        TieOutcome::Undetermined { reason }
    }

    pub fn winner(&self) -> Option<&str> {
        match self {
            TieOutcome::Decided { winner, .. } => Some(winner),
            TieOutcome::Undetermined { .. } => None,
        }
    }

    pub fn loser(&self) -> Option<&str> {
        match self {
            TieOutcome::Decided { loser, .. } => Some(loser),
            TieOutcome::Undetermined { .. } => None,
        }
    }

    pub fn is_decided(&self) -> bool {
        matches!(self, TieOutcome::Decided { .. })
    }
}

/// Which side of the first leg advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// Home team of the first leg ("A").
    First,
    /// Away team of the first leg ("B").
    Second,
}

fn side_from(ordering: Ordering) -> Option<Side> {
    match ordering {
        Ordering::Greater => Some(Side::First),
        Ordering::Less => Some(Side::Second),
        Ordering::Equal => None,
    }
}

/// Resolve one tie from its legs, ordered by leg index.
///
/// Only a leg count other than 1 or 2 is an error; every data problem is
/// reported as `TieOutcome::Undetermined`.
pub fn resolve_tie(slot: &Slot, legs: &[LegView<'_>]) -> Result<TieOutcome, TemplateError> {
    let decided = match legs {
        [only] => resolve_single(only),
        [first, second] => resolve_two_legged(first, second),
        _ => {
            return Err(TemplateError::LegCount {
                slot: slot.clone(),
                legs: legs.len(),
            })
        }
    };

    let (side, decided_by) = match decided {
        Ok(found) => found,
        Err(reason) => return Ok(TieOutcome::undetermined(reason)),
    };

    let (winner, loser) = match side {
        Side::First => (legs[0].home, legs[0].away),
        Side::Second => (legs[0].away, legs[0].home),
    };
    match (winner.as_team(), loser.as_team()) {
        (Some(winner), Some(loser)) => Ok(TieOutcome::Decided {
            winner: winner.to_string(),
            loser: loser.to_string(),
            decided_by,
        }),
        _ => Ok(TieOutcome::undetermined(
            UndeterminedReason::UnresolvedParticipant,
        )),
    }
}

fn resolve_single(leg: &LegView<'_>) -> Result<(Side, DecidedBy), UndeterminedReason> {
    let score = leg.score.ok_or(UndeterminedReason::IncompleteData)?;
    let (home, away) = score.goals().ok_or(UndeterminedReason::IncompleteData)?;
    if let Some(side) = side_from(home.cmp(&away)) {
        return Ok((side, DecidedBy::Goals));
    }

    let (pen_home, pen_away) = score
        .penalties()
        .ok_or(UndeterminedReason::IncompleteData)?;
    side_from(pen_home.cmp(&pen_away))
        .map(|side| (side, DecidedBy::Penalties))
        .ok_or(UndeterminedReason::Level)
}

fn resolve_two_legged(
    first: &LegView<'_>,
    second: &LegView<'_>,
) -> Result<(Side, DecidedBy), UndeterminedReason> {
    // Every leg needs its goals before the tie can be judged at all.
    let first_score = first.score.ok_or(UndeterminedReason::IncompleteData)?;
    let second_score = second.score.ok_or(UndeterminedReason::IncompleteData)?;
    let (first_home, first_away) = first_score
        .goals()
        .ok_or(UndeterminedReason::IncompleteData)?;
    let (second_home, second_away) = second_score
        .goals()
        .ok_or(UndeterminedReason::IncompleteData)?;

    // Normally the first leg's away side hosts the second leg.
    let swapped = second.home == first.away && second.away == first.home;
    let same = second.home == first.home && second.away == first.away;
    if !swapped && !same {
        return Err(UndeterminedReason::AmbiguousPenaltyMapping);
    }

    let (second_for_a, second_for_b) = if swapped {
        (second_away, second_home)
    } else {
        (second_home, second_away)
    };
    // Widened so two stored u32 goal counts can never overflow the sum.
    let goals_a = u64::from(first_home) + u64::from(second_for_a);
    let goals_b = u64::from(first_away) + u64::from(second_for_b);
    if let Some(side) = side_from(goals_a.cmp(&goals_b)) {
        return Ok((side, DecidedBy::Aggregate));
    }

    let (pen_home, pen_away) = second_score
        .penalties()
        .ok_or(UndeterminedReason::IncompleteData)?;
    let (pen_a, pen_b) = if swapped {
        (pen_away, pen_home)
    } else {
        (pen_home, pen_away)
    };
    side_from(pen_a.cmp(&pen_b))
        .map(|side| (side, DecidedBy::Penalties))
        .ok_or(UndeterminedReason::Level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(name: &str) -> ParticipantRef {
        ParticipantRef::team(name)
    }

    fn slot() -> Slot {
        Slot::new("W1")
    }

    fn view<'a>(
        home: &'a ParticipantRef,
        away: &'a ParticipantRef,
        score: Option<&'a ScoreInput>,
    ) -> LegView<'a> {
        LegView { home, away, score }
    }

    #[test]
    fn single_leg_goals_decide() {
        let (h, a) = (team("Home"), team("Away"));
        let score = ScoreInput::new(0, 2);
        let outcome = resolve_tie(&slot(), &[view(&h, &a, Some(&score))]).unwrap();
        assert_eq!(outcome.winner(), Some("Away"));
        assert_eq!(outcome.loser(), Some("Home"));
    }

    #[test]
    fn single_leg_penalties_break_draw() {
        let (h, a) = (team("Home"), team("Away"));
        let score = ScoreInput::new(1, 1).with_penalties(5, 4);
        let outcome = resolve_tie(&slot(), &[view(&h, &a, Some(&score))]).unwrap();
        assert_eq!(
            outcome,
            TieOutcome::Decided {
                winner: "Home".into(),
                loser: "Away".into(),
                decided_by: DecidedBy::Penalties,
            }
        );
    }

    #[test]
    fn single_leg_draw_without_penalties_is_incomplete() {
        let (h, a) = (team("Home"), team("Away"));
        let score = ScoreInput::new(1, 1);
        let outcome = resolve_tie(&slot(), &[view(&h, &a, Some(&score))]).unwrap();
        assert_eq!(
            outcome,
            TieOutcome::Undetermined {
                reason: UndeterminedReason::IncompleteData
            }
        );
    }

    #[test]
    fn equal_penalties_are_level() {
        let (h, a) = (team("Home"), team("Away"));
        let score = ScoreInput::new(0, 0).with_penalties(3, 3);
        let outcome = resolve_tie(&slot(), &[view(&h, &a, Some(&score))]).unwrap();
        assert_eq!(
            outcome,
            TieOutcome::Undetermined {
                reason: UndeterminedReason::Level
            }
        );
    }

    #[test]
    fn two_legs_aggregate_decides() {
        let (x, y) = (team("TeamX"), team("TeamY"));
        let leg0 = ScoreInput::new(1, 0);
        let leg1 = ScoreInput::new(2, 0);
        let outcome = resolve_tie(
            &slot(),
            &[view(&x, &y, Some(&leg0)), view(&y, &x, Some(&leg1))],
        )
        .unwrap();
        assert_eq!(outcome.winner(), Some("TeamY"));
        assert!(matches!(
            outcome,
            TieOutcome::Decided {
                decided_by: DecidedBy::Aggregate,
                ..
            }
        ));
    }

    #[test]
    fn huge_aggregate_does_not_overflow() {
        let (x, y) = (team("TeamX"), team("TeamY"));
        let leg0 = ScoreInput::new(u32::MAX, 0);
        let leg1 = ScoreInput::new(0, 1);
        let outcome = resolve_tie(
            &slot(),
            &[view(&x, &y, Some(&leg0)), view(&y, &x, Some(&leg1))],
        )
        .unwrap();
        assert_eq!(outcome.winner(), Some("TeamX"));

        let leg1 = ScoreInput::new(u32::MAX, 0);
        let outcome = resolve_tie(
            &slot(),
            &[view(&x, &y, Some(&leg0)), view(&y, &x, Some(&leg1))],
        )
        .unwrap();
        assert_eq!(
            outcome,
            TieOutcome::Undetermined {
                reason: UndeterminedReason::IncompleteData
            }
        );
    }

    #[test]
    fn two_legs_level_aggregate_uses_second_leg_penalties() {
        // A 2-1 B, then B 1-0 A: 2-2 on aggregate. Second leg is hosted by B,
        // so its away penalties belong to A.
        let (a, b) = (team("A"), team("B"));
        let leg0 = ScoreInput::new(2, 1);
        let leg1 = ScoreInput::new(1, 0).with_penalties(3, 4);
        let outcome = resolve_tie(
            &slot(),
            &[view(&a, &b, Some(&leg0)), view(&b, &a, Some(&leg1))],
        )
        .unwrap();
        assert_eq!(outcome.winner(), Some("A"));
        assert_eq!(outcome.loser(), Some("B"));
    }

    #[test]
    fn penalties_follow_second_leg_orientation_when_not_swapped() {
        let (a, b) = (team("A"), team("B"));
        let leg0 = ScoreInput::new(1, 1);
        let leg1 = ScoreInput::new(0, 0).with_penalties(3, 4);
        let outcome = resolve_tie(
            &slot(),
            &[view(&a, &b, Some(&leg0)), view(&a, &b, Some(&leg1))],
        )
        .unwrap();
        assert_eq!(outcome.winner(), Some("B"));
    }

    #[test]
    fn missing_goals_in_either_leg_leave_tie_open() {
        let (a, b) = (team("A"), team("B"));
        let missing_home = ScoreInput {
            away_goals: Some(0),
            ..ScoreInput::default()
        };
        let big_win = ScoreInput::new(5, 0);
        let outcome = resolve_tie(
            &slot(),
            &[view(&a, &b, Some(&big_win)), view(&b, &a, Some(&missing_home))],
        )
        .unwrap();
        assert_eq!(
            outcome,
            TieOutcome::Undetermined {
                reason: UndeterminedReason::IncompleteData
            }
        );

        let outcome =
            resolve_tie(&slot(), &[view(&a, &b, Some(&big_win)), view(&b, &a, None)]).unwrap();
        assert!(!outcome.is_decided());
    }

    #[test]
    fn unmatched_second_leg_is_ambiguous() {
        let (a, b, c) = (team("A"), team("B"), team("C"));
        let leg0 = ScoreInput::new(1, 1);
        let leg1 = ScoreInput::new(0, 0).with_penalties(4, 2);
        let outcome = resolve_tie(
            &slot(),
            &[view(&a, &b, Some(&leg0)), view(&c, &a, Some(&leg1))],
        )
        .unwrap();
        assert_eq!(
            outcome,
            TieOutcome::Undetermined {
                reason: UndeterminedReason::AmbiguousPenaltyMapping
            }
        );
    }

    #[test]
    fn symbolic_winner_is_not_a_team() {
        let (s, b) = (ParticipantRef::slot("WP1"), team("B"));
        let score = ScoreInput::new(3, 0);
        let outcome = resolve_tie(&slot(), &[view(&s, &b, Some(&score))]).unwrap();
        assert_eq!(
            outcome,
            TieOutcome::Undetermined {
                reason: UndeterminedReason::UnresolvedParticipant
            }
        );
    }

    #[test]
    fn empty_tie_is_a_template_error() {
        assert_eq!(
            resolve_tie(&slot(), &[]).unwrap_err(),
            TemplateError::LegCount {
                slot: slot(),
                legs: 0
            }
        );
    }
}
