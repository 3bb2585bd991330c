// Library root: bracket resolution and scoring for the continental-cup
// knockout stage of the prediction pool.
//
// Everything in this crate is pure: no I/O, no shared state. Callers hand in a
// bracket template plus raw score inputs and get derived views back.

pub mod bracket;
pub mod cache;
pub mod error;
pub mod ranking;
pub mod resolver;
pub mod rules;
pub mod score;
pub mod scoring;
pub mod tie;

pub use bracket::{BracketTemplate, MatchId, MatchTemplate, ParticipantRef, Round, Slot, TeamName, Tie};
pub use cache::FixtureCache;
pub use error::TemplateError;
pub use ranking::{build_ranking, Entrant, RankedEntry};
pub use resolver::{resolve_fixture, TieResolution, VirtualFixture, VirtualMatch};
pub use rules::{RoundPoints, ScoringRules, TierMode};
pub use score::{ScoreInput, ScoreSet};
pub use scoring::{score_user, MatchScore, MatchStatus, ScoreBreakdown, UserScore};
pub use tie::{resolve_tie, DecidedBy, LegView, TieOutcome, UndeterminedReason};
