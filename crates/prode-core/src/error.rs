// Template errors: a bracket template that cannot be resolved safely.

use thiserror::Error;

use crate::bracket::{MatchId, Round, Slot};

/// A corrupted or inconsistent bracket template.
///
/// Any of these aborts resolution for the whole edition. Missing scores are
/// never reported here; they surface as an undetermined tie instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("match id {id} appears more than once")]
    DuplicateMatchId { id: MatchId },

    #[error("match {id} has a bonus multiplier of 0 (must be >= 1)")]
    ZeroMultiplier { id: MatchId },

    #[error("match {id} has a bonus multiplier of {multiplier} (at most {max})")]
    MultiplierTooLarge { id: MatchId, multiplier: u32, max: u32 },

    #[error("slot {slot} is produced by matches in more than one round")]
    SlotInSeveralRounds { slot: Slot },

    #[error("tie {slot} has {legs} legs (must be 1 or 2)")]
    LegCount { slot: Slot, legs: usize },

    #[error("tie {slot} in {round} has {found} legs, expected {expected}")]
    RoundLegMismatch {
        slot: Slot,
        round: Round,
        expected: usize,
        found: usize,
    },

    #[error("tie {slot} has an invalid or repeated leg index {leg}")]
    BadLegIndex { slot: Slot, leg: u8 },

    #[error("the legs of tie {slot} do not involve the same two participants")]
    MismatchedLegs { slot: Slot },

    #[error("tie {slot} pairs a participant against itself")]
    SelfPairing { slot: Slot },

    #[error("match {match_id} references slot {slot}, which no tie produces")]
    UnknownSlot { match_id: MatchId, slot: Slot },

    #[error("match {match_id} consumes slot {slot} before it is produced")]
    ConsumedBeforeProduced { match_id: MatchId, slot: Slot },

    #[error("slot {slot} is consumed by more than one tie")]
    SlotConsumedTwice { slot: Slot },

    #[error("template has {count} final ties (at most 1 allowed)")]
    MultipleFinals { count: usize },
}
