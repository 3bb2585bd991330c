// Bracket template: rounds, ties, legs and the slot graph linking them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TemplateError;

/// Concrete team name, compared by exact string identity.
pub type TeamName = String;

/// Fixture identifier shared by the template, official results and predictions.
pub type MatchId = u32;

// ---------------------------------------------------------------------------
// Round
// ---------------------------------------------------------------------------

/// Knockout stage. Declaration order is the order in which rounds are played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Round {
    #[serde(rename = "playoff")]
    PlayoffRound,
    #[serde(rename = "round_of_16")]
    RoundOf16,
    #[serde(rename = "quarter_final")]
    QuarterFinal,
    #[serde(rename = "semi_final")]
    SemiFinal,
    #[serde(rename = "final")]
    Final,
}

impl Round {
    pub const ALL: [Round; 5] = [
        Round::PlayoffRound,
        Round::RoundOf16,
        Round::QuarterFinal,
        Round::SemiFinal,
        Round::Final,
    ];

    /// Number of legs every tie of this round is played over.
    pub fn leg_count(self) -> usize {
        match self {
            Round::Final => 1,
            _ => 2,
        }
    }

    /// Key used in config files and JSON output.
    pub fn key(self) -> &'static str {
        match self {
            Round::PlayoffRound => "playoff",
            Round::RoundOf16 => "round_of_16",
            Round::QuarterFinal => "quarter_final",
            Round::SemiFinal => "semi_final",
            Round::Final => "final",
        }
    }

    /// Column heading, same as the short alias accepted by `from_key`.
    pub fn short_label(self) -> &'static str {
        match self {
            Round::PlayoffRound => "PO",
            Round::RoundOf16 => "R16",
            Round::QuarterFinal => "QF",
            Round::SemiFinal => "SF",
            Round::Final => "F",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Round::PlayoffRound => "Playoff round",
            Round::RoundOf16 => "Round of 16",
            Round::QuarterFinal => "Quarter-finals",
            Round::SemiFinal => "Semi-finals",
            Round::Final => "Final",
        }
    }

    /// Parse a round key (`"round_of_16"`) or a short alias (`"r16"`, `"qf"`).
    pub fn from_key(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "playoff" | "playoff_round" | "po" => Some(Round::PlayoffRound),
            "round_of_16" | "r16" => Some(Round::RoundOf16),
            "quarter_final" | "qf" => Some(Round::QuarterFinal),
            "semi_final" | "sf" => Some(Round::SemiFinal),
            "final" | "f" => Some(Round::Final),
            _ => None,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Slots and participant references
// ---------------------------------------------------------------------------

/// Symbolic name of one tie's outcome (e.g. `WO.E`, `WC1`, `WS1`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(String);

impl Slot {
    pub fn new(name: impl Into<String>) -> Self {
        Slot(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One side of a match: a known team, or the winner of another tie.
///
/// Decided when the template is authored; never sniffed from the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRef {
    Team(TeamName),
    Slot(Slot),
}

impl ParticipantRef {
    pub fn team(name: impl Into<String>) -> Self {
        ParticipantRef::Team(name.into())
    }

    pub fn slot(name: impl Into<String>) -> Self {
        ParticipantRef::Slot(Slot::new(name))
    }

    /// The concrete team, if this side is already known.
    pub fn as_team(&self) -> Option<&str> {
        match self {
            ParticipantRef::Team(name) => Some(name),
            ParticipantRef::Slot(_) => None,
        }
    }

    pub fn as_slot(&self) -> Option<&Slot> {
        match self {
            ParticipantRef::Team(_) => None,
            ParticipantRef::Slot(slot) => Some(slot),
        }
    }

    /// Substitute a slot reference whose winner is already known.
    pub fn substitute(&self, advanced: &BTreeMap<Slot, TeamName>) -> ParticipantRef {
        match self {
            ParticipantRef::Slot(slot) => match advanced.get(slot) {
                Some(team) => ParticipantRef::Team(team.clone()),
                None => self.clone(),
            },
            ParticipantRef::Team(_) => self.clone(),
        }
    }
}

impl fmt::Display for ParticipantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantRef::Team(name) => f.write_str(name),
            ParticipantRef::Slot(slot) => write!(f, "{slot}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Matches, ties, template
// ---------------------------------------------------------------------------

/// Largest bonus multiplier a template may assign to one match.
pub const MAX_BONUS_MULTIPLIER: u32 = 10;

fn default_multiplier() -> u32 {
    1
}

/// One physical match of the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTemplate {
    pub id: MatchId,
    pub round: Round,
    /// Slot produced by the tie this match belongs to.
    pub slot: Slot,
    /// 0 for a single or first leg, 1 for a second leg.
    #[serde(default)]
    pub leg: u8,
    pub home: ParticipantRef,
    pub away: ParticipantRef,
    /// Scheduled kickoff; `None` while the date is still to be confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kickoff: Option<DateTime<Utc>>,
    /// Applied to score-accuracy points for this match only.
    #[serde(default = "default_multiplier")]
    pub bonus_multiplier: u32,
}

/// The unit of elimination: the legs sharing one produced slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tie {
    pub slot: Slot,
    pub round: Round,
    /// Match ids ordered by leg index.
    pub legs: Vec<MatchId>,
}

impl Tie {
    /// The leg whose penalties break a level tie and which carries the
    /// qualifier bonus.
    pub fn deciding_leg(&self) -> Option<MatchId> {
        self.legs.last().copied()
    }
}

/// Static description of one edition's knockout stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTemplate {
    pub edition: String,
    #[serde(rename = "match", default)]
    pub matches: Vec<MatchTemplate>,
}

impl BracketTemplate {
    pub fn new(edition: impl Into<String>, matches: Vec<MatchTemplate>) -> Self {
        BracketTemplate {
            edition: edition.into(),
            matches,
        }
    }

    pub fn match_by_id(&self, id: MatchId) -> Option<&MatchTemplate> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn contains_match(&self, id: MatchId) -> bool {
        self.match_by_id(id).is_some()
    }

    /// Validate the slot graph and group matches into ties, ordered by round
    /// and then by first appearance in the template.
    pub fn ties(&self) -> Result<Vec<Tie>, TemplateError> {
        self.group_ties()
            .inspect_err(|e| warn!("template '{}' is inconsistent: {}", self.edition, e))
    }

    fn group_ties(&self) -> Result<Vec<Tie>, TemplateError> {
        let mut seen_ids = HashSet::new();
        for m in &self.matches {
            if !seen_ids.insert(m.id) {
                return Err(TemplateError::DuplicateMatchId { id: m.id });
            }
            if m.bonus_multiplier == 0 {
                return Err(TemplateError::ZeroMultiplier { id: m.id });
            }
            if m.bonus_multiplier > MAX_BONUS_MULTIPLIER {
                return Err(TemplateError::MultiplierTooLarge {
                    id: m.id,
                    multiplier: m.bonus_multiplier,
                    max: MAX_BONUS_MULTIPLIER,
                });
            }
        }

        // Group by produced slot, keeping first-appearance order.
        let mut order: Vec<&Slot> = Vec::new();
        let mut groups: HashMap<&Slot, Vec<&MatchTemplate>> = HashMap::new();
        for m in &self.matches {
            let group = groups.entry(&m.slot).or_default();
            if group.is_empty() {
                order.push(&m.slot);
            }
            group.push(m);
        }

        let mut ties = Vec::with_capacity(order.len());
        let mut produced_in: HashMap<&Slot, Round> = HashMap::new();
        for slot in order {
            let mut legs = groups.remove(slot).unwrap_or_default();
            let tie = build_tie(slot, &mut legs)?;
            produced_in.insert(slot, tie.round);
            ties.push(tie);
        }

        let finals = ties.iter().filter(|t| t.round == Round::Final).count();
        if finals > 1 {
            return Err(TemplateError::MultipleFinals { count: finals });
        }

        // Every reference must point at a slot produced in an earlier round,
        // and each slot feeds exactly one downstream tie.
        let mut consumer_of: HashMap<&Slot, &Slot> = HashMap::new();
        for m in &self.matches {
            for side in [&m.home, &m.away] {
                let Some(referenced) = side.as_slot() else {
                    continue;
                };
                let Some(&producer_round) = produced_in.get(referenced) else {
                    return Err(TemplateError::UnknownSlot {
                        match_id: m.id,
                        slot: referenced.clone(),
                    });
                };
                if producer_round >= m.round {
                    return Err(TemplateError::ConsumedBeforeProduced {
                        match_id: m.id,
                        slot: referenced.clone(),
                    });
                }
                match consumer_of.get(referenced) {
                    Some(&consumer) if consumer != &m.slot => {
                        return Err(TemplateError::SlotConsumedTwice {
                            slot: referenced.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        consumer_of.insert(referenced, &m.slot);
                    }
                }
            }
        }

        // Stable sort keeps template order within a round.
        ties.sort_by_key(|t| t.round);
        Ok(ties)
    }
}

/// Check one slot's legs and turn them into a `Tie`.
fn build_tie(slot: &Slot, legs: &mut [&MatchTemplate]) -> Result<Tie, TemplateError> {
    let round = legs[0].round;
    if legs.iter().any(|m| m.round != round) {
        return Err(TemplateError::SlotInSeveralRounds { slot: slot.clone() });
    }
    if !(1..=2).contains(&legs.len()) {
        return Err(TemplateError::LegCount {
            slot: slot.clone(),
            legs: legs.len(),
        });
    }
    if legs.len() != round.leg_count() {
        return Err(TemplateError::RoundLegMismatch {
            slot: slot.clone(),
            round,
            expected: round.leg_count(),
            found: legs.len(),
        });
    }

    legs.sort_by_key(|m| m.leg);
    for (expected, m) in legs.iter().enumerate() {
        if usize::from(m.leg) != expected {
            return Err(TemplateError::BadLegIndex {
                slot: slot.clone(),
                leg: m.leg,
            });
        }
    }

    if legs.iter().any(|m| m.home == m.away) {
        return Err(TemplateError::SelfPairing { slot: slot.clone() });
    }
    if let [first, second] = legs {
        let swapped = second.home == first.away && second.away == first.home;
        let same = second.home == first.home && second.away == first.away;
        if !swapped && !same {
            return Err(TemplateError::MismatchedLegs { slot: slot.clone() });
        }
    }

    Ok(Tie {
        slot: slot.clone(),
        round,
        legs: legs.iter().map(|m| m.id).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(id: MatchId, round: Round, slot: &str, leg: u8, home: ParticipantRef, away: ParticipantRef) -> MatchTemplate {
        MatchTemplate {
            id,
            round,
            slot: Slot::new(slot),
            leg,
            home,
            away,
            kickoff: None,
            bonus_multiplier: 1,
        }
    }

    fn team(name: &str) -> ParticipantRef {
        ParticipantRef::team(name)
    }

    fn slot(name: &str) -> ParticipantRef {
        ParticipantRef::slot(name)
    }

    /// Two semi-finals feeding a single-leg final.
    fn small_template() -> BracketTemplate {
        BracketTemplate::new(
            "test",
            vec![
                leg(1, Round::SemiFinal, "WS1", 0, team("A"), team("B")),
                leg(2, Round::SemiFinal, "WS1", 1, team("B"), team("A")),
                leg(3, Round::SemiFinal, "WS2", 0, team("C"), team("D")),
                leg(4, Round::SemiFinal, "WS2", 1, team("D"), team("C")),
                leg(5, Round::Final, "CHAMP", 0, slot("WS1"), slot("WS2")),
            ],
        )
    }

    #[test]
    fn groups_legs_into_ties_in_round_order() {
        let ties = small_template().ties().unwrap();
        assert_eq!(ties.len(), 3);
        assert_eq!(ties[0].slot, Slot::new("WS1"));
        assert_eq!(ties[0].legs, vec![1, 2]);
        assert_eq!(ties[1].legs, vec![3, 4]);
        assert_eq!(ties[2].round, Round::Final);
        assert_eq!(ties[2].deciding_leg(), Some(5));
    }

    #[test]
    fn ties_are_sorted_even_when_template_lists_final_first() {
        let mut template = small_template();
        template.matches.rotate_right(1);
        let ties = template.ties().unwrap();
        assert_eq!(ties.last().unwrap().round, Round::Final);
    }

    #[test]
    fn legs_are_ordered_by_leg_index() {
        let mut template = small_template();
        template.matches.swap(0, 1);
        let ties = template.ties().unwrap();
        assert_eq!(ties[0].legs, vec![1, 2]);
    }

    #[test]
    fn rejects_duplicate_match_id() {
        let mut template = small_template();
        template.matches[1].id = 1;
        assert_eq!(
            template.ties().unwrap_err(),
            TemplateError::DuplicateMatchId { id: 1 }
        );
    }

    #[test]
    fn rejects_zero_multiplier() {
        let mut template = small_template();
        template.matches[4].bonus_multiplier = 0;
        assert_eq!(
            template.ties().unwrap_err(),
            TemplateError::ZeroMultiplier { id: 5 }
        );
    }

    #[test]
    fn rejects_oversized_multiplier() {
        let mut template = small_template();
        template.matches[4].bonus_multiplier = u32::MAX;
        assert_eq!(
            template.ties().unwrap_err(),
            TemplateError::MultiplierTooLarge {
                id: 5,
                multiplier: u32::MAX,
                max: MAX_BONUS_MULTIPLIER
            }
        );
        template.matches[4].bonus_multiplier = MAX_BONUS_MULTIPLIER;
        assert!(template.ties().is_ok());
    }

    #[test]
    fn rejects_single_leg_semi_final() {
        let mut template = small_template();
        template.matches.remove(1);
        match template.ties().unwrap_err() {
            TemplateError::RoundLegMismatch { expected, found, .. } => {
                assert_eq!((expected, found), (2, 1));
            }
            other => panic!("expected RoundLegMismatch, got: {other}"),
        }
    }

    #[test]
    fn rejects_three_legs() {
        let mut template = small_template();
        template
            .matches
            .push(leg(6, Round::SemiFinal, "WS1", 2, team("A"), team("B")));
        assert_eq!(
            template.ties().unwrap_err(),
            TemplateError::LegCount {
                slot: Slot::new("WS1"),
                legs: 3
            }
        );
    }

    #[test]
    fn rejects_repeated_leg_index() {
        let mut template = small_template();
        template.matches[1].leg = 0;
        assert!(matches!(
            template.ties().unwrap_err(),
            TemplateError::BadLegIndex { .. }
        ));
    }

    #[test]
    fn rejects_legs_with_different_pairings() {
        let mut template = small_template();
        template.matches[1].home = team("Z");
        assert_eq!(
            template.ties().unwrap_err(),
            TemplateError::MismatchedLegs {
                slot: Slot::new("WS1")
            }
        );
    }

    #[test]
    fn rejects_unknown_slot_reference() {
        let mut template = small_template();
        template.matches[4].away = slot("WS9");
        assert_eq!(
            template.ties().unwrap_err(),
            TemplateError::UnknownSlot {
                match_id: 5,
                slot: Slot::new("WS9")
            }
        );
    }

    #[test]
    fn rejects_slot_consumed_in_same_round() {
        let mut template = small_template();
        template.matches[2].home = slot("WS1");
        template.matches[3].away = slot("WS1");
        assert!(matches!(
            template.ties().unwrap_err(),
            TemplateError::ConsumedBeforeProduced { match_id: 3, .. }
        ));
    }

    #[test]
    fn rejects_slot_consumed_by_two_ties() {
        let template = BracketTemplate::new(
            "test",
            vec![
                leg(1, Round::QuarterFinal, "WQ1", 0, team("A"), team("B")),
                leg(2, Round::QuarterFinal, "WQ1", 1, team("B"), team("A")),
                leg(3, Round::SemiFinal, "WS1", 0, slot("WQ1"), team("C")),
                leg(4, Round::SemiFinal, "WS1", 1, team("C"), slot("WQ1")),
                leg(5, Round::SemiFinal, "WS2", 0, slot("WQ1"), team("D")),
                leg(6, Round::SemiFinal, "WS2", 1, team("D"), slot("WQ1")),
            ],
        );
        assert_eq!(
            template.ties().unwrap_err(),
            TemplateError::SlotConsumedTwice {
                slot: Slot::new("WQ1")
            }
        );
    }

    #[test]
    fn rejects_self_pairing() {
        let mut template = small_template();
        template.matches[4].away = slot("WS1");
        assert_eq!(
            template.ties().unwrap_err(),
            TemplateError::SelfPairing {
                slot: Slot::new("CHAMP")
            }
        );
    }

    #[test]
    fn round_keys_round_trip() {
        for round in Round::ALL {
            assert_eq!(Round::from_key(round.key()), Some(round));
        }
        assert_eq!(Round::from_key("QF"), Some(Round::QuarterFinal));
        for round in Round::ALL {
            assert_eq!(Round::from_key(round.short_label()), Some(round));
        }
        assert_eq!(Round::from_key("groups"), None);
    }

    #[test]
    fn participant_ref_serializes_with_explicit_tag() {
        let json = serde_json::to_string(&slot("WO.E")).unwrap();
        assert_eq!(json, r#"{"slot":"WO.E"}"#);
        let json = serde_json::to_string(&team("Racing Club")).unwrap();
        assert_eq!(json, r#"{"team":"Racing Club"}"#);
    }

    #[test]
    fn substitute_replaces_only_known_slots() {
        let mut advanced = BTreeMap::new();
        advanced.insert(Slot::new("WS1"), "A".to_string());
        assert_eq!(slot("WS1").substitute(&advanced), team("A"));
        assert_eq!(slot("WS2").substitute(&advanced), slot("WS2"));
        assert_eq!(team("C").substitute(&advanced), team("C"));
    }
}
