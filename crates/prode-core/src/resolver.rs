// Slot resolver: turns a template plus one set of scores into a virtual
// fixture with every resolvable placeholder replaced by a concrete team.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bracket::{BracketTemplate, MatchId, ParticipantRef, Round, Slot, TeamName};
use crate::error::TemplateError;
use crate::score::{ScoreInput, ScoreSet};
use crate::tie::{resolve_tie, LegView, TieOutcome};

/// A template match with its participants resolved as far as the scores allow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMatch {
    pub id: MatchId,
    pub round: Round,
    pub slot: Slot,
    pub leg: u8,
    pub home: ParticipantRef,
    pub away: ParticipantRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kickoff: Option<DateTime<Utc>>,
    pub bonus_multiplier: u32,
    /// The score this fixture was resolved with, if one was entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreInput>,
}

/// Outcome of one tie within a virtual fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieResolution {
    pub slot: Slot,
    pub round: Round,
    pub legs: Vec<MatchId>,
    pub outcome: TieOutcome,
}

/// The bracket as it stands under one set of score inputs. Derived on
/// demand; never stored as a source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFixture {
    pub edition: String,
    /// All matches, in template order.
    pub matches: Vec<VirtualMatch>,
    /// All ties, in round order.
    pub ties: Vec<TieResolution>,
}

impl VirtualFixture {
    pub fn match_by_id(&self, id: MatchId) -> Option<&VirtualMatch> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn matches_in(&self, round: Round) -> impl Iterator<Item = &VirtualMatch> {
        self.matches.iter().filter(move |m| m.round == round)
    }

    pub fn tie(&self, slot: &Slot) -> Option<&TieResolution> {
        self.ties.iter().find(|t| &t.slot == slot)
    }

    pub fn winner_of(&self, slot: &Slot) -> Option<&str> {
        self.tie(slot).and_then(|t| t.outcome.winner())
    }

    pub fn final_tie(&self) -> Option<&TieResolution> {
        self.ties.iter().find(|t| t.round == Round::Final)
    }

    pub fn champion(&self) -> Option<&str> {
        self.final_tie().and_then(|t| t.outcome.winner())
    }

    /// The other participant of the Final; derived, never stored.
    pub fn runner_up(&self) -> Option<&str> {
        self.final_tie().and_then(|t| t.outcome.loser())
    }

    /// Teams that advanced from `round`, in tie order.
    pub fn qualified(&self, round: Round) -> Vec<&str> {
        self.ties
            .iter()
            .filter(|t| t.round == round)
            .filter_map(|t| t.outcome.winner())
            .collect()
    }

    /// Rounds present in this fixture, in play order.
    pub fn rounds(&self) -> Vec<Round> {
        let mut rounds: Vec<Round> = self.ties.iter().map(|t| t.round).collect();
        rounds.dedup();
        rounds
    }
}

/// Resolve every tie of `template` under `scores`, propagating winners into
/// later rounds.
///
/// Pure: the same inputs always produce the same fixture. Ties that cannot be
/// decided leave their slot symbolic in every match that consumes it.
pub fn resolve_fixture(
    template: &BracketTemplate,
    scores: &ScoreSet,
) -> Result<VirtualFixture, TemplateError> {
    let ties = template.ties()?;
    let by_id: HashMap<MatchId, _> = template.matches.iter().map(|m| (m.id, m)).collect();

    let mut advanced: BTreeMap<Slot, TeamName> = BTreeMap::new();
    let mut resolved: HashMap<MatchId, VirtualMatch> = HashMap::with_capacity(by_id.len());
    let mut resolutions = Vec::with_capacity(ties.len());

    // Ties come back in round order, so every slot a tie consumes was
    // settled (or left open) by an earlier round.
    for tie in ties {
        let legs: Vec<VirtualMatch> = tie
            .legs
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|m| VirtualMatch {
                id: m.id,
                round: m.round,
                slot: m.slot.clone(),
                leg: m.leg,
                home: m.home.substitute(&advanced),
                away: m.away.substitute(&advanced),
                kickoff: m.kickoff,
                bonus_multiplier: m.bonus_multiplier,
                score: scores.get(&m.id).copied(),
            })
            .collect();

        let views: Vec<LegView<'_>> = legs
            .iter()
            .map(|m| LegView {
                home: &m.home,
                away: &m.away,
                score: m.score.as_ref(),
            })
            .collect();
        let outcome = resolve_tie(&tie.slot, &views)?;

        match &outcome {
            TieOutcome::Decided { winner, .. } => {
                debug!("{} ({}) resolved to {}", tie.slot, tie.round, winner);
                advanced.insert(tie.slot.clone(), winner.clone());
            }
            TieOutcome::Undetermined { reason } => {
                debug!("{} ({}) undetermined: {:?}", tie.slot, tie.round, reason);
            }
        }

        for m in legs {
            resolved.insert(m.id, m);
        }
        resolutions.push(TieResolution {
            slot: tie.slot,
            round: tie.round,
            legs: tie.legs,
            outcome,
        });
    }

    let matches = template
        .matches
        .iter()
        .filter_map(|m| resolved.remove(&m.id))
        .collect();

    Ok(VirtualFixture {
        edition: template.edition.clone(),
        matches,
        ties: resolutions,
    })
}
