// Plain-text renderings of the ranking, a bracket and a user's points.
//
// JSON output goes straight through serde_json on the core types; this module
// only covers the human-readable tables.

use std::fmt::Write;

use prode_core::bracket::Round;
use prode_core::ranking::RankedEntry;
use prode_core::resolver::{VirtualFixture, VirtualMatch};
use prode_core::score::ScoreInput;
use prode_core::scoring::{MatchStatus, Tier, UserScore};
use prode_core::tie::{DecidedBy, TieOutcome, UndeterminedReason};

const NAME_WIDTH: usize = 24;

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Leaderboard with one column per round that has points for anyone.
pub fn ranking_table(entries: &[RankedEntry]) -> String {
    let rounds: Vec<Round> = Round::ALL
        .iter()
        .copied()
        .filter(|r| entries.iter().any(|e| e.by_round.contains_key(r)))
        .collect();

    let mut out = String::new();
    let _ = write!(out, "{:>4}  {:<NAME_WIDTH$}", "#", "Name");
    for round in &rounds {
        let _ = write!(out, " {:>5}", round.short_label());
    }
    let _ = writeln!(out, " {:>6}", "Total");

    for entry in entries {
        let _ = write!(
            out,
            "{:>4}  {:<NAME_WIDTH$}",
            entry.position,
            truncate(&entry.display_name, NAME_WIDTH)
        );
        for round in &rounds {
            let points = entry.by_round.get(round).copied().unwrap_or(0);
            let _ = write!(out, " {:>5}", points);
        }
        let _ = writeln!(out, " {:>6}", entry.total);
    }
    if entries.is_empty() {
        out.push_str("(no entrants)\n");
    }
    out
}

// ---------------------------------------------------------------------------
// Bracket
// ---------------------------------------------------------------------------

/// Every round with its matches as resolved, followed by who went through.
pub fn bracket_view(fixture: &VirtualFixture) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", fixture.edition);

    for round in fixture.rounds() {
        let _ = writeln!(out, "\n== {} ==", round.label());
        for m in fixture.matches_in(round) {
            let _ = writeln!(out, "  {}", match_line(m));
        }
        for tie in fixture.ties.iter().filter(|t| t.round == round) {
            let _ = writeln!(out, "  -> {}: {}", tie.slot, outcome_text(&tie.outcome));
        }
    }

    if let Some(champion) = fixture.champion() {
        let _ = writeln!(out, "\nChampion: {champion}");
    }
    if let Some(runner_up) = fixture.runner_up() {
        let _ = writeln!(out, "Runner-up: {runner_up}");
    }
    out
}

fn match_line(m: &VirtualMatch) -> String {
    let leg = if m.round.leg_count() > 1 {
        format!(" (leg {})", m.leg + 1)
    } else {
        String::new()
    };
    format!(
        "[{:>3}] {} {} {}{}",
        m.id,
        m.home,
        score_text(m.score.as_ref()),
        m.away,
        leg
    )
}

fn score_text(score: Option<&ScoreInput>) -> String {
    let Some(score) = score else {
        return "vs".to_string();
    };
    let goal = |g: Option<u32>| g.map(|g| g.to_string()).unwrap_or_else(|| "?".into());
    let mut text = format!("{}-{}", goal(score.home_goals), goal(score.away_goals));
    if let Some((home, away)) = score.penalties() {
        let _ = write!(text, " ({home}-{away} pen)");
    }
    text
}

fn outcome_text(outcome: &TieOutcome) -> String {
    match outcome {
        TieOutcome::Decided {
            winner, decided_by, ..
        } => {
            let how = match decided_by {
                DecidedBy::Goals => "",
                DecidedBy::Aggregate => " on aggregate",
                DecidedBy::Penalties => " on penalties",
            };
            format!("{winner}{how}")
        }
        TieOutcome::Undetermined { reason } => match reason {
            UndeterminedReason::IncompleteData => "pending".to_string(),
            UndeterminedReason::Level => "level, no winner".to_string(),
            UndeterminedReason::AmbiguousPenaltyMapping => {
                "undetermined (penalties cannot be mapped)".to_string()
            }
            UndeterminedReason::UnresolvedParticipant => "waiting on an earlier tie".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

/// Per-match breakdown for one user, then qualifiers, final bonus and total.
pub fn points_view(display_name: &str, score: &UserScore) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Points for {display_name}");

    for (round, subtotal) in score.by_round() {
        let _ = writeln!(out, "\n== {} ({} pts) ==", round.label(), subtotal.total());
        for m in score.per_match.iter().filter(|m| m.round == round) {
            let status = match (m.status, m.tier) {
                (MatchStatus::Pending, _) => "pending".to_string(),
                (MatchStatus::NotPredicted, _) => "not predicted".to_string(),
                (MatchStatus::Scored, None) => "miss".to_string(),
                (MatchStatus::Scored, Some(Tier::Sign)) => "sign".to_string(),
                (MatchStatus::Scored, Some(Tier::Difference)) => "difference".to_string(),
                (MatchStatus::Scored, Some(Tier::Exact)) => "exact".to_string(),
            };
            let multiplier = if m.multiplier > 1 {
                format!(" x{}", m.multiplier)
            } else {
                String::new()
            };
            let _ = writeln!(
                out,
                "  [{:>3}] {:<6} {:<14} {:>3}{}",
                m.match_id,
                m.slot.as_str(),
                status,
                m.breakdown.total(),
                multiplier
            );
        }
    }

    let qualified: Vec<_> = score.qualifiers.iter().filter(|q| q.bonus > 0).collect();
    if !qualified.is_empty() {
        out.push_str("\nQualifiers called:\n");
        for q in qualified {
            let team = q.official.as_deref().unwrap_or("?");
            let _ = writeln!(out, "  {:<6} {:<NAME_WIDTH$} +{}", q.slot.as_str(), team, q.bonus);
        }
    }

    let bonus = &score.final_bonus;
    if bonus.total() > 0 {
        let _ = writeln!(
            out,
            "\nFinal bonus: champion +{}, runner-up +{}",
            bonus.champion_bonus, bonus.runner_up_bonus
        );
    }
    let _ = writeln!(out, "\nTotal: {}", score.total);
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prode_core::bracket::{BracketTemplate, MatchTemplate, ParticipantRef, Slot};
    use prode_core::resolver::resolve_fixture;
    use prode_core::rules::ScoringRules;
    use prode_core::score::ScoreSet;
    use prode_core::scoring::score_user;
    use std::collections::BTreeMap;

    fn template() -> BracketTemplate {
        let m = |id, round, slot: &str, leg, home: ParticipantRef, away: ParticipantRef, mult| {
            MatchTemplate {
                id,
                round,
                slot: Slot::new(slot),
                leg,
                home,
                away,
                kickoff: None,
                bonus_multiplier: mult,
            }
        };
        BracketTemplate::new(
            "Mini cup",
            vec![
                m(1, Round::SemiFinal, "WS1", 0, ParticipantRef::team("Lanus"), ParticipantRef::team("Fluminense"), 1),
                m(2, Round::SemiFinal, "WS1", 1, ParticipantRef::team("Fluminense"), ParticipantRef::team("Lanus"), 1),
                m(3, Round::Final, "CHAMP", 0, ParticipantRef::slot("WS1"), ParticipantRef::team("Mineiro"), 2),
            ],
        )
    }

    fn entry(position: usize, name: &str, total: u32) -> RankedEntry {
        RankedEntry {
            position,
            user_id: name.to_lowercase(),
            display_name: name.into(),
            total,
            by_round: BTreeMap::from([(Round::SemiFinal, total)]),
        }
    }

    #[test]
    fn ranking_table_lists_positions_and_round_columns() {
        let text = ranking_table(&[entry(1, "Ana", 12), entry(1, "Beto", 12), entry(3, "Carla", 4)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("   SF "));
        assert!(lines[2].trim_start().starts_with("1  Beto"));
        assert!(lines[3].ends_with("4"));
    }

    #[test]
    fn every_round_gets_a_distinct_column_heading() {
        let entry = RankedEntry {
            position: 1,
            user_id: "ana".into(),
            display_name: "Ana".into(),
            total: 5,
            by_round: Round::ALL.iter().map(|r| (*r, 1)).collect(),
        };
        let text = ranking_table(&[entry]);
        let header: Vec<&str> = text.lines().next().unwrap().split_whitespace().collect();
        assert_eq!(header, vec!["#", "Name", "PO", "R16", "QF", "SF", "F", "Total"]);
    }

    #[test]
    fn empty_ranking_says_so() {
        assert!(ranking_table(&[]).contains("(no entrants)"));
    }

    #[test]
    fn bracket_view_shows_penalties_and_champion() {
        let scores: ScoreSet = [
            (1, ScoreInput::new(1, 0)),
            (2, ScoreInput::new(1, 0).with_penalties(3, 5)),
            (3, ScoreInput::new(2, 2)),
        ]
        .into();
        let fixture = resolve_fixture(&template(), &scores).unwrap();
        let text = bracket_view(&fixture);

        assert!(text.contains("(3-5 pen)"));
        assert!(text.contains("WS1: Lanus on penalties"));
        assert!(text.contains("Lanus 2-2 Mineiro"));
        assert!(text.contains("CHAMP: pending"));
        assert!(!text.contains("Champion:"));
    }

    #[test]
    fn bracket_view_before_any_result() {
        let fixture = resolve_fixture(&template(), &ScoreSet::new()).unwrap();
        let text = bracket_view(&fixture);
        assert!(text.contains("WS1 vs Mineiro"));
        assert!(text.contains("CHAMP: pending"));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("Ana", 5), "Ana");
        assert_eq!(truncate("Bartolomeo", 5), "Bart~");
    }

    #[test]
    fn points_view_lists_tiers_and_total() {
        let official: ScoreSet = [
            (1, ScoreInput::new(1, 0)),
            (2, ScoreInput::new(0, 0)),
            (3, ScoreInput::new(2, 0)),
        ]
        .into();
        let predicted: ScoreSet = [(1, ScoreInput::new(1, 0)), (2, ScoreInput::new(2, 1))].into();
        let score = score_user(&template(), &predicted, &official, &ScoringRules::default()).unwrap();
        let text = points_view("Ana", &score);

        assert!(text.starts_with("Points for Ana"));
        assert!(text.contains("exact"));
        assert!(text.contains("not predicted"));
        assert!(text.contains(&format!("Total: {}", score.total)));
    }
}
