//! Plain-text rendering for the command-line front end.

use std::fmt::Write as _;

use crate::engine::{Prediction, PredictionOutcome};
use crate::h2h::OVER_UNDER_LINE;
use crate::model::{CardEvent, CardKind, ResolvedTeam, Signal};
use crate::store::name_key;

pub fn render_resolved(team: &ResolvedTeam) -> String {
    let mut out = team.display_name.clone();
    match team.provider_id {
        Some(id) => {
            let _ = write!(out, " (provider id {id})");
        }
        None => out.push_str(" (no provider id)"),
    }
    if let Some(local) = &team.local {
        let others: Vec<&str> = local
            .aliases
            .iter()
            .filter(|a| **a != local.canonical_name)
            .map(String::as_str)
            .collect();
        if !others.is_empty() {
            let _ = write!(out, "\n  also stored as: {}", others.join(", "));
        }
        if !local.league_ids.is_empty() {
            let leagues: Vec<String> = local.league_ids.iter().map(|l| l.to_string()).collect();
            let _ = write!(out, "\n  leagues: {}", leagues.join(", "));
        }
    } else {
        out.push_str("\n  no stored bookings");
    }
    out
}

pub fn render_prediction(outcome: &PredictionOutcome) -> String {
    match outcome {
        PredictionOutcome::TeamNotFound(err) => {
            format!("Team \"{}\" not found. Check the spelling or try a longer name.", err.input)
        }
        PredictionOutcome::NoUpcomingFixture { team } => format!(
            "No upcoming fixture found for {}. The season may be on a break.",
            team.display_name
        ),
        PredictionOutcome::Prediction(p) => render_fixture_prediction(p),
    }
}

fn render_fixture_prediction(p: &Prediction) -> String {
    let f = &p.fixture;
    let mut out = format!(
        "Next match: {} vs {}\nCompetition: {}",
        f.home_team, f.away_team, f.league_name
    );
    if !f.round.is_empty() {
        let _ = write!(out, " ({})", f.round);
    }
    let _ = write!(out, "\nKick-off: {} UTC", f.match_date.format("%Y-%m-%d %H:%M"));
    if p.opponent.ambiguous {
        let _ = write!(
            out,
            "\nNote: could not tell which side is {}; assumed home.",
            p.team.display_name
        );
    }

    let s = &p.stats;
    match (s.avg_yellow, s.avg_red, s.combined_avg()) {
        (Some(yellow), Some(red), Some(total)) if s.sample_size > 0 => {
            let verdict = match s.signal {
                Signal::Over => "likely OVER",
                _ => "likely UNDER",
            };
            let _ = write!(
                out,
                "\n\nHead-to-head with {} (sample {}):\n  yellow avg: {yellow:.2}\n  red avg: {red:.2}\n  total avg: {total:.2} -> {verdict} {OVER_UNDER_LINE}",
                p.h2h_opponent, s.sample_size
            );
        }
        _ => {
            let _ = write!(
                out,
                "\n\nNo stored card history between {} and {} yet.",
                p.team.store_name(),
                p.h2h_opponent
            );
        }
    }
    out
}

/// Bookings grouped by match in the order given, split by side.
pub fn render_cards(title: &str, cards: &[CardEvent]) -> String {
    if cards.is_empty() {
        return format!("{title}\n\nNo saved cards. Run an ingest for this period first.");
    }

    let mut groups: Vec<(u64, Vec<&CardEvent>)> = Vec::new();
    for card in cards {
        match groups.iter_mut().find(|(id, _)| *id == card.fixture_id) {
            Some((_, list)) => list.push(card),
            None => groups.push((card.fixture_id, vec![card])),
        }
    }

    let mut out = title.to_string();
    for (_, list) in &groups {
        let first = list[0];
        let _ = write!(
            out,
            "\n\nMatch: {} ({})",
            first.match_label,
            first.match_date.format("%d/%m/%Y")
        );
        for side in [&first.home_team, &first.away_team] {
            let _ = write!(out, "\n{side}:");
            for c in list.iter().filter(|c| name_key(&c.offending_team) == name_key(side)) {
                let _ = write!(out, "\n- {} {} {}", c.player, card_symbol(c.card_kind), c.minute_label());
            }
        }
        let unassigned: Vec<&&CardEvent> = list
            .iter()
            .filter(|c| {
                let key = name_key(&c.offending_team);
                key != name_key(&first.home_team) && key != name_key(&first.away_team)
            })
            .collect();
        if !unassigned.is_empty() {
            out.push_str("\nUnknown side:");
            for c in unassigned {
                let _ = write!(out, "\n- {} {} {}", c.player, card_symbol(c.card_kind), c.minute_label());
            }
        }
    }
    out
}

pub fn render_teams(league_id: u32, teams: &[String]) -> String {
    if teams.is_empty() {
        return format!("No teams with stored bookings in league {league_id}.");
    }
    let mut out = format!("Teams in league {league_id}:");
    for t in teams {
        let _ = write!(out, "\n- {t}");
    }
    out
}

fn card_symbol(kind: CardKind) -> &'static str {
    match kind {
        CardKind::Yellow => "🟨",
        CardKind::Red => "🟥",
    }
}
