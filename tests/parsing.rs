use std::fs;
use std::path::PathBuf;

use card_bookings::api_football::{parse_events_json, parse_fixtures_json, parse_teams_json};
use card_bookings::football_data::{parse_bookings_json, parse_matches_json};
use card_bookings::ingest::normalize_events;
use card_bookings::model::{CardKind, FixtureStatus};
use card_bookings::resolve::pick_candidate;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_api_football_team_search() {
    let raw = read_fixture("api_football_teams.json");
    let teams = parse_teams_json(&raw).expect("fixture should parse");
    assert_eq!(teams.len(), 2);
    let picked = pick_candidate("Manchester City", &teams).expect("candidate");
    assert_eq!(picked.id, 50);
    assert_eq!(picked.short_code.as_deref(), Some("MAC"));
}

#[test]
fn parses_api_football_finished_fixtures() {
    let raw = read_fixture("api_football_fixtures.json");
    let fixtures = parse_fixtures_json(&raw).expect("fixture should parse");
    // The postponed match is dropped.
    assert_eq!(fixtures.len(), 2);
    assert!(fixtures.iter().all(|f| f.fixture.status == FixtureStatus::Finished));
    assert_eq!(fixtures[1].fixture.home_team, "Arsenal");
    assert_eq!(fixtures[1].fixture.away_id, Some(39));
}

#[test]
fn api_football_events_normalize_into_cards() {
    let fixtures = parse_fixtures_json(&read_fixture("api_football_fixtures.json")).unwrap();
    let raw = parse_events_json(&read_fixture("api_football_events.json")).unwrap();
    assert_eq!(raw.len(), 4);

    let (cards, problems) = normalize_events(&fixtures[0], &raw);
    assert_eq!(cards.len(), 3);
    assert_eq!(problems.len(), 1);

    let sent_off = &cards[2];
    assert_eq!(sent_off.player, "C. Bassey");
    assert_eq!(sent_off.card_kind, CardKind::Red);
    assert_eq!(sent_off.minute_label(), "90+4'");
    assert_eq!(sent_off.offending_team, "Fulham");
    assert_eq!(sent_off.matchday, 1);
    assert_eq!(sent_off.match_label, "Manchester United vs Fulham");
}

#[test]
fn parses_football_data_matches_and_bookings() {
    let matches = parse_matches_json(&read_fixture("football_data_matches.json")).unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].fixture.status, FixtureStatus::Finished);
    assert_eq!(matches[1].fixture.status, FixtureStatus::Scheduled);
    assert_eq!(matches[1].fixture.round, "Matchday 38");

    let bookings = parse_bookings_json(&read_fixture("football_data_match.json")).unwrap();
    let (cards, problems) = normalize_events(&matches[0], &bookings);
    assert!(problems.is_empty());
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].card_kind, CardKind::Yellow);
    assert_eq!(cards[1].card_kind, CardKind::Red);
    assert_eq!(cards[1].league_id, 2021);
    assert_eq!(cards[1].matchday, 1);
}
