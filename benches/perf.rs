use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use chrono::{Duration, TimeZone, Utc};

use card_bookings::h2h::{H2HBasis, head_to_head, summarize};
use card_bookings::matchday::parse_matchday;
use card_bookings::model::{CardEvent, CardKind};
use card_bookings::resolve::rank_local_candidates;
use card_bookings::store::{EventStore, SqliteStore};

const TEAMS: &[&str] = &[
    "Arsenal",
    "Aston Villa",
    "Brentford",
    "Chelsea",
    "Everton",
    "Fulham",
    "Liverpool",
    "Manchester City",
    "Manchester United",
    "Newcastle United",
    "Tottenham Hotspur",
    "West Ham United",
];

fn sample_cards(fixtures: u64) -> Vec<CardEvent> {
    let start = Utc.with_ymd_and_hms(2021, 8, 14, 14, 0, 0).unwrap();
    let mut out = Vec::new();
    for fixture_id in 0..fixtures {
        let home = TEAMS[(fixture_id as usize) % TEAMS.len()];
        let away = TEAMS[(fixture_id as usize * 5 + 1) % TEAMS.len()];
        for booking in 0..4 {
            let offending = if booking % 2 == 0 { home } else { away };
            out.push(CardEvent {
                fixture_id,
                match_label: format!("{home} vs {away}"),
                league_id: 39,
                league_name: "Premier League".to_string(),
                match_date: start + Duration::days(fixture_id as i64 / 4),
                home_team: home.to_string(),
                away_team: away.to_string(),
                offending_team: offending.to_string(),
                player: format!("player {booking}"),
                card_kind: if booking == 3 { CardKind::Red } else { CardKind::Yellow },
                minute: 10 + booking * 20,
                stoppage_minute: None,
                matchday: (fixture_id % 38 + 1) as u32,
            });
        }
    }
    out
}

fn seeded_store(cards: &[CardEvent]) -> SqliteStore {
    let store = SqliteStore::in_memory().expect("in-memory store");
    for card in cards {
        store.upsert(card).expect("seed card");
    }
    store
}

fn bench_local_resolution(c: &mut Criterion) {
    let store = seeded_store(&sample_cards(1500));
    c.bench_function("rank_local_candidates_man", |b| {
        b.iter(|| {
            let ranked = rank_local_candidates(&store, black_box("man")).expect("rank");
            black_box(ranked.len());
        })
    });
}

fn bench_head_to_head(c: &mut Criterion) {
    let cards = sample_cards(1500);
    let store = seeded_store(&cards);
    let now = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
    c.bench_function("head_to_head_store", |b| {
        b.iter(|| {
            let stats = head_to_head(
                &store,
                black_box("Arsenal"),
                black_box("Manchester City"),
                Duration::days(365 * 5),
                now,
                H2HBasis::PerFixture,
            );
            black_box(stats.sample_size);
        })
    });
    c.bench_function("summarize_6000_cards", |b| {
        b.iter(|| {
            let stats = summarize(black_box(&cards), H2HBasis::PerFixture);
            black_box(stats.signal);
        })
    });
}

fn bench_matchday(c: &mut Criterion) {
    let labels = [
        "Regular Season - 12",
        "Matchday 7",
        "24",
        "Quarter-finals",
        "Round of 16 - 2",
    ];
    c.bench_function("parse_matchday_labels", |b| {
        b.iter(|| {
            for label in labels {
                black_box(parse_matchday(black_box(label)));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_local_resolution,
    bench_head_to_head,
    bench_matchday
);
criterion_main!(benches);
