//! Pulls finished fixtures and their bookings from a remote provider into the card store.
//!
//! Per-fixture failures are logged and skipped. A rate limit or timeout additionally pauses for
//! the configured backoff before moving on. Re-running over the same range is idempotent.
//! `sync_upcoming` does the same walk for scheduled fixtures and writes them to the fixture table.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::config::Pacing;
use crate::error::{DataInconsistency, ProviderError};
use crate::matchday::{Matchday, parse_matchday};
use crate::model::{CardEvent, CardKind, Competition, FixtureStatus, ProviderFixture, RawCardEvent};
use crate::provider::{DateRange, FixtureQuery, FixtureScope, RemoteProvider};
use crate::store::{EventStore, SqliteStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitionSummary {
    pub competition: Competition,
    pub fixtures: usize,
    pub saved: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub fetched: usize,
    pub saved: usize,
    pub skipped_events: usize,
    pub backoffs: usize,
    pub cancelled: bool,
    pub per_competition: Vec<CompetitionSummary>,
}

impl IngestSummary {
    pub fn error_count(&self) -> usize {
        self.per_competition.iter().map(|c| c.errors.len()).sum()
    }
}

pub struct Ingestor<'a, P: RemoteProvider + ?Sized> {
    provider: &'a P,
    store: &'a SqliteStore,
    pacing: Pacing,
    cancel: Option<&'a AtomicBool>,
}

impl<'a, P: RemoteProvider + ?Sized> Ingestor<'a, P> {
    pub fn new(provider: &'a P, store: &'a SqliteStore, pacing: Pacing) -> Self {
        Self {
            provider,
            store,
            pacing,
            cancel: None,
        }
    }

    /// Checked between fixtures; a set flag ends the run after the current fixture.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|f| f.load(Ordering::Relaxed))
    }

    pub fn run(&self, competitions: &[Competition], season: i32, range: DateRange) -> IngestSummary {
        let mut summary = IngestSummary::default();
        for competition in competitions {
            if self.cancelled() {
                summary.cancelled = true;
                break;
            }
            let comp = self.run_competition(competition, season, range, &mut summary);
            summary.fetched += comp.fixtures;
            summary.saved += comp.saved;
            summary.per_competition.push(comp);
        }
        info!(
            provider = self.provider.name(),
            fetched = summary.fetched,
            saved = summary.saved,
            skipped = summary.skipped_events,
            errors = summary.error_count(),
            cancelled = summary.cancelled,
            "ingest complete"
        );
        summary
    }

    fn run_competition(
        &self,
        competition: &Competition,
        season: i32,
        range: DateRange,
        summary: &mut IngestSummary,
    ) -> CompetitionSummary {
        let mut out = CompetitionSummary {
            competition: competition.clone(),
            fixtures: 0,
            saved: 0,
            errors: Vec::new(),
        };
        let run_id = match self.store.begin_run(competition.id, season) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(competition = %competition.code, error = %err, "could not record ingest run");
                None
            }
        };

        let query = FixtureQuery {
            scope: FixtureScope::Competition {
                id: competition.id,
                season,
            },
            range,
            status: FixtureStatus::Finished,
        };
        match self.provider.list_fixtures(&query) {
            Ok(fixtures) => {
                info!(
                    competition = %competition.code,
                    season,
                    fixtures = fixtures.len(),
                    "fixtures listed"
                );
                out.fixtures = fixtures.len();
                for (idx, pf) in fixtures.iter().enumerate() {
                    if self.cancelled() {
                        summary.cancelled = true;
                        break;
                    }
                    if idx > 0 {
                        pause(self.pacing.per_request);
                    }
                    self.ingest_fixture(pf, &mut out, summary);
                }
            }
            Err(err) => {
                error!(competition = %competition.code, season, error = %err, "fixture listing failed");
                if self.back_off_if_limited(&err) {
                    summary.backoffs += 1;
                }
                out.errors.push(format!("{}: {err}", competition.code));
            }
        }

        if let Some(run_id) = run_id
            && let Err(err) = self
                .store
                .finish_run(run_id, out.fixtures, out.saved, &out.errors)
        {
            warn!(run_id, error = %err, "could not close ingest run");
        }
        out
    }

    fn ingest_fixture(
        &self,
        pf: &ProviderFixture,
        out: &mut CompetitionSummary,
        summary: &mut IngestSummary,
    ) {
        let raw = match self.provider.list_card_events(pf.fixture_id) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(fixture_id = pf.fixture_id, error = %err, "card events unavailable; skipping fixture");
                out.errors.push(format!("fixture {}: {err}", pf.fixture_id));
                if self.back_off_if_limited(&err) {
                    summary.backoffs += 1;
                }
                return;
            }
        };

        let (events, problems) = normalize_events(pf, &raw);
        for problem in &problems {
            warn!(%problem, "skipping card event");
        }
        summary.skipped_events += problems.len();

        let mut saved = 0;
        for event in &events {
            match self.store.upsert(event) {
                Ok(()) => saved += 1,
                Err(err) => {
                    warn!(fixture_id = pf.fixture_id, player = %event.player, error = %err, "card upsert failed");
                }
            }
        }
        out.saved += saved;
        info!(
            fixture_id = pf.fixture_id,
            label = %match_label(pf),
            saved,
            "fixture ingested"
        );
    }

    /// Stores scheduled fixtures in `range` so the fixture locator has a local fallback.
    /// Returns how many were written.
    pub fn sync_upcoming(&self, competitions: &[Competition], season: i32, range: DateRange) -> usize {
        let mut stored = 0;
        for (idx, competition) in competitions.iter().enumerate() {
            if self.cancelled() {
                break;
            }
            if idx > 0 {
                pause(self.pacing.per_request);
            }
            let query = FixtureQuery {
                scope: FixtureScope::Competition {
                    id: competition.id,
                    season,
                },
                range,
                status: FixtureStatus::Scheduled,
            };
            let fixtures = match self.provider.list_fixtures(&query) {
                Ok(list) => list,
                Err(err) => {
                    warn!(competition = %competition.code, error = %err, "upcoming fixtures unavailable");
                    self.back_off_if_limited(&err);
                    continue;
                }
            };
            for pf in &fixtures {
                match self.store.upsert_fixture(self.provider.name(), &pf.fixture) {
                    Ok(()) => stored += 1,
                    Err(err) => {
                        warn!(fixture_id = pf.fixture_id, error = %err, "fixture upsert failed");
                    }
                }
            }
        }
        info!(stored, "upcoming fixtures synced");
        stored
    }

    fn back_off_if_limited(&self, err: &ProviderError) -> bool {
        if !err.is_rate_limit_or_timeout() {
            return false;
        }
        info!(secs = self.pacing.backoff.as_secs(), "backing off");
        pause(self.pacing.backoff);
        true
    }
}

fn pause(d: Duration) {
    if !d.is_zero() {
        thread::sleep(d);
    }
}

fn match_label(pf: &ProviderFixture) -> String {
    format!("{} vs {}", pf.fixture.home_team, pf.fixture.away_team)
}

/// Turns one fixture's raw bookings into storable events. Records without a player, a minute
/// or a recognisable card colour come back as inconsistencies.
pub fn normalize_events(
    pf: &ProviderFixture,
    raw: &[RawCardEvent],
) -> (Vec<CardEvent>, Vec<DataInconsistency>) {
    let matchday = parse_matchday(&pf.fixture.round);
    if matchday == Matchday::Unknown {
        warn!(fixture_id = pf.fixture_id, round = %pf.fixture.round, "matchday not recognised");
    }
    let label = match_label(pf);

    let mut events = Vec::with_capacity(raw.len());
    let mut problems = Vec::new();
    for r in raw {
        let inconsistency = |reason: &str| DataInconsistency {
            fixture_id: pf.fixture_id,
            reason: reason.to_string(),
        };
        let Some(player) = r.player.as_deref().map(str::trim).filter(|p| !p.is_empty()) else {
            problems.push(inconsistency("booking without player"));
            continue;
        };
        let Some(minute) = r.minute else {
            problems.push(inconsistency(&format!("booking for {player} without minute")));
            continue;
        };
        let Some(card_kind) = r.detail.as_deref().and_then(CardKind::from_detail) else {
            problems.push(inconsistency(&format!(
                "unrecognised card detail {:?} for {player}",
                r.detail.as_deref().unwrap_or("")
            )));
            continue;
        };
        events.push(CardEvent {
            fixture_id: pf.fixture_id,
            match_label: label.clone(),
            league_id: pf.fixture.league_id,
            league_name: pf.fixture.league_name.clone(),
            match_date: pf.fixture.match_date,
            home_team: pf.fixture.home_team.clone(),
            away_team: pf.fixture.away_team.clone(),
            offending_team: r.team.as_deref().map(str::trim).unwrap_or_default().to_string(),
            player: player.to_string(),
            card_kind,
            minute,
            stoppage_minute: r.extra.filter(|x| *x > 0),
            matchday: matchday.number(),
        });
    }
    (events, problems)
}

const SEASON_MONTHS: &[&str] = &[
    "aug", "sep", "oct", "nov", "dec", "jan", "feb", "mar", "apr", "may",
];

/// Calendar range of one month of a season that starts in August of `season`.
/// January to May fall in the following year.
pub fn month_range(season: i32, month: &str) -> Option<DateRange> {
    let key = month.trim().to_ascii_lowercase();
    let key = key.get(..3)?;
    let idx = SEASON_MONTHS.iter().position(|m| *m == key)?;
    let (year, month) = if idx < 5 {
        (season, idx as u32 + 8)
    } else {
        (season + 1, idx as u32 - 4)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(DateRange::between(first, next.pred_opt()?))
}

/// Whole season, August 1st to May 31st.
pub fn season_range(season: i32) -> Option<DateRange> {
    Some(DateRange::between(
        NaiveDate::from_ymd_opt(season, 8, 1)?,
        NaiveDate::from_ymd_opt(season + 1, 5, 31)?,
    ))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{month_range, normalize_events, season_range};
    use crate::model::{CardKind, Fixture, FixtureStatus, ProviderFixture, RawCardEvent};

    fn pf(round: &str) -> ProviderFixture {
        ProviderFixture {
            fixture_id: 77,
            fixture: Fixture {
                home_team: "Arsenal".to_string(),
                away_team: "Chelsea".to_string(),
                match_date: Utc.with_ymd_and_hms(2024, 11, 10, 16, 30, 0).unwrap(),
                league_id: 39,
                league_name: "Premier League".to_string(),
                round: round.to_string(),
                status: FixtureStatus::Finished,
                home_id: Some(42),
                away_id: Some(49),
            },
        }
    }

    fn raw(player: Option<&str>, detail: Option<&str>, minute: Option<i32>) -> RawCardEvent {
        RawCardEvent {
            team: Some("Chelsea".to_string()),
            player: player.map(str::to_string),
            detail: detail.map(str::to_string),
            minute,
            extra: None,
        }
    }

    #[test]
    fn normalizes_valid_and_flags_broken_records() {
        let input = vec![
            raw(Some("Cucurella"), Some("Yellow Card"), Some(31)),
            raw(Some("Caicedo"), Some("Second Yellow card"), Some(77)),
            raw(None, Some("Yellow Card"), Some(40)),
            raw(Some("Palmer"), Some("Yellow Card"), None),
            raw(Some("Jackson"), Some("Card upgrade"), Some(55)),
        ];
        let (events, problems) = normalize_events(&pf("Regular Season - 11"), &input);
        assert_eq!(events.len(), 2);
        assert_eq!(problems.len(), 3);
        assert_eq!(events[0].matchday, 11);
        assert_eq!(events[0].match_label, "Arsenal vs Chelsea");
        assert_eq!(events[1].card_kind, CardKind::Red);
        assert!(problems.iter().all(|p| p.fixture_id == 77));
    }

    #[test]
    fn unknown_round_stores_matchday_zero() {
        let (events, _) = normalize_events(
            &pf("Quarter-finals"),
            &[raw(Some("Rice"), Some("Yellow Card"), Some(12))],
        );
        assert_eq!(events[0].matchday, 0);
    }

    #[derive(Clone, Default)]
    struct LogBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn blank_round_warns_and_stores_zero() {
        let logs = LogBuf::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let (events, _) = tracing::subscriber::with_default(subscriber, || {
            normalize_events(
                &pf("  "),
                &[raw(Some("Rice"), Some("Yellow Card"), Some(12))],
            )
        });
        assert_eq!(events[0].matchday, 0);
        let out = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("WARN"));
        assert!(out.contains("matchday not recognised"));
    }

    #[test]
    fn month_ranges_follow_the_season() {
        let aug = month_range(2024, "aug").unwrap();
        assert_eq!(aug.from, NaiveDate::from_ymd_opt(2024, 8, 1));
        assert_eq!(aug.to, NaiveDate::from_ymd_opt(2024, 8, 31));

        let feb = month_range(2023, "February").unwrap();
        assert_eq!(feb.from, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(feb.to, NaiveDate::from_ymd_opt(2024, 2, 29));

        let dec = month_range(2024, "dec").unwrap();
        assert_eq!(dec.to, NaiveDate::from_ymd_opt(2024, 12, 31));

        assert!(month_range(2024, "jul").is_none());
        assert!(month_range(2024, "x").is_none());
    }

    #[test]
    fn season_range_spans_aug_to_may() {
        let r = season_range(2024).unwrap();
        assert_eq!(r.from, NaiveDate::from_ymd_opt(2024, 8, 1));
        assert_eq!(r.to, NaiveDate::from_ymd_opt(2025, 5, 31));
    }
}
