#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

use card_bookings::error::ProviderError;
use card_bookings::model::{
    CardEvent, CardKind, Fixture, FixtureStatus, ProviderFixture, RawCardEvent, TeamCandidate,
};
use card_bookings::provider::{FixtureQuery, FixtureScope, RemoteProvider};
use card_bookings::store::name_key;

/// Scripted provider. Failures are queued per fixture or competition and consumed in order.
#[derive(Default)]
pub struct FakeProvider {
    pub teams: HashMap<String, Vec<TeamCandidate>>,
    pub fixtures: Vec<ProviderFixture>,
    pub events: RefCell<HashMap<u64, Vec<RawCardEvent>>>,
    pub event_failures: RefCell<HashMap<u64, VecDeque<ProviderError>>>,
    pub competition_failures: RefCell<HashMap<u32, ProviderError>>,
    pub search_down: bool,
    pub search_not_found: bool,
    pub searches: RefCell<Vec<String>>,
    pub event_calls: RefCell<Vec<u64>>,
    pub cancel_on: Option<(u64, Arc<AtomicBool>)>,
}

impl FakeProvider {
    pub fn with_team(mut self, query: &str, candidates: Vec<TeamCandidate>) -> Self {
        self.teams.insert(name_key(query), candidates);
        self
    }

    pub fn with_fixture(mut self, fixture: ProviderFixture) -> Self {
        self.fixtures.push(fixture);
        self
    }

    pub fn set_events(&self, fixture_id: u64, events: Vec<RawCardEvent>) {
        self.events.borrow_mut().insert(fixture_id, events);
    }

    pub fn fail_events_once(&self, fixture_id: u64, err: ProviderError) {
        self.event_failures
            .borrow_mut()
            .entry(fixture_id)
            .or_default()
            .push_back(err);
    }

    pub fn fail_competition(&self, league_id: u32, err: ProviderError) {
        self.competition_failures.borrow_mut().insert(league_id, err);
    }
}

impl RemoteProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn search_teams(&self, name: &str) -> Result<Vec<TeamCandidate>, ProviderError> {
        self.searches.borrow_mut().push(name.to_string());
        if self.search_down {
            return Err(ProviderError::Timeout);
        }
        if self.search_not_found {
            return Err(ProviderError::NotFound);
        }
        Ok(self.teams.get(&name_key(name)).cloned().unwrap_or_default())
    }

    fn list_fixtures(&self, query: &FixtureQuery) -> Result<Vec<ProviderFixture>, ProviderError> {
        if let FixtureScope::Competition { id, .. } = query.scope
            && let Some(err) = self.competition_failures.borrow_mut().remove(&id)
        {
            return Err(err);
        }
        Ok(self
            .fixtures
            .iter()
            .filter(|pf| pf.fixture.status == query.status)
            .filter(|pf| match query.scope {
                FixtureScope::Team(id) => {
                    pf.fixture.home_id == Some(id) || pf.fixture.away_id == Some(id)
                }
                FixtureScope::Competition { id, .. } => pf.fixture.league_id == id,
            })
            .filter(|pf| {
                let day = pf.fixture.match_date.date_naive();
                query.range.from.is_none_or(|from| day >= from)
                    && query.range.to.is_none_or(|to| day <= to)
            })
            .cloned()
            .collect())
    }

    fn list_card_events(&self, fixture_id: u64) -> Result<Vec<RawCardEvent>, ProviderError> {
        self.event_calls.borrow_mut().push(fixture_id);
        if let Some((id, flag)) = &self.cancel_on
            && *id == fixture_id
        {
            flag.store(true, Ordering::Relaxed);
        }
        if let Some(err) = self
            .event_failures
            .borrow_mut()
            .get_mut(&fixture_id)
            .and_then(|q| q.pop_front())
        {
            return Err(err);
        }
        Ok(self
            .events
            .borrow()
            .get(&fixture_id)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn candidate(id: u32, name: &str, code: Option<&str>) -> TeamCandidate {
    TeamCandidate {
        id,
        name: name.to_string(),
        short_code: code.map(str::to_string),
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
}

pub fn fixture(
    fixture_id: u64,
    league_id: u32,
    home: (&str, u32),
    away: (&str, u32),
    kickoff: DateTime<Utc>,
    status: FixtureStatus,
) -> ProviderFixture {
    ProviderFixture {
        fixture_id,
        fixture: Fixture {
            home_team: home.0.to_string(),
            away_team: away.0.to_string(),
            match_date: kickoff,
            league_id,
            league_name: "Premier League".to_string(),
            round: format!("Regular Season - {}", fixture_id % 38 + 1),
            status,
            home_id: Some(home.1),
            away_id: Some(away.1),
        },
    }
}

pub fn raw_card(team: &str, player: &str, detail: &str, minute: i32) -> RawCardEvent {
    RawCardEvent {
        team: Some(team.to_string()),
        player: Some(player.to_string()),
        detail: Some(detail.to_string()),
        minute: Some(minute),
        extra: None,
    }
}

pub fn stored_card(
    fixture_id: u64,
    home: &str,
    away: &str,
    offending: &str,
    player: &str,
    minute: i32,
    kind: CardKind,
    days_ago: i64,
) -> CardEvent {
    CardEvent {
        fixture_id,
        match_label: format!("{home} vs {away}"),
        league_id: 39,
        league_name: "Premier League".to_string(),
        match_date: base_time() - Duration::days(days_ago),
        home_team: home.to_string(),
        away_team: away.to_string(),
        offending_team: offending.to_string(),
        player: player.to_string(),
        card_kind: kind,
        minute,
        stoppage_minute: None,
        matchday: 1,
    }
}
