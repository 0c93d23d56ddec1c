//! Next scheduled fixture for a resolved team, and who the opponent is.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::aliases::canonicalize;
use crate::model::{Fixture, FixtureStatus, ResolvedTeam};
use crate::provider::{DateRange, FixtureQuery, FixtureScope, RemoteProvider};
use crate::resolve::team_names;
use crate::store::{FixtureStore, name_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opponent {
    pub name: String,
    pub provider_id: Option<u32>,
    pub subject_is_home: bool,
    /// Neither side or both sides matched the subject; home was assumed to be the subject.
    pub ambiguous: bool,
}

pub struct FixtureLocator<'a> {
    provider: Option<&'a dyn RemoteProvider>,
    local: Option<&'a dyn FixtureStore>,
    horizon: Duration,
}

impl<'a> FixtureLocator<'a> {
    pub fn new(
        provider: Option<&'a dyn RemoteProvider>,
        local: Option<&'a dyn FixtureStore>,
        horizon_days: i64,
    ) -> Self {
        Self {
            provider,
            local,
            horizon: Duration::days(horizon_days.max(1)),
        }
    }

    /// Soonest scheduled fixture in `[now, now + horizon]`. The provider is asked first when
    /// the team has a provider id; locally imported fixtures are the fallback.
    pub fn next_fixture(&self, team: &ResolvedTeam, now: DateTime<Utc>) -> Option<Fixture> {
        let until = now + self.horizon;

        if let (Some(provider), Some(team_id)) = (self.provider, team.provider_id) {
            let query = FixtureQuery {
                scope: FixtureScope::Team(team_id),
                range: DateRange::window(now, until),
                status: FixtureStatus::Scheduled,
            };
            match provider.list_fixtures(&query) {
                Ok(list) => {
                    let found = soonest(list.into_iter().map(|pf| pf.fixture), now, until);
                    if found.is_some() {
                        return found;
                    }
                    debug!(team = %team.display_name, team_id, "provider lists no upcoming fixture");
                }
                Err(err) => {
                    warn!(team = %team.display_name, team_id, error = %err, "upcoming fixture lookup failed");
                }
            }
        }

        let local = self.local?;
        let mut candidates = Vec::new();
        for name in team_names(team) {
            match local.find_upcoming(&name, now, until) {
                Ok(list) => candidates.extend(list),
                Err(err) => {
                    warn!(team = %name, error = %err, "local fixture lookup failed");
                }
            }
        }
        soonest(candidates.into_iter(), now, until)
    }
}

/// Ties on kick-off keep the first fixture seen.
pub fn soonest(
    fixtures: impl Iterator<Item = Fixture>,
    now: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Option<Fixture> {
    fixtures
        .filter(|f| f.status == FixtureStatus::Scheduled)
        .filter(|f| f.match_date >= now && f.match_date <= until)
        .min_by_key(|f| f.match_date)
}

/// The side of `fixture` that is not `subject`. Provider ids decide when both are known,
/// otherwise names are compared case-insensitively.
pub fn derive_opponent(fixture: &Fixture, subject: &ResolvedTeam) -> Opponent {
    if let Some(id) = subject.provider_id {
        if fixture.home_id == Some(id) && fixture.away_id != Some(id) {
            return away_opponent(fixture, false);
        }
        if fixture.away_id == Some(id) && fixture.home_id != Some(id) {
            return home_opponent(fixture);
        }
    }

    let names: Vec<String> = team_names(subject).iter().map(|n| name_key(n)).collect();
    let home = side_matches(&fixture.home_team, &names);
    let away = side_matches(&fixture.away_team, &names);
    match (home, away) {
        (true, false) => away_opponent(fixture, false),
        (false, true) => home_opponent(fixture),
        _ => {
            warn!(
                team = %subject.display_name,
                home = %fixture.home_team,
                away = %fixture.away_team,
                "cannot tell which side is the subject; assuming home"
            );
            away_opponent(fixture, true)
        }
    }
}

fn side_matches(side: &str, subject_keys: &[String]) -> bool {
    let side_key = name_key(side);
    let side_canonical = name_key(&canonicalize(side));
    subject_keys
        .iter()
        .any(|k| !k.is_empty() && (side_key.contains(k.as_str()) || side_canonical == *k))
}

fn away_opponent(fixture: &Fixture, ambiguous: bool) -> Opponent {
    Opponent {
        name: fixture.away_team.clone(),
        provider_id: fixture.away_id,
        subject_is_home: true,
        ambiguous,
    }
}

fn home_opponent(fixture: &Fixture) -> Opponent {
    Opponent {
        name: fixture.home_team.clone(),
        provider_id: fixture.home_id,
        subject_is_home: false,
        ambiguous: false,
    }
}
