use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::http_client::{get_text, http_client};
use crate::model::{Fixture, FixtureStatus, ProviderFixture, RawCardEvent, TeamCandidate};
use crate::provider::{FixtureQuery, FixtureScope, RemoteProvider};

const API_FOOTBALL_BASE: &str = "https://v3.football.api-sports.io";
const KEY_HEADER: &str = "x-apisports-key";

pub struct ApiFootball {
    client: &'static Client,
    api_key: String,
    base_url: String,
}

impl ApiFootball {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(Some(timeout))?,
            api_key: api_key.to_string(),
            base_url: API_FOOTBALL_BASE.to_string(),
        })
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "api-football request");
        get_text(
            self.client,
            &url,
            query,
            &[(KEY_HEADER, self.api_key.as_str())],
        )
    }
}

impl RemoteProvider for ApiFootball {
    fn name(&self) -> &str {
        "api-football"
    }

    fn search_teams(&self, name: &str) -> Result<Vec<TeamCandidate>, ProviderError> {
        let body = self.get("/teams", &[("search", name.to_string())])?;
        parse_teams_json(&body)
    }

    fn list_fixtures(&self, query: &FixtureQuery) -> Result<Vec<ProviderFixture>, ProviderError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        match query.scope {
            FixtureScope::Team(id) => params.push(("team", id.to_string())),
            FixtureScope::Competition { id, season } => {
                params.push(("league", id.to_string()));
                params.push(("season", season.to_string()));
            }
        }
        if let Some(from) = query.range.from {
            params.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = query.range.to {
            params.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        let status = match query.status {
            FixtureStatus::Finished => "FT-AET-PEN",
            FixtureStatus::Scheduled => "TBD-NS",
        };
        params.push(("status", status.to_string()));
        params.push(("timezone", "UTC".to_string()));

        let body = self.get("/fixtures", &params)?;
        parse_fixtures_json(&body)
    }

    fn list_card_events(&self, fixture_id: u64) -> Result<Vec<RawCardEvent>, ProviderError> {
        let body = self.get(
            "/fixtures/events",
            &[
                ("fixture", fixture_id.to_string()),
                ("type", "Card".to_string()),
            ],
        )?;
        parse_events_json(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    errors: Value,
    #[serde(default = "Vec::new")]
    response: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TeamEntry {
    team: ApiTeam,
}

#[derive(Debug, Deserialize)]
struct ApiTeam {
    id: Option<u32>,
    name: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    fixture: ApiFixture,
    league: ApiLeague,
    teams: ApiTeams,
}

#[derive(Debug, Deserialize)]
struct ApiFixture {
    id: u64,
    date: String,
    status: ApiStatus,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    short: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLeague {
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    round: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTeams {
    home: ApiTeam,
    away: ApiTeam,
}

#[derive(Debug, Deserialize)]
struct EventEntry {
    #[serde(default)]
    time: ApiTime,
    team: Option<ApiTeam>,
    player: Option<ApiPlayer>,
    #[serde(rename = "type")]
    kind: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiTime {
    elapsed: Option<i32>,
    extra: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ApiPlayer {
    name: Option<String>,
}

fn parse_envelope<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<Vec<T>, ProviderError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let envelope: Envelope<T> = serde_json::from_str(trimmed)?;
    check_errors(&envelope.errors)?;
    Ok(envelope.response)
}

/// API-Football reports quota and auth problems with a 200 and a non-empty `errors` field.
fn check_errors(errors: &Value) -> Result<(), ProviderError> {
    let entries: Vec<(String, String)> = match errors {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|v| (String::new(), v.to_string()))
            .collect(),
        _ => Vec::new(),
    };
    if entries.is_empty() {
        return Ok(());
    }
    let limited = entries.iter().any(|(k, v)| {
        let k = k.to_ascii_lowercase();
        let v = v.to_ascii_lowercase();
        k == "ratelimit" || k == "requests" || v.contains("too many") || v.contains("limit")
    });
    if limited {
        return Err(ProviderError::RateLimited);
    }
    let joined = entries
        .into_iter()
        .map(|(k, v)| if k.is_empty() { v } else { format!("{k}: {v}") })
        .collect::<Vec<_>>()
        .join("; ");
    Err(ProviderError::Http {
        status: 200,
        body: joined,
    })
}

pub fn parse_teams_json(raw: &str) -> Result<Vec<TeamCandidate>, ProviderError> {
    let entries: Vec<TeamEntry> = parse_envelope(raw)?;
    Ok(entries
        .into_iter()
        .filter_map(|e| {
            Some(TeamCandidate {
                id: e.team.id?,
                name: e.team.name.filter(|n| !n.trim().is_empty())?,
                short_code: e.team.code.filter(|c| !c.trim().is_empty()),
            })
        })
        .collect())
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<ProviderFixture>, ProviderError> {
    let entries: Vec<FixtureEntry> = parse_envelope(raw)?;
    let mut out = Vec::with_capacity(entries.len());
    for e in entries {
        let Some(status) = e.fixture.status.short.as_deref().and_then(map_status) else {
            continue;
        };
        let Ok(match_date) = DateTime::parse_from_rfc3339(&e.fixture.date) else {
            warn!(fixture_id = e.fixture.id, date = %e.fixture.date, "unparseable fixture date");
            continue;
        };
        let (Some(home_team), Some(away_team)) = (e.teams.home.name, e.teams.away.name) else {
            warn!(fixture_id = e.fixture.id, "fixture without team names");
            continue;
        };
        out.push(ProviderFixture {
            fixture_id: e.fixture.id,
            fixture: Fixture {
                home_team,
                away_team,
                match_date: match_date.with_timezone(&Utc),
                league_id: e.league.id,
                league_name: e.league.name,
                round: e.league.round.unwrap_or_default(),
                status,
                home_id: e.teams.home.id,
                away_id: e.teams.away.id,
            },
        });
    }
    Ok(out)
}

pub fn parse_events_json(raw: &str) -> Result<Vec<RawCardEvent>, ProviderError> {
    let entries: Vec<EventEntry> = parse_envelope(raw)?;
    Ok(entries
        .into_iter()
        .filter(|e| {
            e.kind
                .as_deref()
                .is_none_or(|k| k.eq_ignore_ascii_case("card"))
        })
        .map(|e| RawCardEvent {
            team: e.team.and_then(|t| t.name),
            player: e.player.and_then(|p| p.name),
            detail: e.detail,
            minute: e.time.elapsed,
            extra: e.time.extra,
        })
        .collect())
}

fn map_status(short: &str) -> Option<FixtureStatus> {
    match short {
        "FT" | "AET" | "PEN" => Some(FixtureStatus::Finished),
        "NS" | "TBD" => Some(FixtureStatus::Scheduled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_events_json, parse_fixtures_json, parse_teams_json};
    use crate::error::ProviderError;
    use crate::model::FixtureStatus;

    #[test]
    fn parses_team_search() {
        let raw = r#"{"errors":[],"response":[
            {"team":{"id":50,"name":"Manchester City","code":"MAC"},"venue":{}},
            {"team":{"id":33,"name":"Manchester United","code":null}}
        ]}"#;
        let teams = parse_teams_json(raw).unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].id, 50);
        assert_eq!(teams[0].short_code.as_deref(), Some("MAC"));
        assert!(teams[1].short_code.is_none());
    }

    #[test]
    fn quota_errors_surface_as_rate_limited() {
        let raw = r#"{"errors":{"requests":"You have reached the request limit for the day"},"response":[]}"#;
        assert!(matches!(
            parse_teams_json(raw),
            Err(ProviderError::RateLimited)
        ));
        let raw = r#"{"errors":{"token":"Error/Missing application key"},"response":[]}"#;
        assert!(matches!(
            parse_teams_json(raw),
            Err(ProviderError::Http { status: 200, .. })
        ));
    }

    #[test]
    fn parses_fixtures_and_skips_live() {
        let raw = r#"{"response":[
            {"fixture":{"id":1035037,"date":"2024-08-16T19:00:00+00:00","status":{"short":"FT"}},
             "league":{"id":39,"name":"Premier League","round":"Regular Season - 1"},
             "teams":{"home":{"id":33,"name":"Manchester United"},"away":{"id":36,"name":"Fulham"}}},
            {"fixture":{"id":1035038,"date":"2024-08-17T11:30:00+00:00","status":{"short":"2H"}},
             "league":{"id":39,"name":"Premier League","round":"Regular Season - 1"},
             "teams":{"home":{"id":34,"name":"Newcastle"},"away":{"id":41,"name":"Southampton"}}}
        ]}"#;
        let fixtures = parse_fixtures_json(raw).unwrap();
        assert_eq!(fixtures.len(), 1);
        let f = &fixtures[0];
        assert_eq!(f.fixture_id, 1035037);
        assert_eq!(f.fixture.status, FixtureStatus::Finished);
        assert_eq!(f.fixture.round, "Regular Season - 1");
        assert_eq!(f.fixture.home_id, Some(33));
    }

    #[test]
    fn parses_card_events_only() {
        let raw = r#"{"response":[
            {"time":{"elapsed":45,"extra":2},"team":{"id":33,"name":"Manchester United"},
             "player":{"id":1,"name":"B. Fernandes"},"type":"Card","detail":"Yellow Card"},
            {"time":{"elapsed":60,"extra":null},"team":{"id":36,"name":"Fulham"},
             "player":{"id":2,"name":"R. Jiménez"},"type":"Goal","detail":"Normal Goal"}
        ]}"#;
        let events = parse_events_json(raw).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].player.as_deref(), Some("B. Fernandes"));
        assert_eq!(events[0].extra, Some(2));
    }

    #[test]
    fn null_payloads_are_empty() {
        assert!(parse_teams_json("null").unwrap().is_empty());
        assert!(parse_events_json("").unwrap().is_empty());
    }
}
