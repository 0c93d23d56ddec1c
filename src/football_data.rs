use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::http_client::{get_text, http_client};
use crate::model::{Fixture, FixtureStatus, ProviderFixture, RawCardEvent, TeamCandidate};
use crate::provider::{FixtureQuery, FixtureScope, RemoteProvider};

const FOOTBALL_DATA_BASE: &str = "https://api.football-data.org/v4";
const TOKEN_HEADER: &str = "X-Auth-Token";

/// football-data.org adapter. Competition ids are this provider's own (2021 = Premier League).
/// Bookings are only present on plans that include match details.
pub struct FootballData {
    client: &'static Client,
    token: String,
}

impl FootballData {
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(Some(timeout))?,
            token: token.to_string(),
        })
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, ProviderError> {
        let url = format!("{FOOTBALL_DATA_BASE}{path}");
        debug!(%url, ?query, "football-data request");
        get_text(
            self.client,
            &url,
            query,
            &[(TOKEN_HEADER, self.token.as_str()), ("Accept", "application/json")],
        )
    }
}

impl RemoteProvider for FootballData {
    fn name(&self) -> &str {
        "football-data"
    }

    fn search_teams(&self, name: &str) -> Result<Vec<TeamCandidate>, ProviderError> {
        match self.get("/teams", &[("name", name.to_string())]) {
            Ok(body) => parse_teams_json(&body),
            Err(ProviderError::NotFound) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    fn list_fixtures(&self, query: &FixtureQuery) -> Result<Vec<ProviderFixture>, ProviderError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        let path = match query.scope {
            FixtureScope::Team(id) => format!("/teams/{id}/matches"),
            FixtureScope::Competition { id, season } => {
                params.push(("season", season.to_string()));
                format!("/competitions/{id}/matches")
            }
        };
        if let Some(from) = query.range.from {
            params.push(("dateFrom", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = query.range.to {
            params.push(("dateTo", to.format("%Y-%m-%d").to_string()));
        }
        let status = match query.status {
            FixtureStatus::Finished => "FINISHED",
            FixtureStatus::Scheduled => "SCHEDULED,TIMED",
        };
        params.push(("status", status.to_string()));

        let body = self.get(&path, &params)?;
        parse_matches_json(&body)
    }

    fn list_card_events(&self, fixture_id: u64) -> Result<Vec<RawCardEvent>, ProviderError> {
        let body = self.get(&format!("/matches/{fixture_id}"), &[])?;
        parse_bookings_json(&body)
    }
}

#[derive(Debug, Deserialize)]
struct TeamsResponse {
    #[serde(default)]
    teams: Vec<FdTeam>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdTeam {
    id: Option<u32>,
    name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    tla: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<FdMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdMatch {
    id: u64,
    utc_date: String,
    status: String,
    #[serde(default)]
    matchday: Option<u32>,
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    competition: Option<FdCompetition>,
    home_team: FdTeam,
    away_team: FdTeam,
}

#[derive(Debug, Deserialize)]
struct FdCompetition {
    id: u32,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct MatchDetail {
    #[serde(default)]
    bookings: Vec<FdBooking>,
}

#[derive(Debug, Deserialize)]
struct FdBooking {
    minute: Option<i32>,
    team: Option<FdTeam>,
    player: Option<FdPlayer>,
    card: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FdPlayer {
    name: Option<String>,
}

fn is_blank(raw: &str) -> bool {
    let t = raw.trim();
    t.is_empty() || t == "null"
}

pub fn parse_teams_json(raw: &str) -> Result<Vec<TeamCandidate>, ProviderError> {
    if is_blank(raw) {
        return Ok(Vec::new());
    }
    let resp: TeamsResponse = serde_json::from_str(raw.trim())?;
    Ok(resp
        .teams
        .into_iter()
        .filter_map(|t| {
            Some(TeamCandidate {
                id: t.id?,
                name: t.name.or(t.short_name)?,
                short_code: t.tla.filter(|c| !c.trim().is_empty()),
            })
        })
        .collect())
}

pub fn parse_matches_json(raw: &str) -> Result<Vec<ProviderFixture>, ProviderError> {
    if is_blank(raw) {
        return Ok(Vec::new());
    }
    let resp: MatchesResponse = serde_json::from_str(raw.trim())?;
    let mut out = Vec::with_capacity(resp.matches.len());
    for m in resp.matches {
        let status = match m.status.as_str() {
            "FINISHED" => FixtureStatus::Finished,
            "SCHEDULED" | "TIMED" => FixtureStatus::Scheduled,
            _ => continue,
        };
        let Ok(match_date) = DateTime::parse_from_rfc3339(&m.utc_date) else {
            warn!(fixture_id = m.id, date = %m.utc_date, "unparseable match date");
            continue;
        };
        let (Some(home_team), Some(away_team)) = (m.home_team.name, m.away_team.name) else {
            continue;
        };
        let round = match (m.matchday, m.stage) {
            (Some(day), _) => format!("Matchday {day}"),
            (None, Some(stage)) => stage,
            (None, None) => String::new(),
        };
        let (league_id, league_name) = m
            .competition
            .map(|c| (c.id, c.name))
            .unwrap_or_default();
        out.push(ProviderFixture {
            fixture_id: m.id,
            fixture: Fixture {
                home_team,
                away_team,
                match_date: match_date.with_timezone(&Utc),
                league_id,
                league_name,
                round,
                status,
                home_id: m.home_team.id,
                away_id: m.away_team.id,
            },
        });
    }
    Ok(out)
}

pub fn parse_bookings_json(raw: &str) -> Result<Vec<RawCardEvent>, ProviderError> {
    if is_blank(raw) {
        return Ok(Vec::new());
    }
    let detail: MatchDetail = serde_json::from_str(raw.trim())?;
    Ok(detail
        .bookings
        .into_iter()
        .map(|b| RawCardEvent {
            team: b.team.and_then(|t| t.name),
            player: b.player.and_then(|p| p.name),
            detail: b.card,
            minute: b.minute,
            extra: None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{parse_bookings_json, parse_matches_json, parse_teams_json};
    use crate::model::{CardKind, FixtureStatus};

    #[test]
    fn parses_teams_with_tla() {
        let raw = r#"{"count":1,"teams":[{"id":65,"name":"Manchester City FC","shortName":"Man City","tla":"MCI"}]}"#;
        let teams = parse_teams_json(raw).unwrap();
        assert_eq!(teams[0].id, 65);
        assert_eq!(teams[0].short_code.as_deref(), Some("MCI"));
    }

    #[test]
    fn parses_matches_with_matchday_round() {
        let raw = r#"{"matches":[
            {"id":497410,"utcDate":"2024-08-16T19:00:00Z","status":"FINISHED","matchday":1,
             "stage":"REGULAR_SEASON","competition":{"id":2021,"name":"Premier League"},
             "homeTeam":{"id":66,"name":"Manchester United FC"},"awayTeam":{"id":63,"name":"Fulham FC"}},
            {"id":497411,"utcDate":"2024-08-17T11:30:00Z","status":"POSTPONED",
             "homeTeam":{"id":67,"name":"Newcastle United FC"},"awayTeam":{"id":340,"name":"Southampton FC"}}
        ]}"#;
        let fixtures = parse_matches_json(raw).unwrap();
        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].fixture.round, "Matchday 1");
        assert_eq!(fixtures[0].fixture.league_id, 2021);
        assert_eq!(fixtures[0].fixture.status, FixtureStatus::Finished);
    }

    #[test]
    fn parses_bookings() {
        let raw = r#"{"id":497410,"bookings":[
            {"minute":38,"team":{"id":66,"name":"Manchester United FC"},"player":{"id":1,"name":"Casemiro"},"card":"YELLOW"},
            {"minute":80,"team":{"id":63,"name":"Fulham FC"},"player":{"id":2,"name":"Calvin Bassey"},"card":"YELLOW_RED"}
        ]}"#;
        let events = parse_bookings_json(raw).unwrap();
        assert_eq!(events.len(), 2);
        let kinds: Vec<_> = events
            .iter()
            .map(|e| e.detail.as_deref().and_then(CardKind::from_detail))
            .collect();
        assert_eq!(kinds, vec![Some(CardKind::Yellow), Some(CardKind::Red)]);
    }
}
