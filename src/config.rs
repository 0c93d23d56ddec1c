use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::h2h::H2HBasis;
use crate::model::Competition;

const APP_DIR: &str = "card_bookings";
const DB_FILE: &str = "cards.sqlite";

const DEFAULT_HORIZON_DAYS: i64 = 60;
const DEFAULT_LOOKBACK_YEARS: i64 = 5;
const DEFAULT_REQUEST_DELAY_SECS: u64 = 8;
const DEFAULT_BACKOFF_SECS: u64 = 30;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    ApiFootball,
    FootballData,
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "api-football" | "apifootball" | "api_football" => Some(ProviderKind::ApiFootball),
            "football-data" | "footballdata" | "football_data" => Some(ProviderKind::FootballData),
            _ => None,
        }
    }
}

/// Pauses between remote calls during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub per_request: Duration,
    pub backoff: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            per_request: Duration::ZERO,
            backoff: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            per_request: Duration::from_secs(DEFAULT_REQUEST_DELAY_SECS),
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub football_data_token: Option<String>,
    pub db_path: Option<PathBuf>,
    pub competitions: Vec<Competition>,
    pub fixture_horizon_days: i64,
    pub lookback_years: i64,
    pub h2h_basis: H2HBasis,
    pub pacing: Pacing,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match env::var("CARD_PROVIDER") {
            Ok(raw) if !raw.trim().is_empty() => {
                ProviderKind::parse(&raw).ok_or(ConfigError::Invalid {
                    key: "CARD_PROVIDER",
                    value: raw,
                })?
            }
            _ => ProviderKind::ApiFootball,
        };
        let h2h_basis = match env::var("H2H_BASIS") {
            Ok(raw) if !raw.trim().is_empty() => {
                H2HBasis::parse(&raw).ok_or(ConfigError::Invalid {
                    key: "H2H_BASIS",
                    value: raw,
                })?
            }
            _ => H2HBasis::default(),
        };
        let competitions = match env::var("CARD_LEAGUES") {
            Ok(raw) if !raw.trim().is_empty() => {
                let parsed = parse_competitions(&raw, provider);
                if parsed.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: "CARD_LEAGUES",
                        value: raw,
                    });
                }
                parsed
            }
            _ => default_competitions(provider),
        };

        Ok(Self {
            provider,
            api_key: env_string("API_KEY"),
            football_data_token: env_string("FOOTBALL_DATA_TOKEN"),
            db_path: env_string("CARD_DB_PATH")
                .map(PathBuf::from)
                .or_else(default_db_path),
            competitions,
            fixture_horizon_days: env_i64("FIXTURE_HORIZON_DAYS")
                .unwrap_or(DEFAULT_HORIZON_DAYS)
                .clamp(1, 365),
            lookback_years: env_i64("H2H_LOOKBACK_YEARS")
                .unwrap_or(DEFAULT_LOOKBACK_YEARS)
                .clamp(1, 30),
            h2h_basis,
            pacing: Pacing {
                per_request: Duration::from_secs(
                    env_u64("INGEST_REQUEST_DELAY_SECS").unwrap_or(DEFAULT_REQUEST_DELAY_SECS),
                ),
                backoff: Duration::from_secs(
                    env_u64("INGEST_BACKOFF_SECS").unwrap_or(DEFAULT_BACKOFF_SECS),
                ),
            },
            http_timeout: Duration::from_secs(
                env_u64("HTTP_TIMEOUT_SECS")
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
                    .clamp(5, 120),
            ),
        })
    }

    /// The credential the selected provider cannot run without.
    pub fn require_credentials(&self) -> Result<&str, ConfigError> {
        match self.provider {
            ProviderKind::ApiFootball => self
                .api_key
                .as_deref()
                .ok_or(ConfigError::Missing("API_KEY")),
            ProviderKind::FootballData => self
                .football_data_token
                .as_deref()
                .ok_or(ConfigError::Missing("FOOTBALL_DATA_TOKEN")),
        }
    }
}

/// The five top leagues in the selected provider's id space.
pub fn default_competitions(provider: ProviderKind) -> Vec<Competition> {
    let ids: [u32; 5] = match provider {
        ProviderKind::ApiFootball => [39, 140, 135, 78, 61],
        ProviderKind::FootballData => [2021, 2014, 2019, 2002, 2015],
    };
    let leagues = [
        ("PL", "Premier League"),
        ("PD", "La Liga"),
        ("SA", "Serie A"),
        ("BL1", "Bundesliga"),
        ("FL1", "Ligue 1"),
    ];
    ids.into_iter()
        .zip(leagues)
        .map(|(id, (code, name))| Competition::new(id, code, name))
        .collect()
}

/// Parses `id:CODE:Name` entries separated by commas. A bare id keeps a known entry's code
/// and name when it is one of the provider's defaults.
pub fn parse_competitions(raw: &str, provider: ProviderKind) -> Vec<Competition> {
    let defaults = default_competitions(provider);
    let mut out: Vec<Competition> = Vec::new();
    for part in raw.split([',', ';']) {
        let mut fields = part.trim().splitn(3, ':');
        let Some(id) = fields.next().and_then(|s| s.trim().parse::<u32>().ok()) else {
            continue;
        };
        if id == 0 || out.iter().any(|c| c.id == id) {
            continue;
        }
        let code = fields.next().map(str::trim).filter(|s| !s.is_empty());
        let name = fields.next().map(str::trim).filter(|s| !s.is_empty());
        let known = defaults.iter().find(|c| c.id == id);
        let code = code
            .map(|s| s.to_string())
            .or_else(|| known.map(|c| c.code.clone()))
            .unwrap_or_else(|| id.to_string());
        let name = name
            .map(|s| s.to_string())
            .or_else(|| known.map(|c| c.name.clone()))
            .unwrap_or_else(|| format!("League {id}"));
        out.push(Competition { id, code, name });
    }
    out
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_i64(key: &str) -> Option<i64> {
    env::var(key).ok().and_then(|v| v.trim().parse::<i64>().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.trim().parse::<u64>().ok())
}
