use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{info, warn};

use crate::aliases::canonicalize;
use crate::api_football::ApiFootball;
use crate::config::{AppConfig, Pacing, ProviderKind};
use crate::error::{ConfigError, TeamNotFound};
use crate::fixtures::{FixtureLocator, Opponent, derive_opponent};
use crate::football_data::FootballData;
use crate::h2h::{H2HBasis, head_to_head, lookback_window};
use crate::ingest::{IngestSummary, Ingestor};
use crate::model::{Competition, Fixture, H2HStats, ResolvedTeam};
use crate::provider::{DateRange, RemoteProvider};
use crate::resolve::{Resolver, resolve_locally};
use crate::store::{SqliteStore, open_db};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub horizon_days: i64,
    pub lookback_years: i64,
    pub basis: H2HBasis,
    pub pacing: Pacing,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            horizon_days: 60,
            lookback_years: 5,
            basis: H2HBasis::default(),
            pacing: Pacing::default(),
        }
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            horizon_days: cfg.fixture_horizon_days,
            lookback_years: cfg.lookback_years,
            basis: cfg.h2h_basis,
            pacing: cfg.pacing,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub team: ResolvedTeam,
    pub fixture: Fixture,
    pub opponent: Opponent,
    /// Opponent spelling used against the card store.
    pub h2h_opponent: String,
    pub stats: H2HStats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Prediction(Prediction),
    NoUpcomingFixture { team: ResolvedTeam },
    TeamNotFound(TeamNotFound),
}

/// The operations a chat or command layer calls.
pub struct Engine {
    store: SqliteStore,
    provider: Option<Box<dyn RemoteProvider>>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        store: SqliteStore,
        provider: Option<Box<dyn RemoteProvider>>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    /// Opens the database at `db_path` and builds the configured provider. Missing credentials
    /// are fatal here.
    pub fn open(cfg: &AppConfig, db_path: &Path) -> Result<Self> {
        let provider = build_provider(cfg)?;
        let store = open_db(db_path)?;
        info!(db = %db_path.display(), provider = provider.name(), "engine ready");
        Ok(Self::new(store, Some(provider), EngineSettings::from(cfg)))
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    fn provider(&self) -> Option<&dyn RemoteProvider> {
        self.provider.as_deref()
    }

    pub fn resolve_team(&self, raw: &str) -> Result<ResolvedTeam, TeamNotFound> {
        Resolver::new(&self.store, self.provider()).resolve(raw)
    }

    pub fn get_prediction(&self, raw: &str) -> PredictionOutcome {
        self.get_prediction_at(raw, Utc::now())
    }

    /// Resolve, find the next fixture, then aggregate cards against that opponent.
    pub fn get_prediction_at(&self, raw: &str, now: DateTime<Utc>) -> PredictionOutcome {
        let team = match self.resolve_team(raw) {
            Ok(team) => team,
            Err(err) => return PredictionOutcome::TeamNotFound(err),
        };

        let locator = FixtureLocator::new(
            self.provider(),
            Some(&self.store),
            self.settings.horizon_days,
        );
        let Some(fixture) = locator.next_fixture(&team, now) else {
            info!(team = %team.display_name, "no upcoming fixture");
            return PredictionOutcome::NoUpcomingFixture { team };
        };

        let opponent = derive_opponent(&fixture, &team);
        let h2h_opponent = self.normalize_opponent(&opponent.name);
        let stats = head_to_head(
            &self.store,
            team.store_name(),
            &h2h_opponent,
            lookback_window(self.settings.lookback_years),
            now,
            self.settings.basis,
        );
        info!(
            team = %team.display_name,
            opponent = %h2h_opponent,
            sample = stats.sample_size,
            signal = %stats.signal,
            "prediction"
        );
        PredictionOutcome::Prediction(Prediction {
            team,
            fixture,
            opponent,
            h2h_opponent,
            stats,
        })
    }

    /// Maps a fixture's opponent spelling onto the one the card store uses, when it knows one.
    fn normalize_opponent(&self, name: &str) -> String {
        let canonical = canonicalize(name);
        match resolve_locally(&self.store, &canonical) {
            Ok(Some(identity)) => identity.canonical_name,
            Ok(None) => canonical,
            Err(err) => {
                warn!(opponent = name, error = %err, "opponent lookup failed");
                canonical
            }
        }
    }

    pub fn run_ingestion(
        &self,
        competitions: &[Competition],
        season: i32,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<IngestSummary, ConfigError> {
        let provider = self
            .provider()
            .ok_or(ConfigError::Missing("CARD_PROVIDER"))?;
        let ingestor = Ingestor::new(provider, &self.store, self.settings.pacing);
        Ok(ingestor.run(competitions, season, DateRange { from, to }))
    }

    /// Copies the provider's scheduled fixtures for the next horizon into the local store.
    pub fn sync_fixtures(
        &self,
        competitions: &[Competition],
        season: i32,
        now: DateTime<Utc>,
    ) -> Result<usize, ConfigError> {
        let provider = self
            .provider()
            .ok_or(ConfigError::Missing("CARD_PROVIDER"))?;
        let until = now + Duration::days(self.settings.horizon_days.max(1));
        let ingestor = Ingestor::new(provider, &self.store, self.settings.pacing);
        Ok(ingestor.sync_upcoming(competitions, season, DateRange::window(now, until)))
    }
}

pub fn build_provider(cfg: &AppConfig) -> Result<Box<dyn RemoteProvider>> {
    let credential = cfg.require_credentials()?;
    let provider: Box<dyn RemoteProvider> = match cfg.provider {
        ProviderKind::ApiFootball => Box::new(
            ApiFootball::new(credential, cfg.http_timeout).context("build api-football client")?,
        ),
        ProviderKind::FootballData => Box::new(
            FootballData::new(credential, cfg.http_timeout)
                .context("build football-data client")?,
        ),
    };
    Ok(provider)
}
