use chrono::{DateTime, NaiveDate, Utc};

use crate::error::ProviderError;
use crate::model::{FixtureStatus, ProviderFixture, RawCardEvent, TeamCandidate};

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn open() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn window(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self::between(from.date_naive(), until.date_naive())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureScope {
    Team(u32),
    Competition { id: u32, season: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureQuery {
    pub scope: FixtureScope,
    pub range: DateRange,
    pub status: FixtureStatus,
}

/// One remote sports-data source. Adapters translate their own wire format into these calls;
/// nothing above this trait branches on which provider is in use.
pub trait RemoteProvider {
    fn name(&self) -> &str;

    /// Candidates in provider order. An unknown team is an empty list, not an error.
    fn search_teams(&self, name: &str) -> Result<Vec<TeamCandidate>, ProviderError>;

    fn list_fixtures(&self, query: &FixtureQuery) -> Result<Vec<ProviderFixture>, ProviderError>;

    fn list_card_events(&self, fixture_id: u64) -> Result<Vec<RawCardEvent>, ProviderError>;
}

impl<P: RemoteProvider + ?Sized> RemoteProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn search_teams(&self, name: &str) -> Result<Vec<TeamCandidate>, ProviderError> {
        (**self).search_teams(name)
    }

    fn list_fixtures(&self, query: &FixtureQuery) -> Result<Vec<ProviderFixture>, ProviderError> {
        (**self).list_fixtures(query)
    }

    fn list_card_events(&self, fixture_id: u64) -> Result<Vec<RawCardEvent>, ProviderError> {
        (**self).list_card_events(fixture_id)
    }
}
