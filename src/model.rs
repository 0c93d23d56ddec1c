use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team as the local store knows it: one preferred spelling plus every spelling seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamIdentity {
    pub canonical_name: String,
    pub aliases: BTreeSet<String>,
    pub provider_id: Option<u32>,
    pub league_ids: BTreeSet<u32>,
}

impl TeamIdentity {
    /// Returns `None` for a blank name; the canonical name is always one of the aliases.
    pub fn new(canonical_name: &str) -> Option<Self> {
        let canonical_name = canonical_name.trim();
        if canonical_name.is_empty() {
            return None;
        }
        let mut aliases = BTreeSet::new();
        aliases.insert(canonical_name.to_string());
        Some(Self {
            canonical_name: canonical_name.to_string(),
            aliases,
            provider_id: None,
            league_ids: BTreeSet::new(),
        })
    }

    pub fn add_alias(&mut self, alias: &str) {
        let alias = alias.trim();
        if !alias.is_empty() {
            self.aliases.insert(alias.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardKind {
    Yellow,
    Red,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Yellow => "YELLOW",
            CardKind::Red => "RED",
        }
    }

    pub fn from_db(raw: &str) -> Option<Self> {
        match raw {
            "YELLOW" => Some(CardKind::Yellow),
            "RED" => Some(CardKind::Red),
            _ => None,
        }
    }

    /// Maps a provider card label ("Yellow Card", "Second Yellow card", "Red Card", ...).
    /// A second yellow is a sending-off and counts as red.
    pub fn from_detail(detail: &str) -> Option<Self> {
        let d = detail.trim().to_ascii_lowercase();
        if d.contains("red") || d.contains("second yellow") || d.contains("yellow_red") {
            Some(CardKind::Red)
        } else if d.contains("yellow") {
            Some(CardKind::Yellow)
        } else {
            None
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One booking. Natural key is `(fixture_id, player, minute)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CardEvent {
    pub fixture_id: u64,
    pub match_label: String,
    pub league_id: u32,
    pub league_name: String,
    pub match_date: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub offending_team: String,
    pub player: String,
    pub card_kind: CardKind,
    pub minute: i32,
    pub stoppage_minute: Option<i32>,
    /// 0 = unknown
    pub matchday: u32,
}

impl CardEvent {
    pub fn minute_label(&self) -> String {
        match self.stoppage_minute {
            Some(extra) if extra > 0 => format!("{}+{}'", self.minute, extra),
            _ => format!("{}'", self.minute),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixtureStatus {
    Scheduled,
    Finished,
}

impl FixtureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixtureStatus::Scheduled => "SCHEDULED",
            FixtureStatus::Finished => "FINISHED",
        }
    }

    pub fn from_db(raw: &str) -> Option<Self> {
        match raw {
            "SCHEDULED" => Some(FixtureStatus::Scheduled),
            "FINISHED" => Some(FixtureStatus::Finished),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub home_team: String,
    pub away_team: String,
    pub match_date: DateTime<Utc>,
    pub league_id: u32,
    pub league_name: String,
    pub round: String,
    pub status: FixtureStatus,
    /// Provider team ids, when the fixture came from a remote provider.
    pub home_id: Option<u32>,
    pub away_id: Option<u32>,
}

/// A fixture as listed by a remote provider, before card events are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFixture {
    pub fixture_id: u64,
    pub fixture: Fixture,
}

/// A raw booking as returned by a provider, not yet validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCardEvent {
    pub team: Option<String>,
    pub player: Option<String>,
    pub detail: Option<String>,
    pub minute: Option<i32>,
    pub extra: Option<i32>,
}

/// One entry of a provider team search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamCandidate {
    pub id: u32,
    pub name: String,
    pub short_code: Option<String>,
}

/// A competition the ingestion pipeline walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Competition {
    pub id: u32,
    pub code: String,
    pub name: String,
}

impl Competition {
    pub fn new(id: u32, code: &str, name: &str) -> Self {
        Self {
            id,
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTeam {
    pub display_name: String,
    pub provider_id: Option<u32>,
    /// Present when the local store knew the team.
    pub local: Option<TeamIdentity>,
}

impl ResolvedTeam {
    /// The spelling the card store uses, falling back to the display name.
    pub fn store_name(&self) -> &str {
        self.local
            .as_ref()
            .map(|t| t.canonical_name.as_str())
            .unwrap_or(&self.display_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Over,
    Under,
    Unknown,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Over => write!(f, "OVER"),
            Signal::Under => write!(f, "UNDER"),
            Signal::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Averages are `None` when there is no sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct H2HStats {
    pub sample_size: usize,
    pub avg_yellow: Option<f64>,
    pub avg_red: Option<f64>,
    pub signal: Signal,
}

impl H2HStats {
    pub fn empty() -> Self {
        Self {
            sample_size: 0,
            avg_yellow: None,
            avg_red: None,
            signal: Signal::Unknown,
        }
    }

    pub fn combined_avg(&self) -> Option<f64> {
        Some(self.avg_yellow? + self.avg_red?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_canonical_name_is_an_alias() {
        let team = TeamIdentity::new("  Arsenal ").expect("non-empty");
        assert_eq!(team.canonical_name, "Arsenal");
        assert!(team.aliases.contains("Arsenal"));
        assert!(TeamIdentity::new("   ").is_none());
    }

    #[test]
    fn card_kind_from_provider_detail() {
        assert_eq!(CardKind::from_detail("Yellow Card"), Some(CardKind::Yellow));
        assert_eq!(CardKind::from_detail("Red Card"), Some(CardKind::Red));
        assert_eq!(
            CardKind::from_detail("Second Yellow card"),
            Some(CardKind::Red)
        );
        assert_eq!(CardKind::from_detail("YELLOW_RED"), Some(CardKind::Red));
        assert_eq!(CardKind::from_detail("Normal Goal"), None);
    }

    #[test]
    fn minute_label_includes_stoppage() {
        let ev = CardEvent {
            fixture_id: 1,
            match_label: "A vs B".to_string(),
            league_id: 39,
            league_name: "Premier League".to_string(),
            match_date: Utc::now(),
            home_team: "A".to_string(),
            away_team: "B".to_string(),
            offending_team: "A".to_string(),
            player: "P".to_string(),
            card_kind: CardKind::Yellow,
            minute: 90,
            stoppage_minute: Some(3),
            matchday: 1,
        };
        assert_eq!(ev.minute_label(), "90+3'");
    }
}
