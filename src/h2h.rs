//! Head-to-head card averages between two teams.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::model::{CardEvent, CardKind, H2HStats, Signal};
use crate::store::EventStore;

/// Combined cards per sample above this line is an OVER signal.
pub const OVER_UNDER_LINE: f64 = 4.5;

/// What one "sample" is when averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum H2HBasis {
    /// Each stored card event is a sample. Averages are then fractions of one card.
    #[default]
    PerCard,
    /// Each distinct fixture is a sample; averages are cards per match.
    PerFixture,
}

impl H2HBasis {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "card" | "per-card" | "per_card" | "event" => Some(H2HBasis::PerCard),
            "fixture" | "per-fixture" | "per_fixture" | "match" => Some(H2HBasis::PerFixture),
            _ => None,
        }
    }
}

pub fn lookback_window(years: i64) -> Duration {
    Duration::days(365 * years.max(0))
}

/// Averages over `events`, which must all belong to the same pairing.
pub fn summarize(events: &[CardEvent], basis: H2HBasis) -> H2HStats {
    let sample_size = match basis {
        H2HBasis::PerCard => events.len(),
        H2HBasis::PerFixture => events
            .iter()
            .map(|e| e.fixture_id)
            .collect::<BTreeSet<_>>()
            .len(),
    };
    if sample_size == 0 {
        return H2HStats::empty();
    }

    let yellows = events
        .iter()
        .filter(|e| e.card_kind == CardKind::Yellow)
        .count();
    let reds = events.len() - yellows;
    let avg_yellow = yellows as f64 / sample_size as f64;
    let avg_red = reds as f64 / sample_size as f64;
    let signal = if avg_yellow + avg_red > OVER_UNDER_LINE {
        Signal::Over
    } else {
        Signal::Under
    };

    H2HStats {
        sample_size,
        avg_yellow: Some(avg_yellow),
        avg_red: Some(avg_red),
        signal,
    }
}

/// Stats for `a` vs `b` in either home/away order, kicking off no earlier than
/// `now - lookback`. A store failure yields empty stats.
pub fn head_to_head<S: EventStore + ?Sized>(
    store: &S,
    a: &str,
    b: &str,
    lookback: Duration,
    now: DateTime<Utc>,
    basis: H2HBasis,
) -> H2HStats {
    let since = now - lookback;
    let events = match store.find_by_team_pair(a, b, since) {
        Ok(events) => events,
        Err(err) => {
            warn!(team_a = a, team_b = b, error = %err, "head-to-head query failed");
            return H2HStats::empty();
        }
    };
    let stats = summarize(&events, basis);
    debug!(
        team_a = a,
        team_b = b,
        events = events.len(),
        sample = stats.sample_size,
        ?basis,
        "head-to-head"
    );
    stats
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{H2HBasis, OVER_UNDER_LINE, head_to_head, summarize};
    use crate::model::{CardEvent, CardKind, Signal};
    use crate::store::{EventStore, SqliteStore};

    fn ev(fixture_id: u64, minute: i32, kind: CardKind, home: &str, away: &str) -> CardEvent {
        CardEvent {
            fixture_id,
            match_label: format!("{home} vs {away}"),
            league_id: 39,
            league_name: "Premier League".to_string(),
            match_date: Utc.with_ymd_and_hms(2023, 10, 1, 14, 0, 0).unwrap(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            offending_team: home.to_string(),
            player: format!("p{minute}"),
            card_kind: kind,
            minute,
            stoppage_minute: None,
            matchday: 7,
        }
    }

    #[test]
    fn empty_sample_is_unknown() {
        let stats = summarize(&[], H2HBasis::PerCard);
        assert_eq!(stats.sample_size, 0);
        assert_eq!(stats.avg_yellow, None);
        assert_eq!(stats.avg_red, None);
        assert_eq!(stats.signal, Signal::Unknown);
    }

    #[test]
    fn per_card_averages_are_fractions() {
        let events = vec![
            ev(1, 10, CardKind::Yellow, "Arsenal", "Chelsea"),
            ev(1, 20, CardKind::Yellow, "Arsenal", "Chelsea"),
            ev(2, 30, CardKind::Red, "Chelsea", "Arsenal"),
            ev(2, 40, CardKind::Yellow, "Chelsea", "Arsenal"),
        ];
        let stats = summarize(&events, H2HBasis::PerCard);
        assert_eq!(stats.sample_size, 4);
        assert_eq!(stats.avg_yellow, Some(0.75));
        assert_eq!(stats.avg_red, Some(0.25));
        assert_eq!(stats.signal, Signal::Under);
    }

    #[test]
    fn per_fixture_crosses_the_line() {
        let mut events = Vec::new();
        for minute in 0..9 {
            events.push(ev(1, minute, CardKind::Yellow, "Arsenal", "Chelsea"));
        }
        events.push(ev(2, 1, CardKind::Red, "Chelsea", "Arsenal"));
        let stats = summarize(&events, H2HBasis::PerFixture);
        assert_eq!(stats.sample_size, 2);
        assert!(stats.combined_avg().unwrap() > OVER_UNDER_LINE);
        assert_eq!(stats.signal, Signal::Over);
    }

    #[test]
    fn pairing_is_symmetric_and_lookback_bound() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&ev(1, 10, CardKind::Yellow, "Arsenal", "Chelsea")).unwrap();
        store.upsert(&ev(2, 20, CardKind::Red, "Chelsea", "Arsenal")).unwrap();
        let mut old = ev(3, 30, CardKind::Yellow, "Arsenal", "Chelsea");
        old.match_date = Utc.with_ymd_and_hms(2015, 1, 1, 14, 0, 0).unwrap();
        store.upsert(&old).unwrap();

        let now = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        let lookback = Duration::days(365 * 5);
        let ab = head_to_head(&store, "Arsenal", "Chelsea", lookback, now, H2HBasis::PerCard);
        let ba = head_to_head(&store, "chelsea", "ARSENAL", lookback, now, H2HBasis::PerCard);
        assert_eq!(ab, ba);
        assert_eq!(ab.sample_size, 2);
        assert_eq!(ab.avg_red, Some(0.5));
    }

    #[test]
    fn basis_parses_names() {
        assert_eq!(H2HBasis::parse("Fixture"), Some(H2HBasis::PerFixture));
        assert_eq!(H2HBasis::parse("card"), Some(H2HBasis::PerCard));
        assert_eq!(H2HBasis::parse("weekly"), None);
        assert_eq!(H2HBasis::default(), H2HBasis::PerCard);
    }
}
