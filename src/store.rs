use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::warn;

use crate::model::{CardEvent, CardKind, Fixture, FixtureStatus};

/// Read and idempotent-write access to stored bookings.
pub trait EventStore {
    /// Events whose offending, home or away team contains `pattern` (case-insensitive),
    /// in insertion order.
    fn find_by_name_substring(&self, pattern: &str) -> Result<Vec<CardEvent>>;

    /// Events from fixtures between `a` and `b` in either home/away order, on or after `since`.
    fn find_by_team_pair(&self, a: &str, b: &str, since: DateTime<Utc>) -> Result<Vec<CardEvent>>;

    /// Inserts the event or overwrites the one with the same `(fixture_id, player, minute)`.
    fn upsert(&self, event: &CardEvent) -> Result<()>;
}

pub trait FixtureStore {
    /// Scheduled fixtures involving `team` (substring, case-insensitive) kicking off in
    /// `[from, until]`, soonest first.
    fn find_upcoming(
        &self,
        team: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Fixture>>;
}

pub struct SqliteStore {
    conn: Connection,
}

pub fn open_db(path: &Path) -> Result<SqliteStore> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")
        .context("enable wal")?;
    init_schema(&conn)?;
    Ok(SqliteStore { conn })
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS card_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fixture_id INTEGER NOT NULL,
            match_label TEXT NOT NULL,
            league_id INTEGER NOT NULL,
            league_name TEXT NOT NULL,
            match_date TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            offending_team TEXT NOT NULL,
            player TEXT NOT NULL,
            card_kind TEXT NOT NULL,
            minute INTEGER NOT NULL,
            stoppage_minute INTEGER NULL,
            matchday INTEGER NOT NULL,
            team_key TEXT NOT NULL,
            home_key TEXT NOT NULL,
            away_key TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(fixture_id, player, minute)
        );
        CREATE INDEX IF NOT EXISTS idx_cards_pair ON card_events(home_key, away_key);
        CREATE INDEX IF NOT EXISTS idx_cards_date ON card_events(match_date);
        CREATE INDEX IF NOT EXISTS idx_cards_league ON card_events(league_id, matchday);

        CREATE TABLE IF NOT EXISTS fixtures (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_key TEXT NOT NULL,
            away_key TEXT NOT NULL,
            match_date TEXT NOT NULL,
            league_id INTEGER NOT NULL,
            league_name TEXT NOT NULL,
            round TEXT NOT NULL,
            status TEXT NOT NULL,
            home_id INTEGER NULL,
            away_id INTEGER NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(source, home_team, away_team, match_date)
        );
        CREATE INDEX IF NOT EXISTS idx_fixtures_date ON fixtures(match_date);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            competition_id INTEGER NOT NULL,
            season INTEGER NOT NULL,
            fixtures_fetched INTEGER NOT NULL,
            cards_saved INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

const CARD_COLUMNS: &str = "fixture_id, match_label, league_id, league_name, match_date, \
     home_team, away_team, offending_team, player, card_kind, minute, stoppage_minute, matchday";

const FIXTURE_COLUMNS: &str =
    "home_team, away_team, match_date, league_id, league_name, round, status, home_id, away_id";

impl SqliteStore {
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Inserts or refreshes a fixture keyed by `(source, home_team, away_team, match_date)`.
    pub fn upsert_fixture(&self, source: &str, fixture: &Fixture) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO fixtures (
                    source, home_team, away_team, home_key, away_key, match_date,
                    league_id, league_name, round, status, home_id, away_id, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(source, home_team, away_team, match_date) DO UPDATE SET
                    home_key = excluded.home_key,
                    away_key = excluded.away_key,
                    league_id = excluded.league_id,
                    league_name = excluded.league_name,
                    round = excluded.round,
                    status = excluded.status,
                    home_id = excluded.home_id,
                    away_id = excluded.away_id,
                    updated_at = excluded.updated_at
                "#,
                params![
                    source,
                    fixture.home_team,
                    fixture.away_team,
                    name_key(&fixture.home_team),
                    name_key(&fixture.away_team),
                    ts_to_db(fixture.match_date),
                    fixture.league_id as i64,
                    fixture.league_name,
                    fixture.round,
                    fixture.status.as_str(),
                    fixture.home_id.map(i64::from),
                    fixture.away_id.map(i64::from),
                    ts_to_db(Utc::now()),
                ],
            )
            .context("upsert fixture")?;
        Ok(())
    }

    pub fn count_cards(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM card_events", [], |row| row.get(0))
            .context("count cards")?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    pub fn find_card(&self, fixture_id: u64, player: &str, minute: i32) -> Result<Option<CardEvent>> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM card_events WHERE fixture_id = ?1 AND player = ?2 AND minute = ?3"
        );
        self.conn
            .query_row(&sql, params![fixture_id as i64, player, minute], card_from_row)
            .optional()
            .context("query card by key")
    }

    /// Latest bookings first.
    pub fn recent_cards(&self, limit: usize) -> Result<Vec<CardEvent>> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM card_events ORDER BY match_date DESC, fixture_id DESC, minute ASC LIMIT ?1"
        );
        self.query_cards(&sql, params![limit as i64])
    }

    /// Distinct offending-team names with bookings in a league, alphabetical.
    pub fn teams_in_league(&self, league_id: u32) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT DISTINCT offending_team FROM card_events
                 WHERE league_id = ?1 AND offending_team <> ''
                 ORDER BY offending_team ASC",
            )
            .context("prepare teams query")?;
        let rows = stmt
            .query_map(params![league_id as i64], |row| row.get::<_, String>(0))
            .context("query teams")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode team row")?);
        }
        Ok(out)
    }

    /// Bookings in fixtures involving `team`, optionally limited to a league and an
    /// inclusive matchday range. Latest first.
    pub fn team_cards(
        &self,
        team: &str,
        league_id: Option<u32>,
        matchdays: Option<(u32, u32)>,
    ) -> Result<Vec<CardEvent>> {
        let key = name_key(team);
        let (md_from, md_to) = matchdays.unwrap_or((0, u32::MAX));
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM card_events
             WHERE (instr(team_key, ?1) > 0 OR instr(home_key, ?1) > 0 OR instr(away_key, ?1) > 0)
               AND (?2 IS NULL OR league_id = ?2)
               AND matchday >= ?3 AND matchday <= ?4
             ORDER BY match_date DESC, fixture_id DESC, minute ASC"
        );
        self.query_cards(
            &sql,
            params![
                key,
                league_id.map(i64::from),
                md_from as i64,
                md_to as i64
            ],
        )
    }

    pub fn begin_run(&self, competition_id: u32, season: i32) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO ingest_runs(started_at, finished_at, competition_id, season, fixtures_fetched, cards_saved, errors_json)
                 VALUES (?1, NULL, ?2, ?3, 0, 0, '[]')",
                params![ts_to_db(Utc::now()), competition_id as i64, season],
            )
            .context("insert ingest run")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn finish_run(&self, run_id: i64, fetched: usize, saved: usize, errors: &[String]) -> Result<()> {
        let errors_json = serde_json::to_string(errors).unwrap_or_else(|_| "[]".to_string());
        self.conn
            .execute(
                "UPDATE ingest_runs
                 SET finished_at = ?1, fixtures_fetched = ?2, cards_saved = ?3, errors_json = ?4
                 WHERE run_id = ?5",
                params![
                    ts_to_db(Utc::now()),
                    fetched as i64,
                    saved as i64,
                    errors_json,
                    run_id
                ],
            )
            .context("update ingest run")?;
        Ok(())
    }

    fn query_cards(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<CardEvent>> {
        let mut stmt = self.conn.prepare(sql).context("prepare card query")?;
        let rows = stmt.query_map(args, card_from_row).context("query cards")?;
        let mut out = Vec::new();
        for row in rows {
            match row {
                Ok(card) => out.push(card),
                // A single undecodable row is skipped; statement failures still propagate.
                Err(err @ rusqlite::Error::FromSqlConversionFailure(..)) => {
                    warn!(error = %err, "skipping unreadable card row");
                }
                Err(err) => return Err(err).context("decode card row"),
            }
        }
        Ok(out)
    }
}

impl EventStore for SqliteStore {
    fn find_by_name_substring(&self, pattern: &str) -> Result<Vec<CardEvent>> {
        let key = name_key(pattern);
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM card_events
             WHERE instr(team_key, ?1) > 0 OR instr(home_key, ?1) > 0 OR instr(away_key, ?1) > 0
             ORDER BY id ASC"
        );
        self.query_cards(&sql, params![key])
    }

    fn find_by_team_pair(&self, a: &str, b: &str, since: DateTime<Utc>) -> Result<Vec<CardEvent>> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM card_events
             WHERE ((home_key = ?1 AND away_key = ?2) OR (home_key = ?2 AND away_key = ?1))
               AND match_date >= ?3
             ORDER BY match_date ASC, id ASC"
        );
        self.query_cards(&sql, params![name_key(a), name_key(b), ts_to_db(since)])
    }

    fn upsert(&self, event: &CardEvent) -> Result<()> {
        upsert_card(&self.conn, event)
    }
}

impl FixtureStore for SqliteStore {
    fn find_upcoming(
        &self,
        team: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Fixture>> {
        let key = name_key(team);
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {FIXTURE_COLUMNS} FROM fixtures
             WHERE (instr(home_key, ?1) > 0 OR instr(away_key, ?1) > 0)
               AND status = 'SCHEDULED'
               AND match_date >= ?2 AND match_date <= ?3
             ORDER BY match_date ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare fixture query")?;
        let rows = stmt
            .query_map(
                params![key, ts_to_db(from), ts_to_db(until)],
                fixture_from_row,
            )
            .context("query fixtures")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode fixture row")?);
        }
        Ok(out)
    }
}

fn upsert_card(conn: &Connection, e: &CardEvent) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO card_events (
            fixture_id, match_label, league_id, league_name, match_date,
            home_team, away_team, offending_team, player, card_kind,
            minute, stoppage_minute, matchday,
            team_key, home_key, away_key, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13,
            ?14, ?15, ?16, ?17
        )
        ON CONFLICT(fixture_id, player, minute) DO UPDATE SET
            match_label = excluded.match_label,
            league_id = excluded.league_id,
            league_name = excluded.league_name,
            match_date = excluded.match_date,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            offending_team = excluded.offending_team,
            card_kind = excluded.card_kind,
            stoppage_minute = excluded.stoppage_minute,
            matchday = excluded.matchday,
            team_key = excluded.team_key,
            home_key = excluded.home_key,
            away_key = excluded.away_key,
            updated_at = excluded.updated_at
        "#,
        params![
            e.fixture_id as i64,
            e.match_label,
            e.league_id as i64,
            e.league_name,
            ts_to_db(e.match_date),
            e.home_team,
            e.away_team,
            e.offending_team,
            e.player,
            e.card_kind.as_str(),
            e.minute,
            e.stoppage_minute,
            e.matchday as i64,
            name_key(&e.offending_team),
            name_key(&e.home_team),
            name_key(&e.away_team),
            ts_to_db(Utc::now()),
        ],
    )
    .with_context(|| format!("upsert card fixture={} player={}", e.fixture_id, e.player))?;
    Ok(())
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<CardEvent> {
    let kind_raw: String = row.get(9)?;
    let card_kind = CardKind::from_db(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            Type::Text,
            format!("unknown card kind {kind_raw}").into(),
        )
    })?;
    Ok(CardEvent {
        fixture_id: row.get::<_, i64>(0)? as u64,
        match_label: row.get(1)?,
        league_id: row.get::<_, i64>(2)? as u32,
        league_name: row.get(3)?,
        match_date: ts_from_db(row, 4)?,
        home_team: row.get(5)?,
        away_team: row.get(6)?,
        offending_team: row.get(7)?,
        player: row.get(8)?,
        card_kind,
        minute: row.get(10)?,
        stoppage_minute: row.get(11)?,
        matchday: row.get::<_, i64>(12)? as u32,
    })
}

fn fixture_from_row(row: &Row<'_>) -> rusqlite::Result<Fixture> {
    let status_raw: String = row.get(6)?;
    let status = FixtureStatus::from_db(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            Type::Text,
            format!("unknown fixture status {status_raw}").into(),
        )
    })?;
    Ok(Fixture {
        home_team: row.get(0)?,
        away_team: row.get(1)?,
        match_date: ts_from_db(row, 2)?,
        league_id: row.get::<_, i64>(3)? as u32,
        league_name: row.get(4)?,
        round: row.get(5)?,
        status,
        home_id: row.get::<_, Option<i64>>(7)?.map(|v| v as u32),
        away_id: row.get::<_, Option<i64>>(8)?.map(|v| v as u32),
    })
}

/// Lower-cased, trimmed form used by every case-insensitive comparison.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn ts_to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn ts_from_db(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}
