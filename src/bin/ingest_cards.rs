use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate, Utc};

use card_bookings::config::{AppConfig, ProviderKind, parse_competitions};
use card_bookings::engine::Engine;
use card_bookings::ingest::{month_range, season_range};
use card_bookings::model::Competition;
use card_bookings::provider::DateRange;

fn main() -> Result<()> {
    card_bookings::load_env();
    card_bookings::init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = AppConfig::from_env()?;

    let competitions = select_competitions(
        &cfg.competitions,
        cfg.provider,
        arg_value(&args, "--league-ids"),
    );
    if competitions.is_empty() {
        return Err(anyhow!("no competitions resolved for ingest"));
    }

    let season = match arg_value(&args, "--season") {
        Some(raw) => raw
            .trim()
            .parse::<i32>()
            .with_context(|| format!("invalid --season {raw}"))?,
        None => current_season(),
    };
    let range = resolve_range(&args, season)?;

    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| cfg.db_path.clone())
        .context("unable to resolve sqlite path")?;

    let engine = Engine::open(&cfg, &db_path)?;
    let summary = engine.run_ingestion(&competitions, season, range.from, range.to)?;

    println!("Card ingest complete");
    println!("DB: {}", db_path.display());
    println!("Season: {season}");
    println!(
        "Range: {} .. {}",
        fmt_day(range.from),
        fmt_day(range.to)
    );
    println!("Fixtures fetched: {}", summary.fetched);
    println!("Cards saved: {}", summary.saved);
    if summary.skipped_events > 0 {
        println!("Events skipped: {}", summary.skipped_events);
    }
    if summary.backoffs > 0 {
        println!("Rate-limit pauses: {}", summary.backoffs);
    }
    for item in &summary.per_competition {
        println!(
            "{} ({}): fixtures={} cards={}",
            item.competition.name, item.competition.id, item.fixtures, item.saved
        );
        if !item.errors.is_empty() {
            println!("  errors: {}", item.errors.len());
            for err in item.errors.iter().take(6) {
                println!("   - {err}");
            }
        }
    }
    if args.iter().any(|a| a == "--fixtures") {
        let stored = engine.sync_fixtures(&competitions, season, Utc::now())?;
        println!("Upcoming fixtures stored: {stored}");
    }

    Ok(())
}

/// `--month` wins over `--from`/`--to`; with neither the whole season is requested.
fn resolve_range(args: &[String], season: i32) -> Result<DateRange> {
    if let Some(month) = arg_value(args, "--month") {
        return month_range(season, &month)
            .with_context(|| format!("unknown month {month}; use aug..may"));
    }
    let from = arg_value(args, "--from").map(|s| parse_day(&s)).transpose()?;
    let to = arg_value(args, "--to").map(|s| parse_day(&s)).transpose()?;
    if from.is_none() && to.is_none() {
        return season_range(season).context("invalid season");
    }
    Ok(DateRange { from, to })
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date {raw}; expected YYYY-MM-DD"))
}

fn fmt_day(day: Option<NaiveDate>) -> String {
    day.map(|d| d.to_string()).unwrap_or_else(|| "open".to_string())
}

/// Seasons start in August.
fn current_season() -> i32 {
    let today = Utc::now().date_naive();
    if today.month() >= 8 {
        today.year()
    } else {
        today.year() - 1
    }
}

fn select_competitions(
    configured: &[Competition],
    provider: ProviderKind,
    ids_arg: Option<String>,
) -> Vec<Competition> {
    let Some(raw) = ids_arg else {
        return configured.to_vec();
    };
    let ids = parse_ids(&raw);
    ids.into_iter()
        .filter_map(|id| {
            configured
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .or_else(|| parse_competitions(&id.to_string(), provider).into_iter().next())
        })
        .collect()
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.clone());
        }
    }
    None
}

fn parse_ids(raw: &str) -> Vec<u32> {
    let ids = raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .filter(|id| *id != 0)
        .collect::<Vec<_>>();
    dedup_ids(ids)
}

fn dedup_ids(ids: Vec<u32>) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        if seen.insert(id) {
            out.push(id);
        }
    }
    out
}
