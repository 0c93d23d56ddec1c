use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use card_bookings::config::AppConfig;
use card_bookings::engine::Engine;
use card_bookings::matchday::{MATCHDAY_RANGES, parse_matchday_range};
use card_bookings::report::{render_cards, render_prediction, render_resolved, render_teams};
use card_bookings::store::open_db;

const DEFAULT_RECENT_LIMIT: usize = 20;
const VALUE_FLAGS: &[&str] = &["--db", "--limit", "--league", "--matchdays"];

fn main() -> Result<()> {
    card_bookings::load_env();
    card_bookings::init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let positional = positional_args(&args);
    let Some((command, rest)) = positional.split_first() else {
        print_usage();
        return Ok(());
    };

    let cfg = AppConfig::from_env()?;
    let db_path = flag_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| cfg.db_path.clone())
        .context("unable to resolve sqlite path")?;

    match command.as_str() {
        "predict" => {
            let team = join_team(rest)?;
            let engine = Engine::open(&cfg, &db_path)?;
            println!("{}", render_prediction(&engine.get_prediction(&team)));
        }
        "resolve" => {
            let team = join_team(rest)?;
            let engine = Engine::open(&cfg, &db_path)?;
            match engine.resolve_team(&team) {
                Ok(resolved) => println!("{}", render_resolved(&resolved)),
                Err(err) => println!("{err}"),
            }
        }
        "recent" => {
            let limit = flag_value(&args, "--limit")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_RECENT_LIMIT);
            let store = open_db(&db_path)?;
            let cards = store.recent_cards(limit)?;
            println!("{}", render_cards(&format!("Last {limit} cards"), &cards));
        }
        "teams" => {
            let league_id = rest
                .first()
                .cloned()
                .or_else(|| flag_value(&args, "--league"))
                .and_then(|v| v.trim().parse::<u32>().ok())
                .context("teams needs a league id")?;
            let store = open_db(&db_path)?;
            println!("{}", render_teams(league_id, &store.teams_in_league(league_id)?));
        }
        "cards" => {
            let team = join_team(rest)?;
            let league_id = flag_value(&args, "--league").and_then(|v| v.trim().parse::<u32>().ok());
            let matchdays = flag_value(&args, "--matchdays").and_then(|v| parse_matchday_range(&v));
            let store = open_db(&db_path)?;
            let cards = store.team_cards(&team, league_id, matchdays)?;
            let range = matchdays
                .map(|(lo, hi)| format!("matchdays {lo}-{hi}"))
                .unwrap_or_else(|| "all matchdays".to_string());
            let league = league_id
                .map(|id| format!(", league {id}"))
                .unwrap_or_default();
            println!(
                "{}",
                render_cards(&format!("Cards for {team} ({range}{league})"), &cards)
            );
        }
        other => {
            print_usage();
            return Err(anyhow!("unknown command {other}"));
        }
    }

    Ok(())
}

fn print_usage() {
    let ranges = MATCHDAY_RANGES
        .iter()
        .map(|(lo, hi)| format!("{lo}-{hi}"))
        .collect::<Vec<_>>()
        .join(", ");
    eprintln!("usage: card_bookings <command> [--db PATH]");
    eprintln!("  predict <team>                     next fixture and head-to-head card signal");
    eprintln!("  resolve <team>                     show how a team name resolves");
    eprintln!("  recent [--limit N]                 latest stored bookings");
    eprintln!("  teams <league id>                  teams with stored bookings in a league");
    eprintln!("  cards <team> [--league ID] [--matchdays RANGE]");
    eprintln!("                                     RANGE is one of {ranges}, or all");
}

fn join_team(rest: &[String]) -> Result<String> {
    let team = rest.join(" ");
    if team.trim().is_empty() {
        return Err(anyhow!("a team name is required"));
    }
    Ok(team)
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
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

/// Arguments that are neither flags nor the value of a `--flag VALUE` pair.
fn positional_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = VALUE_FLAGS.contains(&arg.as_str());
            continue;
        }
        out.push(arg.clone());
    }
    out
}
