//! Free-text team name to team identity.
//!
//! The chain is alias table, then the local card store, then a remote provider's team search.
//! Local resolution ranks by how often a spelling shows up in stored bookings; remote resolution
//! applies a fixed tie-break over the provider's candidates.

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use tracing::{debug, warn};

use crate::aliases::canonicalize;
use crate::error::{ProviderError, TeamNotFound};
use crate::model::{ResolvedTeam, TeamCandidate, TeamIdentity};
use crate::provider::RemoteProvider;
use crate::store::{EventStore, name_key};

/// Shorter queries match too much of the store to rank reliably.
pub const MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCandidate {
    pub identity: TeamIdentity,
    pub occurrences: usize,
}

/// Every team in the store whose name contains `partial`, most frequent first.
/// Ties keep the order in which the store returned them.
pub fn rank_local_candidates<S: EventStore + ?Sized>(
    store: &S,
    partial: &str,
) -> Result<Vec<LocalCandidate>> {
    let query = name_key(partial);
    if query.chars().count() < MIN_QUERY_LEN {
        return Ok(Vec::new());
    }

    let events = store.find_by_name_substring(&query)?;
    let mut ranked: Vec<LocalCandidate> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for ev in &events {
        // The booked side is preferred; home/away only when it is absent or does not match.
        let Some(name) = [&ev.offending_team, &ev.home_team, &ev.away_team]
            .into_iter()
            .find(|n| name_key(n).contains(&query))
        else {
            continue;
        };
        let key = name_key(name);
        let idx = match by_key.get(&key) {
            Some(idx) => *idx,
            None => {
                let Some(identity) = TeamIdentity::new(name) else {
                    continue;
                };
                ranked.push(LocalCandidate {
                    identity,
                    occurrences: 0,
                });
                by_key.insert(key, ranked.len() - 1);
                ranked.len() - 1
            }
        };
        let cand = &mut ranked[idx];
        cand.occurrences += 1;
        cand.identity.add_alias(name);
        cand.identity.league_ids.insert(ev.league_id);
    }

    ranked.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    Ok(ranked)
}

/// The best local match for `partial`, or `None`. Never guesses below the length threshold.
pub fn resolve_locally<S: EventStore + ?Sized>(
    store: &S,
    partial: &str,
) -> Result<Option<TeamIdentity>> {
    Ok(rank_local_candidates(store, partial)?
        .into_iter()
        .next()
        .map(|c| c.identity))
}

/// Tie-break over provider candidates: exact name, exact short code, name containing the
/// query, then the provider's first result.
pub fn pick_candidate<'a>(name: &str, candidates: &'a [TeamCandidate]) -> Option<&'a TeamCandidate> {
    let wanted = name_key(name);
    candidates
        .iter()
        .find(|c| name_key(&c.name) == wanted)
        .or_else(|| {
            candidates.iter().find(|c| {
                c.short_code
                    .as_deref()
                    .is_some_and(|code| name_key(code) == wanted)
            })
        })
        .or_else(|| {
            candidates
                .iter()
                .find(|c| !wanted.is_empty() && name_key(&c.name).contains(&wanted))
        })
        .or_else(|| candidates.first())
}

/// `Ok(None)` when the provider knows no such team; `Err` only when it could not answer.
pub fn resolve_remotely<P: RemoteProvider + ?Sized>(
    provider: &P,
    name: &str,
) -> Result<Option<TeamCandidate>, ProviderError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    let candidates = match provider.search_teams(name) {
        Ok(list) => list,
        Err(err) if !err.is_unavailable() => Vec::new(),
        Err(err) => return Err(err),
    };
    debug!(
        provider = provider.name(),
        query = name,
        candidates = candidates.len(),
        "team search"
    );
    Ok(pick_candidate(name, &candidates).cloned())
}

pub struct Resolver<'a> {
    store: &'a dyn EventStore,
    provider: Option<&'a dyn RemoteProvider>,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn EventStore, provider: Option<&'a dyn RemoteProvider>) -> Self {
        Self { store, provider }
    }

    /// Runs the whole chain. The remote step runs even after a local hit so callers that
    /// need a provider id get one.
    pub fn resolve(&self, raw: &str) -> Result<ResolvedTeam, TeamNotFound> {
        let not_found = || TeamNotFound {
            input: raw.to_string(),
        };
        let canonical = canonicalize(raw);
        if canonical.is_empty() {
            return Err(not_found());
        }

        let mut local = match resolve_locally(self.store, &canonical) {
            Ok(found) => found,
            Err(err) => {
                warn!(input = raw, error = %err, "local team lookup failed");
                None
            }
        };

        let remote = self.resolve_remote(&canonical, local.as_ref());

        if let (Some(identity), Some(candidate)) = (local.as_mut(), remote.as_ref()) {
            identity.provider_id = Some(candidate.id);
        }

        let display_name = match (&local, &remote) {
            (Some(identity), _) => identity.canonical_name.clone(),
            (None, Some(candidate)) => candidate.name.clone(),
            (None, None) => return Err(not_found()),
        };

        Ok(ResolvedTeam {
            display_name,
            provider_id: remote.map(|c| c.id),
            local,
        })
    }

    fn resolve_remote(&self, canonical: &str, local: Option<&TeamIdentity>) -> Option<TeamCandidate> {
        let provider = self.provider?;
        let mut names: Vec<&str> = Vec::new();
        if let Some(identity) = local {
            names.push(&identity.canonical_name);
        }
        if !names.iter().any(|n| name_key(n) == name_key(canonical)) {
            names.push(canonical);
        }

        for name in names {
            match resolve_remotely(provider, name) {
                Ok(Some(candidate)) => return Some(candidate),
                Ok(None) => continue,
                Err(err) => {
                    warn!(provider = provider.name(), query = name, error = %err, "remote team lookup unavailable");
                    return None;
                }
            }
        }
        None
    }
}

/// Distinct spellings to try when matching a resolved team against other data.
pub fn team_names(team: &ResolvedTeam) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let locals = team
        .local
        .iter()
        .flat_map(|t| std::iter::once(&t.canonical_name).chain(t.aliases.iter()));
    for name in std::iter::once(&team.display_name).chain(locals) {
        if seen.insert(name_key(name)) {
            out.push(name.clone());
        }
    }
    out
}
