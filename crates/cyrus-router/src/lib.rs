//! Webhook Router (C3): maps an inbound event to a single `Repository` by
//! label → project → team → workspace fallback (spec.md §4.3).

use cyrus_core::Repository;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// The subset of the subject issue needed to make a routing decision —
/// fetched once by the caller, kept free of any Tracker I/O here.
pub struct RoutingContext<'a> {
    pub labels: &'a [String],
    pub project: Option<&'a str>,
    pub team_key: Option<&'a str>,
    /// e.g. `"ENG-123"`, used to derive a team key when `team_key` is absent.
    pub identifier: &'a str,
}

static IDENTIFIER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9]*)-\d+$").expect("static regex is valid"));

fn team_key_from_identifier(identifier: &str) -> Option<&str> {
    IDENTIFIER_PREFIX
        .captures(identifier)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Choose the `Repository` an event should be routed to, or `None` if no
/// repository in the candidate set matches by any rule.
///
/// `candidates` must already be narrowed to the repository set for the
/// delivering Tracker token.
pub fn route<'a>(ctx: &RoutingContext<'_>, candidates: &'a [&'a Repository]) -> Option<&'a Repository> {
    // 1. Label routing.
    if let Some(repo) = candidates
        .iter()
        .find(|r| r.routing_labels.iter().any(|l| ctx.labels.contains(l)))
    {
        debug!(repository = %repo.id, "routed by label");
        return Some(repo);
    }

    // 2. Project routing.
    if let Some(project) = ctx.project
        && let Some(repo) = candidates.iter().find(|r| r.project_keys.iter().any(|p| p == project))
    {
        debug!(repository = %repo.id, "routed by project");
        return Some(repo);
    }

    // 3. Team routing (fall back to parsing the identifier's prefix).
    let team_key = ctx.team_key.or_else(|| team_key_from_identifier(ctx.identifier));
    if let Some(team_key) = team_key
        && let Some(repo) = candidates.iter().find(|r| r.team_keys.iter().any(|t| t == team_key))
    {
        debug!(repository = %repo.id, "routed by team key");
        return Some(repo);
    }

    // 4. Workspace catch-all: the repository declaring no routing keys at all.
    if let Some(repo) = candidates
        .iter()
        .find(|r| r.routing_labels.is_empty() && r.project_keys.is_empty() && r.team_keys.is_empty())
    {
        debug!(repository = %repo.id, "routed by workspace catch-all");
        return Some(repo);
    }

    // 5. Workspace fallback: the first repository in the set.
    let repo = candidates.first().copied();
    if let Some(repo) = repo {
        debug!(repository = %repo.id, "routed by workspace fallback");
    }
    repo
}
