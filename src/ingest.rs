use std::time::Duration;

use anyhow::{Result, anyhow};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::executor::Executor;
use crate::fetch;
use crate::graphql::GraphqlTransport;
use crate::model::{EventMap, Roster, merge_last_wins};
use crate::store;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub tournament_slugs: Vec<String>,
    /// Pause before every roster query.
    pub roster_pacing: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub tournaments_total: usize,
    pub tournaments_succeeded: usize,
    pub events: usize,
    pub events_inserted: usize,
    pub phase_groups: usize,
    pub phase_groups_inserted: usize,
    pub players_seen: usize,
    pub players_inserted: usize,
    pub empty_seeds: usize,
    pub skipped_participants: usize,
    pub truncated_groups: Vec<u64>,
    pub event_id_collisions: Vec<u64>,
    pub remote_calls: u64,
    pub errors: Vec<String>,
}

/// One full pass: events of every tournament, then per event its phase
/// groups and their rosters.
///
/// Remote failures of a single tournament, event or phase group are recorded
/// in the summary and skipped; store failures abort the run. An event's phase
/// groups are committed before its rosters so player rows never point at a
/// missing group.
pub fn run_ingest<T: GraphqlTransport>(
    conn: &mut Connection,
    executor: &Executor<T>,
    options: &IngestOptions,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary {
        tournaments_total: options.tournament_slugs.len(),
        ..IngestSummary::default()
    };

    let events = collect_events(executor, &options.tournament_slugs, &mut summary)?;
    summary.events = events.len();
    summary.events_inserted = store::add_events(conn, &events)?;

    for (event_id, event) in &events {
        let mut groups = match fetch::get_event_phase_groups(executor, *event_id) {
            Ok(groups) => groups,
            Err(err) => {
                warn!(event_id, error = %format!("{err:#}"), "skipping event");
                summary.errors.push(format!("event {event_id}: {err:#}"));
                continue;
            }
        };

        let mut rosters: Vec<(u64, Roster)> = Vec::with_capacity(groups.len());
        for (group_id, record) in groups.iter_mut() {
            if !options.roster_pacing.is_zero() {
                executor.pause(options.roster_pacing);
            }
            match fetch::get_players_phase_group(executor, *group_id, record) {
                Ok(page) => {
                    summary.players_seen += page.players.len();
                    summary.empty_seeds += page.empty_seeds;
                    summary.skipped_participants += page.skipped_tags.len();
                    if page.truncated {
                        summary.truncated_groups.push(*group_id);
                    }
                    rosters.push((*group_id, page.players));
                }
                Err(err) => {
                    warn!(phase_group = group_id, error = %format!("{err:#}"), "skipping roster");
                    summary.errors.push(format!("phase group {group_id}: {err:#}"));
                }
            }
        }

        summary.phase_groups += groups.len();
        summary.phase_groups_inserted += store::add_phase_groups(conn, *event_id, &groups)?;
        for (group_id, players) in &rosters {
            summary.players_inserted += store::add_players(conn, *group_id, players)?;
        }
        info!(
            event_id,
            game = %event.game,
            event = %event.name,
            phase_groups = groups.len(),
            "event ingested"
        );
    }

    summary.remote_calls = executor.calls();
    Ok(summary)
}

fn collect_events<T: GraphqlTransport>(
    executor: &Executor<T>,
    slugs: &[String],
    summary: &mut IngestSummary,
) -> Result<EventMap> {
    let mut events = EventMap::new();
    for slug in slugs {
        match fetch::get_events(executor, slug) {
            Ok(found) => {
                summary.tournaments_succeeded += 1;
                for event_id in merge_last_wins(&mut events, found) {
                    warn!(event_id, slug = %slug, "event id seen in more than one tournament, keeping latest");
                    summary.event_id_collisions.push(event_id);
                }
            }
            Err(err) => {
                warn!(slug = %slug, error = %format!("{err:#}"), "skipping tournament");
                summary.errors.push(format!("tournament {slug}: {err:#}"));
            }
        }
    }
    if summary.tournaments_succeeded == 0 {
        return Err(anyhow!(
            "no tournament could be fetched: {}",
            summary.errors.join("; ")
        ));
    }
    Ok(events)
}
