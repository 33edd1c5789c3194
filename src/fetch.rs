use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::executor::Executor;
use crate::graphql::{GraphqlTransport, Query};
use crate::model::{EventMap, EventRecord, PhaseGroupMap, PhaseGroupRecord, Roster};

/// Seeds requested per roster query. Only the first page is ever read.
pub const SEED_PAGE_SIZE: u32 = 100;

pub const EVENTS_QUERY: Query = Query {
    operation: "TournamentEvents",
    document: r#"
query TournamentEvents($slug: String) {
  tournament(slug: $slug) {
    events {
      id
      name
      videogame { name }
    }
  }
}
"#,
};

// No wave or seed totals here; the roster query fetches those per group.
pub const PHASE_GROUPS_QUERY: Query = Query {
    operation: "EventPhaseGroups",
    document: r#"
query EventPhaseGroups($eventId: ID!) {
  event(id: $eventId) {
    tournament { id slug name }
    phaseGroups {
      id
      displayIdentifier
      phase { id }
    }
  }
}
"#,
};

pub const ROSTER_QUERY: Query = Query {
    operation: "PhaseGroupRoster",
    document: r#"
query PhaseGroupRoster($phaseGroupId: ID!, $page: Int!, $perPage: Int!) {
  phaseGroup(id: $phaseGroupId) {
    wave { identifier startAt }
    seeds(query: { page: $page, perPage: $perPage }) {
      pageInfo { total }
      nodes {
        entrant {
          participants {
            gamerTag
            user { discriminator }
          }
        }
      }
    }
  }
}
"#,
};

/// First seed page of a phase group, flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterPage {
    pub wave_id: Option<String>,
    pub start_time: Option<i64>,
    pub players: Roster,
    /// Seed total reported by the service, if any.
    pub seed_total: Option<u64>,
    pub seeds_read: usize,
    /// More seeds exist than the single page read.
    pub truncated: bool,
    /// Seeds with no entrant assigned.
    pub empty_seeds: usize,
    /// Tags of participants without a linked user.
    pub skipped_tags: Vec<String>,
}

pub fn get_events<T: GraphqlTransport>(executor: &Executor<T>, slug: &str) -> Result<EventMap> {
    let data = executor
        .execute(&EVENTS_QUERY, Some(json!({ "slug": slug })))
        .with_context(|| format!("fetch events for {slug}"))?;
    let events = parse_events(data).with_context(|| format!("parse events for {slug}"))?;
    debug!(slug, events = events.len(), "fetched events");
    Ok(events)
}

pub fn get_event_phase_groups<T: GraphqlTransport>(
    executor: &Executor<T>,
    event_id: u64,
) -> Result<PhaseGroupMap> {
    let data = executor
        .execute(&PHASE_GROUPS_QUERY, Some(json!({ "eventId": event_id })))
        .with_context(|| format!("fetch phase groups for event {event_id}"))?;
    parse_phase_groups(data).with_context(|| format!("parse phase groups for event {event_id}"))
}

/// Fetches the first seed page of `phase_group_id` and copies its wave
/// details into `record`.
pub fn get_players_phase_group<T: GraphqlTransport>(
    executor: &Executor<T>,
    phase_group_id: u64,
    record: &mut PhaseGroupRecord,
) -> Result<RosterPage> {
    let variables = json!({
        "phaseGroupId": phase_group_id,
        "page": 1,
        "perPage": SEED_PAGE_SIZE,
    });
    let data = executor
        .execute(&ROSTER_QUERY, Some(variables))
        .with_context(|| format!("fetch roster for phase group {phase_group_id}"))?;
    let page = parse_roster(data)
        .with_context(|| format!("parse roster for phase group {phase_group_id}"))?;

    record.wave_id = page.wave_id.clone();
    record.start_time = page.start_time;

    for tag in &page.skipped_tags {
        info!(phase_group = phase_group_id, tag = %tag, "participant has no linked user, skipped");
    }
    if page.truncated {
        warn!(
            phase_group = phase_group_id,
            total = page.seed_total.unwrap_or_default(),
            read = page.seeds_read,
            "seed list longer than one page, roster truncated"
        );
    }
    Ok(page)
}

pub fn parse_events(data: Value) -> Result<EventMap> {
    let parsed: EventsData = serde_json::from_value(data).context("unexpected events shape")?;
    let tournament = parsed
        .tournament
        .ok_or_else(|| anyhow!("tournament not found"))?;

    let mut out = EventMap::new();
    for event in tournament.events.unwrap_or_default() {
        let game = event
            .videogame
            .and_then(|v| v.name)
            .unwrap_or_default();
        out.insert(
            event.id,
            EventRecord {
                game,
                name: event.name.unwrap_or_default(),
            },
        );
    }
    Ok(out)
}

pub fn parse_phase_groups(data: Value) -> Result<PhaseGroupMap> {
    let parsed: PhaseGroupsData =
        serde_json::from_value(data).context("unexpected phase groups shape")?;
    let event = parsed.event.ok_or_else(|| anyhow!("event not found"))?;
    let tournament = event
        .tournament
        .ok_or_else(|| anyhow!("event has no tournament"))?;
    let slug = tournament.slug.unwrap_or_default();
    let name = tournament.name.unwrap_or_default();

    let mut out = PhaseGroupMap::new();
    for group in event.phase_groups.unwrap_or_default() {
        let Some(phase) = group.phase else {
            warn!(phase_group = group.id, "phase group without phase, skipped");
            continue;
        };
        out.insert(
            group.id,
            PhaseGroupRecord {
                phase_id: phase.id,
                display_id: group.display_identifier.unwrap_or_default(),
                wave_id: None,
                start_time: None,
                tournament_slug: slug.clone(),
                tournament_name: name.clone(),
                tournament_id: tournament.id,
            },
        );
    }
    Ok(out)
}

pub fn parse_roster(data: Value) -> Result<RosterPage> {
    let parsed: RosterData = serde_json::from_value(data).context("unexpected roster shape")?;
    let group = parsed
        .phase_group
        .ok_or_else(|| anyhow!("phase group not found"))?;

    let mut page = RosterPage::default();
    if let Some(wave) = group.wave {
        page.wave_id = wave.identifier;
        page.start_time = wave.start_at;
    }

    let Some(seeds) = group.seeds else {
        return Ok(page);
    };
    let nodes = seeds.nodes.unwrap_or_default();
    page.seeds_read = nodes.len();
    page.seed_total = seeds.page_info.and_then(|p| p.total);
    page.truncated = page
        .seed_total
        .is_some_and(|total| total > page.seeds_read as u64);

    for seed in nodes.into_iter().flatten() {
        let Some(entrant) = seed.entrant else {
            page.empty_seeds += 1;
            continue;
        };
        for participant in entrant.participants.unwrap_or_default().into_iter().flatten() {
            let tag = participant.gamer_tag.unwrap_or_default();
            match participant.user.and_then(|u| u.discriminator) {
                Some(discriminator) => {
                    page.players.insert(discriminator, tag);
                }
                None => page.skipped_tags.push(tag),
            }
        }
    }
    Ok(page)
}

#[derive(Debug, Deserialize)]
struct EventsData {
    tournament: Option<EventsTournament>,
}

#[derive(Debug, Deserialize)]
struct EventsTournament {
    #[serde(default)]
    events: Option<Vec<EventNode>>,
}

#[derive(Debug, Deserialize)]
struct EventNode {
    #[serde(deserialize_with = "de_id")]
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    videogame: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhaseGroupsData {
    event: Option<PhaseGroupsEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhaseGroupsEvent {
    tournament: Option<TournamentRef>,
    #[serde(default)]
    phase_groups: Option<Vec<PhaseGroupNode>>,
}

#[derive(Debug, Deserialize)]
struct TournamentRef {
    #[serde(deserialize_with = "de_id")]
    id: u64,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhaseGroupNode {
    #[serde(deserialize_with = "de_id")]
    id: u64,
    #[serde(default)]
    display_identifier: Option<String>,
    #[serde(default)]
    phase: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    #[serde(deserialize_with = "de_id")]
    id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterData {
    phase_group: Option<RosterGroup>,
}

#[derive(Debug, Deserialize)]
struct RosterGroup {
    #[serde(default)]
    wave: Option<WaveNode>,
    #[serde(default)]
    seeds: Option<SeedConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaveNode {
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    start_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedConnection {
    #[serde(default)]
    page_info: Option<PageInfo>,
    #[serde(default)]
    nodes: Option<Vec<Option<SeedNode>>>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default, deserialize_with = "de_opt_u64")]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SeedNode {
    #[serde(default)]
    entrant: Option<EntrantNode>,
}

#[derive(Debug, Deserialize)]
struct EntrantNode {
    #[serde(default)]
    participants: Option<Vec<Option<ParticipantNode>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantNode {
    #[serde(default)]
    gamer_tag: Option<String>,
    #[serde(default)]
    user: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
struct UserNode {
    #[serde(default, deserialize_with = "de_opt_string")]
    discriminator: Option<String>,
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    as_u64_any(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid id: {value}")))
}

fn de_opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_u64_any(&value))
}

fn de_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_i64_any(&value))
}

fn de_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}
