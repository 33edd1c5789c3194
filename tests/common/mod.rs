#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;

use bracket_snapshot::error::QueryError;
use bracket_snapshot::executor::{Executor, RetryPolicy};
use bracket_snapshot::graphql::{GraphqlTransport, Query, extract_data};

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Serves canned response bodies keyed by operation and id, e.g.
/// `events:tournament/x`, `event:900001`, `roster:2001`.
#[derive(Default)]
pub struct FixtureTransport {
    routes: HashMap<String, String>,
    failures_left: RefCell<HashMap<String, u32>>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, key: &str, fixture: &str) -> Self {
        self.routes.insert(key.to_string(), read_fixture(fixture));
        self
    }

    /// Answers `key` with a rate-limit body `times` times before serving it.
    pub fn flaky(self, key: &str, times: u32) -> Self {
        self.failures_left
            .borrow_mut()
            .insert(key.to_string(), times);
        self
    }

    /// Shared handle on the ordered list of route keys requested so far.
    pub fn call_log(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.calls)
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls.borrow().iter().filter(|k| *k == key).count()
    }
}

fn route_key(query: &Query, variables: &Value) -> String {
    match query.operation {
        "TournamentEvents" => format!(
            "events:{}",
            variables["slug"].as_str().unwrap_or_default()
        ),
        "EventPhaseGroups" => format!("event:{}", variables["eventId"]),
        "PhaseGroupRoster" => format!("roster:{}", variables["phaseGroupId"]),
        other => other.to_string(),
    }
}

impl GraphqlTransport for FixtureTransport {
    fn send(&self, query: &Query, variables: &Value) -> Result<Value, QueryError> {
        let key = route_key(query, variables);
        self.calls.borrow_mut().push(key.clone());

        if let Some(left) = self.failures_left.borrow_mut().get_mut(&key)
            && *left > 0
        {
            *left -= 1;
            return extract_data(&read_fixture("rate_limited.json"));
        }

        let Some(body) = self.routes.get(&key) else {
            return Err(QueryError::Status {
                status: 404,
                body: format!("no fixture for {key}"),
            });
        };
        extract_data(body)
    }
}

/// Gives up after `max_attempts` and never actually sleeps.
pub fn fast_executor(transport: FixtureTransport, max_attempts: u32) -> Executor<FixtureTransport> {
    let policy = RetryPolicy {
        first_delay: Duration::from_millis(1),
        steady_delay: Duration::from_millis(10),
        max_attempts,
    };
    Executor::new(transport, policy).with_sleeper(|_| {})
}

pub const SLUG: &str = "tournament/ceotaku-2023";
pub const COMMUNITY_SLUG: &str = "tournament/ceotaku-2023-community-events";

/// One event with two phase groups of three seeds each; one seed in group
/// 2002 has no entrant.
pub fn bracket_transport() -> FixtureTransport {
    FixtureTransport::new()
        .route(&format!("events:{SLUG}"), "events.json")
        .route("event:900001", "phase_groups.json")
        .route("roster:2001", "roster_2001.json")
        .route("roster:2002", "roster_2002.json")
}
