mod common;

use std::rc::Rc;
use std::time::Duration;

use rusqlite::Connection;

use bracket_snapshot::ingest::{IngestOptions, run_ingest};
use bracket_snapshot::store::{self, table_row_count};

use common::{COMMUNITY_SLUG, SLUG, bracket_transport, fast_executor};

fn options(slugs: &[&str]) -> IngestOptions {
    IngestOptions {
        tournament_slugs: slugs.iter().map(|s| s.to_string()).collect(),
        roster_pacing: Duration::ZERO,
    }
}

fn memory_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    store::enable_foreign_keys(&conn).unwrap();
    conn
}

fn dump(conn: &Connection) -> Vec<String> {
    let queries = [
        "SELECT quote(event_id) || '|' || quote(game) || '|' || quote(event_name) FROM events ORDER BY event_id",
        "SELECT quote(phasegroup_id) || '|' || quote(display) || '|' || quote(phase_id) || '|' || quote(wave) || '|' \
         || quote(tournament_slug) || '|' || quote(tournament_name) || '|' || quote(tournament_id) || '|' \
         || quote(start_time) || '|' || quote(event_id) FROM phasegroups ORDER BY phasegroup_id",
        "SELECT quote(discriminator) || '|' || quote(tag) || '|' || quote(phasegroup_id) FROM players \
         ORDER BY phasegroup_id, discriminator",
    ];
    let mut out = Vec::new();
    for sql in queries {
        let mut stmt = conn.prepare(sql).unwrap();
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
        for row in rows {
            out.push(row.unwrap());
        }
    }
    out
}

fn players_in(conn: &Connection, group: i64) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM players WHERE phasegroup_id = ?1",
        [group],
        |r| r.get(0),
    )
    .unwrap()
}

#[test]
fn one_event_two_groups_end_to_end() {
    let mut conn = memory_db();
    let executor = fast_executor(bracket_transport(), 2);

    let summary = run_ingest(&mut conn, &executor, &options(&[SLUG])).expect("ingest should run");

    assert_eq!(summary.events, 1);
    assert_eq!(summary.phase_groups, 2);
    assert_eq!(summary.players_seen, 5);
    assert_eq!(summary.players_inserted, 5);
    assert_eq!(summary.empty_seeds, 1);
    assert!(summary.errors.is_empty());
    assert!(summary.truncated_groups.is_empty());
    assert_eq!(summary.remote_calls, 4);

    assert_eq!(table_row_count(&conn, "events").unwrap(), 1);
    assert_eq!(table_row_count(&conn, "phasegroups").unwrap(), 2);
    assert_eq!(table_row_count(&conn, "players").unwrap(), 5);
    assert_eq!(players_in(&conn, 2001), 3);
    assert_eq!(players_in(&conn, 2002), 2);

    let orphans: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM phasegroups WHERE event_id != 900001",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);

    let (wave, start): (String, i64) = conn
        .query_row(
            "SELECT wave, start_time FROM phasegroups WHERE phasegroup_id = 2002",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(wave, "B");
    assert_eq!(start, 1693591200);
}

#[test]
fn second_run_leaves_store_unchanged() {
    let mut conn = memory_db();

    let first = fast_executor(bracket_transport(), 2);
    run_ingest(&mut conn, &first, &options(&[SLUG])).unwrap();
    let before = dump(&conn);

    let second = fast_executor(bracket_transport(), 2);
    let summary = run_ingest(&mut conn, &second, &options(&[SLUG])).unwrap();
    let after = dump(&conn);

    assert_eq!(before, after);
    assert_eq!(before.len(), 1 + 2 + 5);
    assert_eq!(summary.events_inserted, 0);
    assert_eq!(summary.phase_groups_inserted, 0);
    assert_eq!(summary.players_inserted, 0);
}

#[test]
fn failed_roster_keeps_group_without_players() {
    let transport = common::FixtureTransport::new()
        .route(&format!("events:{SLUG}"), "events.json")
        .route("event:900001", "phase_groups.json")
        .route("roster:2001", "roster_2001.json");
    let mut conn = memory_db();
    let executor = fast_executor(transport, 3);

    let summary = run_ingest(&mut conn, &executor, &options(&[SLUG])).unwrap();

    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("phase group 2002"));
    assert_eq!(executor.transport().calls_for("roster:2002"), 3);
    assert_eq!(table_row_count(&conn, "phasegroups").unwrap(), 2);
    assert_eq!(players_in(&conn, 2001), 3);
    assert_eq!(players_in(&conn, 2002), 0);

    let wave: Option<String> = conn
        .query_row(
            "SELECT wave FROM phasegroups WHERE phasegroup_id = 2002",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(wave, None);
}

#[test]
fn flaky_calls_are_retried_and_counted() {
    let transport = bracket_transport().flaky("roster:2001", 2);
    let mut conn = memory_db();
    let executor = fast_executor(transport, 5);

    let summary = run_ingest(&mut conn, &executor, &options(&[SLUG])).unwrap();

    assert!(summary.errors.is_empty());
    assert_eq!(summary.remote_calls, 6);
    assert_eq!(executor.transport().calls_for("roster:2001"), 3);
    assert_eq!(table_row_count(&conn, "players").unwrap(), 5);
}

#[test]
fn events_merge_across_tournaments() {
    let transport = bracket_transport().route(&format!("events:{COMMUNITY_SLUG}"), "events_community.json");
    let mut conn = memory_db();
    let executor = fast_executor(transport, 1);

    let summary = run_ingest(&mut conn, &executor, &options(&[SLUG, COMMUNITY_SLUG])).unwrap();

    assert_eq!(summary.tournaments_succeeded, 2);
    assert_eq!(summary.events, 3);
    assert!(summary.event_id_collisions.is_empty());
    assert_eq!(table_row_count(&conn, "events").unwrap(), 3);
    // The community events have no phase group fixtures.
    assert_eq!(summary.errors.len(), 2);
    assert_eq!(table_row_count(&conn, "phasegroups").unwrap(), 2);
}

#[test]
fn unknown_tournament_is_skipped() {
    let mut conn = memory_db();
    let executor = fast_executor(bracket_transport(), 1);

    let summary = run_ingest(
        &mut conn,
        &executor,
        &options(&["tournament/does-not-exist", SLUG]),
    )
    .unwrap();

    assert_eq!(summary.tournaments_total, 2);
    assert_eq!(summary.tournaments_succeeded, 1);
    assert_eq!(summary.events, 1);
    assert!(summary.errors[0].contains("tournament/does-not-exist"));
}

#[test]
fn aborts_when_no_tournament_loads() {
    let mut conn = memory_db();
    let executor = fast_executor(bracket_transport(), 1);

    let result = run_ingest(&mut conn, &executor, &options(&["tournament/nope"]));
    assert!(result.is_err());
    assert_eq!(table_row_count(&conn, "events").unwrap(), 0);
}

#[test]
fn snapshot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("phases.db");
    {
        let mut conn = store::open_db(&path).unwrap();
        let executor = fast_executor(bracket_transport(), 1);
        run_ingest(&mut conn, &executor, &options(&[SLUG])).unwrap();
    }
    let conn = store::open_db(&path).unwrap();
    assert_eq!(table_row_count(&conn, "events").unwrap(), 1);
    assert_eq!(table_row_count(&conn, "phasegroups").unwrap(), 2);
    assert_eq!(table_row_count(&conn, "players").unwrap(), 5);
}

#[test]
fn each_roster_fetch_is_preceded_by_a_pause() {
    let transport = bracket_transport();
    let log = transport.call_log();
    let sink = Rc::clone(&log);
    let executor = fast_executor(transport, 1)
        .with_sleeper(move |d| sink.borrow_mut().push(format!("pause:{}ms", d.as_millis())));
    let mut conn = memory_db();
    let opts = IngestOptions {
        roster_pacing: Duration::from_millis(300),
        ..options(&[SLUG])
    };

    run_ingest(&mut conn, &executor, &opts).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "events:tournament/ceotaku-2023",
            "event:900001",
            "pause:300ms",
            "roster:2001",
            "pause:300ms",
            "roster:2002",
        ]
    );
}
