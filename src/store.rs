use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};

use crate::model::{EventMap, PhaseGroupMap, Roster};

pub const DEFAULT_DB_FILE: &str = "phases.db";

/// Opens (or creates) the snapshot database. Tables are created lazily by the
/// `add_*` functions.
pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    enable_foreign_keys(&conn)?;
    Ok(conn)
}

pub fn enable_foreign_keys(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("enable foreign keys")?;
    Ok(())
}

/// Inserts events that are not stored yet. Returns the number of new rows.
pub fn add_events(conn: &mut Connection, events: &EventMap) -> Result<usize> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            event_id INTEGER PRIMARY KEY,
            game TEXT,
            event_name TEXT
        );
        "#,
    )
    .context("create events table")?;

    let tx = conn.transaction().context("begin events transaction")?;
    let mut inserted = 0usize;
    {
        let mut stmt = tx
            .prepare("INSERT OR IGNORE INTO events (event_id, game, event_name) VALUES (?1, ?2, ?3)")
            .context("prepare event insert")?;
        for (event_id, event) in events {
            inserted += stmt
                .execute(params![to_sql_id(*event_id)?, event.game, event.name])
                .context("insert event")?;
        }
    }
    tx.commit().context("commit events transaction")?;
    Ok(inserted)
}

/// Inserts the phase groups of one event. Returns the number of new rows.
pub fn add_phase_groups(
    conn: &mut Connection,
    event_id: u64,
    groups: &PhaseGroupMap,
) -> Result<usize> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS phasegroups (
            phasegroup_id INTEGER PRIMARY KEY,
            display TEXT,
            phase_id INTEGER,
            wave TEXT,
            tournament_slug TEXT,
            tournament_name TEXT,
            tournament_id INTEGER,
            start_time DATETIME,
            event_id INTEGER,
            FOREIGN KEY(event_id) REFERENCES events(event_id)
        );
        "#,
    )
    .context("create phasegroups table")?;

    let tx = conn.transaction().context("begin phasegroups transaction")?;
    let mut inserted = 0usize;
    {
        let mut stmt = tx
            .prepare(
                r#"
                INSERT OR IGNORE INTO phasegroups (
                    phasegroup_id, display, phase_id, wave,
                    tournament_slug, tournament_name, tournament_id,
                    start_time, event_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .context("prepare phasegroup insert")?;
        for (group_id, group) in groups {
            inserted += stmt
                .execute(params![
                    to_sql_id(*group_id)?,
                    group.display_id,
                    to_sql_id(group.phase_id)?,
                    group.wave_id,
                    group.tournament_slug,
                    group.tournament_name,
                    to_sql_id(group.tournament_id)?,
                    group.start_time,
                    to_sql_id(event_id)?,
                ])
                .with_context(|| format!("insert phasegroup {group_id}"))?;
        }
    }
    tx.commit().context("commit phasegroups transaction")?;
    Ok(inserted)
}

/// Inserts one phase group's roster. Returns the number of new rows.
pub fn add_players(conn: &mut Connection, phase_group_id: u64, roster: &Roster) -> Result<usize> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            discriminator TEXT,
            tag TEXT,
            phasegroup_id INTEGER,
            FOREIGN KEY(phasegroup_id) REFERENCES phasegroups(phasegroup_id),
            UNIQUE(discriminator, phasegroup_id)
        );
        "#,
    )
    .context("create players table")?;

    let tx = conn.transaction().context("begin players transaction")?;
    let mut inserted = 0usize;
    {
        let mut stmt = tx
            .prepare(
                "INSERT OR IGNORE INTO players (discriminator, tag, phasegroup_id) VALUES (?1, ?2, ?3)",
            )
            .context("prepare player insert")?;
        let group = to_sql_id(phase_group_id)?;
        for (discriminator, tag) in roster {
            inserted += stmt
                .execute(params![discriminator, tag, group])
                .with_context(|| format!("insert player {discriminator}"))?;
        }
    }
    tx.commit().context("commit players transaction")?;
    Ok(inserted)
}

/// Row count of `table`, or 0 when the table has not been created yet.
pub fn table_row_count(conn: &Connection, table: &str) -> Result<u64> {
    let exists = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .context("look up table")?;
    if exists.is_none() {
        return Ok(0);
    }
    let count = conn
        .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
            row.get::<_, i64>(0)
        })
        .with_context(|| format!("count rows in {table}"))?;
    Ok(count.max(0) as u64)
}

fn to_sql_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| anyhow!("id {id} does not fit in sqlite integer"))
}
