use anyhow::{Context, Result};

use bracket_snapshot::config::IngestConfig;
use bracket_snapshot::executor::Executor;
use bracket_snapshot::graphql::HttpSession;
use bracket_snapshot::http_client::http_client;
use bracket_snapshot::{ingest, logging, store};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::setup_logging();

    let config = IngestConfig::from_env().context("invalid configuration")?;
    let api_key = config.api_key()?;

    let session = HttpSession::new(http_client()?, config.endpoint.clone(), api_key);
    let executor = Executor::new(session, config.retry);

    let mut conn = store::open_db(&config.db_path)?;
    let summary = ingest::run_ingest(&mut conn, &executor, &config.ingest_options())?;

    println!("Phase group ingest complete");
    println!("DB: {}", config.db_path.display());
    println!(
        "Tournaments: {}/{}",
        summary.tournaments_succeeded, summary.tournaments_total
    );
    println!(
        "Events: {} ({} new)",
        summary.events, summary.events_inserted
    );
    println!(
        "Phase groups: {} ({} new)",
        summary.phase_groups, summary.phase_groups_inserted
    );
    println!(
        "Players: {} ({} new)",
        summary.players_seen, summary.players_inserted
    );
    println!("Remote calls: {}", summary.remote_calls);
    println!(
        "Stored rows: events={} phasegroups={} players={}",
        store::table_row_count(&conn, "events")?,
        store::table_row_count(&conn, "phasegroups")?,
        store::table_row_count(&conn, "players")?
    );
    if summary.skipped_participants > 0 || summary.empty_seeds > 0 {
        println!(
            "Skipped: {} participants without user, {} seeds without entrant",
            summary.skipped_participants, summary.empty_seeds
        );
    }
    if !summary.truncated_groups.is_empty() {
        println!(
            "Truncated rosters (first page only): {:?}",
            summary.truncated_groups
        );
    }
    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}
