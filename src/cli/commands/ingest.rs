//! Ingest command handler

use crate::domain::WorkId;
use crate::services::IngestError;
use crate::state::AppState;

pub async fn cmd_ingest(state: &AppState, work_id: u64, actor: Option<&str>) -> anyhow::Result<()> {
    let work_id = WorkId::new(work_id);

    if let Some(actor) = actor {
        println!("Fetching seasons of work {work_id} featuring {actor}...");
    } else {
        println!("Fetching seasons of work {work_id}...");
    }

    let outcome = match state.ingest.ingest(work_id, actor).await {
        Ok(outcome) => outcome,
        Err(IngestError::NotFound(id)) => {
            println!("Work {id} not found in catalog.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!();
    println!("Stored Seasons ({} total)", outcome.seasons.len());
    println!("{:-<70}", "");

    for record in outcome.seasons.iter() {
        let key = record.key();
        let marker = if outcome.summary.inserted.contains(&key) {
            "+"
        } else if outcome.summary.updated.contains(&key) {
            "↻"
        } else {
            "•"
        };

        println!("{marker} S{} {}", record.season_number, record.name);
        if record.platforms.is_empty() {
            println!("  Platforms: none found");
        } else {
            let names: Vec<&str> = record.platforms.keys().map(String::as_str).collect();
            println!("  Platforms: {}", names.join(", "));
        }
    }

    println!();
    println!("Legend: + new | ↻ updated | • kept from earlier runs");

    Ok(())
}

pub async fn cmd_ingest_movie(state: &AppState, work_id: u64) -> anyhow::Result<()> {
    let work_id = WorkId::new(work_id);
    println!("Fetching movie {work_id}...");

    let outcome = match state.ingest.ingest_movie(work_id).await {
        Ok(outcome) => outcome,
        Err(IngestError::NotFound(id)) => {
            println!("Movie {id} not found in catalog.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let movie = &outcome.movie;
    let marker = if outcome.inserted { "+" } else { "↻" };
    println!();
    println!("{marker} {} ({})", movie.name, movie.original_name);
    if let Some(runtime) = movie.runtime {
        println!("  Runtime: {runtime} min");
    }
    if movie.platforms.is_empty() {
        println!("  Platforms: none found");
    } else {
        let names: Vec<&str> = movie.platforms.keys().map(String::as_str).collect();
        println!("  Platforms: {}", names.join(", "));
    }

    Ok(())
}
