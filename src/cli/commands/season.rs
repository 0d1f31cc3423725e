//! Season command handler

use crate::domain::{SeasonNumber, WorkId, WorkType};
use crate::models::SeasonRecord;
use crate::state::AppState;

pub async fn cmd_season(state: &AppState, work_id: u64, season: u32) -> anyhow::Result<()> {
    let work_id = WorkId::new(work_id);
    let season = SeasonNumber::new(season);

    let record = match state.catalog.fetch_season_record(work_id, season).await {
        Ok(record) => record,
        Err(e) if e.is_not_found() => {
            println!("Season {season} of work {work_id} not found in catalog.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let platforms = state
        .availability
        .lookup(&record.name, WorkType::Drama)
        .await;

    print_record(&record);
    println!("Platforms:");
    if platforms.is_empty() {
        println!("  (none cached)");
    }
    for (name, url) in &platforms {
        println!("  {name:<22} {url}");
    }

    Ok(())
}

fn print_record(record: &SeasonRecord) {
    let unknown = || "?".to_string();

    println!("Season Info");
    println!("{:-<60}", "");
    println!("Name:      {}", record.name);
    println!("Original:  {}", record.original_name);
    if let Some(english) = &record.english_name {
        println!("English:   {english}");
    }
    println!("Key:       {}", record.key());
    println!(
        "Episodes:  {}/{}",
        record.aired_episodes.map_or_else(unknown, |n| n.to_string()),
        record.episode_count.map_or_else(unknown, |n| n.to_string())
    );
    if let Some(status) = record.status {
        println!("Status:    {}", status.display_name());
    }
    println!("Schedule:  {}", record.release_schedule.display_name());
    if let Some(year) = &record.release_year {
        println!("Year:      {year}");
    }
    if let Some(runtime) = &record.runtime_per_episode {
        println!("Runtime:   {runtime} min");
    }
    if let Some(rating) = &record.age_rating {
        println!("Rating:    {rating}");
    }
    if !record.networks.is_empty() {
        println!("Networks:  {}", record.networks.join(", "));
    }
    if !record.lead_actors.is_empty() {
        println!("Cast:      {}", record.lead_actors.join(", "));
    }
    if !record.directors.is_empty() {
        println!("Directors: {}", record.directors.join(", "));
    }
    if !record.writers.is_empty() {
        println!("Writers:   {}", record.writers.join(", "));
    }
    println!();
}
