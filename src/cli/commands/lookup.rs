use crate::domain::WorkType;
use crate::state::AppState;

pub async fn cmd_lookup(state: &AppState, work_type: WorkType, title: &str) -> anyhow::Result<()> {
    let found = state.availability.lookup(title, work_type).await;

    if found.is_empty() {
        println!("'{title}' ({work_type}) is not listed on any cached platform.");
        println!();
        println!("Titles must match exactly. Run 'dramawatch refresh' to update the cache.");
        return Ok(());
    }

    println!("{title} ({work_type})");
    println!("{:-<60}", "");
    for (platform, url) in &found {
        println!("{platform:<24} {url}");
    }

    Ok(())
}
