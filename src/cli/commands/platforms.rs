//! Platforms command handler

use crate::state::AppState;

pub async fn cmd_platforms(state: &AppState) -> anyhow::Result<()> {
    println!("Platforms ({} total)", state.registry.len());
    println!("{:-<70}", "");

    for platform in state.registry.iter() {
        let cached = match state.availability.get(&platform.id).await {
            Some(snapshot) => format!(
                "{} works, refreshed {}",
                snapshot.len(),
                snapshot.refreshed_at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => "not cached yet".to_string(),
        };

        let login = if platform.requires_login { " 🔒" } else { "" };
        println!("• {}{login}", platform.id);
        println!("  {}", platform.listing_url);
        println!("  Cache: {cached}");
    }

    Ok(())
}
