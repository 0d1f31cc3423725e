//! Refresh command handler

use crate::domain::PlatformId;
use crate::models::PlatformConfig;
use crate::state::AppState;

pub async fn cmd_refresh(state: &AppState, only: &[String]) -> anyhow::Result<()> {
    let platforms: Vec<PlatformConfig> = if only.is_empty() {
        state.registry.iter().cloned().collect()
    } else {
        let mut selected = Vec::with_capacity(only.len());
        for raw in only {
            let id: PlatformId = raw.parse()?;
            let Some(config) = state.registry.get(&id) else {
                println!("Unknown platform: {raw}");
                println!("Use 'dramawatch platforms' to see configured platforms");
                return Ok(());
            };
            selected.push(config.clone());
        }
        selected
    };

    println!("Refreshing {} platform(s)...", platforms.len());
    let report = state.availability.refresh_platforms(&platforms).await;

    println!();
    for refreshed in &report.refreshed {
        let note = if refreshed.partial { " (partial)" } else { "" };
        println!(
            "✓ {}: {} works over {} page(s){note}",
            refreshed.platform, refreshed.works, refreshed.pages
        );
    }
    for failed in &report.failed {
        println!("✗ {}: {}", failed.platform, failed.error);
    }

    println!();
    println!(
        "Done in {:.1}s: {} refreshed, {} failed",
        report.duration.as_secs_f64(),
        report.refreshed.len(),
        report.failed.len()
    );

    Ok(())
}
