use crate::core::models::Track;
use crate::core::store::SettingsStore;
use crate::scheduler::{peek_next_scope, RegionList};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct StatusOutput {
    regions: Vec<String>,
    tracks: Vec<TrackStatus>,
    install_id: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    checked_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct TrackStatus {
    track: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<String>,
}

pub async fn run(store: &dyn SettingsStore, json: bool) -> Result<()> {
    let output = collect(store).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

async fn collect(store: &dyn SettingsStore) -> Result<StatusOutput> {
    let stored = store
        .inventory_regions()
        .await
        .context("Failed to read inventory regions")?;
    let regions = RegionList::new(stored);

    let mut tracks = Vec::with_capacity(Track::ALL.len());
    for track in Track::ALL {
        let cursor = store
            .cursor(track)
            .await
            .with_context(|| format!("Failed to read {} cursor", track))?;
        let next = peek_next_scope(store, track).await?;
        tracks.push(TrackStatus {
            track: track.name(),
            cursor,
            next: next.map(|scope| scope.to_string()),
        });
    }

    Ok(StatusOutput {
        regions: regions.iter().map(str::to_string).collect(),
        tracks,
        install_id: store.install_id().await?,
        checked_at: Utc::now(),
    })
}

fn print_text_output(output: &StatusOutput) {
    if output.regions.is_empty() {
        println!("Regions: none configured");
    } else {
        println!("Regions: {}", output.regions.join(", "));
    }

    println!();
    for track in &output.tracks {
        println!("{}", track.track);
        println!("  {:<8} {}", "Cursor:", track.cursor.as_deref().unwrap_or("-"));
        println!("  {:<8} {}", "Next:", track.next.as_deref().unwrap_or("-"));
    }

    println!();
    println!(
        "Install id: {}",
        output.install_id.as_deref().unwrap_or("not set (run `media-inventory init`)")
    );
}
