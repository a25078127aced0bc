use crate::core::store::SettingsStore;
use crate::scheduler::RegionList;
use anyhow::{Context, Result};

/// Replaces the inventory region list. Entries are trimmed, sorted and
/// de-duplicated the same way each rotation sees them.
pub async fn set(store: &dyn SettingsStore, regions: &[String]) -> Result<()> {
    let list = RegionList::new(regions);
    if list.len() != regions.len() {
        tracing::info!(
            given = regions.len(),
            kept = list.len(),
            "Dropped blank or duplicate regions"
        );
    }

    let normalized: Vec<String> = list.iter().map(str::to_string).collect();
    store
        .set_inventory_regions(&normalized)
        .await
        .context("Failed to save inventory regions")?;

    println!("Inventory regions: {}", display(&normalized));
    Ok(())
}

pub async fn show(store: &dyn SettingsStore) -> Result<()> {
    let regions = store
        .inventory_regions()
        .await
        .context("Failed to read inventory regions")?;
    println!("{}", display(&regions));
    Ok(())
}

fn display(regions: &[String]) -> String {
    if regions.is_empty() {
        "(none)".to_string()
    } else {
        regions.join(", ")
    }
}
