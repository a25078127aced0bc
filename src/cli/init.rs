use crate::core::settings::Settings;
use crate::core::store::SettingsStore;
use crate::metrics::ensure_install_id;
use anyhow::{Context, Result};
use std::path::Path;

/// Writes the default config when none exists. Returns whether a file was written.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let content =
        toml::to_string_pretty(&Settings::default()).context("Failed to encode default config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(true)
}

pub async fn run(store: &dyn SettingsStore, config_path: &Path) -> Result<()> {
    if write_default_config(config_path)? {
        println!("Wrote default config: {}", config_path.display());
    } else {
        println!("Config: {}", config_path.display());
    }

    let (install_id, created) = ensure_install_id(store)
        .await
        .context("Failed to initialize install id")?;
    if created {
        tracing::info!(%install_id, "Generated install id");
        println!("Generated install id: {}", install_id);
    } else {
        println!("Install id: {}", install_id);
    }

    Ok(())
}
