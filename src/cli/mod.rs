pub mod event;
pub mod init;
pub mod once;
pub mod regions;
pub mod status;

use crate::core::settings::Settings;
use crate::core::store::{FileSettingsStore, MemorySettingsStore, SettingsStore};
use crate::daemon::{Backends, JobContext};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The `--config` path when given, otherwise the per-user default.
pub fn resolve_config_path(config: Option<&Path>) -> Result<PathBuf> {
    match config {
        Some(path) => Ok(path.to_path_buf()),
        None => Settings::config_path().context("Could not determine config directory"),
    }
}

/// Loads and validates settings. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let settings = Settings::load_from(path)?;
    settings.validate()?;
    Ok(settings)
}

/// Opens the settings store. A dry run reads the stored values once and keeps
/// every later write in memory.
pub async fn open_store(settings: &Settings, dry_run: bool) -> Result<Arc<dyn SettingsStore>> {
    let path = settings
        .store_path()
        .context("Could not determine settings store location")?;
    let file_store = FileSettingsStore::new(path);

    if !dry_run {
        return Ok(Arc::new(file_store));
    }

    let snapshot = file_store
        .snapshot()
        .await
        .with_context(|| format!("Failed to read settings store: {}", file_store.path().display()))?;
    tracing::info!(path = ?file_store.path(), "Dry run, settings store writes are discarded");
    Ok(Arc::new(MemorySettingsStore::from_snapshot(snapshot)))
}

pub async fn job_context(settings: Settings, dry_run: bool) -> Result<JobContext> {
    let store = open_store(&settings, dry_run).await?;
    let backends = Backends::remote(&settings.backend)?;
    JobContext::new(settings, store, backends)
}
