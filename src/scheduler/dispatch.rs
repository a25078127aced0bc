use crate::core::error::{CycleError, RemoteError};
use crate::core::models::{Scope, Track};
use crate::core::store::SettingsStore;
use crate::scheduler::rotation::select_next_scope;
use async_trait::async_trait;

/// The global/regional routine pair behind one discovery track.
#[async_trait]
pub trait DiscoveryTrack: Send + Sync {
    fn track(&self) -> Track;
    async fn run_global(&self) -> Result<(), RemoteError>;
    async fn run_regional(&self, region: &str) -> Result<(), RemoteError>;
}

/// Runs exactly one routine of `routines` for `scope`, or nothing without a scope.
pub async fn dispatch(
    scope: Option<&Scope>,
    routines: &dyn DiscoveryTrack,
) -> Result<(), RemoteError> {
    match scope {
        Some(Scope::Global) => routines.run_global().await,
        Some(Scope::Region(region)) if !region.is_empty() => routines.run_regional(region).await,
        _ => Ok(()),
    }
}

/// One scheduling cycle: advance the track's cursor, then dispatch discovery for
/// the selected scope.
pub async fn run_cycle(
    store: &dyn SettingsStore,
    routines: &dyn DiscoveryTrack,
) -> Result<Option<Scope>, CycleError> {
    let track = routines.track();
    let Some(scope) = select_next_scope(store, track).await? else {
        return Ok(None);
    };

    tracing::info!(%track, %scope, "Updating nodes for scope");

    match dispatch(Some(&scope), routines).await {
        Ok(()) => Ok(Some(scope)),
        Err(source) => Err(CycleError::Remote { scope, source }),
    }
}

/// Periodic entry point for a track. Never fails: a persistence failure skips the
/// cycle, and a discovery failure is logged. The cursor has already moved past
/// that scope, so the next cycle does not retry it.
///
/// Returns the scope attempted this cycle, for logging only.
pub async fn update_track(
    store: &dyn SettingsStore,
    routines: &dyn DiscoveryTrack,
) -> Option<Scope> {
    let track = routines.track();
    match run_cycle(store, routines).await {
        Ok(scope) => scope,
        Err(CycleError::Persistence(e)) => {
            tracing::error!(%track, error = %e, "Failed to advance region cursor, skipping cycle");
            None
        }
        Err(CycleError::Remote { scope, source }) => {
            tracing::warn!(%track, %scope, error = %source, "Discovery failed, moving on next cycle");
            Some(scope)
        }
    }
}
