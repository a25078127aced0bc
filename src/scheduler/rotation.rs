use crate::core::error::StoreError;
use crate::core::models::{Rotation, Scope, Track};
use crate::core::store::SettingsStore;

/// Sorted, de-duplicated scope identifiers for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionList {
    scopes: Vec<String>,
}

impl RegionList {
    pub fn new<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut scopes: Vec<String> = regions
            .into_iter()
            .map(|r| r.as_ref().trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        scopes.sort();
        scopes.dedup();
        Self { scopes }
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    pub fn position(&self, scope: &str) -> Option<usize> {
        self.scopes.iter().position(|s| s == scope)
    }
}

/// Picks the scope for this invocation and the cursor to persist for the next one.
///
/// An absent or unknown cursor restarts the cycle at the first scope. Returns
/// `None` only when the list is empty.
pub fn plan_rotation(regions: &RegionList, cursor: Option<&str>) -> Option<Rotation> {
    if regions.is_empty() {
        return None;
    }

    let index = cursor.and_then(|c| regions.position(c)).unwrap_or(0);
    let next_index = (index + 1) % regions.len();

    Some(Rotation {
        current: Scope::new(&regions.scopes[index]),
        next: Scope::new(&regions.scopes[next_index]),
    })
}

/// Reads the region list and cursor for `track`, commits the advanced cursor and
/// returns the scope to process now.
///
/// The cursor is written before any discovery runs, so a crash during discovery
/// moves the next invocation on to the following scope.
pub async fn select_next_scope<S>(store: &S, track: Track) -> Result<Option<Scope>, StoreError>
where
    S: SettingsStore + ?Sized,
{
    let regions = RegionList::new(store.inventory_regions().await?);
    let cursor = store.cursor(track).await?;

    let Some(rotation) = plan_rotation(&regions, cursor.as_deref()) else {
        tracing::debug!(%track, "No inventory regions configured, nothing to refresh");
        return Ok(None);
    };

    if let Some(stale) = cursor
        .as_deref()
        .filter(|c| regions.position(c).is_none())
    {
        tracing::debug!(%track, cursor = stale, "Cursor not in region list, restarting cycle");
    }

    store.set_cursor(track, &rotation.next).await?;
    tracing::debug!(
        %track,
        current = %rotation.current,
        next = %rotation.next,
        "Advanced region cursor"
    );

    Ok(Some(rotation.current))
}

/// Same selection as [`select_next_scope`] without writing the cursor.
pub async fn peek_next_scope<S>(store: &S, track: Track) -> Result<Option<Scope>, StoreError>
where
    S: SettingsStore + ?Sized,
{
    let regions = RegionList::new(store.inventory_regions().await?);
    let cursor = store.cursor(track).await?;
    Ok(plan_rotation(&regions, cursor.as_deref()).map(|r| r.current))
}
