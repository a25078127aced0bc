mod refresh;
mod remote;

use crate::core::error::RemoteError;
use crate::core::models::{ManagedInstance, MonitoredService, Scope, SubscribedAlarm, Track};
use crate::core::store::SettingsStore;
use crate::scheduler::{update_track, DiscoveryTrack};
use async_trait::async_trait;
use std::sync::Arc;

pub use refresh::{update_alarms, update_connections};
pub use remote::RemoteInventory;

/// Node discovery and cache writes for one scope.
#[async_trait]
pub trait NodeDiscovery: Send + Sync {
    async fn update_global_nodes(&self) -> Result<(), RemoteError>;
    async fn update_regional_nodes(&self, region: &str) -> Result<(), RemoteError>;
    async fn update_regional_ssm_nodes(&self, region: &str) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait ConnectionDiscovery: Send + Sync {
    async fn update_connections(&self) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait AlarmService: Send + Sync {
    async fn subscribed_alarms(&self) -> Result<Vec<SubscribedAlarm>, RemoteError>;
    async fn update_alarms(&self, region: &str, alarm_names: &[String]) -> Result<(), RemoteError>;
}

/// Read access to the resource cache table.
#[async_trait]
pub trait ContentCache: Send + Sync {
    async fn cached_count(&self, service: MonitoredService) -> Result<usize, RemoteError>;
    async fn tagged_managed_instances(&self, tag: &str)
        -> Result<Vec<ManagedInstance>, RemoteError>;
}

/// General node inventory: global services plus one region per cycle.
pub struct NodeTrack {
    nodes: Arc<dyn NodeDiscovery>,
}

impl NodeTrack {
    pub fn new(nodes: Arc<dyn NodeDiscovery>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl DiscoveryTrack for NodeTrack {
    fn track(&self) -> Track {
        Track::Node
    }

    async fn run_global(&self) -> Result<(), RemoteError> {
        self.nodes.update_global_nodes().await
    }

    async fn run_regional(&self, region: &str) -> Result<(), RemoteError> {
        self.nodes.update_regional_nodes(region).await
    }
}

/// Managed-instance inventory. Managed instances are regional only.
pub struct SsmNodeTrack {
    nodes: Arc<dyn NodeDiscovery>,
}

impl SsmNodeTrack {
    pub fn new(nodes: Arc<dyn NodeDiscovery>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl DiscoveryTrack for SsmNodeTrack {
    fn track(&self) -> Track {
        Track::SsmNode
    }

    async fn run_global(&self) -> Result<(), RemoteError> {
        tracing::debug!("Skipping global scope for managed instances");
        Ok(())
    }

    async fn run_regional(&self, region: &str) -> Result<(), RemoteError> {
        self.nodes.update_regional_ssm_nodes(region).await
    }
}

pub async fn update_nodes(
    store: &dyn SettingsStore,
    nodes: Arc<dyn NodeDiscovery>,
) -> Option<Scope> {
    update_track(store, &NodeTrack::new(nodes)).await
}

pub async fn update_ssm_nodes(
    store: &dyn SettingsStore,
    nodes: Arc<dyn NodeDiscovery>,
) -> Option<Scope> {
    update_track(store, &SsmNodeTrack::new(nodes)).await
}
