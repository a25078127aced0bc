//! In-memory collaborators for unit tests.

use crate::agent::CommandService;
use crate::core::error::{RemoteError, StoreError};
use crate::core::models::{
    CommandDocument, CommandRequest, ManagedInstance, MetricDatum, MonitoredService, SettingKey,
    StatisticQuery, SubscribedAlarm, Track,
};
use crate::core::store::{MemorySettingsStore, SettingsStore};
use crate::discovery::{AlarmService, ConnectionDiscovery, ContentCache, NodeDiscovery};
use crate::metrics::MetricsSink;
use crate::scheduler::DiscoveryTrack;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

fn remote_failure(operation: &'static str) -> RemoteError {
    RemoteError::Status {
        operation,
        status: 503,
        body: "ServiceUnavailable".to_string(),
    }
}

/// Records every routine call; regions in `failing` return a remote failure.
pub struct RecordingTrack {
    track: Track,
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingTrack {
    pub fn new(track: Track) -> Self {
        Self {
            track,
            failing: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_region(mut self, region: &str) -> Self {
        self.failing.push(region.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscoveryTrack for RecordingTrack {
    fn track(&self) -> Track {
        self.track
    }

    async fn run_global(&self) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push("global".to_string());
        Ok(())
    }

    async fn run_regional(&self, region: &str) -> Result<(), RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("regional:{region}"));
        if self.failing.iter().any(|r| r == region) {
            return Err(remote_failure("regional discovery"));
        }
        Ok(())
    }
}

/// Settings store whose reads or writes fail.
pub struct FailingStore {
    inner: MemorySettingsStore,
    fail_reads: bool,
}

impl FailingStore {
    /// Reads succeed against `regions`; every write fails.
    pub fn failing_writes(regions: &[&str]) -> Self {
        let mut snapshot = serde_json::Map::new();
        snapshot.insert(
            SettingKey::InventoryRegions.as_str().to_string(),
            Value::from(regions.iter().map(|r| r.to_string()).collect::<Vec<_>>()),
        );
        Self {
            inner: MemorySettingsStore::from_snapshot(snapshot),
            fail_reads: false,
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            inner: MemorySettingsStore::new(),
            fail_reads: true,
        }
    }

    fn io_error() -> StoreError {
        StoreError::Io {
            path: PathBuf::from("/unavailable/settings.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
    }
}

#[async_trait]
impl SettingsStore for FailingStore {
    async fn get(&self, key: SettingKey) -> Result<Option<Value>, StoreError> {
        if self.fail_reads {
            return Err(Self::io_error());
        }
        self.inner.get(key).await
    }

    async fn put(&self, _key: SettingKey, _value: Value) -> Result<(), StoreError> {
        Err(Self::io_error())
    }
}

/// One fake standing in for every backend collaborator.
#[derive(Default)]
pub struct FakeBackend {
    pub alarms: Vec<SubscribedAlarm>,
    pub failing_regions: Vec<String>,
    /// Listing and connection calls fail.
    pub fail_listing: bool,
    pub counts: HashMap<MonitoredService, usize>,
    pub instances: Vec<ManagedInstance>,
    pub documents: Vec<CommandDocument>,
    pub invalid_instances: Vec<String>,
    pub output: Vec<String>,
    /// Statistic maximums keyed by resource type dimension.
    pub maxima: HashMap<String, f64>,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) sent: Mutex<Vec<CommandRequest>>,
    pub(crate) metrics: Mutex<Vec<MetricDatum>>,
    pub(crate) queries: Mutex<Vec<StatisticQuery>>,
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_commands(&self) -> Vec<CommandRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn metrics(&self) -> Vec<MetricDatum> {
        self.metrics.lock().unwrap().clone()
    }

    pub fn statistic_queries(&self) -> Vec<StatisticQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn regional(&self, call: String, region: &str) -> Result<(), RemoteError> {
        self.record(call);
        if self.failing_regions.iter().any(|r| r == region) {
            return Err(remote_failure("regional call"));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeDiscovery for FakeBackend {
    async fn update_global_nodes(&self) -> Result<(), RemoteError> {
        self.record("nodes:global".to_string());
        Ok(())
    }

    async fn update_regional_nodes(&self, region: &str) -> Result<(), RemoteError> {
        self.regional(format!("nodes:{region}"), region)
    }

    async fn update_regional_ssm_nodes(&self, region: &str) -> Result<(), RemoteError> {
        self.regional(format!("ssm-nodes:{region}"), region)
    }
}

#[async_trait]
impl ConnectionDiscovery for FakeBackend {
    async fn update_connections(&self) -> Result<(), RemoteError> {
        if self.fail_listing {
            return Err(remote_failure("update connections"));
        }
        self.record("connections".to_string());
        Ok(())
    }
}

#[async_trait]
impl AlarmService for FakeBackend {
    async fn subscribed_alarms(&self) -> Result<Vec<SubscribedAlarm>, RemoteError> {
        if self.fail_listing {
            return Err(remote_failure("list subscribed alarms"));
        }
        Ok(self.alarms.clone())
    }

    async fn update_alarms(&self, region: &str, alarm_names: &[String]) -> Result<(), RemoteError> {
        self.regional(format!("alarms:{region}:{}", alarm_names.join(",")), region)
    }
}

#[async_trait]
impl ContentCache for FakeBackend {
    async fn cached_count(&self, service: MonitoredService) -> Result<usize, RemoteError> {
        if self.fail_listing {
            return Err(remote_failure("count cached resources"));
        }
        Ok(self.counts.get(&service).copied().unwrap_or(0))
    }

    async fn tagged_managed_instances(
        &self,
        _tag: &str,
    ) -> Result<Vec<ManagedInstance>, RemoteError> {
        if self.fail_listing {
            return Err(remote_failure("list managed instances"));
        }
        Ok(self.instances.clone())
    }
}

#[async_trait]
impl CommandService for FakeBackend {
    async fn list_documents(&self, _node_types: &[String]) -> Result<Vec<CommandDocument>, RemoteError> {
        if self.fail_listing {
            return Err(remote_failure("list command documents"));
        }
        Ok(self.documents.clone())
    }

    async fn send_command(&self, request: &CommandRequest) -> Result<String, RemoteError> {
        self.sent.lock().unwrap().push(request.clone());
        if self.invalid_instances.contains(&request.instance_id) {
            return Err(RemoteError::InvalidInstance(request.instance_id.clone()));
        }
        Ok(format!("cmd-{}", request.instance_id))
    }

    async fn command_output(&self, log_group: &str, log_stream: &str) -> Result<Vec<String>, RemoteError> {
        self.record(format!("output:{log_group}:{log_stream}"));
        Ok(self.output.clone())
    }
}

#[async_trait]
impl MetricsSink for FakeBackend {
    async fn put_metric(&self, datum: &MetricDatum) -> Result<(), RemoteError> {
        self.metrics.lock().unwrap().push(datum.clone());
        Ok(())
    }

    async fn max_statistic(&self, query: &StatisticQuery) -> Result<Option<f64>, RemoteError> {
        self.queries.lock().unwrap().push(query.clone());
        let resource_type = query
            .dimensions
            .iter()
            .find(|d| d.name == "Resource Type")
            .map(|d| d.value.as_str())
            .unwrap_or_default();
        Ok(self.maxima.get(resource_type).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_backend_struct_update_records_calls() {
        let backend = FakeBackend {
            failing_regions: vec!["eu-west-1".to_string()],
            ..Default::default()
        };

        backend.update_regional_nodes("us-east-1").await.unwrap();
        assert!(backend.update_regional_nodes("eu-west-1").await.is_err());
        assert_eq!(
            backend.calls(),
            vec!["nodes:us-east-1".to_string(), "nodes:eu-west-1".to_string()]
        );
        assert!(backend.sent_commands().is_empty());
        assert!(backend.metrics().is_empty());
        assert!(backend.statistic_queries().is_empty());
    }
}
