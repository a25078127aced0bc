use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const GLOBAL_SCOPE: &str = "global";

/// A unit of discovery work for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Region(String),
}

impl Scope {
    /// Builds a scope from a non-blank identifier taken from the region list.
    pub fn new(identifier: &str) -> Self {
        if identifier == GLOBAL_SCOPE {
            Scope::Global
        } else {
            Scope::Region(identifier.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Scope::Global => GLOBAL_SCOPE,
            Scope::Region(region) => region,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An independent discovery pipeline with its own cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    Node,
    SsmNode,
}

impl Track {
    pub const ALL: [Track; 2] = [Track::Node, Track::SsmNode];

    pub fn name(&self) -> &'static str {
        match self {
            Track::Node => "node",
            Track::SsmNode => "ssm-node",
        }
    }

    pub fn cursor_key(&self) -> &'static str {
        match self {
            Track::Node => "cache-next-region",
            Track::SsmNode => "ssm-cache-next-region",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keys understood by the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    InventoryRegions,
    Cursor(Track),
    InstallId,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::InventoryRegions => "inventory-regions",
            SettingKey::Cursor(track) => track.cursor_key(),
            SettingKey::InstallId => "uuid",
        }
    }
}

/// The scope processed by this invocation and the cursor left for the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    pub current: Scope,
    pub next: Scope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MonitoredService {
    MediaLiveInput,
    MediaLiveChannel,
    MediaLiveMultiplex,
    MediaPackageChannel,
    MediaPackageOriginEndpoint,
    MediaStoreContainer,
    SpekeKeyserver,
    MediaConnectFlow,
    MediaTailorConfiguration,
    Ec2Instances,
    LinkDevices,
    SsmManagedInstances,
    S3,
    CloudFrontDistribution,
}

impl MonitoredService {
    pub const ALL: [MonitoredService; 14] = [
        MonitoredService::MediaLiveInput,
        MonitoredService::MediaLiveChannel,
        MonitoredService::MediaLiveMultiplex,
        MonitoredService::MediaPackageChannel,
        MonitoredService::MediaPackageOriginEndpoint,
        MonitoredService::MediaStoreContainer,
        MonitoredService::SpekeKeyserver,
        MonitoredService::MediaConnectFlow,
        MonitoredService::MediaTailorConfiguration,
        MonitoredService::Ec2Instances,
        MonitoredService::LinkDevices,
        MonitoredService::SsmManagedInstances,
        MonitoredService::S3,
        MonitoredService::CloudFrontDistribution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitoredService::MediaLiveInput => "medialive-input",
            MonitoredService::MediaLiveChannel => "medialive-channel",
            MonitoredService::MediaLiveMultiplex => "medialive-multiplex",
            MonitoredService::MediaPackageChannel => "mediapackage-channel",
            MonitoredService::MediaPackageOriginEndpoint => "mediapackage-origin-endpoint",
            MonitoredService::MediaStoreContainer => "mediastore-container",
            MonitoredService::SpekeKeyserver => "speke-keyserver",
            MonitoredService::MediaConnectFlow => "mediaconnect-flow",
            MonitoredService::MediaTailorConfiguration => "mediatailor-configuration",
            MonitoredService::Ec2Instances => "ec2-instances",
            MonitoredService::LinkDevices => "link-devices",
            MonitoredService::SsmManagedInstances => "ssm-managed-instances",
            MonitoredService::S3 => "s3",
            MonitoredService::CloudFrontDistribution => "cloudfront-distribution",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribedAlarm {
    pub region: String,
    pub alarm_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedInstance {
    pub id: String,
    pub node_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDocument {
    pub name: String,
    #[serde(default)]
    pub node_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub instance_id: String,
    pub document_name: String,
    pub timeout_secs: u64,
    pub max_concurrency: String,
    pub max_errors: String,
    pub log_group: String,
}

/// Completion event emitted when a command finishes on a managed instance.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandEvent {
    pub detail: CommandEventDetail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandEventDetail {
    pub instance_id: String,
    pub document_name: String,
    pub status: String,
    pub command_id: String,
}

impl CommandEventDetail {
    pub fn log_stream_name(&self) -> String {
        format!(
            "{}/{}/aws-runShellScript/stdout",
            self.command_id, self.instance_id
        )
    }

    pub fn succeeded(&self) -> bool {
        self.status == "Success"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDatum {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period_secs: u64,
}

/// Anonymous usage payload posted to the report endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    #[serde(rename = "Solution")]
    pub solution: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "UUID")]
    pub uuid: String,
    #[serde(rename = "TimeStamp")]
    pub timestamp: String,
    #[serde(rename = "Data")]
    pub data: BTreeMap<String, u64>,
}
