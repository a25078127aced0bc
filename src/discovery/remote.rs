use crate::agent::CommandService;
use crate::core::error::RemoteError;
use crate::core::models::{
    CommandDocument, CommandRequest, ManagedInstance, MetricDatum, MonitoredService,
    StatisticQuery, SubscribedAlarm,
};
use crate::core::settings::BackendSettings;
use crate::discovery::{AlarmService, ConnectionDiscovery, ContentCache, NodeDiscovery};
use crate::metrics::MetricsSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("media-inventory/", env!("CARGO_PKG_VERSION"));

/// Inventory backend reached over JSON/HTTP. The backend owns the cloud SDK
/// calls and the cache table; this client only triggers and reads them.
pub struct RemoteInventory {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    command_id: String,
}

#[derive(Debug, Deserialize)]
struct LogEventsResponse {
    events: Vec<LogEvent>,
}

#[derive(Debug, Deserialize)]
struct LogEvent {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StatisticResponse {
    maximum: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AlarmUpdate<'a> {
    alarm_names: &'a [String],
}

impl RemoteInventory {
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let user_agent = match &settings.user_agent_extra {
            Some(extra) => format!("{USER_AGENT} {extra}"),
            None => USER_AGENT.to_string(),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(user_agent)
            .build()
            .context("Failed to build inventory backend client")?;

        let endpoint = Url::parse(settings.endpoint.trim())
            .with_context(|| format!("Invalid backend endpoint: {}", settings.endpoint))?;
        if endpoint.cannot_be_a_base() {
            anyhow::bail!("Backend endpoint cannot carry a path: {}", settings.endpoint);
        }

        Ok(Self { client, endpoint })
    }

    /// Appends `segments` to the endpoint path, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn check(operation: &'static str, response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            operation,
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> Result<T, RemoteError> {
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode {
                operation,
                message: e.to_string(),
            })
    }

    async fn post_empty(
        &self,
        operation: &'static str,
        segments: &[&str],
    ) -> Result<(), RemoteError> {
        let response = self.client.post(self.url(segments)).send().await?;
        Self::check(operation, response).await?;
        Ok(())
    }

    async fn post_json<B: Serialize + ?Sized + Sync>(
        &self,
        operation: &'static str,
        segments: &[&str],
        body: &B,
    ) -> Result<Response, RemoteError> {
        let response = self.client.post(self.url(segments)).json(body).send().await?;
        Self::check(operation, response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let response = self
            .client
            .get(self.url(segments))
            .query(query)
            .send()
            .await?;
        let response = Self::check(operation, response).await?;
        Self::decode(operation, response).await
    }
}

#[async_trait]
impl NodeDiscovery for RemoteInventory {
    async fn update_global_nodes(&self) -> Result<(), RemoteError> {
        self.post_empty("update global nodes", &["nodes", "global"])
            .await
    }

    async fn update_regional_nodes(&self, region: &str) -> Result<(), RemoteError> {
        self.post_empty("update regional nodes", &["nodes", "regions", region])
            .await
    }

    async fn update_regional_ssm_nodes(&self, region: &str) -> Result<(), RemoteError> {
        self.post_empty(
            "update managed instances",
            &["ssm-nodes", "regions", region],
        )
        .await
    }
}

#[async_trait]
impl ConnectionDiscovery for RemoteInventory {
    async fn update_connections(&self) -> Result<(), RemoteError> {
        self.post_empty("update connections", &["connections"]).await
    }
}

#[async_trait]
impl AlarmService for RemoteInventory {
    async fn subscribed_alarms(&self) -> Result<Vec<SubscribedAlarm>, RemoteError> {
        self.get_json("list subscribed alarms", &["alarms", "subscribed"], &[])
            .await
    }

    async fn update_alarms(&self, region: &str, alarm_names: &[String]) -> Result<(), RemoteError> {
        self.post_json(
            "update alarms",
            &["alarms", "regions", region],
            &AlarmUpdate { alarm_names },
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ContentCache for RemoteInventory {
    async fn cached_count(&self, service: MonitoredService) -> Result<usize, RemoteError> {
        let response: CountResponse = self
            .get_json(
                "count cached resources",
                &["cache", service.as_str(), "count"],
                &[],
            )
            .await?;
        Ok(response.count)
    }

    async fn tagged_managed_instances(
        &self,
        tag: &str,
    ) -> Result<Vec<ManagedInstance>, RemoteError> {
        self.get_json(
            "list managed instances",
            &["cache", "ssm-managed-instance"],
            &[("tag", tag)],
        )
        .await
    }
}

#[async_trait]
impl CommandService for RemoteInventory {
    async fn list_documents(&self, node_types: &[String]) -> Result<Vec<CommandDocument>, RemoteError> {
        let query: Vec<(&str, &str)> = node_types
            .iter()
            .map(|t| ("node_type", t.as_str()))
            .collect();
        self.get_json("list command documents", &["commands", "documents"], &query)
            .await
    }

    async fn send_command(&self, request: &CommandRequest) -> Result<String, RemoteError> {
        let response = self
            .client
            .post(self.url(&["commands"]))
            .json(request)
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            if body.contains("InvalidInstanceId") {
                return Err(RemoteError::InvalidInstance(request.instance_id.clone()));
            }
            return Err(RemoteError::Status {
                operation: "send command",
                status: StatusCode::BAD_REQUEST.as_u16(),
                body,
            });
        }

        let response = Self::check("send command", response).await?;
        let sent: CommandResponse = Self::decode("send command", response).await?;
        Ok(sent.command_id)
    }

    async fn command_output(&self, log_group: &str, log_stream: &str) -> Result<Vec<String>, RemoteError> {
        let response: LogEventsResponse = self
            .get_json(
                "read command output",
                &["logs", "events"],
                &[("group", log_group), ("stream", log_stream)],
            )
            .await?;
        Ok(response.events.into_iter().map(|e| e.message).collect())
    }
}

#[async_trait]
impl MetricsSink for RemoteInventory {
    async fn put_metric(&self, datum: &MetricDatum) -> Result<(), RemoteError> {
        self.post_json("put metric", &["metrics"], datum).await?;
        Ok(())
    }

    async fn max_statistic(&self, query: &StatisticQuery) -> Result<Option<f64>, RemoteError> {
        let response = self
            .post_json("read metric statistics", &["metrics", "statistics"], query)
            .await?;
        let statistic: StatisticResponse =
            Self::decode("read metric statistics", response).await?;
        Ok(statistic.maximum)
    }
}
