use crate::core::error::RemoteError;
use crate::core::models::{Dimension, MetricDatum, MonitoredService};
use crate::core::settings::MetricsSettings;
use crate::discovery::ContentCache;
use crate::metrics::MetricsSink;

pub(crate) const STACK_DIMENSION: &str = "Stack Name";
pub(crate) const RESOURCE_DIMENSION: &str = "Resource Type";

pub(crate) fn resource_dimensions(stack_name: &str, service: MonitoredService) -> Vec<Dimension> {
    vec![
        Dimension::new(STACK_DIMENSION, stack_name),
        Dimension::new(RESOURCE_DIMENSION, service.as_str()),
    ]
}

async fn put_resource_counts(
    cache: &dyn ContentCache,
    sink: &dyn MetricsSink,
    settings: &MetricsSettings,
    stack_name: &str,
) -> Result<usize, RemoteError> {
    let mut written = 0;
    for service in MonitoredService::ALL {
        let count = cache.cached_count(service).await?;
        let datum = MetricDatum {
            namespace: settings.namespace.clone(),
            metric_name: settings.metric_name.clone(),
            dimensions: resource_dimensions(stack_name, service),
            value: count as f64,
            unit: "Count".to_string(),
        };
        sink.put_metric(&datum).await?;
        tracing::trace!(service = service.as_str(), count, "Put resource count");
        written += 1;
    }
    Ok(written)
}

/// Emits one resource-count metric per monitored service type.
///
/// Returns the number of metrics written before any failure.
pub async fn generate_metrics(
    cache: &dyn ContentCache,
    sink: &dyn MetricsSink,
    settings: &MetricsSettings,
    stack_name: &str,
) -> usize {
    match put_resource_counts(cache, sink, settings, stack_name).await {
        Ok(written) => {
            tracing::debug!(written, "Generated resource count metrics");
            written
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to generate resource count metrics");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_generate_metrics_counts_every_service() {
        let backend = FakeBackend {
            counts: HashMap::from([
                (MonitoredService::MediaLiveChannel, 4),
                (MonitoredService::S3, 2),
            ]),
            ..Default::default()
        };

        let written =
            generate_metrics(&backend, &backend, &MetricsSettings::default(), "live-events").await;
        assert_eq!(written, MonitoredService::ALL.len());

        let metrics = backend.metrics();
        assert_eq!(metrics.len(), 14);

        let channel = metrics
            .iter()
            .find(|m| m.dimensions[1].value == "medialive-channel")
            .unwrap();
        assert_eq!(channel.value, 4.0);
        assert_eq!(channel.namespace, "MediaInventory");
        assert_eq!(channel.metric_name, "Resource Count");
        assert_eq!(channel.dimensions[0], Dimension::new("Stack Name", "live-events"));

        let flows = metrics
            .iter()
            .find(|m| m.dimensions[1].value == "mediaconnect-flow")
            .unwrap();
        assert_eq!(flows.value, 0.0);
    }

    #[tokio::test]
    async fn test_generate_metrics_stops_on_cache_failure() {
        let backend = FakeBackend {
            fail_listing: true,
            ..Default::default()
        };
        assert_eq!(
            generate_metrics(&backend, &backend, &MetricsSettings::default(), "stack").await,
            0
        );
        assert!(backend.metrics().is_empty());
    }
}
