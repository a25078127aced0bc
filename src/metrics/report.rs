use crate::core::error::{RemoteError, StoreError};
use crate::core::models::{MonitoredService, StatisticQuery, UsageReport};
use crate::core::settings::Settings;
use crate::core::store::SettingsStore;
use crate::metrics::generate::resource_dimensions;
use crate::metrics::MetricsSink;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::collections::BTreeMap;
use uuid::{Uuid, Variant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Disabled,
    InvalidInstallId,
    SkippedEmpty,
    Sent(u16),
}

/// Install ids must be hyphenated RFC 4122 version 4 UUIDs.
fn is_valid_install_id(id: &str) -> bool {
    if id.len() != 36 {
        return false;
    }
    Uuid::try_parse(id)
        .map(|uuid| uuid.get_version_num() == 4 && uuid.get_variant() == Variant::RFC4122)
        .unwrap_or(false)
}

/// Returns the stored install id, creating one on first use.
///
/// The boolean is true when a new id was written.
pub async fn ensure_install_id(store: &dyn SettingsStore) -> Result<(String, bool), StoreError> {
    if let Some(existing) = store.install_id().await? {
        return Ok((existing, false));
    }

    let id = Uuid::new_v4().to_string();
    store.set_install_id(&id).await?;
    Ok((id, true))
}

/// Start of the statistics window ending at `now`, or `None` when it falls
/// outside the representable date range.
fn window_start(now: DateTime<Utc>, hours: u32) -> Option<DateTime<Utc>> {
    Duration::try_hours(i64::from(hours)).and_then(|window| now.checked_sub_signed(window))
}

async fn build_report(
    sink: &dyn MetricsSink,
    settings: &Settings,
    install_id: String,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<UsageReport, RemoteError> {
    let hours = settings.metrics.report_window_hours;

    let mut data = BTreeMap::new();
    for service in MonitoredService::ALL {
        let query = StatisticQuery {
            namespace: settings.metrics.namespace.clone(),
            metric_name: settings.metrics.metric_name.clone(),
            dimensions: resource_dimensions(&settings.stack_name, service),
            start,
            end: now,
            period_secs: u64::from(hours) * 3600,
        };

        if let Some(maximum) = sink.max_statistic(&query).await? {
            data.insert(service.as_str().to_string(), maximum as u64);
        }
    }

    Ok(UsageReport {
        solution: settings.solution_segment().unwrap_or_default().to_string(),
        version: settings.version.clone(),
        uuid: install_id,
        timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        data,
    })
}

/// Posts the anonymous maximum resource count per service type over the report
/// window. Nothing is sent when no service has datapoints.
pub async fn report_metrics(
    store: &dyn SettingsStore,
    sink: &dyn MetricsSink,
    settings: &Settings,
    client: &Client,
    now: DateTime<Utc>,
) -> Result<ReportOutcome> {
    if !settings.metrics.report_enabled {
        tracing::debug!("Usage reporting disabled");
        return Ok(ReportOutcome::Disabled);
    }

    let install_id = store.install_id().await?;
    let Some(install_id) = install_id.filter(|id| is_valid_install_id(id)) else {
        tracing::warn!("Install id in settings does not match required format");
        return Ok(ReportOutcome::InvalidInstallId);
    };

    let hours = settings.metrics.report_window_hours;
    let start = window_start(now, hours)
        .with_context(|| format!("Report window of {hours} hours is out of range"))?;

    let report = build_report(sink, settings, install_id, start, now)
        .await
        .context("Failed to collect resource count statistics")?;
    tracing::debug!(payload = ?report, "Assembled usage report");

    if report.data.is_empty() {
        tracing::info!("Skipping usage report because of empty data");
        return Ok(ReportOutcome::SkippedEmpty);
    }

    let response = client
        .post(&settings.metrics.report_endpoint)
        .json(&report)
        .send()
        .await
        .context("Failed to post usage report")?;

    let status = response.status().as_u16();
    tracing::info!(status, "Posted usage report");
    Ok(ReportOutcome::Sent(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemorySettingsStore;
    use crate::testing::FakeBackend;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_ID: &str = "6f1c2a3b-4d5e-4f60-8a7b-9c0d1e2f3a4b";

    fn enabled_settings(endpoint: &str) -> Settings {
        let mut settings = Settings::default();
        settings.stack_name = "live-events".to_string();
        settings.solution_id = "acme/SO0048/v1".to_string();
        settings.version = "1.2.0".to_string();
        settings.metrics.report_enabled = true;
        settings.metrics.report_endpoint = endpoint.to_string();
        settings
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 18, 9, 30, 5).unwrap()
    }

    #[test]
    fn test_install_id_validation() {
        assert!(is_valid_install_id(VALID_ID));
        assert!(is_valid_install_id(&VALID_ID.to_uppercase()));
        assert!(!is_valid_install_id("6f1c2a3b4d5e4f608a7b9c0d1e2f3a4b"));
        // version 1
        assert!(!is_valid_install_id("6f1c2a3b-4d5e-1f60-8a7b-9c0d1e2f3a4b"));
        // non RFC 4122 variant
        assert!(!is_valid_install_id("6f1c2a3b-4d5e-4f60-ca7b-9c0d1e2f3a4b"));
        assert!(!is_valid_install_id(""));
    }

    #[tokio::test]
    async fn test_ensure_install_id_never_overwrites() {
        let store = MemorySettingsStore::new();

        let (first, created) = ensure_install_id(&store).await.unwrap();
        assert!(created);
        assert!(is_valid_install_id(&first));

        let (second, created) = ensure_install_id(&store).await.unwrap();
        assert!(!created);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_build_report_uses_window_maximums() {
        let backend = FakeBackend {
            maxima: HashMap::from([("medialive-channel".to_string(), 7.9), ("s3".to_string(), 2.0)]),
            ..Default::default()
        };
        let settings = enabled_settings("http://unused");

        let start = window_start(fixed_now(), 24).unwrap();
        let report = build_report(&backend, &settings, VALID_ID.to_string(), start, fixed_now())
            .await
            .unwrap();

        assert_eq!(report.solution, "SO0048");
        assert_eq!(report.version, "1.2.0");
        assert_eq!(report.timestamp, "2026-01-18 09:30:05");
        assert_eq!(report.data.len(), 2);
        assert_eq!(report.data["medialive-channel"], 7);

        let queries = backend.statistic_queries();
        assert_eq!(queries.len(), MonitoredService::ALL.len());
        assert_eq!(queries[0].period_secs, 24 * 3600);
        assert_eq!(queries[0].end - queries[0].start, Duration::hours(24));
        assert_eq!(queries[0].dimensions[0].value, "live-events");
    }

    #[tokio::test]
    async fn test_report_skips_when_disabled_or_invalid() {
        let store = MemorySettingsStore::new();
        let backend = FakeBackend::default();
        let client = Client::new();

        let outcome = report_metrics(&store, &backend, &Settings::default(), &client, fixed_now())
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome::Disabled);

        let settings = enabled_settings("http://unused");
        let outcome = report_metrics(&store, &backend, &settings, &client, fixed_now())
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome::InvalidInstallId);

        store.set_install_id("not-a-uuid").await.unwrap();
        let outcome = report_metrics(&store, &backend, &settings, &client, fixed_now())
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome::InvalidInstallId);
        assert!(backend.statistic_queries().is_empty());
    }

    #[test]
    fn test_window_start() {
        assert_eq!(
            window_start(fixed_now(), 24),
            Some(Utc.with_ymd_and_hms(2026, 1, 17, 9, 30, 5).unwrap())
        );
        assert!(window_start(DateTime::<Utc>::MIN_UTC, 1).is_none());
    }

    #[tokio::test]
    async fn test_report_rejects_out_of_range_window() {
        let store = MemorySettingsStore::new();
        store.set_install_id(VALID_ID).await.unwrap();
        let backend = FakeBackend::default();
        let mut settings = enabled_settings("http://unused");
        settings.metrics.report_window_hours = u32::MAX;

        let result = report_metrics(&store, &backend, &settings, &Client::new(), fixed_now()).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(backend.statistic_queries().is_empty());
    }

    #[tokio::test]
    async fn test_report_skips_empty_data() {
        let store = MemorySettingsStore::new();
        store.set_install_id(VALID_ID).await.unwrap();
        let backend = FakeBackend::default();

        let outcome = report_metrics(
            &store,
            &backend,
            &enabled_settings("http://unused"),
            &Client::new(),
            fixed_now(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, ReportOutcome::SkippedEmpty);
    }

    #[tokio::test]
    async fn test_report_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generic"))
            .and(body_partial_json(serde_json::json!({
                "Solution": "SO0048",
                "UUID": VALID_ID,
                "Data": { "s3": 3 }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemorySettingsStore::new();
        store.set_install_id(VALID_ID).await.unwrap();
        let backend = FakeBackend {
            maxima: HashMap::from([("s3".to_string(), 3.0)]),
            ..Default::default()
        };
        let settings = enabled_settings(&format!("{}/generic", server.uri()));

        let outcome = report_metrics(&store, &backend, &settings, &Client::new(), fixed_now())
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome::Sent(200));
    }
}
