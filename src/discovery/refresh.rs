use crate::core::models::SubscribedAlarm;
use crate::discovery::{AlarmService, ConnectionDiscovery};
use std::collections::BTreeMap;

/// Groups alarm names by region. Names keep their listing order within a region.
fn group_by_region(alarms: Vec<SubscribedAlarm>) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for alarm in alarms {
        groups.entry(alarm.region).or_default().push(alarm.alarm_name);
    }
    groups
}

/// Refreshes the state of every subscribed alarm, one backend call per region.
///
/// Returns the number of regions refreshed successfully.
pub async fn update_alarms(alarms: &dyn AlarmService) -> usize {
    let subscribed = match alarms.subscribed_alarms().await {
        Ok(subscribed) => subscribed,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list subscribed alarms");
            return 0;
        }
    };

    let groups = group_by_region(subscribed);
    tracing::debug!(regions = groups.len(), "Updating subscribed alarms");

    let mut refreshed = 0;
    for (region, names) in &groups {
        match alarms.update_alarms(region, names).await {
            Ok(()) => refreshed += 1,
            Err(e) => {
                tracing::warn!(%region, alarms = names.len(), error = %e, "Failed to update alarms");
            }
        }
    }

    refreshed
}

/// Discovers and caches connections between resources.
pub async fn update_connections(connections: &dyn ConnectionDiscovery) -> bool {
    match connections.update_connections().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update connections");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn alarm(region: &str, name: &str) -> SubscribedAlarm {
        SubscribedAlarm {
            region: region.to_string(),
            alarm_name: name.to_string(),
        }
    }

    #[test]
    fn test_group_by_region() {
        let groups = group_by_region(vec![
            alarm("us-west-2", "b"),
            alarm("us-east-1", "z"),
            alarm("us-west-2", "a"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups["us-west-2"], vec!["b".to_string(), "a".to_string()]);
        assert_eq!(groups["us-east-1"], vec!["z".to_string()]);
    }

    #[tokio::test]
    async fn test_update_alarms_continues_after_region_failure() {
        let backend = FakeBackend {
            alarms: vec![
                alarm("eu-west-1", "input-loss"),
                alarm("us-east-1", "channel-errors"),
                alarm("us-east-1", "pipeline-down"),
            ],
            failing_regions: vec!["eu-west-1".to_string()],
            ..Default::default()
        };

        let refreshed = update_alarms(&backend).await;
        assert_eq!(refreshed, 1);
        assert_eq!(
            backend.calls(),
            vec![
                "alarms:eu-west-1:input-loss".to_string(),
                "alarms:us-east-1:channel-errors,pipeline-down".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_alarms_listing_failure() {
        let backend = FakeBackend {
            fail_listing: true,
            ..Default::default()
        };
        assert_eq!(update_alarms(&backend).await, 0);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_connections() {
        let backend = FakeBackend::default();
        assert!(update_connections(&backend).await);
        assert_eq!(backend.calls(), vec!["connections".to_string()]);

        let failing = FakeBackend {
            fail_listing: true,
            ..Default::default()
        };
        assert!(!update_connections(&failing).await);
    }
}
