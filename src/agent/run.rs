use crate::agent::CommandService;
use crate::core::error::RemoteError;
use crate::core::models::{CommandDocument, CommandRequest, ManagedInstance};
use crate::core::settings::CommandSettings;
use crate::discovery::ContentCache;

/// Pairs every instance with every document whose node-type tag contains the
/// instance's node type.
fn plan_commands(
    instances: &[ManagedInstance],
    documents: &[CommandDocument],
) -> Vec<(String, String)> {
    let mut plan = Vec::new();
    for instance in instances {
        for document in documents {
            let Some(doc_type) = document.node_type.as_deref() else {
                continue;
            };
            if doc_type.contains(instance.node_type.as_str()) {
                plan.push((instance.id.clone(), document.name.clone()));
            }
        }
    }
    plan
}

async fn send_planned(
    cache: &dyn ContentCache,
    commands: &dyn CommandService,
    settings: &CommandSettings,
) -> Result<usize, RemoteError> {
    let instances = cache
        .tagged_managed_instances(&settings.node_type_tag)
        .await?;
    let documents = commands.list_documents(&settings.node_types).await?;
    let plan = plan_commands(&instances, &documents);

    tracing::debug!(
        instances = instances.len(),
        documents = documents.len(),
        commands = plan.len(),
        "Planned managed instance commands"
    );

    let mut sent = 0;
    for (instance_id, document_name) in plan {
        tracing::info!(%instance_id, document = %document_name, "Running command");
        let request = CommandRequest {
            instance_id,
            document_name,
            timeout_secs: settings.timeout_secs,
            max_concurrency: settings.max_concurrency.clone(),
            max_errors: settings.max_errors.clone(),
            log_group: settings.log_group.clone(),
        };

        match commands.send_command(&request).await {
            Ok(command_id) => {
                tracing::debug!(%command_id, instance_id = %request.instance_id, "Command sent");
                sent += 1;
            }
            Err(RemoteError::InvalidInstance(id)) => {
                tracing::debug!(instance_id = %id, "Instance no longer managed, skipping");
            }
            Err(e) => {
                tracing::warn!(
                    instance_id = %request.instance_id,
                    document = %request.document_name,
                    error = %e,
                    "Failed to send command"
                );
            }
        }
    }

    Ok(sent)
}

/// Runs every applicable command document on the tagged managed instances.
///
/// Returns the number of commands sent.
pub async fn run_commands(
    cache: &dyn ContentCache,
    commands: &dyn CommandService,
    settings: &CommandSettings,
) -> usize {
    match send_planned(cache, commands, settings).await {
        Ok(sent) => sent,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to run managed instance commands");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn instance(id: &str, node_type: &str) -> ManagedInstance {
        ManagedInstance {
            id: id.to_string(),
            node_type: node_type.to_string(),
        }
    }

    fn document(name: &str, node_type: Option<&str>) -> CommandDocument {
        CommandDocument {
            name: name.to_string(),
            node_type: node_type.map(String::from),
        }
    }

    #[test]
    fn test_plan_matches_node_type_substring() {
        let instances = vec![instance("mi-1", "ElementalLive"), instance("mi-2", "Conductor")];
        let documents = vec![
            document("ElementalLiveStatus", Some("ElementalLive")),
            document("Shared", Some("ElementalLive,Conductor")),
            document("Untagged", None),
        ];

        let plan = plan_commands(&instances, &documents);
        assert_eq!(
            plan,
            vec![
                ("mi-1".to_string(), "ElementalLiveStatus".to_string()),
                ("mi-1".to_string(), "Shared".to_string()),
                ("mi-2".to_string(), "Shared".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_commands_skips_invalid_instances() {
        let backend = FakeBackend {
            instances: vec![instance("mi-1", "ElementalLive"), instance("mi-gone", "ElementalLive")],
            documents: vec![document("ElementalLiveStatus", Some("ElementalLive"))],
            invalid_instances: vec!["mi-gone".to_string()],
            ..Default::default()
        };

        let sent = run_commands(&backend, &backend, &CommandSettings::default()).await;
        assert_eq!(sent, 1);

        let requests = backend.sent_commands();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].timeout_secs, 600);
        assert_eq!(requests[0].log_group, "MediaInventory/RunCommand");
    }

    #[tokio::test]
    async fn test_run_commands_listing_failure() {
        let backend = FakeBackend {
            fail_listing: true,
            ..Default::default()
        };
        assert_eq!(
            run_commands(&backend, &backend, &CommandSettings::default()).await,
            0
        );
        assert!(backend.sent_commands().is_empty());
    }
}
