use crate::agent::CommandService;
use crate::core::error::RemoteError;
use crate::core::models::{CommandEventDetail, Dimension, MetricDatum};
use crate::core::settings::CommandSettings;
use crate::metrics::MetricsSink;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

const LIVE_STATUS: &str = "ElementalLiveStatus";
const SYSTEM_STATUS: &str = "SsmSystemStatus";
const ACTIVE_ALERTS: &str = "ElementalLiveActiveAlerts";
const EVENT_COUNTERS: [&str; 3] = [
    "ElementalLiveCompletedEvents",
    "ElementalLiveErroredEvents",
    "ElementalLiveRunningEvents",
];
const INSTANCE_DIMENSION: &str = "Instance ID";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Command produced no output")]
    Empty,

    #[error("Command output has no root element")]
    NoRoot,

    #[error("Command output ends inside an element")]
    Unclosed,

    #[error("Command output is not valid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandMetric {
    name: String,
    value: u64,
}

impl CommandMetric {
    fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Local names of the root element's direct children.
fn root_children(xml: &str) -> Result<Vec<String>, OutputError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut saw_root = false;
    let mut children = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 0 {
                    saw_root = true;
                } else if depth == 1 {
                    children.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    saw_root = true;
                } else if depth == 1 {
                    children.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            Event::Eof if depth > 0 => return Err(OutputError::Unclosed),
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(OutputError::NoRoot);
    }
    Ok(children)
}

fn first_message(messages: &[String]) -> Result<&str, OutputError> {
    messages.first().map(String::as_str).ok_or(OutputError::Empty)
}

fn derive_metric(
    detail: &CommandEventDetail,
    messages: &[String],
) -> Result<CommandMetric, OutputError> {
    let document = detail.document_name.as_str();
    let any_line = |needle: &str| messages.iter().any(|m| m.contains(needle));

    if detail.succeeded() {
        if document.contains(LIVE_STATUS) {
            return Ok(CommandMetric::new(LIVE_STATUS, any_line("running") as u64));
        }
        if document.contains(SYSTEM_STATUS) {
            return Ok(CommandMetric::new(SYSTEM_STATUS, 1));
        }
        if document.contains(ACTIVE_ALERTS) {
            let children = root_children(first_message(messages)?)?;
            let alerts = match children.as_slice() {
                [only] if only == "empty" => 0,
                _ => children.len() as u64,
            };
            return Ok(CommandMetric::new(ACTIVE_ALERTS, alerts));
        }

        let name = EVENT_COUNTERS
            .iter()
            .find(|counter| document.contains(*counter))
            .copied()
            .unwrap_or(document);
        let events = root_children(first_message(messages)?)?
            .iter()
            .filter(|child| child.as_str() == "live_event")
            .count();
        return Ok(CommandMetric::new(name, events as u64));
    }

    if detail.status == "Failed" && document.contains(LIVE_STATUS) {
        // The status script itself fails when the live process is not running at all.
        let stopped = any_line("Not Running") || any_line("Active: failed");
        let name = if stopped { LIVE_STATUS } else { document };
        return Ok(CommandMetric::new(name, 0));
    }

    tracing::info!(
        instance_id = %detail.instance_id,
        document = %document,
        status = %detail.status,
        "Command did not complete"
    );
    Ok(CommandMetric::new(format!("SsmCommand{}", detail.status), 1))
}

async fn interpret_and_record(
    commands: &dyn CommandService,
    sink: &dyn MetricsSink,
    settings: &CommandSettings,
    detail: &CommandEventDetail,
) -> Result<MetricDatum, OutputError> {
    let messages = commands
        .command_output(&settings.log_group, &detail.log_stream_name())
        .await?;
    let metric = derive_metric(detail, &messages)?;

    let datum = MetricDatum {
        namespace: settings.log_group.clone(),
        metric_name: metric.name,
        dimensions: vec![Dimension::new(INSTANCE_DIMENSION, detail.instance_id.clone())],
        value: metric.value as f64,
        unit: "Count".to_string(),
    };
    sink.put_metric(&datum).await?;
    Ok(datum)
}

/// Turns a command completion event into a health metric for the instance.
pub async fn process_command_event(
    commands: &dyn CommandService,
    sink: &dyn MetricsSink,
    settings: &CommandSettings,
    detail: &CommandEventDetail,
) -> Option<MetricDatum> {
    match interpret_and_record(commands, sink, settings, detail).await {
        Ok(datum) => {
            tracing::debug!(
                instance_id = %detail.instance_id,
                metric = %datum.metric_name,
                value = datum.value,
                "Recorded command metric"
            );
            Some(datum)
        }
        Err(e) => {
            tracing::warn!(
                instance_id = %detail.instance_id,
                document = %detail.document_name,
                status = %detail.status,
                log_stream = %detail.log_stream_name(),
                error = %e,
                "Failed to process command result"
            );
            None
        }
    }
}
