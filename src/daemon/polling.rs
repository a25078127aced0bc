use crate::agent::{process_command_event, run_commands, CommandService};
use crate::core::models::{CommandEventDetail, MetricDatum, Scope};
use crate::core::settings::{BackendSettings, ScheduleSettings, Settings};
use crate::core::store::SettingsStore;
use crate::discovery::{
    update_alarms, update_connections, update_nodes, update_ssm_nodes, AlarmService,
    ConnectionDiscovery, ContentCache, NodeDiscovery, RemoteInventory,
};
use crate::metrics::{generate_metrics, report_metrics, MetricsSink, ReportOutcome};
use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Periodic units of work run by the daemon and the one-shot subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    Nodes,
    SsmNodes,
    Alarms,
    Connections,
    Commands,
    GenerateMetrics,
    ReportMetrics,
}

impl Job {
    pub const ALL: [Job; 7] = [
        Job::Nodes,
        Job::SsmNodes,
        Job::Alarms,
        Job::Connections,
        Job::Commands,
        Job::GenerateMetrics,
        Job::ReportMetrics,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Job::Nodes => "update-nodes",
            Job::SsmNodes => "update-ssm-nodes",
            Job::Alarms => "update-alarms",
            Job::Connections => "update-connections",
            Job::Commands => "run-commands",
            Job::GenerateMetrics => "generate-metrics",
            Job::ReportMetrics => "report-metrics",
        }
    }

    pub fn interval(&self, schedule: &ScheduleSettings) -> Duration {
        let secs = match self {
            Job::Nodes => schedule.nodes,
            Job::SsmNodes => schedule.ssm_nodes,
            Job::Alarms => schedule.alarms,
            Job::Connections => schedule.connections,
            Job::Commands => schedule.ssm_commands,
            Job::GenerateMetrics => schedule.generate_metrics,
            Job::ReportMetrics => schedule.report_metrics,
        };
        Duration::from_secs(secs)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collaborators each job talks to.
pub struct Backends {
    pub nodes: Arc<dyn NodeDiscovery>,
    pub connections: Arc<dyn ConnectionDiscovery>,
    pub alarms: Arc<dyn AlarmService>,
    pub cache: Arc<dyn ContentCache>,
    pub commands: Arc<dyn CommandService>,
    pub metrics: Arc<dyn MetricsSink>,
}

impl Backends {
    pub fn remote(settings: &BackendSettings) -> Result<Self> {
        let remote = Arc::new(RemoteInventory::new(settings)?);
        Ok(Self::shared(remote))
    }

    /// One backend serving every collaborator role.
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: NodeDiscovery
            + ConnectionDiscovery
            + AlarmService
            + ContentCache
            + CommandService
            + MetricsSink
            + 'static,
    {
        Self {
            nodes: backend.clone(),
            connections: backend.clone(),
            alarms: backend.clone(),
            cache: backend.clone(),
            commands: backend.clone(),
            metrics: backend,
        }
    }
}

pub struct JobContext {
    pub settings: Settings,
    pub store: Arc<dyn SettingsStore>,
    pub backends: Backends,
    http: Client,
}

impl JobContext {
    pub fn new(settings: Settings, store: Arc<dyn SettingsStore>, backends: Backends) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.backend.timeout_secs))
            .build()
            .context("Failed to build usage report client")?;

        Ok(Self {
            settings,
            store,
            backends,
            http,
        })
    }

    /// Interprets one command completion event. Not scheduled; driven by events.
    pub async fn handle_command_event(&self, detail: &CommandEventDetail) -> Option<MetricDatum> {
        process_command_event(
            self.backends.commands.as_ref(),
            self.backends.metrics.as_ref(),
            &self.settings.commands,
            detail,
        )
        .await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Scope a discovery track processed, if any.
    Scope(Option<Scope>),
    Regions(usize),
    Connections(bool),
    CommandsSent(usize),
    MetricsWritten(usize),
    Report(ReportOutcome),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Scope(Some(scope)) => write!(f, "processed {scope}"),
            JobOutcome::Scope(None) => f.write_str("no scope processed"),
            JobOutcome::Regions(count) => write!(f, "refreshed alarms in {count} region(s)"),
            JobOutcome::Connections(true) => f.write_str("refreshed connections"),
            JobOutcome::Connections(false) => f.write_str("connection refresh failed"),
            JobOutcome::CommandsSent(count) => write!(f, "sent {count} command(s)"),
            JobOutcome::MetricsWritten(count) => write!(f, "wrote {count} metric(s)"),
            JobOutcome::Report(ReportOutcome::Sent(status)) => {
                write!(f, "usage report sent (status {status})")
            }
            JobOutcome::Report(ReportOutcome::SkippedEmpty) => {
                f.write_str("usage report skipped, no data")
            }
            JobOutcome::Report(ReportOutcome::InvalidInstallId) => {
                f.write_str("usage report skipped, invalid install id")
            }
            JobOutcome::Report(ReportOutcome::Disabled) => f.write_str("usage reporting disabled"),
        }
    }
}

/// Runs a single invocation of `job`.
///
/// Only the usage report can fail; every other job logs its own failures and
/// reports what it managed to do.
pub async fn run_job(ctx: &JobContext, job: Job) -> Result<JobOutcome> {
    let store = ctx.store.as_ref();
    let backends = &ctx.backends;

    let outcome = match job {
        Job::Nodes => JobOutcome::Scope(update_nodes(store, Arc::clone(&backends.nodes)).await),
        Job::SsmNodes => {
            JobOutcome::Scope(update_ssm_nodes(store, Arc::clone(&backends.nodes)).await)
        }
        Job::Alarms => JobOutcome::Regions(update_alarms(backends.alarms.as_ref()).await),
        Job::Connections => {
            JobOutcome::Connections(update_connections(backends.connections.as_ref()).await)
        }
        Job::Commands => JobOutcome::CommandsSent(
            run_commands(
                backends.cache.as_ref(),
                backends.commands.as_ref(),
                &ctx.settings.commands,
            )
            .await,
        ),
        Job::GenerateMetrics => JobOutcome::MetricsWritten(
            generate_metrics(
                backends.cache.as_ref(),
                backends.metrics.as_ref(),
                &ctx.settings.metrics,
                &ctx.settings.stack_name,
            )
            .await,
        ),
        Job::ReportMetrics => JobOutcome::Report(
            report_metrics(
                store,
                backends.metrics.as_ref(),
                &ctx.settings,
                &ctx.http,
                Utc::now(),
            )
            .await?,
        ),
    };

    Ok(outcome)
}
