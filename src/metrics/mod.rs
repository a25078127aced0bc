mod generate;
mod report;

use crate::core::error::RemoteError;
use crate::core::models::{MetricDatum, StatisticQuery};
use async_trait::async_trait;

pub use generate::generate_metrics;
pub use report::{ensure_install_id, report_metrics, ReportOutcome};

/// Destination for emitted metrics, and the source of their statistics.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn put_metric(&self, datum: &MetricDatum) -> Result<(), RemoteError>;

    /// Maximum datapoint for the query window, if any datapoints exist.
    async fn max_statistic(&self, query: &StatisticQuery) -> Result<Option<f64>, RemoteError>;
}
