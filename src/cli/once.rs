use crate::daemon::{run_job, Job, JobContext};
use anyhow::Result;

/// Runs one job invocation, for external schedulers.
pub async fn run(ctx: &JobContext, job: Job) -> Result<()> {
    tracing::debug!(%job, "Running job once");
    let outcome = run_job(ctx, job).await?;
    println!("{}: {}", job, outcome);
    Ok(())
}
