mod app;
mod polling;

use anyhow::Result;

pub use polling::{run_job, Backends, Job, JobContext};

pub async fn run(ctx: JobContext) -> Result<()> {
    tracing::info!(stack = %ctx.settings.stack_name, "Starting media-inventory daemon");
    app::run(ctx).await
}
