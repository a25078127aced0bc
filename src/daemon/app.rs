use crate::daemon::polling::{run_job, Job, JobContext};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

pub async fn run(ctx: JobContext) -> Result<()> {
    let ctx = Arc::new(ctx);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles = Vec::with_capacity(Job::ALL.len());
    for job in Job::ALL {
        let period = job.interval(&ctx.settings.schedule);
        tracing::info!(%job, period_secs = period.as_secs(), "Scheduling job");
        handles.push(tokio::spawn(run_job_loop(
            Arc::clone(&ctx),
            job,
            period,
            shutdown_rx.clone(),
        )));
    }

    wait_for_shutdown().await?;
    tracing::info!("Shutdown requested, waiting for running jobs");
    let _ = shutdown_tx.send(true);

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Job loop ended abnormally");
        }
    }

    tracing::info!("Daemon stopped");
    Ok(())
}

/// Ticks never overlap: a job that overruns its period skips the missed ticks.
async fn run_job_loop(
    ctx: Arc<JobContext>,
    job: Job,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_and_log(&ctx, job).await;
            }
            _ = shutdown_rx.changed() => {
                tracing::debug!(%job, "Job loop stopping");
                break;
            }
        }
    }
}

async fn run_and_log(ctx: &JobContext, job: Job) {
    let started = std::time::Instant::now();
    match run_job(ctx, job).await {
        Ok(outcome) => {
            tracing::info!(
                %job,
                %outcome,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job finished"
            );
        }
        Err(e) => {
            tracing::warn!(%job, error = %format!("{e:#}"), "Job failed");
        }
    }
}

async fn wait_for_shutdown() -> Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
        }
        _ = terminate.recv() => {}
    }

    Ok(())
}
