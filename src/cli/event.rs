use crate::core::models::{CommandEvent, CommandEventDetail};
use crate::daemon::JobContext;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

fn parse_event(content: &str) -> Result<CommandEventDetail> {
    let event: CommandEvent =
        serde_json::from_str(content).context("Failed to parse command completion event")?;
    Ok(event.detail)
}

fn read_input(file: &Path) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read event from stdin")?;
        return Ok(content);
    }

    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read event file: {}", file.display()))
}

/// Reads a command completion event (`-` for stdin) and records its metric.
pub async fn run(ctx: &JobContext, file: &Path) -> Result<()> {
    let detail = parse_event(&read_input(file)?)?;
    tracing::debug!(
        instance_id = %detail.instance_id,
        command_id = %detail.command_id,
        "Processing command completion event"
    );

    match ctx.handle_command_event(&detail).await {
        Some(datum) => println!(
            "{} {}={} ({})",
            detail.instance_id, datum.metric_name, datum.value, datum.namespace
        ),
        None => println!("{}: no metric recorded", detail.instance_id),
    }

    Ok(())
}
