mod output;
mod run;

use crate::core::error::RemoteError;
use crate::core::models::{CommandDocument, CommandRequest};
use async_trait::async_trait;

pub use output::process_command_event;
pub use run::run_commands;

/// Remote command execution on managed instances.
#[async_trait]
pub trait CommandService: Send + Sync {
    /// Documents owned by this account and tagged with one of `node_types`.
    async fn list_documents(&self, node_types: &[String]) -> Result<Vec<CommandDocument>, RemoteError>;

    /// Sends one command and returns its command id.
    async fn send_command(&self, request: &CommandRequest) -> Result<String, RemoteError>;

    async fn command_output(&self, log_group: &str, log_stream: &str) -> Result<Vec<String>, RemoteError>;
}
