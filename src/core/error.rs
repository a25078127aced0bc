use crate::core::models::Scope;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reading or writing the settings store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access settings store {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings store {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode settings store: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Setting {key} has an unexpected type, expected {expected}")]
    UnexpectedType {
        key: &'static str,
        expected: &'static str,
    },
}

/// Failure of a call against the inventory backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Request to inventory backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inventory backend returned {status} for {operation}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid instance id {0}")]
    InvalidInstance(String),

    #[error("Unexpected response for {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

/// Outcome of one scheduling cycle that did not complete.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Discovery failed for scope {scope}: {source}")]
    Remote {
        scope: Scope,
        #[source]
        source: RemoteError,
    },
}
