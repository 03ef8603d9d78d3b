use std::path::PathBuf;

use thiserror::Error;

/// Machine-readable error codes printed by the CLI alongside notices.
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NO_SESSION: &str = "no_session";
    pub const SERVICE_ERROR: &str = "service_error";
    pub const CONNECTION_ERROR: &str = "connection_error";
    pub const STORAGE_ERROR: &str = "storage_error";
    pub const INVALID_SELECTION: &str = "invalid_selection";
}

/// Inconsistent unit-group data (names and ids must be unique per session).
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("occurrence id '{0}' appears more than once")]
    DuplicateOccurrenceId(String),
    #[error("unit group '{0}' appears more than once")]
    DuplicateGroupName(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write state file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("could not reach the recipe service: {0}")]
    Transport(String),
    #[error("recipe service responded with HTTP {status}")]
    Status { status: u16, body: Option<String> },
    #[error("recipe service returned an unreadable body: {0}")]
    Decode(String),
    #[error("recipe service returned inconsistent units: {0}")]
    Inconsistent(#[from] ModelError),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Transport(_) => codes::CONNECTION_ERROR,
            _ => codes::SERVICE_ERROR,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("no unit group named '{0}'")]
    UnknownGroup(String),
    #[error("no unit occurrence with id '{0}'")]
    UnknownOccurrence(String),
    #[error("'{target}' is not an available target for '{key}'")]
    UnsupportedTarget { key: String, target: String },
}

/// Failure of a parse or convert flow, converted to a notice at the boundary.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("no parsed recipe is available")]
    NoSession,
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FlowError {
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::Validation { .. } => codes::VALIDATION_FAILED,
            FlowError::NoSession => codes::NO_SESSION,
            FlowError::Service(err) => err.code(),
            FlowError::Store(_) => codes::STORAGE_ERROR,
        }
    }
}
