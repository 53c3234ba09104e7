//! Common error types for vmbox.

use std::path::PathBuf;
use thiserror::Error;

/// Common error type for vmbox operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No valid VMware files found in {}", .dir.display())]
    NoManagedFiles { dir: PathBuf },

    #[error("Missing VMDK in {}", .dir.display())]
    MissingDiskImage { dir: PathBuf },

    #[error("VMX file not found in {}", .dir.display())]
    MissingMachineConfig { dir: PathBuf },

    #[error(
        "Could not determine box name from {}, please specify one with --box_name",
        .path.display()
    )]
    DisplayNameNotFound { path: PathBuf },

    #[error("Box name is empty")]
    EmptyBoxName,

    #[error("No .box file found in {}", .dir.display())]
    BoxNotFound { dir: PathBuf },

    #[error("Multiple .box files found, pick one with --box_name: {}", .candidates.join(", "))]
    AmbiguousBox { candidates: Vec<String> },

    #[error("Unable to locate {tool}: {hint}")]
    ToolNotFound { tool: String, hint: String },

    #[error("Command execution failed: {cmd} - {reason}")]
    CommandExecution { cmd: String, reason: String },

    #[error("Command exited with {}: {cmd}", exit_description(.code))]
    CommandFailed { cmd: String, code: Option<i32> },

    #[error("{0}")]
    Other(String),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;
