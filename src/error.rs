//! Error taxonomy for latency capture
//!
//! Per-sample failures never leave the component that hit them: a
//! `CommandExecution` or `Parse` error during capture is logged and the
//! sample is recorded as a loss. Only `DeviceUnresponsive` (cold-launch
//! pre-validation exhausted) and `Validation` reach the run boundary, where
//! they become the failure reason of the output row.

use thiserror::Error;

/// Errors that can occur while driving a device or reducing its samples
#[derive(Error, Debug)]
pub enum KpiError {
    #[error("adb command `{command}` failed: {reason}")]
    CommandExecution { command: String, reason: String },

    #[error("malformed marker value `{input}`: {reason}")]
    Parse { input: String, reason: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("device unresponsive after {attempts} attempts: {reason}")]
    DeviceUnresponsive { attempts: u32, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KpiError {
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(input: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for perfkpi operations
pub type Result<T> = std::result::Result<T, KpiError>;
