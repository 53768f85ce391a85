// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

use stabbie_contracts::{StabbieError, StabbieErrorKind};
use thiserror::Error;

/// Error types for system-level operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid mountinfo line: {0}")]
    InvalidMountInfoLine(String),

    #[error("command failed: {command}: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("command timed out after {}s: {command}", .timeout.as_secs_f64())]
    CommandTimeout { command: String, timeout: Duration },
}

impl From<SysError> for StabbieError {
    fn from(err: SysError) -> Self {
        let kind = match &err {
            SysError::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                StabbieErrorKind::PermissionDenied
            }
            SysError::Io(_) => StabbieErrorKind::Unavailable,
            SysError::InvalidMountInfoLine(_) => StabbieErrorKind::InvalidInput,
            SysError::CommandFailed { .. } => StabbieErrorKind::Internal,
            SysError::CommandTimeout { .. } => StabbieErrorKind::Timeout,
        };
        StabbieError::new(kind, err.to_string())
    }
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;
