// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Error types for device automation

use thiserror::Error;

/// Longest tail of raw device output kept inside an error
const SNIPPET_LIMIT: usize = 512;

/// Main error type for RouterOS and OLT operations
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Host unreachable, refused, reset or timed out
    #[error("Connection error: {0}")]
    Connection(String),

    /// Credentials rejected by the device
    #[error("Authentication failed for user '{user}': {reason}")]
    Authentication { user: String, reason: String },

    /// Malformed or truncated RouterOS binary stream
    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    /// RouterOS answered with `!trap`
    #[error("Device rejected command '{command}': {message}")]
    DeviceRejectedCommand {
        command: String,
        message: String,
        category: Option<String>,
    },

    /// OLT banner did not show the base prompt
    #[error("Unrecognized prompt at step '{step}': {output:?}")]
    UnrecognizedPrompt { step: String, output: String },

    /// OLT output did not contain the expected marker in time
    #[error("Unexpected device response at step '{step}': {output:?}")]
    UnexpectedDeviceResponse { step: String, output: String },

    /// Serial number not present in the searched port range
    #[error("Device with serial '{serial}' not found in {range}")]
    DeviceNotFound { serial: String, range: String },

    /// Data row present but fields could not be extracted
    #[error("Parse failure at step '{step}': {output:?}")]
    ParseFailure { step: String, output: String },

    /// Session method called out of order
    #[error("Invalid transition: cannot {step} while {state}")]
    InvalidTransition { step: String, state: String },
}

impl Error {
    pub(crate) fn unexpected(step: &str, output: &str) -> Self {
        Self::UnexpectedDeviceResponse {
            step: step.to_string(),
            output: snippet(output),
        }
    }

    pub(crate) fn parse_failure(step: &str, output: &str) -> Self {
        Self::ParseFailure {
            step: step.to_string(),
            output: snippet(output),
        }
    }

    /// True for failures the orchestrator may retry as a whole sequence
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::UnexpectedDeviceResponse { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Connection(error.to_string())
    }
}

impl From<russh::Error> for Error {
    fn from(error: russh::Error) -> Self {
        Self::Connection(format!("ssh: {error}"))
    }
}

/// Keep the last `SNIPPET_LIMIT` bytes of output, cut on a char boundary
pub(crate) fn snippet(output: &str) -> String {
    if output.len() <= SNIPPET_LIMIT {
        return output.to_string();
    }
    let mut start = output.len() - SNIPPET_LIMIT;
    while !output.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &output[start..])
}

/// Convenient alias for Result with the crate error
pub type Result<T> = std::result::Result<T, Error>;
