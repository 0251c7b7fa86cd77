//! Error types for synthesis runs.
//!
//! Only [`SynthesisError::MissingMandatoryInput`] aborts a run. Optional
//! documents that are absent or malformed degrade to empty inputs and are
//! reported through [`crate::io::loader::InputStatus`]; references that fail
//! to correlate are dropped without any error at all.
//!
//! # Error Codes
//!
//! - E001-E009: input documents
//! - E020-E029: configuration

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error code for documentation and programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    /// Mandatory file-analysis document absent or unreadable
    pub const INPUT_MISSING_MANDATORY: ErrorCode = ErrorCode("E001");
    /// Document present but not in an accepted shape
    pub const INPUT_MALFORMED: ErrorCode = ErrorCode("E002");
    /// Config error - invalid value
    pub const CONFIG_INVALID: ErrorCode = ErrorCode("E020");
    /// Config error - file could not be read
    pub const CONFIG_UNREADABLE: ErrorCode = ErrorCode("E022");

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The file-analysis document is absent or unreadable
    #[error("Required input not found or unreadable: {}: {reason}", path.display())]
    MissingMandatoryInput { path: PathBuf, reason: String },

    /// An optional document exists but does not parse into the expected shape
    #[error("Malformed input {}: {message}", path.display())]
    MalformedInput { path: PathBuf, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },
}

impl SynthesisError {
    pub fn missing_mandatory(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::MissingMandatoryInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::MalformedInput {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Config {
            message: message.into(),
            path,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingMandatoryInput { .. } => ErrorCode::INPUT_MISSING_MANDATORY,
            Self::MalformedInput { .. } => ErrorCode::INPUT_MALFORMED,
            Self::Config { path: Some(_), .. } => ErrorCode::CONFIG_UNREADABLE,
            Self::Config { path: None, .. } => ErrorCode::CONFIG_INVALID,
        }
    }

    /// Whether the run must stop. Everything else degrades to partial results.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, SynthesisError>;
