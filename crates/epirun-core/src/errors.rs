//! Structured error types shared across epirun crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SweepError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, indices, expressions).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller fix the sweep configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for sweep setup.
///
/// Every failure is fatal for the batch-setup step that raised it; the only
/// recoverable path (per-run summary extraction) downgrades these to warnings
/// at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SweepError {
    /// Malformed sweep specification, run selection or engine configuration.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// Expression or path placeholders that reference each other in a cycle.
    #[error("circular parameter reference: {0}")]
    CircularReference(ErrorInfo),
    /// Lookup against a nested mapping that lacks one of the path segments.
    #[error("missing path: {0}")]
    MissingPath(ErrorInfo),
    /// Filesystem failures while reading inputs or writing run artefacts.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SweepError {
    /// Shorthand for a [`SweepError::Configuration`] without context.
    pub fn configuration(code: impl Into<String>, message: impl Into<String>) -> Self {
        SweepError::Configuration(ErrorInfo::new(code, message))
    }

    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SweepError::Configuration(info)
            | SweepError::CircularReference(info)
            | SweepError::MissingPath(info)
            | SweepError::Io(info)
            | SweepError::Serde(info) => info,
        }
    }

    /// Returns true when the error is a [`SweepError::MissingPath`].
    pub fn is_missing_path(&self) -> bool {
        matches!(self, SweepError::MissingPath(_))
    }
}

/// Wraps an I/O failure for `path` under the provided error code.
pub fn io_error(code: &str, path: &std::path::Path, err: impl ToString) -> SweepError {
    SweepError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}
