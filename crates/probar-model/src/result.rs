//! Result and error types for probar-model.

use crate::executor::TestPathResult;
use crate::trace;
use std::fmt;
use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while planning or running model-based tests
#[derive(Debug, Error)]
pub enum ModelError {
    /// A state assertion rejected
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// An event executor rejected
    #[error("Event execution failed: {message}")]
    ExecutionFailed {
        /// Error message
        message: String,
    },

    /// The state reached by a literal event sequence is not the declared target
    #[error("The last state {actual} does not match the target state {expected}")]
    TargetMismatch {
        /// Value of the state actually reached
        actual: String,
        /// Rendered target
        expected: String,
    },

    /// A literal event is not accepted by the state it was replayed against
    #[error("Invalid transition from state {state} for event {event}")]
    InvalidEvent {
        /// Serialized state the event was sent to
        state: String,
        /// Serialized event
        event: String,
    },

    /// A generated path failed; carries the cause and the step trace
    #[error("{0}")]
    PathFailed(Box<PathFailure>),

    /// One or more declared state nodes were never asserted
    #[error("Missing coverage for state nodes:\n{}", format_missing(.missing))]
    CoverageIncomplete {
        /// Ids of the uncovered nodes
        missing: Vec<String>,
    },

    /// Machine definition failed validation
    #[error("Invalid machine definition: {0}")]
    InvalidDefinition(String),

    /// Machine definition could not be parsed
    #[error("Failed to parse machine definition: {0}")]
    Parse(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error raised by caller-supplied automation code
    #[error(transparent)]
    External(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ModelError {
    /// Shorthand for an assertion failure.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Shorthand for an executor failure.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }

    /// The path failure behind this error, if any.
    pub fn path_failure(&self) -> Option<&PathFailure> {
        match self {
            Self::PathFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

fn format_missing(missing: &[String]) -> String {
    missing
        .iter()
        .map(|id| format!("\t{id}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A failed path run: the original cause and the trace recorded up to it.
///
/// `Display` renders the colored trace; [`PathFailure::render_plain`] gives the
/// same text without ANSI styling.
#[derive(Debug)]
pub struct PathFailure {
    /// Error raised by the failing assertion or executor
    pub cause: ModelError,
    /// Steps recorded before the walk stopped
    pub result: TestPathResult,
}

impl PathFailure {
    /// Render the failure message and trace without colors.
    pub fn render_plain(&self) -> String {
        format!("{}{}", self.cause, trace::render_plain(&self.result))
    }
}

impl fmt::Display for PathFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.cause, trace::render(&self.result))
    }
}

impl std::error::Error for PathFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_mismatch_display() {
        let err = ModelError::TargetMismatch {
            actual: "\"active\"".to_string(),
            expected: "\"inactive\"".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"active\""));
        assert!(msg.contains("\"inactive\""));
    }

    #[test]
    fn test_coverage_incomplete_lists_every_node() {
        let err = ModelError::CoverageIncomplete {
            missing: vec!["light.red".to_string(), "light.green".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing coverage for state nodes:\n\tlight.red\n\tlight.green"
        );
    }

    #[test]
    fn test_external_error_is_transparent() {
        let boxed: Box<dyn std::error::Error + Send + Sync> = "browser went away".into();
        let err = ModelError::from(boxed);
        assert_eq!(err.to_string(), "browser went away");
        assert!(err.path_failure().is_none());
    }
}
