use serde::Serialize;
use thiserror::Error;

/// Machine-readable reason attached to every validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    StartNotBeforeEnd,
    InvalidTimeFormat,
    UnknownTimezone,
    InvalidDay,
    UnknownDepartment,
    UnknownAgent,
    UnknownCapability,
    InvalidPresence,
    EmptyIdentifier,
    NegativeOrder,
    DuplicateName,
}

impl std::fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            ValidationReason::StartNotBeforeEnd => "start_not_before_end",
            ValidationReason::InvalidTimeFormat => "invalid_time_format",
            ValidationReason::UnknownTimezone => "unknown_timezone",
            ValidationReason::InvalidDay => "invalid_day",
            ValidationReason::UnknownDepartment => "unknown_department",
            ValidationReason::UnknownAgent => "unknown_agent",
            ValidationReason::UnknownCapability => "unknown_capability",
            ValidationReason::InvalidPresence => "invalid_presence",
            ValidationReason::EmptyIdentifier => "empty_identifier",
            ValidationReason::NegativeOrder => "negative_order",
            ValidationReason::DuplicateName => "duplicate_name",
        };
        write!(f, "{}", code)
    }
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Validation error ({reason}): {message}")]
    Validation {
        reason: ValidationReason,
        message: String,
    },
    #[error("Storage operation timed out")]
    StorageTimeout,
    #[error("Storage conflict: {0}")]
    StorageConflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(reason: ValidationReason, message: impl Into<String>) -> Self {
        DomainError::Validation {
            reason,
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

/// A stored business-hour window whose configuration cannot be evaluated.
///
/// The evaluator logs these and treats the window as closed; they never
/// propagate out of an availability check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("window {window_id} has unknown timezone '{timezone}'")]
    UnknownTimezone { window_id: String, timezone: String },
    #[error("window {window_id} has unparseable time '{value}'")]
    InvalidTime { window_id: String, value: String },
}
