//! Error types for the AWS backend.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors raised by the AWS backend.
///
/// The variants follow the run's failure taxonomy: a naming conflict and a
/// readiness timeout are distinct, operator cancellation is reported as its
/// own outcome, and transient control-plane failures surface fatally rather
/// than being retried.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AwsBackendError {
    /// Raised when the high-level configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when a resource spec fails validation.
    #[error("invalid resource spec: {0}")]
    Validation(String),
    /// Raised when the resolved name already exists in the service
    /// namespace. Names are unique per run via the generated suffix, so this
    /// indicates operator reuse or a suffix collision.
    #[error("{kind} name '{name}' already exists in {region}")]
    NamingConflict {
        /// Resource kind as reported to the operator.
        kind: String,
        /// Name the service rejected.
        name: String,
        /// Region of the rejected request.
        region: String,
    },
    /// Raised when the service rejects an attribute combination.
    #[error("invalid resource configuration: {message}")]
    InvalidConfiguration {
        /// Message returned by the service.
        message: String,
    },
    /// Raised when a resource does not reach the expected state before the
    /// configured deadline.
    #[error("timeout waiting for {action} on {name}")]
    Timeout {
        /// Action being waited on.
        action: String,
        /// Resource name.
        name: String,
    },
    /// Raised when the operator cancels the run between polls.
    #[error("cancelled while waiting for {name}")]
    Cancelled {
        /// Resource name the wait was observing.
        name: String,
    },
    /// Wrapper for control-plane failures, including transient network
    /// errors and throttling. Not retried; the run aborts.
    #[error("provider error: {message}")]
    Provider {
        /// Message returned by the service SDK.
        message: String,
    },
}

impl From<BackendError> for AwsBackendError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Validation(message) => Self::Validation(message),
        }
    }
}
