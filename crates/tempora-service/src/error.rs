//! Service error types with client/internal classification.
//!
//! [`ServiceError`] is the unified error type for every [`GraphService`](crate::GraphService)
//! operation. Core and storage errors are mapped into it so callers only
//! have to decide between "the request was wrong" and "the system is broken".

use tracing::error;

use tempora_core::{CoreError, ValidationError};
use tempora_storage::StorageError;

/// Errors returned by the service layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Entity not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request cannot be applied to the current graph.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A component element set was rejected.
    #[error("validation failed: {0}")]
    ValidationFailed(ValidationError),

    /// The graph or its store is in a state it should never reach.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Whether the caller caused this error (as opposed to the service).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ServiceError::Internal(_))
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            CoreError::ValidationFailed(validation) => ServiceError::ValidationFailed(validation),
            CoreError::InvalidEdge { .. } => ServiceError::BadRequest(err.to_string()),
            CoreError::InvariantViolation { .. } => {
                error!(error = %err, "graph invariant violated");
                ServiceError::Internal(err.to_string())
            }
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        if let StorageError::IntegrityError { .. } = &err {
            error!(error = %err, "store diverged from the live graph");
        }
        ServiceError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempora_core::Kind;

    #[test]
    fn core_errors_are_classified() {
        let not_found: ServiceError = CoreError::NotFound {
            kind: Kind::Node,
            target: "abc".into(),
        }
        .into();
        assert!(matches!(not_found, ServiceError::NotFound(_)));
        assert!(not_found.is_client_error());

        let invalid: ServiceError = CoreError::ValidationFailed(ValidationError::Cyclic).into();
        match invalid {
            ServiceError::ValidationFailed(ValidationError::Cyclic) => {}
            other => panic!("expected ValidationFailed(Cyclic), got {:?}", other),
        }

        let broken: ServiceError = CoreError::InvariantViolation {
            reason: "edge without endpoints".into(),
        }
        .into();
        assert!(!broken.is_client_error());
    }

    #[test]
    fn storage_errors_are_internal() {
        let err: ServiceError = StorageError::Migration("bad".into()).into();
        assert!(matches!(err, ServiceError::Internal(_)));
        assert!(!err.is_client_error());
    }
}
