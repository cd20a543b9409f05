//! Domain error types.

use thiserror::Error;

use crate::store::StoreError;

/// Result type returned by every public admin operation.
pub type AdminResult<T> = Result<T, AdminError>;

/// Failure kinds surfaced to callers of the admin services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdminError {
    /// Caller-supplied input failed a precondition before any store call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced id or slug does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness or invariant violation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other store failure, including connectivity.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl AdminError {
    /// Short machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AdminError::Validation(_) => "validation_error",
            AdminError::NotFound(_) => "not_found",
            AdminError::Conflict(_) => "conflict",
            AdminError::Backend(_) => "backend_error",
        }
    }

    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        AdminError::NotFound(format!("{} {} not found", what, id))
    }
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { table, key } => {
                AdminError::NotFound(format!("{} row {} not found", table, key))
            }
            StoreError::UniqueViolation(constraint) => {
                AdminError::Conflict(format!("Resource already exists ({})", constraint))
            }
            StoreError::Serialization(msg) => {
                AdminError::Conflict(format!("Concurrent modification: {}", msg))
            }
            StoreError::Decode { table, message } => {
                AdminError::Backend(format!("Malformed {} row: {}", table, message))
            }
            StoreError::Backend(msg) => AdminError::Backend(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        messages.sort();

        AdminError::Validation(messages.join("; "))
    }
}

impl From<shared::pagination::PaginationError> for AdminError {
    fn from(err: shared::pagination::PaginationError) -> Self {
        AdminError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Table;

    #[test]
    fn test_store_error_mapping() {
        let err: AdminError = StoreError::UniqueViolation("plans_slug_key".into()).into();
        assert!(matches!(err, AdminError::Conflict(_)));

        let err: AdminError = StoreError::Serialization("could not serialize".into()).into();
        assert!(matches!(err, AdminError::Conflict(_)));

        let err: AdminError = StoreError::NotFound {
            table: Table::Plans,
            key: "p1".into(),
        }
        .into();
        assert_eq!(err, AdminError::NotFound("plans row p1 not found".into()));

        let err: AdminError = StoreError::Backend("connection refused".into()).into();
        assert_eq!(err, AdminError::Backend("connection refused".into()));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AdminError::Validation("x".into()).code(), "validation_error");
        assert_eq!(AdminError::NotFound("x".into()).code(), "not_found");
        assert_eq!(AdminError::Conflict("x".into()).code(), "conflict");
        assert_eq!(AdminError::Backend("x".into()).code(), "backend_error");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AdminError::not_found("Plan", "pro").to_string(),
            "Not found: Plan pro not found"
        );
    }
}
