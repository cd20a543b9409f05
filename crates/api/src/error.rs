use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::services::CommitError;
use domain::AdminError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A settings commit that stopped early. `persisted` lists the keys
    /// saved before the failure and may be empty.
    #[error("Commit failed: {cause}")]
    CommitFailed {
        cause: Box<ApiError>,
        persisted: Vec<String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    persisted: Option<Vec<String>>,
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String, Option<Vec<String>>) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg, None),
            ApiError::CommitFailed { cause, persisted } => {
                let (status, error_code, message, _) = (*cause).parts();
                if persisted.is_empty() {
                    return (status, error_code, message, Some(persisted));
                }
                tracing::error!(saved = persisted.len(), "Settings commit stopped partway: {}", message);
                let message = format!(
                    "{} setting(s) were saved before the commit failed: {}",
                    persisted.len(),
                    message
                );
                (status, "partial_commit", message, Some(persisted))
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg, None)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, persisted) = self.parts();

        let body = ErrorBody {
            error: error_code.into(),
            message,
            persisted,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Validation(msg) => ApiError::Validation(msg),
            AdminError::NotFound(msg) => ApiError::NotFound(msg),
            AdminError::Conflict(msg) => ApiError::Conflict(msg),
            AdminError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        ApiError::CommitFailed {
            cause: Box::new(err.source.into()),
            persisted: err.persisted,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AdminError::from(errors).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_api_error_not_found() {
        let response = ApiError::NotFound("resource not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_api_error_conflict() {
        let response = ApiError::Conflict("slug taken".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_api_error_validation() {
        let response = ApiError::Validation("invalid input".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_api_error_internal() {
        let response = ApiError::Internal("database error".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_admin_error_mapping() {
        let cases = [
            (AdminError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AdminError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AdminError::Conflict("x".into()), StatusCode::CONFLICT),
            (AdminError::Backend("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_commit_error_keeps_persisted_keys() {
        let err = CommitError {
            persisted: vec!["site_name".into()],
            source: AdminError::Backend("timeout".into()),
        };
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "partial_commit");
        assert_eq!(body["persisted"], serde_json::json!(["site_name"]));
    }

    #[tokio::test]
    async fn test_commit_failing_on_first_key_is_not_partial() {
        let err = CommitError {
            persisted: vec![],
            source: AdminError::Backend("timeout".into()),
        };
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["persisted"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_commit_not_found_reports_persisted_keys() {
        let err = CommitError {
            persisted: vec!["maintenance_mode".into()],
            source: AdminError::NotFound("Setting theme not found".into()),
        };
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "partial_commit");
        assert_eq!(body["persisted"], serde_json::json!(["maintenance_mode"]));
    }

    #[tokio::test]
    async fn test_commit_error_validation_is_bad_request() {
        let err = CommitError {
            persisted: vec![],
            source: AdminError::Validation("bad".into()),
        };
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }
}
