use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain::services::IdentityError;
use domain::DomainError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request was understood but is missing a required part.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("User not registered")]
    NotRegistered,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot delete trade")]
    CannotDelete,

    #[error("Failed to update payment status")]
    PaymentNotRecorded,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::NotRegistered => (
                StatusCode::NOT_FOUND,
                "not_registered",
                "User not registered".into(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::CannotDelete => (
                StatusCode::BAD_REQUEST,
                "cannot_delete",
                "Cannot delete trade. Either it does not exist, it's not yours, or it's already filled."
                    .into(),
            ),
            ApiError::PaymentNotRecorded => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "payment_not_recorded",
                "Failed to update payment status".into(),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::NotRegistered => ApiError::NotRegistered,
            DomainError::Forbidden(msg) => ApiError::Forbidden(msg),
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::CannotDelete => ApiError::CannotDelete,
            DomainError::PaymentNotRecorded => ApiError::PaymentNotRecorded,
            DomainError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::MissingCredential => {
                ApiError::Unauthorized("missing Authorization: Bearer token".into())
            }
            IdentityError::MissingDevSubject => ApiError::BadRequest(err.to_string()),
            IdentityError::Rejected(_) => ApiError::Unauthorized("Invalid id_token".into()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::from(errors).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::VerifyError;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::NotRegistered, StatusCode::NOT_FOUND),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::CannotDelete, StatusCode::BAD_REQUEST),
            (ApiError::PaymentNotRecorded, StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (status, json) =
            body_json(ApiError::Internal("Store error: connection reset".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal_error");
        assert!(!json["message"].as_str().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_body_shape() {
        let (_, json) = body_json(ApiError::Conflict("You are already a member".into())).await;
        assert_eq!(json["error"], "conflict");
        assert_eq!(json["message"], "You are already a member");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_collapsed_errors_have_distinct_codes() {
        let (_, delete) = body_json(DomainError::CannotDelete.into()).await;
        assert_eq!(delete["error"], "cannot_delete");
        let (status, paid) = body_json(DomainError::PaymentNotRecorded.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(paid["error"], "payment_not_recorded");
    }

    #[test]
    fn test_identity_error_mapping() {
        assert!(matches!(
            ApiError::from(IdentityError::MissingCredential),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(IdentityError::MissingDevSubject),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(IdentityError::Rejected(VerifyError::Status(400))),
            ApiError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_not_registered_is_not_unauthorized() {
        let response = ApiError::from(DomainError::NotRegistered).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
