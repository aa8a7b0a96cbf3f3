use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::builder::FormError;
use crate::client::ClientError;
use crate::notice::{FailureText, FieldStyle, Notice, failure_notice};
use crate::service::{LoadError, MutationError};

const REQUEST_FAILED: FailureText = FailureText {
    title: "Request Failed",
    validation_title: "Validation Error",
    message: "The class API rejected the request",
    style: FieldStyle::Bullets,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// The class API answered with an error; the notice describes it.
    Upstream { status: StatusCode, notice: Notice },
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Upstream { status, notice } => (status, Json(notice)).into_response(),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

/// Client errors from upstream are passed on, anything else is a bad gateway.
fn relay_status(err: &ClientError) -> StatusCode {
    match err.status() {
        Some(status) if status.is_client_error() => status,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl From<ClientError> for ApiError {
    fn from(value: ClientError) -> Self {
        match &value {
            ClientError::Http(err) => {
                error!("HTTP error: {err}");
                ApiError::Unavailable("Class API is unreachable".into())
            }
            ClientError::Url(_) => ApiError::Internal(value.to_string()),
            _ if value.status() == Some(StatusCode::NOT_FOUND) => {
                let message = value
                    .body()
                    .and_then(|body| body.message.clone())
                    .unwrap_or_else(|| "Not found".into());
                ApiError::NotFound(message)
            }
            _ => ApiError::Upstream {
                status: relay_status(&value),
                notice: failure_notice(&value, REQUEST_FAILED),
            },
        }
    }
}

impl From<FormError> for ApiError {
    fn from(value: FormError) -> Self {
        ApiError::BadRequest(value.to_string())
    }
}

impl From<LoadError> for ApiError {
    fn from(value: LoadError) -> Self {
        match value {
            LoadError::Upstream(err) => err.into(),
        }
    }
}

impl From<MutationError> for ApiError {
    fn from(value: MutationError) -> Self {
        match value {
            MutationError::Pending(_) => ApiError::Conflict(value.to_string()),
            MutationError::Form(err) => err.into(),
            MutationError::Upstream { notice, source } => match source {
                ClientError::Http(err) => {
                    error!("HTTP error: {err}");
                    ApiError::Upstream {
                        status: StatusCode::SERVICE_UNAVAILABLE,
                        notice,
                    }
                }
                other => ApiError::Upstream {
                    status: relay_status(&other),
                    notice,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ErrorBody, FieldError};
    use crate::notice::NoticeVariant;

    #[test]
    fn test_not_found_uses_upstream_message() {
        let err = ClientError::Api {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                title: None,
                message: Some("Class not found".into()),
                errors: Vec::new(),
            },
        };
        assert!(matches!(ApiError::from(err), ApiError::NotFound(msg) if msg == "Class not found"));
    }

    #[test]
    fn test_validation_error_is_relayed() {
        let err = ClientError::Api {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: ErrorBody {
                title: None,
                message: None,
                errors: vec![FieldError {
                    field: "title".into(),
                    message: "Title is required".into(),
                }],
            },
        };
        let ApiError::Upstream { status, notice } = ApiError::from(err) else {
            panic!("expected upstream error");
        };
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(notice.variant, NoticeVariant::Error);
        assert_eq!(notice.description.as_deref(), Some("• Title is required"));
    }

    #[test]
    fn test_server_error_becomes_bad_gateway() {
        let err = ClientError::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody::default(),
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_form_error_is_bad_request() {
        let response = ApiError::from(FormError::MissingTitle).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
