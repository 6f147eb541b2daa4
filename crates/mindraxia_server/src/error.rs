//! HTTP error mapping.
//!
//! Every failure is answered with `{"error": "<code>", "message": "<text>"}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use mindraxia_core::{RepoError, SearchError, ServiceError};
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Internal(message) => message,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.code(), "message": self.message() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Validation(err) => Self::BadRequest(err.to_string()),
            ServiceError::Unauthorized => Self::Unauthorized(value.to_string()),
            ServiceError::Forbidden(_) => Self::Forbidden(value.to_string()),
            ServiceError::NotFound { .. } => Self::NotFound(value.to_string()),
            ServiceError::Conflict(message) => Self::Conflict(message),
            ServiceError::Repo(err) => {
                error!(
                    "event=api_error module=api status=error error_code=repo_failed error={err}"
                );
                Self::Internal("internal storage error".to_string())
            }
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        ServiceError::from(value).into()
    }
}

impl From<SearchError> for ApiError {
    fn from(value: SearchError) -> Self {
        match value {
            SearchError::InvalidQuery { .. } => Self::BadRequest(value.to_string()),
            other => {
                error!(
                    "event=api_error module=api status=error error_code=search_failed error={other}"
                );
                Self::Internal("search failed".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use mindraxia_core::model::ValidationError;
    use mindraxia_core::ServiceError;

    #[test]
    fn service_errors_map_to_status_codes() {
        let cases = [
            (
                ServiceError::Validation(ValidationError::BlankField("title")),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("no".to_string()), StatusCode::FORBIDDEN),
            (
                ServiceError::NotFound {
                    entity: "post",
                    id: "x".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (ServiceError::Conflict("taken".to_string()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn codes_are_snake_case() {
        assert_eq!(ApiError::Internal(String::new()).code(), "internal_error");
        assert_eq!(ApiError::NotFound(String::new()).code(), "not_found");
    }
}
