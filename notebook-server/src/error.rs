//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use notebook_common::Error;
use serde_json::json;
use thiserror::Error as ThisError;
use tracing::error;

/// Error returned by every handler
#[derive(Debug, ThisError)]
pub enum ApiError {
    /// No usable credential on the request
    #[error("{0}")]
    Unauthenticated(String),

    #[error(transparent)]
    Domain(#[from] Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Domain(e) => match e {
                Error::Validation(_) => StatusCode::BAD_REQUEST,
                Error::Authorization(_) => StatusCode::FORBIDDEN,
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::ExternalService(_) => StatusCode::BAD_GATEWAY,
                Error::Persistence(_) | Error::Config(_) | Error::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Domain(e) => match e {
                Error::Validation(_) => "VALIDATION_ERROR",
                Error::Authorization(_) => "FORBIDDEN",
                Error::NotFound(_) => "NOT_FOUND",
                Error::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
                Error::Persistence(_) => "PERSISTENCE_ERROR",
                Error::Config(_) | Error::Io(_) => "INTERNAL_ERROR",
            },
        }
    }

    /// Client-facing message; store internals are not exposed
    fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated(msg) => msg.clone(),
            ApiError::Domain(e) => match e {
                Error::Validation(msg)
                | Error::Authorization(msg)
                | Error::NotFound(msg)
                | Error::ExternalService(msg) => msg.clone(),
                Error::Persistence(_) | Error::Config(_) | Error::Io(_) => {
                    "Internal server error".to_string()
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        }));

        (status, body).into_response()
    }
}
