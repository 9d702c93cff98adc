use super::{
    auth::AuthError,
    lifecycle::{self, Operation},
    models::ValidationErrors,
};
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ServerError {
    Lifecycle(lifecycle::Error),
    Auth(AuthError),
    /// The request body could not be read as a multipart form.
    Form(MultipartError),
}

impl ServerError {
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Lifecycle(e) => match e {
                lifecycle::Error::Validation(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid property")
                }
                lifecycle::Error::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "Property not found")
                }
                lifecycle::Error::Upload { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "File upload error")
                }
                lifecycle::Error::Persistence { op, .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    match op {
                        Operation::Fetch => "Failed to fetch properties",
                        Operation::Save => "Failed to save property",
                        Operation::Delete => "Failed to delete property",
                    },
                ),
            },
            Self::Auth(AuthError::Unauthorized(_)) => (
                StatusCode::UNAUTHORIZED,
                "Access denied. No token provided.",
            ),
            Self::Auth(AuthError::Forbidden(_)) => {
                (StatusCode::FORBIDDEN, "Invalid or expired token.")
            }
            Self::Auth(AuthError::AdminRequired) => {
                (StatusCode::FORBIDDEN, "Admin role required.")
            }
            Self::Form(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Upload too large")
            }
            Self::Form(_) => (StatusCode::BAD_REQUEST, "Malformed form data"),
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Lifecycle(e) => e.to_string(),
            Self::Auth(e) => e.to_string(),
            Self::Form(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let detail = self.detail();
        if status.is_server_error() {
            error!(error = %detail, "{message}");
        }

        (status, Json(json!({ "message": message, "error": detail })))
            .into_response()
    }
}

impl From<lifecycle::Error> for ServerError {
    fn from(err: lifecycle::Error) -> Self {
        Self::Lifecycle(err)
    }
}

impl From<ValidationErrors> for ServerError {
    fn from(err: ValidationErrors) -> Self {
        Self::Lifecycle(err.into())
    }
}

impl From<AuthError> for ServerError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<MultipartError> for ServerError {
    fn from(err: MultipartError) -> Self {
        Self::Form(err)
    }
}
