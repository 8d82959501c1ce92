//! Error types for the game API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response with a `{error, status}` JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stronghold_core::commands::CommandError;
use stronghold_world::WorldError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No valid session cookie was presented.
    #[error("not logged in")]
    Unauthorized,

    /// Login failed. The message never says which half was wrong.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The session user may not touch this resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was malformed or the command was rejected.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status code for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WorldError> for ApiError {
    fn from(e: WorldError) -> Self {
        match e {
            WorldError::AlreadyExists(_) => Self::Conflict(e.to_string()),
            WorldError::OwnerNotFound(_) | WorldError::IdExhausted(_) => {
                Self::Internal(e.to_string())
            }
            WorldError::UserNotFound(_)
            | WorldError::UserIdNotFound(_)
            | WorldError::CityNotFound(_) => Self::NotFound(e.to_string()),
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::World { source } => source.into(),
            CommandError::NotOwner { .. } => Self::Forbidden(e.to_string()),
            CommandError::BuildingNotFound { .. } | CommandError::UnknownTroop(_) => {
                Self::NotFound(e.to_string())
            }
            CommandError::InvalidQuantity
            | CommandError::InsufficientResources { .. }
            | CommandError::MaxLevelReached { .. }
            | CommandError::CostOverflow => Self::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
