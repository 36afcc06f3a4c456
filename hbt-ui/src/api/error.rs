//! API error responses
//!
//! Every error answers with a JSON body `{"error": "..."}`. Errors that mean
//! "go back to the start" add `"redirect": "/"`; upstream failures add the
//! upstream `"status"` so the page can show it in its alert.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::client::ClientError;
use crate::compare::CompareError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable x-tab-id header
    #[error("Missing or invalid x-tab-id header")]
    MissingTab,

    /// Malformed survey, email or product choice
    #[error("{0}")]
    InvalidInput(String),

    /// Email gate not passed yet
    #[error("Email required")]
    IdentityRequired,

    #[error(transparent)]
    Compare(#[from] CompareError),

    /// Recommendation or history lookup failed
    #[error("Upstream error: {0}")]
    Upstream(#[from] ClientError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<hbt_common::Error> for ApiError {
    fn from(err: hbt_common::Error) -> Self {
        match err {
            hbt_common::Error::InvalidInput(msg) => ApiError::InvalidInput(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();

        let (status, body) = match &self {
            ApiError::MissingTab | ApiError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ApiError::IdentityRequired => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": message, "redirect": "/" }),
            ),
            ApiError::Compare(CompareError::MissingPriorState) => (
                StatusCode::CONFLICT,
                json!({ "error": message, "redirect": "/" }),
            ),
            ApiError::Compare(CompareError::InvalidTransition(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message }))
            }
            ApiError::Compare(CompareError::SubmissionFailure(code))
            | ApiError::Upstream(ClientError::Status(code, _)) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": message, "status": code }),
            ),
            ApiError::Compare(CompareError::Transport(_)) | ApiError::Upstream(_) => {
                (StatusCode::BAD_GATEWAY, json!({ "error": message }))
            }
            ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
        };

        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %message, "API request failed");
        }

        (status, Json(body)).into_response()
    }
}
