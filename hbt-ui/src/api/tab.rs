//! Tab identification
//!
//! The page asks for a tab id once (`POST /api/tabs`), keeps it in its own
//! tab storage and sends it as `x-tab-id` on every API call.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::ApiError;
use crate::AppState;

pub const TAB_ID_HEADER: &str = "x-tab-id";

/// Tab id extracted from the `x-tab-id` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for TabId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(TAB_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::MissingTab)?;

        Uuid::parse_str(value.trim())
            .map(TabId)
            .map_err(|_| ApiError::MissingTab)
    }
}

#[derive(Debug, Serialize)]
pub struct TabResponse {
    pub tab_id: Uuid,
}

/// POST /api/tabs
pub async fn open_tab(State(state): State<AppState>) -> (StatusCode, Json<TabResponse>) {
    let tab_id = state.tabs.open().await;
    (StatusCode::CREATED, Json(TabResponse { tab_id }))
}
