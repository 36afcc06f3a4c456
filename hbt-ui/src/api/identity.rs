//! Email gate and logout

use axum::{extract::State, Json};
use hbt_common::session;
use hbt_common::EmailAddress;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, TabId};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct IdentityRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub redirect: &'static str,
}

/// GET /api/identity
///
/// Email already entered in this tab, if any.
pub async fn get_identity(
    State(state): State<AppState>,
    TabId(tab_id): TabId,
) -> Json<IdentityResponse> {
    let email = match state.tabs.get(tab_id).await {
        Some(tab) => session::identity(&tab.lock().await.store),
        None => None,
    };
    Json(IdentityResponse { email })
}

/// POST /api/identity
///
/// Validates and stores the email for this tab. A different email drops the
/// cached comparison so the next submission carries the new address.
pub async fn set_identity(
    State(state): State<AppState>,
    TabId(tab_id): TabId,
    Json(request): Json<IdentityRequest>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let email = EmailAddress::parse(request.email.trim())?;

    let tab = state.tabs.get_or_open(tab_id).await;
    let mut tab = tab.lock().await;
    if session::identity(&tab.store).as_deref() != Some(email.as_str()) {
        tab.reset_comparison();
    }
    session::set_identity(&mut tab.store, email.as_str());
    info!(tab_id = %tab_id, email = %email, "Identity set");

    Ok(Json(IdentityResponse {
        email: Some(email.into()),
    }))
}

/// POST /api/logout
///
/// Clears everything stored for this tab, identity included.
pub async fn logout(State(state): State<AppState>, TabId(tab_id): TabId) -> Json<LogoutResponse> {
    if let Some(tab) = state.tabs.get(tab_id).await {
        let mut tab = tab.lock().await;
        session::logout(&mut tab.store);
        tab.reset_comparison();
        info!(tab_id = %tab_id, "Logged out");
    }

    Json(LogoutResponse { redirect: "/" })
}
