//! Comparison screen endpoints
//!
//! Every transition answers with the view of the round the user is on
//! afterwards. The view is blind: it never reveals which algorithm
//! recommended a product, nor the algorithm's score.

use axum::{extract::State, Json};
use hbt_common::recommendation::ProductId;
use hbt_common::ROUND_COUNT;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, TabId};
use crate::compare::{CompareError, ComparisonSession, RoundState, LAST_ROUND};
use crate::tabs::TabSession;
use crate::AppState;

/// One product as shown to the user
#[derive(Debug, Serialize)]
pub struct CandidateView {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: f64,
    pub is_selected: bool,
}

/// Current round as shown to the user
#[derive(Debug, Serialize)]
pub struct RoundView {
    /// 0-based round index
    pub round: usize,
    pub round_count: usize,
    pub state: RoundState,
    pub candidates: Vec<CandidateView>,
    pub can_advance: bool,
    pub can_retreat: bool,
    pub can_submit: bool,
    pub is_last_round: bool,
}

impl From<&ComparisonSession> for RoundView {
    fn from(session: &ComparisonSession) -> Self {
        let state = session.current_state();
        let candidates = session
            .candidates()
            .map(|(_, product)| CandidateView {
                product_id: product.product_id,
                product_name: product.product_name.clone(),
                price: product.price,
                is_selected: state.selected() == Some(product.product_id),
            })
            .collect();

        Self {
            round: session.current_round(),
            round_count: ROUND_COUNT,
            state,
            candidates,
            can_advance: session.can_advance(),
            can_retreat: session.can_retreat(),
            can_submit: session.is_complete(),
            is_last_round: session.current_round() == LAST_ROUND,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
    pub redirect: &'static str,
}

/// Run `f` against this tab's comparison and render the resulting round
async fn with_comparison<F>(state: &AppState, tab_id: uuid::Uuid, f: F) -> Result<Json<RoundView>, ApiError>
where
    F: FnOnce(&mut ComparisonSession) -> Result<(), ApiError>,
{
    let tab = state
        .tabs
        .get(tab_id)
        .await
        .ok_or(CompareError::MissingPriorState)?;
    let mut tab = tab.lock().await;
    let session = tab.comparison()?;
    f(session)?;
    Ok(Json(RoundView::from(&*session)))
}

/// GET /api/compare
///
/// 409 with `redirect` when no survey is in progress in this tab.
pub async fn get_round(
    State(state): State<AppState>,
    TabId(tab_id): TabId,
) -> Result<Json<RoundView>, ApiError> {
    with_comparison(&state, tab_id, |_| Ok(())).await
}

/// POST /api/compare/select
///
/// The product must be one of those shown in the current round.
pub async fn select(
    State(state): State<AppState>,
    TabId(tab_id): TabId,
    Json(request): Json<SelectRequest>,
) -> Result<Json<RoundView>, ApiError> {
    with_comparison(&state, tab_id, |session| {
        if !session
            .recommendations()
            .offers(session.current_round(), request.product_id)
        {
            return Err(ApiError::InvalidInput(format!(
                "Product {} is not offered in round {}",
                request.product_id,
                session.current_round() + 1
            )));
        }
        Ok(session.select(request.product_id)?)
    })
    .await
}

/// POST /api/compare/bad
pub async fn mark_bad(
    State(state): State<AppState>,
    TabId(tab_id): TabId,
) -> Result<Json<RoundView>, ApiError> {
    with_comparison(&state, tab_id, |session| {
        session.mark_bad();
        Ok(())
    })
    .await
}

/// POST /api/compare/advance
pub async fn advance(
    State(state): State<AppState>,
    TabId(tab_id): TabId,
) -> Result<Json<RoundView>, ApiError> {
    with_comparison(&state, tab_id, |session| Ok(session.advance()?)).await
}

/// POST /api/compare/retreat
pub async fn retreat(
    State(state): State<AppState>,
    TabId(tab_id): TabId,
) -> Result<Json<RoundView>, ApiError> {
    with_comparison(&state, tab_id, |session| Ok(session.retreat()?)).await
}

/// POST /api/compare/submit
///
/// On success the comparison is gone and the page moves to the done screen.
/// On failure (502 with the upstream `status`) everything stays as it was.
pub async fn submit(
    State(state): State<AppState>,
    TabId(tab_id): TabId,
) -> Result<Json<SubmitResponse>, ApiError> {
    let tab = state
        .tabs
        .get(tab_id)
        .await
        .ok_or(CompareError::MissingPriorState)?;
    let mut guard = tab.lock().await;
    guard.comparison()?;

    let TabSession { store, compare } = &mut *guard;
    let session = compare.as_ref().ok_or(CompareError::MissingPriorState)?;
    session.submit(state.sink.as_ref(), store).await?;
    *compare = None;

    info!(tab_id = %tab_id, "Comparison finished");

    Ok(Json(SubmitResponse {
        status: "submitted",
        redirect: "/done",
    }))
}
