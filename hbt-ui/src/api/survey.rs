//! Survey screen endpoints
//!
//! Survey vocabularies, the "Random" helper, previous sessions for
//! pre-filling, and the survey submission that fetches recommendations.

use axum::{extract::State, Json};
use hbt_common::history::{PreviousSession, StoredParameters};
use hbt_common::session;
use hbt_common::survey::{AgeBracket, Gender, Interest, Occasion, SurveyRequest};
use hbt_common::SurveyParameters;
use serde::Serialize;
use tracing::info;

use super::{ApiError, TabId};
use crate::AppState;

/// Value/label pair for one survey choice
#[derive(Debug, Serialize)]
pub struct Choice {
    pub value: &'static str,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct SurveyOptions {
    pub genders: Vec<Choice>,
    pub age_brackets: Vec<Choice>,
    pub occasions: Vec<Choice>,
    pub interests: Vec<Choice>,
}

#[derive(Debug, Serialize)]
pub struct SurveyAccepted {
    /// Number of algorithms that answered
    pub algorithms: usize,
    pub redirect: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PreviousSessionView {
    pub session_id: i64,
    pub summary: String,
    /// RFC 3339 when parseable, upstream text otherwise
    pub created_at: String,
    pub parameters: StoredParameters,
    /// Ready-to-use survey; absent when the stored record has no budget
    pub survey: Option<SurveyParameters>,
}

impl From<PreviousSession> for PreviousSessionView {
    fn from(session: PreviousSession) -> Self {
        let created_at = session
            .created_at_utc()
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| session.created_at.clone());

        Self {
            session_id: session.session_id,
            summary: session.parameters.summary(),
            created_at,
            survey: session.parameters.to_survey(),
            parameters: session.parameters,
        }
    }
}

/// GET /api/survey/options
pub async fn survey_options() -> Json<SurveyOptions> {
    Json(SurveyOptions {
        genders: Gender::ALL
            .iter()
            .map(|g| Choice { value: g.as_str(), label: g.label() })
            .collect(),
        age_brackets: AgeBracket::ALL
            .iter()
            .map(|a| Choice { value: a.as_str(), label: a.label() })
            .collect(),
        occasions: Occasion::ALL
            .iter()
            .map(|o| Choice { value: o.as_str(), label: o.label() })
            .collect(),
        interests: Interest::ALL
            .iter()
            .map(|i| Choice { value: i.as_str(), label: i.label() })
            .collect(),
    })
}

/// GET /api/survey/random
pub async fn random_survey() -> Json<SurveyParameters> {
    Json(SurveyParameters::random(&mut rand::thread_rng()))
}

/// POST /api/survey
///
/// Validates the survey, asks the recommendation API for recommendations and
/// stores both for the comparison screen. Any comparison already running in
/// this tab is discarded.
pub async fn submit_survey(
    State(state): State<AppState>,
    TabId(tab_id): TabId,
    Json(parameters): Json<SurveyParameters>,
) -> Result<Json<SurveyAccepted>, ApiError> {
    parameters.validate()?;

    let tab = state.tabs.get(tab_id).await.ok_or(ApiError::IdentityRequired)?;
    let email = session::identity(&tab.lock().await.store).ok_or(ApiError::IdentityRequired)?;

    let request = SurveyRequest { email, parameters };
    let recommendations = state.provider.fetch_recommendations(&request).await?;

    let mut tab = tab.lock().await;
    session::store_survey(&mut tab.store, &request, &recommendations)?;
    tab.reset_comparison();

    info!(
        tab_id = %tab_id,
        algorithms = recommendations.len(),
        "Survey accepted, comparison ready"
    );

    Ok(Json(SurveyAccepted {
        algorithms: recommendations.len(),
        redirect: "/compare",
    }))
}

/// GET /api/previous-sessions
///
/// Sessions stored upstream, filtered by this tab's email when known.
pub async fn previous_sessions(
    State(state): State<AppState>,
    TabId(tab_id): TabId,
) -> Result<Json<Vec<PreviousSessionView>>, ApiError> {
    let email = match state.tabs.get(tab_id).await {
        Some(tab) => session::identity(&tab.lock().await.store),
        None => None,
    };

    let sessions = state.history.previous_sessions(email.as_deref()).await?;

    Ok(Json(sessions.into_iter().map(PreviousSessionView::from).collect()))
}
