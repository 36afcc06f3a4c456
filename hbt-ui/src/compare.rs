//! Blind comparison state machine
//!
//! Walks a user through [`ROUND_COUNT`] rounds. Each round shows the product
//! every algorithm ranked at that position, without saying which algorithm
//! produced which. The user either picks one product or flags the whole round
//! as bad. Once every round is resolved the outcome is submitted as one
//! [`SelectionRecord`] per (round, algorithm) pair.
//!
//! **Round lifecycle:**
//! ```text
//!            select(id)                 select(id')
//! Unresolved ──────────► Selected(id) ──────────► Selected(id')
//!     │                        │
//!     │ mark_bad()             │ mark_bad()
//!     ▼                        ▼
//! MarkedBad ◄──────────────────┘      (select is rejected; no unmark)
//! ```

use crate::client::{ClientError, SubmissionSink};
use hbt_common::recommendation::ProductId;
use hbt_common::session::{self, SessionStore};
use hbt_common::submission::{SelectionRecord, SubmissionPayload};
use hbt_common::{Product, RecommendationSet, SurveyParameters, ROUND_COUNT};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Index of the final round
pub const LAST_ROUND: usize = ROUND_COUNT - 1;

/// Resolution of one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "product_id", rename_all = "snake_case")]
pub enum RoundState {
    #[default]
    Unresolved,
    Selected(ProductId),
    MarkedBad,
}

impl RoundState {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, RoundState::Unresolved)
    }

    pub fn selected(&self) -> Option<ProductId> {
        match self {
            RoundState::Selected(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_marked_bad(&self) -> bool {
        matches!(self, RoundState::MarkedBad)
    }
}

/// Why a transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("round {round} is marked bad; selection is disabled")]
    RoundMarkedBad { round: usize },

    #[error("round {round} has no selection yet")]
    RoundUnresolved { round: usize },

    #[error("already at the last round")]
    NoNextRound,

    #[error("already at the first round")]
    NoPreviousRound,

    #[error("only {resolved} of {} rounds are resolved", ROUND_COUNT)]
    Incomplete { resolved: usize },
}

/// Comparison errors
#[derive(Debug, Error)]
pub enum CompareError {
    /// Survey or recommendations missing from the session; go back to the survey
    #[error("No survey in progress")]
    MissingPriorState,

    /// Transition not allowed in the current state; nothing changed
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] Rejection),

    /// Submission sink answered with a non-success status
    #[error("Submission failed with status {0}")]
    SubmissionFailure(u16),

    /// Submission never got an answer
    #[error("Submission request failed: {0}")]
    Transport(String),
}

impl From<ClientError> for CompareError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status(code, _) => CompareError::SubmissionFailure(code),
            other => CompareError::Transport(other.to_string()),
        }
    }
}

/// In-progress blind comparison for one browser tab
#[derive(Debug, Clone)]
pub struct ComparisonSession {
    email: String,
    parameters: SurveyParameters,
    recommendations: RecommendationSet,
    current_round: usize,
    rounds: [RoundState; ROUND_COUNT],
}

impl ComparisonSession {
    /// Start a comparison from what the survey screen left in the session
    ///
    /// Fails with [`CompareError::MissingPriorState`] if the survey, the
    /// recommendations or the identity token is absent.
    pub fn load(store: &dyn SessionStore) -> Result<Self, CompareError> {
        let (Some(survey), Some(recommendations)) = (
            session::load_survey(store),
            session::load_recommendations(store),
        ) else {
            debug!("Comparison requested without survey state");
            return Err(CompareError::MissingPriorState);
        };

        let email = session::identity(store)
            .or_else(|| Some(survey.email).filter(|e| !e.is_empty()))
            .ok_or(CompareError::MissingPriorState)?;

        Ok(Self::new(email, survey.parameters, recommendations))
    }

    pub fn new(
        email: impl Into<String>,
        parameters: SurveyParameters,
        recommendations: RecommendationSet,
    ) -> Self {
        Self {
            email: email.into(),
            parameters,
            recommendations,
            current_round: 0,
            rounds: [RoundState::Unresolved; ROUND_COUNT],
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn parameters(&self) -> &SurveyParameters {
        &self.parameters
    }

    pub fn recommendations(&self) -> &RecommendationSet {
        &self.recommendations
    }

    pub fn current_round(&self) -> usize {
        self.current_round
    }

    pub fn round_state(&self, round: usize) -> Option<RoundState> {
        self.rounds.get(round).copied()
    }

    pub fn current_state(&self) -> RoundState {
        self.rounds[self.current_round]
    }

    /// Products shown in the current round, one per algorithm that has one
    pub fn candidates(&self) -> impl Iterator<Item = (&str, &Product)> {
        self.recommendations.candidates(self.current_round)
    }

    pub fn resolved_count(&self) -> usize {
        self.rounds.iter().filter(|r| r.is_resolved()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.resolved_count() == ROUND_COUNT
    }

    pub fn can_advance(&self) -> bool {
        self.current_round < LAST_ROUND && self.current_state().is_resolved()
    }

    pub fn can_retreat(&self) -> bool {
        self.current_round > 0
    }

    /// Pick a product in the current round
    ///
    /// Re-selecting the same product is a no-op; a different product replaces
    /// the earlier pick. Refused once the round is marked bad.
    pub fn select(&mut self, product_id: ProductId) -> Result<(), CompareError> {
        let round = self.current_round;
        if self.rounds[round].is_marked_bad() {
            return Err(Rejection::RoundMarkedBad { round }.into());
        }

        self.rounds[round] = RoundState::Selected(product_id);
        debug!(round, product_id, "Round selection");
        Ok(())
    }

    /// Flag every product in the current round as a bad recommendation
    ///
    /// Drops any selection made in the round.
    pub fn mark_bad(&mut self) {
        let round = self.current_round;
        self.rounds[round] = RoundState::MarkedBad;
        debug!(round, "Round marked bad");
    }

    /// Move to the next round; the current one must be resolved
    pub fn advance(&mut self) -> Result<(), CompareError> {
        if self.current_round >= LAST_ROUND {
            return Err(Rejection::NoNextRound.into());
        }
        if !self.current_state().is_resolved() {
            return Err(Rejection::RoundUnresolved {
                round: self.current_round,
            }
            .into());
        }

        self.current_round += 1;
        Ok(())
    }

    /// Move back one round; round states are kept
    pub fn retreat(&mut self) -> Result<(), CompareError> {
        if self.current_round == 0 {
            return Err(Rejection::NoPreviousRound.into());
        }

        self.current_round -= 1;
        Ok(())
    }

    /// One record per (round, algorithm) pair that has a product
    ///
    /// Requires every round to be resolved. Algorithms with fewer than
    /// [`ROUND_COUNT`] products simply contribute nothing to the rounds they
    /// lack.
    pub fn build_selections(&self) -> Result<Vec<SelectionRecord>, CompareError> {
        let resolved = self.resolved_count();
        if resolved < ROUND_COUNT {
            return Err(Rejection::Incomplete { resolved }.into());
        }

        let mut selections = Vec::new();
        for (round, state) in self.rounds.iter().enumerate() {
            for (algorithm, product) in self.recommendations.candidates(round) {
                selections.push(SelectionRecord {
                    algorithm: algorithm.to_string(),
                    product_id: product.product_id,
                    recommended_order: (round + 1) as u32,
                    is_selected: state.selected() == Some(product.product_id),
                    bad_recommendation: state.is_marked_bad(),
                });
            }
        }

        Ok(selections)
    }

    /// Full submission body
    pub fn submission_payload(&self) -> Result<SubmissionPayload, CompareError> {
        Ok(SubmissionPayload {
            email: self.email.clone(),
            session_parameters: self.parameters.clone(),
            selections: self.build_selections()?,
        })
    }

    /// Send the finished comparison to the sink
    ///
    /// On success the survey-scoped session state is cleared (the identity
    /// token stays) and the caller should move to the done screen. On failure
    /// nothing changes, so the user can submit again.
    pub async fn submit(
        &self,
        sink: &dyn SubmissionSink,
        store: &mut dyn SessionStore,
    ) -> Result<(), CompareError> {
        let payload = self.submission_payload()?;

        if let Err(e) = sink.submit(&payload).await {
            warn!(email = %self.email, error = %e, "Blind-test submission failed");
            return Err(e.into());
        }

        session::clear_survey_scope(store);
        info!(
            email = %self.email,
            records = payload.selections.len(),
            "Blind-test comparison submitted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hbt_common::session::{MemorySessionStore, RECOMMENDATIONS_KEY, USER_EMAIL_KEY};
    use hbt_common::survey::{AgeBracket, Gender, Interest, Occasion, SurveyRequest};
    use std::sync::Mutex;

    fn params() -> SurveyParameters {
        SurveyParameters {
            gender: Gender::Male,
            age_bracket: AgeBracket::YoungAdult,
            occasion: Occasion::Birthday,
            interests: [Interest::Music].into_iter().collect(),
            min_budget: 100.0,
            max_budget: 500.0,
        }
    }

    fn products(ids: impl IntoIterator<Item = ProductId>) -> Vec<Product> {
        ids.into_iter()
            .map(|id| Product {
                product_id: id,
                product_name: format!("Product {}", id),
                price: 100.0 + id as f64,
                score: 0.5,
            })
            .collect()
    }

    fn two_algorithms() -> RecommendationSet {
        let mut set = RecommendationSet::new();
        set.insert("algorithm_1", products(1..=5));
        set.insert("algorithm_2", products(6..=10));
        set
    }

    fn fresh_session() -> ComparisonSession {
        ComparisonSession::new("user@example.com", params(), two_algorithms())
    }

    /// Select 1, bad, 8, 9, 10
    fn run_scenario(session: &mut ComparisonSession) {
        session.select(1).unwrap();
        session.advance().unwrap();
        session.mark_bad();
        session.advance().unwrap();
        session.select(8).unwrap();
        session.advance().unwrap();
        session.select(9).unwrap();
        session.advance().unwrap();
        session.select(10).unwrap();
    }

    #[derive(Default)]
    struct RecordingSink {
        fail_with: Option<u16>,
        received: Mutex<Vec<SubmissionPayload>>,
    }

    #[async_trait]
    impl SubmissionSink for RecordingSink {
        async fn submit(&self, payload: &SubmissionPayload) -> Result<(), ClientError> {
            self.received.lock().unwrap().push(payload.clone());
            match self.fail_with {
                Some(code) => Err(ClientError::Status(code, "boom".to_string())),
                None => Ok(()),
            }
        }
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    #[test]
    fn test_initial_state() {
        let session = fresh_session();
        assert_eq!(session.current_round(), 0);
        for round in 0..ROUND_COUNT {
            assert_eq!(session.round_state(round), Some(RoundState::Unresolved));
        }
        assert_eq!(session.round_state(ROUND_COUNT), None);
        assert_eq!(session.candidates().count(), 2);
    }

    #[test]
    fn test_load_requires_survey_and_recommendations() {
        let mut store = MemorySessionStore::new();
        store.set(USER_EMAIL_KEY, "user@example.com".to_string());
        assert!(matches!(
            ComparisonSession::load(&store),
            Err(CompareError::MissingPriorState)
        ));

        let survey = SurveyRequest {
            email: "user@example.com".to_string(),
            parameters: params(),
        };
        session::store_survey(&mut store, &survey, &two_algorithms()).unwrap();
        store.remove(RECOMMENDATIONS_KEY);
        assert!(matches!(
            ComparisonSession::load(&store),
            Err(CompareError::MissingPriorState)
        ));

        session::store_survey(&mut store, &survey, &two_algorithms()).unwrap();
        let loaded = ComparisonSession::load(&store).unwrap();
        assert_eq!(loaded.email(), "user@example.com");
        assert_eq!(loaded.parameters(), &params());
        assert_eq!(loaded.recommendations().len(), 2);
    }

    #[test]
    fn test_load_falls_back_to_survey_email() {
        let mut store = MemorySessionStore::new();
        let survey = SurveyRequest {
            email: "from-survey@example.com".to_string(),
            parameters: params(),
        };
        session::store_survey(&mut store, &survey, &two_algorithms()).unwrap();

        let loaded = ComparisonSession::load(&store).unwrap();
        assert_eq!(loaded.email(), "from-survey@example.com");
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    #[test]
    fn test_select_is_idempotent_in_every_round() {
        let mut session = fresh_session();
        for round in 0..ROUND_COUNT {
            session.select(42).unwrap();
            session.select(42).unwrap();
            assert_eq!(session.round_state(round), Some(RoundState::Selected(42)));
            if round < LAST_ROUND {
                session.advance().unwrap();
            }
        }
    }

    #[test]
    fn test_select_overwrites_previous_choice() {
        let mut session = fresh_session();
        session.select(1).unwrap();
        session.select(6).unwrap();
        assert_eq!(session.current_state(), RoundState::Selected(6));
    }

    #[test]
    fn test_mark_bad_clears_selection_and_blocks_select() {
        let mut session = fresh_session();
        for round in 0..ROUND_COUNT {
            session.select(1).unwrap();
            session.mark_bad();
            assert_eq!(session.current_state(), RoundState::MarkedBad);

            let err = session.select(6).unwrap_err();
            assert!(matches!(
                err,
                CompareError::InvalidTransition(Rejection::RoundMarkedBad { round: r }) if r == round
            ));
            assert_eq!(session.current_state(), RoundState::MarkedBad);

            if round < LAST_ROUND {
                session.advance().unwrap();
            }
        }
    }

    #[test]
    fn test_advance_rejected_only_when_unresolved() {
        let mut session = fresh_session();
        for round in 0..LAST_ROUND {
            assert!(!session.can_advance());
            assert!(matches!(
                session.advance(),
                Err(CompareError::InvalidTransition(Rejection::RoundUnresolved { .. }))
            ));
            assert_eq!(session.current_round(), round);

            session.select(1).unwrap();
            assert!(session.can_advance());
            session.advance().unwrap();
            assert_eq!(session.current_round(), round + 1);
        }
    }

    #[test]
    fn test_advance_always_rejected_at_last_round() {
        let mut session = fresh_session();
        run_scenario(&mut session);
        assert_eq!(session.current_round(), LAST_ROUND);
        assert!(session.current_state().is_resolved());

        assert!(!session.can_advance());
        assert!(matches!(
            session.advance(),
            Err(CompareError::InvalidTransition(Rejection::NoNextRound))
        ));
        assert_eq!(session.current_round(), LAST_ROUND);
    }

    #[test]
    fn test_retreat() {
        let mut session = fresh_session();
        assert!(!session.can_retreat());
        assert!(matches!(
            session.retreat(),
            Err(CompareError::InvalidTransition(Rejection::NoPreviousRound))
        ));

        run_scenario(&mut session);
        let before: Vec<_> = (0..ROUND_COUNT).map(|r| session.round_state(r)).collect();

        for expected in (0..LAST_ROUND).rev() {
            session.retreat().unwrap();
            assert_eq!(session.current_round(), expected);
        }

        let after: Vec<_> = (0..ROUND_COUNT).map(|r| session.round_state(r)).collect();
        assert_eq!(before, after);
        assert_eq!(session.current_state(), RoundState::Selected(1));
    }

    #[test]
    fn test_revisited_round_can_change_selection() {
        let mut session = fresh_session();
        session.select(1).unwrap();
        session.advance().unwrap();
        session.retreat().unwrap();
        session.select(6).unwrap();
        assert_eq!(session.round_state(0), Some(RoundState::Selected(6)));
    }

    // ------------------------------------------------------------------
    // Submission records
    // ------------------------------------------------------------------

    #[test]
    fn test_build_selections_requires_all_rounds() {
        let mut session = fresh_session();
        session.mark_bad();
        assert!(matches!(
            session.build_selections(),
            Err(CompareError::InvalidTransition(Rejection::Incomplete { resolved: 1 }))
        ));

        session.advance().unwrap();
        session.select(7).unwrap();
        session.advance().unwrap();
        session.select(3).unwrap();
        session.advance().unwrap();
        session.select(4).unwrap();
        assert!(session.build_selections().is_err());

        session.advance().unwrap();
        session.mark_bad();
        assert!(session.is_complete());
        assert_eq!(session.build_selections().unwrap().len(), 10);
    }

    #[test]
    fn test_scenario_two_algorithms() {
        let mut session = fresh_session();
        run_scenario(&mut session);

        let records = session.build_selections().unwrap();
        assert_eq!(records.len(), 10);

        assert_eq!(
            records[0],
            SelectionRecord {
                algorithm: "algorithm_1".to_string(),
                product_id: 1,
                recommended_order: 1,
                is_selected: true,
                bad_recommendation: false,
            }
        );
        assert_eq!(
            records[1],
            SelectionRecord {
                algorithm: "algorithm_2".to_string(),
                product_id: 6,
                recommended_order: 1,
                is_selected: false,
                bad_recommendation: false,
            }
        );

        for record in records.iter().filter(|r| r.recommended_order == 2) {
            assert!(!record.is_selected);
            assert!(record.bad_recommendation);
        }

        let selected: Vec<_> = records
            .iter()
            .filter(|r| r.is_selected)
            .map(|r| (r.recommended_order, r.algorithm.as_str(), r.product_id))
            .collect();
        assert_eq!(
            selected,
            vec![
                (1, "algorithm_1", 1),
                (3, "algorithm_2", 8),
                (4, "algorithm_2", 9),
                (5, "algorithm_2", 10),
            ]
        );
    }

    #[test]
    fn test_short_group_contributes_no_missing_rounds() {
        let mut set = RecommendationSet::new();
        set.insert("algorithm_1", products(1..=5));
        set.insert("algorithm_2", products(6..=8));
        let mut session = ComparisonSession::new("user@example.com", params(), set);

        // Rounds 3 and 4 only offer algorithm_1
        session.select(1).unwrap();
        session.advance().unwrap();
        session.select(7).unwrap();
        session.advance().unwrap();
        session.mark_bad();
        session.advance().unwrap();
        assert_eq!(session.candidates().count(), 1);
        assert!(session.build_selections().is_err());
        session.select(4).unwrap();
        session.advance().unwrap();
        session.select(5).unwrap();

        let records = session.build_selections().unwrap();
        assert_eq!(records.len(), 2 * 3 + 2);
        assert!(!records
            .iter()
            .any(|r| r.algorithm == "algorithm_2" && r.recommended_order > 3));
    }

    #[test]
    fn test_record_count_and_single_selection_per_round() {
        let mut set = RecommendationSet::new();
        set.insert("a", products(1..=5));
        set.insert("b", products(11..=12));
        set.insert("c", products(21..=26));
        let mut session = ComparisonSession::new("user@example.com", params(), set.clone());

        for round in 0..ROUND_COUNT {
            if round % 2 == 0 {
                let (_, product) = session.candidates().last().unwrap();
                let id = product.product_id;
                session.select(id).unwrap();
            } else {
                session.mark_bad();
            }
            if round < LAST_ROUND {
                session.advance().unwrap();
            }
        }

        let records = session.build_selections().unwrap();
        let expected: usize = (0..ROUND_COUNT).map(|r| set.candidates(r).count()).sum();
        assert_eq!(records.len(), expected);

        for round in 0..ROUND_COUNT {
            let order = (round + 1) as u32;
            let selected = records
                .iter()
                .filter(|r| r.recommended_order == order && r.is_selected)
                .count();
            let state = session.round_state(round).unwrap();
            match state {
                RoundState::Selected(_) => assert_eq!(selected, 1),
                _ => assert_eq!(selected, 0),
            }
        }
    }

    #[test]
    fn test_round_state_serialization() {
        assert_eq!(
            serde_json::to_value(RoundState::Selected(3)).unwrap(),
            serde_json::json!({"state": "selected", "product_id": 3})
        );
        assert_eq!(
            serde_json::to_value(RoundState::MarkedBad).unwrap(),
            serde_json::json!({"state": "marked_bad"})
        );
    }

    // ------------------------------------------------------------------
    // Submit
    // ------------------------------------------------------------------

    fn loaded_store() -> MemorySessionStore {
        let mut store = MemorySessionStore::new();
        session::set_identity(&mut store, "user@example.com");
        let survey = SurveyRequest {
            email: "user@example.com".to_string(),
            parameters: params(),
        };
        session::store_survey(&mut store, &survey, &two_algorithms()).unwrap();
        store
    }

    #[tokio::test]
    async fn test_submit_success_clears_survey_scope() {
        let mut store = loaded_store();
        let mut session = ComparisonSession::load(&store).unwrap();
        run_scenario(&mut session);
        let sink = RecordingSink::default();

        session.submit(&sink, &mut store).await.unwrap();

        let received = sink.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].email, "user@example.com");
        assert_eq!(received[0].session_parameters, params());
        assert_eq!(received[0].selections.len(), 10);

        assert_eq!(session::identity(&store).as_deref(), Some("user@example.com"));
        assert!(session::load_survey(&store).is_none());
        assert!(session::load_recommendations(&store).is_none());
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_state() {
        let mut store = loaded_store();
        let mut session = ComparisonSession::load(&store).unwrap();
        run_scenario(&mut session);
        let sink = RecordingSink {
            fail_with: Some(500),
            ..Default::default()
        };

        let err = session.submit(&sink, &mut store).await.unwrap_err();
        assert!(matches!(err, CompareError::SubmissionFailure(500)));

        assert!(session::load_survey(&store).is_some());
        assert!(session::load_recommendations(&store).is_some());
        assert!(session.is_complete());
        assert_eq!(session.current_round(), LAST_ROUND);
    }

    #[tokio::test]
    async fn test_submit_incomplete_never_reaches_sink() {
        let mut store = loaded_store();
        let mut session = ComparisonSession::load(&store).unwrap();
        session.mark_bad();
        let sink = RecordingSink::default();

        let err = session.submit(&sink, &mut store).await.unwrap_err();
        assert!(matches!(err, CompareError::InvalidTransition(Rejection::Incomplete { .. })));
        assert!(sink.received.lock().unwrap().is_empty());
        assert!(session::load_survey(&store).is_some());
    }

    #[test]
    fn test_client_error_mapping() {
        assert!(matches!(
            CompareError::from(ClientError::Status(503, String::new())),
            CompareError::SubmissionFailure(503)
        ));
        assert!(matches!(
            CompareError::from(ClientError::Network("refused".to_string())),
            CompareError::Transport(_)
        ));
    }
}
