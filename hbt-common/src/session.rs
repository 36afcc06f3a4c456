//! Tab-scoped session storage
//!
//! A string key-value store living as long as one browser tab. The survey
//! screen writes to it, the comparison screen reads from it, and a successful
//! submission clears everything but the identity token.
//!
//! Values are JSON documents; a value that fails to parse is treated as
//! absent so a stale or hand-edited entry sends the user back to the survey
//! instead of failing the request.

use crate::recommendation::RecommendationSet;
use crate::survey::SurveyRequest;
use crate::Result;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Identity token (bare email string)
pub const USER_EMAIL_KEY: &str = "user_email";
/// Survey parameters plus email (JSON `SurveyRequest`)
pub const USER_PARAMS_KEY: &str = "user_params";
/// Fetched recommendations (JSON `RecommendationSet`)
pub const RECOMMENDATIONS_KEY: &str = "recommendations";

/// Storage port for tab-scoped session values
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
    fn clear(&mut self);
}

/// In-memory session store
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    values: HashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

fn load_json<T: DeserializeOwned>(store: &dyn SessionStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Ignoring unparseable session value");
            None
        }
    }
}

/// Identity token, if the email gate has been passed
pub fn identity(store: &dyn SessionStore) -> Option<String> {
    store.get(USER_EMAIL_KEY).filter(|email| !email.is_empty())
}

pub fn set_identity(store: &mut dyn SessionStore, email: &str) {
    store.set(USER_EMAIL_KEY, email.to_string());
}

/// Persist a completed survey and its recommendations for the comparison screen
pub fn store_survey(
    store: &mut dyn SessionStore,
    survey: &SurveyRequest,
    recommendations: &RecommendationSet,
) -> Result<()> {
    let recommendations_json = serde_json::to_string(recommendations)?;
    let survey_json = serde_json::to_string(survey)?;
    store.set(RECOMMENDATIONS_KEY, recommendations_json);
    store.set(USER_PARAMS_KEY, survey_json);
    debug!(algorithms = recommendations.len(), "Stored survey and recommendations");
    Ok(())
}

pub fn load_survey(store: &dyn SessionStore) -> Option<SurveyRequest> {
    load_json(store, USER_PARAMS_KEY)
}

pub fn load_recommendations(store: &dyn SessionStore) -> Option<RecommendationSet> {
    load_json(store, RECOMMENDATIONS_KEY)
}

/// Drop survey-scoped state, keeping only the identity token
pub fn clear_survey_scope(store: &mut dyn SessionStore) {
    let email = store.get(USER_EMAIL_KEY);
    store.clear();
    if let Some(email) = email {
        store.set(USER_EMAIL_KEY, email);
    }
}

/// Forget everything, identity included
pub fn logout(store: &mut dyn SessionStore) {
    store.remove(USER_EMAIL_KEY);
    store.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendation::Product;
    use crate::survey::{AgeBracket, Gender, Occasion, SurveyParameters};

    fn survey() -> SurveyRequest {
        SurveyRequest {
            email: "a@b.co".to_string(),
            parameters: SurveyParameters {
                gender: Gender::Female,
                age_bracket: AgeBracket::Adult,
                occasion: Occasion::Anniversary,
                interests: Default::default(),
                min_budget: 0.0,
                max_budget: 100.0,
            },
        }
    }

    fn recommendations() -> RecommendationSet {
        let mut set = RecommendationSet::new();
        set.insert(
            "algorithm_1",
            vec![Product {
                product_id: 1,
                product_name: "Scarf".to_string(),
                price: 80.0,
                score: 0.5,
            }],
        );
        set
    }

    #[test]
    fn test_store_and_load_survey() {
        let mut store = MemorySessionStore::new();
        store_survey(&mut store, &survey(), &recommendations()).unwrap();

        assert_eq!(load_survey(&store), Some(survey()));
        assert_eq!(load_recommendations(&store), Some(recommendations()));
    }

    #[test]
    fn test_missing_and_corrupt_values_are_absent() {
        let mut store = MemorySessionStore::new();
        assert!(load_survey(&store).is_none());

        store.set(RECOMMENDATIONS_KEY, "{not json".to_string());
        assert!(load_recommendations(&store).is_none());
    }

    #[test]
    fn test_clear_survey_scope_keeps_identity() {
        let mut store = MemorySessionStore::new();
        set_identity(&mut store, "a@b.co");
        store_survey(&mut store, &survey(), &recommendations()).unwrap();

        clear_survey_scope(&mut store);

        assert_eq!(identity(&store).as_deref(), Some("a@b.co"));
        assert!(load_survey(&store).is_none());
        assert!(load_recommendations(&store).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_survey_scope_without_identity() {
        let mut store = MemorySessionStore::new();
        store_survey(&mut store, &survey(), &recommendations()).unwrap();

        clear_survey_scope(&mut store);

        assert!(store.is_empty());
    }

    #[test]
    fn test_logout_clears_everything() {
        let mut store = MemorySessionStore::new();
        set_identity(&mut store, "a@b.co");
        store_survey(&mut store, &survey(), &recommendations()).unwrap();

        logout(&mut store);

        assert!(identity(&store).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_identity_is_absent() {
        let mut store = MemorySessionStore::new();
        set_identity(&mut store, "");
        assert!(identity(&store).is_none());
    }
}
