//! Previous blind-test sessions
//!
//! The storage API keeps every submitted survey; the survey screen lists them
//! so a user can rerun one with the same parameters.

use crate::survey::{AgeBracket, Gender, Interest, Occasion, SurveyParameters};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Survey parameters as stored upstream
///
/// Older records use `age` / `special` and may lack a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredParameters {
    pub gender: Gender,
    #[serde(alias = "age")]
    pub age_bracket: AgeBracket,
    #[serde(alias = "special")]
    pub occasion: Occasion,
    #[serde(default)]
    pub interests: BTreeSet<Interest>,
    #[serde(default)]
    pub min_budget: Option<f64>,
    #[serde(default)]
    pub max_budget: Option<f64>,
}

impl StoredParameters {
    /// Survey to pre-fill; returns None when the stored record has no budget
    pub fn to_survey(&self) -> Option<SurveyParameters> {
        Some(SurveyParameters {
            gender: self.gender,
            age_bracket: self.age_bracket,
            occasion: self.occasion,
            interests: self.interests.clone(),
            min_budget: self.min_budget?,
            max_budget: self.max_budget?,
        })
    }

    /// One-line summary, e.g. `Erkek • 19-29 • birthday`
    pub fn summary(&self) -> String {
        format!(
            "{} • {} • {}",
            self.gender.label(),
            self.age_bracket.label(),
            self.occasion.label()
        )
    }
}

/// Previously submitted session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousSession {
    pub session_id: i64,
    pub parameters: StoredParameters,
    pub created_at: String,
}

impl PreviousSession {
    /// Creation time in UTC
    ///
    /// Accepts RFC 3339 as well as naive ISO timestamps (treated as UTC).
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(ts.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&self.created_at, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}
