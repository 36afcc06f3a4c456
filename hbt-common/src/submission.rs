//! Submission wire types
//!
//! Body of `POST /api/blind-test/submit`.

use crate::recommendation::ProductId;
use crate::survey::SurveyParameters;
use serde::{Deserialize, Serialize};

/// Outcome for one product shown in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRecord {
    /// Algorithm label that recommended the product
    pub algorithm: String,
    pub product_id: ProductId,
    /// 1-based round number
    pub recommended_order: u32,
    pub is_selected: bool,
    /// Round was flagged "all bad"
    pub bad_recommendation: bool,
}

/// Full result of a blind comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub email: String,
    pub session_parameters: SurveyParameters,
    pub selections: Vec<SelectionRecord>,
}
