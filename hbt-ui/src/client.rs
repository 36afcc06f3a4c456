//! Blind-test API client
//!
//! The recommendation/storage API does all the real work: it generates the
//! recommendations, stores submitted comparisons and lists previous
//! sessions. This module is a thin pass-through to it.
//!
//! Each call is a single request/response exchange with no retry, backoff or
//! timeout. Failures go straight back to the user, who can try again.

use async_trait::async_trait;
use hbt_common::history::PreviousSession;
use hbt_common::submission::SubmissionPayload;
use hbt_common::survey::SurveyRequest;
use hbt_common::RecommendationSet;
use serde::Serialize;
use thiserror::Error;

const USER_AGENT: &str = concat!("hbt-ui/", env!("CARGO_PKG_VERSION"));

const RECOMMENDATIONS_PATH: &str = "/api/blind-test/recommendations";
const SUBMIT_PATH: &str = "/api/blind-test/submit";
const PREVIOUS_SESSIONS_PATH: &str = "/api/blind-test/previous-sessions";

/// Blind-test API client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request could not be sent or the connection failed
    #[error("Network error: {0}")]
    Network(String),

    /// API answered with a non-success status
    #[error("API error {0}: {1}")]
    Status(u16, String),

    /// Response body was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of recommendations for a completed survey
#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    async fn fetch_recommendations(
        &self,
        request: &SurveyRequest,
    ) -> Result<RecommendationSet, ClientError>;
}

/// Destination of finished comparisons
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), ClientError>;
}

/// Lookup of previously submitted sessions
#[async_trait]
pub trait SessionHistory: Send + Sync {
    async fn previous_sessions(
        &self,
        email: Option<&str>,
    ) -> Result<Vec<PreviousSession>, ClientError>;
}

/// HTTP client for the blind-test API
pub struct BlindTestClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl BlindTestClient {
    /// Create a client for the API at `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.url(path);
        tracing::debug!(url = %url, "POST to blind-test API");

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), body = %error_text, "Blind-test API returned error");
    Err(ClientError::Status(status.as_u16(), error_text))
}

#[async_trait]
impl RecommendationProvider for BlindTestClient {
    async fn fetch_recommendations(
        &self,
        request: &SurveyRequest,
    ) -> Result<RecommendationSet, ClientError> {
        let response = self.post_json(RECOMMENDATIONS_PATH, request).await?;

        let recommendations: RecommendationSet = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        tracing::info!(
            algorithms = recommendations.len(),
            occasion = %request.parameters.occasion,
            "Fetched recommendations"
        );

        Ok(recommendations)
    }
}

#[async_trait]
impl SubmissionSink for BlindTestClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), ClientError> {
        self.post_json(SUBMIT_PATH, payload).await?;

        tracing::info!(selections = payload.selections.len(), "Submitted blind-test results");
        Ok(())
    }
}

#[async_trait]
impl SessionHistory for BlindTestClient {
    async fn previous_sessions(
        &self,
        email: Option<&str>,
    ) -> Result<Vec<PreviousSession>, ClientError> {
        let mut request = self.http_client.get(self.url(PREVIOUS_SESSIONS_PATH));
        if let Some(email) = email {
            request = request.query(&[("email", email)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}
