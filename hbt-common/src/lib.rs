//! # Hediyele Blind Test Common Library
//!
//! Shared code for the blind-test service including:
//! - Survey parameter types and validation
//! - Recommendation and submission wire types
//! - Tab-scoped session storage port
//! - Identity (email) validation
//! - Configuration loading

pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod recommendation;
pub mod session;
pub mod submission;
pub mod survey;

pub use error::{Error, Result};
pub use identity::EmailAddress;
pub use recommendation::{Product, RecommendationSet, ROUND_COUNT};
pub use session::{MemorySessionStore, SessionStore};
pub use survey::SurveyParameters;
