//! HTTP API handlers for hbt-ui

pub mod compare;
pub mod error;
pub mod health;
pub mod identity;
pub mod survey;
pub mod tab;
pub mod ui;

pub use compare::{advance, get_round, mark_bad, retreat, select, submit};
pub use error::ApiError;
pub use health::health_routes;
pub use identity::{get_identity, logout, set_identity};
pub use survey::{previous_sessions, random_survey, submit_survey, survey_options};
pub use tab::{open_tab, TabId, TAB_ID_HEADER};
pub use ui::{serve_app_js, serve_index};
