//! Identity token
//!
//! The email address a user enters before the survey. It is an
//! unauthenticated correlation key: it tags stored results and looks up
//! previous sessions, nothing more.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"));

/// Validated email address
///
/// Accepts `local@domain.tld` shaped strings: no whitespace, exactly one `@`,
/// and a dot in the domain with at least one character on each side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and validate an email address
    pub fn parse(value: &str) -> Result<Self> {
        if EMAIL_PATTERN.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::InvalidInput(
                "Lütfen geçerli bir email adresi girin".to_string(),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}
