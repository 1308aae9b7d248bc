//! # Content identifier extraction.
//!
//! Callers submit free-form input (typically a full URL); the orchestrator
//! only cares about the embedded numeric content identifier. [`ContentId`]
//! is a validated newtype that can only be constructed by extraction, so a
//! job record never carries an unnormalized identifier.
//!
//! Extraction scans for the **first** run of 8-12 decimal digits. Inputs
//! without such a run are rejected before any job is created.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SubmitError;

fn content_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{8,12}").expect("content id pattern is valid"))
}

/// Normalized external content identifier (8-12 decimal digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(String);

impl ContentId {
    /// Extracts the first 8-12 digit run from raw caller input.
    ///
    /// # Example
    /// ```
    /// use fetchvisor::ContentId;
    ///
    /// let id = ContentId::extract("https://example.com/watch?id=2234989491").unwrap();
    /// assert_eq!(id.as_str(), "2234989491");
    ///
    /// assert!(ContentId::extract("no digits here").is_err());
    /// ```
    pub fn extract(input: &str) -> Result<Self, SubmitError> {
        content_id_pattern()
            .find(input)
            .map(|m| Self(m.as_str().to_string()))
            .ok_or(SubmitError::InvalidIdentifier)
    }

    /// Returns the normalized identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
