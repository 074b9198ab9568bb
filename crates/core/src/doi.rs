//! DOI syntax validation.
//!
//! A DOI has the shape `10.<registrant>/<suffix>`. Input is accepted with
//! the usual resolver prefixes (`doi:`, `https://doi.org/`, ...) which are
//! stripped before validation.

use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static DOI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^10\.[0-9]+(\.[0-9]+)*/\S+$").expect("valid DOI regex"));

const RESOLVER_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

/// Errors produced when parsing a DOI.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DoiError {
    /// No DOI was supplied.
    #[error("DOI is empty")]
    Empty,

    /// The string does not follow `10.<registrant>/<suffix>`.
    #[error("malformed DOI: {0}")]
    Malformed(String),
}

/// A syntactically valid DOI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Doi(String);

impl Doi {
    /// Parse and validate a DOI, stripping resolver prefixes.
    pub fn parse(input: &str) -> Result<Self, DoiError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DoiError::Empty);
        }

        let mut bare = trimmed;
        for prefix in RESOLVER_PREFIXES {
            let matches = bare
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
            if matches {
                bare = bare[prefix.len()..].trim_start();
                break;
            }
        }

        if !DOI_PATTERN.is_match(bare) {
            return Err(DoiError::Malformed(trimmed.to_string()));
        }

        Ok(Self(bare.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive identity of this DOI.
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Doi {
    type Error = DoiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Doi::parse(&value)
    }
}

impl From<Doi> for String {
    fn from(doi: Doi) -> Self {
        doi.0
    }
}
