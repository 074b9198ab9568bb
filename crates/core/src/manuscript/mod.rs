//! Manuscript data model.

mod types;

pub use types::{Manuscript, ManuscriptSet, PDF_MIME_TYPE};

use thiserror::Error;

/// Errors raised when a manuscript record is incomplete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManuscriptError {
    /// A required field was empty.
    #[error("manuscript field '{0}' is required")]
    MissingField(&'static str),
}
