//! Manifest documents describing the manuscripts resolved for a request.
//!
//! A manifest is assembled append-only through [`ManifestBuilder`] and is
//! immutable once built. Its JSON form is:
//!
//! ```json
//! {
//!   "storedUri": "https://pass.example.org/fcrepo/rest/files/ab/cd",
//!   "manuscripts": [
//!     {"location": "...", "repoInstitution": "...", "type": "application/pdf",
//!      "source": "Unpaywall", "name": "file.pdf"}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::manuscript::{Manuscript, ManuscriptSet};

/// Ordered manuscript records plus the stored URI once known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stored_uri: Option<String>,
    #[serde(default)]
    manuscripts: Vec<Manuscript>,
}

impl Manifest {
    /// A manifest with no records.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn stored_uri(&self) -> Option<&str> {
        self.stored_uri.as_deref()
    }

    pub fn manuscripts(&self) -> &[Manuscript] {
        &self.manuscripts
    }

    pub fn is_empty(&self) -> bool {
        self.manuscripts.is_empty() && self.stored_uri.is_none()
    }

    /// Parse a manifest from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Render the manifest as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Append-only builder for [`Manifest`].
#[derive(Debug, Clone, Default)]
pub struct ManifestBuilder {
    manuscripts: Vec<Manuscript>,
    stored_uri: Option<String>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record.
    pub fn push(mut self, manuscript: Manuscript) -> Self {
        self.manuscripts.push(manuscript);
        self
    }

    /// Append every record of a set, in order.
    pub fn with_manuscripts(mut self, manuscripts: &ManuscriptSet) -> Self {
        self.manuscripts.extend(manuscripts.iter().cloned());
        self
    }

    /// Set the stored URI of the ingested binary.
    pub fn with_stored_uri(mut self, stored_uri: impl Into<String>) -> Self {
        self.stored_uri = Some(stored_uri.into());
        self
    }

    pub fn build(self) -> Manifest {
        Manifest {
            stored_uri: self.stored_uri,
            manuscripts: self.manuscripts,
        }
    }
}

/// Build a manifest from a set of manuscripts.
///
/// An empty set yields an empty manifest.
pub fn build_manifest(manuscripts: &ManuscriptSet) -> Manifest {
    ManifestBuilder::new().with_manuscripts(manuscripts).build()
}
