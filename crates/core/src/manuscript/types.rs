//! Manuscript records and ordered candidate sets.

use serde::{Deserialize, Serialize};

use super::ManuscriptError;

/// MIME type reported for PDF manuscripts.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A candidate or resolved manuscript.
///
/// Fields are private and only set through [`Manuscript::new`], so a record
/// cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawManuscript")]
pub struct Manuscript {
    location: String,
    #[serde(rename = "repoInstitution")]
    repo_institution: String,
    #[serde(rename = "type")]
    mime_type: String,
    source: String,
    name: String,
}

impl Manuscript {
    /// Build a manuscript record.
    ///
    /// `location`, `mime_type` and `source` must be non-empty.
    /// `repo_institution` and `name` may be empty when the provider omits them.
    pub fn new(
        location: impl Into<String>,
        repo_institution: impl Into<String>,
        mime_type: impl Into<String>,
        source: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ManuscriptError> {
        let location = location.into().trim().to_string();
        let mime_type = mime_type.into().trim().to_string();
        let source = source.into().trim().to_string();

        if location.is_empty() {
            return Err(ManuscriptError::MissingField("location"));
        }
        if mime_type.is_empty() {
            return Err(ManuscriptError::MissingField("type"));
        }
        if source.is_empty() {
            return Err(ManuscriptError::MissingField("source"));
        }

        Ok(Self {
            location,
            repo_institution: repo_institution.into(),
            mime_type,
            source,
            name: name.into(),
        })
    }

    /// URI the manuscript can be fetched from.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Human-readable label of the hosting repository.
    pub fn repo_institution(&self) -> &str {
        &self.repo_institution
    }

    /// MIME type of the file.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Lookup provider that reported this candidate.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Suggested file name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Deserialize)]
struct RawManuscript {
    location: String,
    #[serde(rename = "repoInstitution", default)]
    repo_institution: String,
    #[serde(rename = "type")]
    mime_type: String,
    source: String,
    #[serde(default)]
    name: String,
}

impl TryFrom<RawManuscript> for Manuscript {
    type Error = ManuscriptError;

    fn try_from(raw: RawManuscript) -> Result<Self, Self::Error> {
        Manuscript::new(
            raw.location,
            raw.repo_institution,
            raw.mime_type,
            raw.source,
            raw.name,
        )
    }
}

/// Ordered candidates for one DOI, in the provider's order of preference.
///
/// Duplicates are allowed; the first entry is the default candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManuscriptSet(Vec<Manuscript>);

impl ManuscriptSet {
    pub fn new(manuscripts: Vec<Manuscript>) -> Self {
        Self(manuscripts)
    }

    /// The provider's preferred candidate.
    pub fn first(&self) -> Option<&Manuscript> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Manuscript> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Manuscript] {
        &self.0
    }

    /// One record per exact location string, keeping the first occurrence.
    ///
    /// Providers list the same URL under several hosts; the earlier entry is
    /// the preferred one.
    pub fn distinct(&self) -> Vec<&Manuscript> {
        let mut seen: Vec<&Manuscript> = Vec::with_capacity(self.0.len());
        for manuscript in &self.0 {
            if !seen.iter().any(|m| m.location() == manuscript.location()) {
                seen.push(manuscript);
            }
        }
        seen
    }
}

impl From<Vec<Manuscript>> for ManuscriptSet {
    fn from(manuscripts: Vec<Manuscript>) -> Self {
        Self(manuscripts)
    }
}

impl<'a> IntoIterator for &'a ManuscriptSet {
    type Item = &'a Manuscript;
    type IntoIter = std::slice::Iter<'a, Manuscript>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Manuscript> for ManuscriptSet {
    fn from_iter<I: IntoIterator<Item = Manuscript>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
