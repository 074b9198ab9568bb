//! Verification of a caller-supplied URI against resolved candidates.
//!
//! DOI records often carry several spellings of the same address, so
//! comparison is done on normalized URIs:
//!
//! - `http` and `https` are treated as the same scheme
//! - scheme and host are lower-cased
//! - default ports (80, 443) are dropped
//! - a single trailing slash on the path is removed

use reqwest::Url;

use crate::manuscript::{Manuscript, ManuscriptSet};

/// Outcome of verifying a caller URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// Exactly one candidate location matches the caller URI.
    Matched(Manuscript),
    /// No candidate matches.
    Mismatched,
    /// Two or more different locations normalize to the caller URI.
    Ambiguous,
    /// The caller supplied no URI; the provider's first candidate is used.
    NoCandidateUri(Manuscript),
}

impl MatchResult {
    /// The manuscript to download, if verification allows one.
    pub fn selected(&self) -> Option<&Manuscript> {
        match self {
            Self::Matched(m) | Self::NoCandidateUri(m) => Some(m),
            Self::Mismatched | Self::Ambiguous => None,
        }
    }
}

/// Verify `candidate_uri` against the resolved manuscripts.
pub fn verify(candidate_uri: Option<&str>, manuscripts: &ManuscriptSet) -> MatchResult {
    let candidate_uri = candidate_uri.map(str::trim).filter(|u| !u.is_empty());

    let Some(candidate_uri) = candidate_uri else {
        return match manuscripts.first() {
            Some(first) => MatchResult::NoCandidateUri(first.clone()),
            None => MatchResult::Mismatched,
        };
    };

    let wanted = normalize_uri(candidate_uri);
    let matches: Vec<&Manuscript> = manuscripts
        .distinct()
        .into_iter()
        .filter(|m| normalize_uri(m.location()) == wanted)
        .collect();

    match matches.as_slice() {
        [] => MatchResult::Mismatched,
        [only] => MatchResult::Matched((*only).clone()),
        _ => MatchResult::Ambiguous,
    }
}

/// Normalize a URI for comparison.
///
/// Unparseable input falls back to its trimmed text with the scheme
/// lower-cased.
pub fn normalize_uri(uri: &str) -> String {
    let uri = uri.trim();
    let Ok(url) = Url::parse(uri) else {
        return match uri.split_once("://") {
            Some((scheme, rest)) => format!("{}://{}", scheme.to_ascii_lowercase(), rest),
            None => uri.to_string(),
        };
    };

    // Url::parse already lower-cases scheme and host.
    let scheme = match url.scheme() {
        "http" | "https" => "web",
        other => other,
    };

    let host = url.host_str().unwrap_or_default();
    // port() is None when the port is the default for the URL's own scheme.
    let port = match url.port() {
        None => String::new(),
        Some(80) | Some(443) if scheme == "web" => String::new(),
        Some(port) => format!(":{}", port),
    };

    let path = url.path();
    let path = path.strip_suffix('/').unwrap_or(path);

    let mut normalized = format!("{}://{}{}{}", scheme, host, port, path);
    if let Some(query) = url.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        normalized.push('#');
        normalized.push_str(fragment);
    }
    normalized
}
