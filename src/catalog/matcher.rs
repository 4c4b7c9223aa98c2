//! Confidence-scored matching of catalog candidates against a query.
//!
//! The external catalog has no stable foreign key linking it to the download
//! side, so verification relies on additive fuzzy scoring: identifiers are
//! worth the most, then title, then author, then library path. Thresholds
//! classify the best score into a verification status.

use super::models::{CatalogCandidate, MatchQuery, MatchScore, VerificationStatus};

/// Score awarded for an exact ASIN or ISBN match.
const IDENTIFIER_SCORE: u32 = 200;
/// Exact normalized title match.
const TITLE_EXACT_SCORE: u32 = 100;
/// Case-insensitive substring title match, either direction.
const TITLE_PARTIAL_SCORE: u32 = 50;
/// Exact normalized author match.
const AUTHOR_EXACT_SCORE: u32 = 50;
/// Substring author match, either direction.
const AUTHOR_PARTIAL_SCORE: u32 = 25;
/// Default credit when the query supplied no author at all.
const AUTHOR_MISSING_SCORE: u32 = 10;
/// Candidate's library path is consistent with the destination.
const PATH_SCORE: u32 = 25;

/// Score at or above which a match is `verified`.
pub const VERIFIED_THRESHOLD: u32 = 100;
/// Score at or above which (but below verified) a match is a `mismatch`.
pub const MISMATCH_THRESHOLD: u32 = 50;

/// Scores catalog candidates against an import query.
#[derive(Debug, Clone, Default)]
pub struct CatalogMatcher {
    /// Library root used for the path bonus, when configured.
    library_root: Option<String>,
}

impl CatalogMatcher {
    pub fn new(library_root: Option<String>) -> Self {
        Self { library_root }
    }

    /// Score all candidates and return the best one, or `None` when no
    /// candidate scores above zero.
    pub fn score(&self, query: &MatchQuery, candidates: &[CatalogCandidate]) -> Option<MatchScore> {
        candidates
            .iter()
            .map(|candidate| self.score_candidate(query, candidate))
            .filter(|m| m.score > 0)
            .max_by_key(|m| m.score)
    }

    /// Classify a score (or the absence of one) into a terminal status.
    pub fn classify(score: Option<u32>) -> VerificationStatus {
        match score {
            Some(s) if s >= VERIFIED_THRESHOLD => VerificationStatus::Verified,
            Some(s) if s >= MISMATCH_THRESHOLD => VerificationStatus::Mismatch,
            _ => VerificationStatus::NotFound,
        }
    }

    fn score_candidate(&self, query: &MatchQuery, candidate: &CatalogCandidate) -> MatchScore {
        let mut score = 0u32;
        let mut reasons = Vec::new();

        // Only one identifier bonus applies; ASIN takes priority.
        if let Some(points) = identifier_score(query, candidate) {
            score += points.0;
            reasons.push(points.1);
        }

        let (title_points, title_reason) = title_score(&query.title, &candidate.title);
        if title_points > 0 {
            score += title_points;
            reasons.push(title_reason);
        }

        let (author_points, author_reason) =
            author_score(query.author.as_deref(), candidate.author.as_deref());
        if author_points > 0 {
            score += author_points;
            reasons.push(author_reason);
        }

        if let Some(points) = self.path_score(query, candidate) {
            score += points.0;
            reasons.push(points.1);
        }

        MatchScore {
            score,
            reasons,
            candidate: candidate.clone(),
        }
    }

    fn path_score(
        &self,
        query: &MatchQuery,
        candidate: &CatalogCandidate,
    ) -> Option<(u32, String)> {
        let destination = query.destination_path.as_deref()?;
        let library_path = candidate.library_path.as_deref()?;

        let root_match = self
            .library_root
            .as_deref()
            .is_some_and(|root| !root.is_empty() && library_path.contains(root));
        let subpath_match = relative_subpath(destination, self.library_root.as_deref())
            .is_some_and(|sub| library_path.contains(&sub));

        if root_match || subpath_match {
            Some((PATH_SCORE, format!("path_match:+{}", PATH_SCORE)))
        } else {
            None
        }
    }
}

fn identifier_score(query: &MatchQuery, candidate: &CatalogCandidate) -> Option<(u32, String)> {
    if let (Some(q), Some(c)) = (query.asin.as_deref(), candidate.asin.as_deref()) {
        if !q.is_empty() && q.eq_ignore_ascii_case(c) {
            return Some((IDENTIFIER_SCORE, format!("asin_match:+{}", IDENTIFIER_SCORE)));
        }
    }
    if let (Some(q), Some(c)) = (query.isbn.as_deref(), candidate.isbn.as_deref()) {
        if !q.is_empty() && q.eq_ignore_ascii_case(c) {
            return Some((IDENTIFIER_SCORE, format!("isbn_match:+{}", IDENTIFIER_SCORE)));
        }
    }
    None
}

fn title_score(query_title: &str, candidate_title: &str) -> (u32, String) {
    let q = normalize(query_title);
    let c = normalize(candidate_title);
    if q.is_empty() || c.is_empty() {
        return (0, String::new());
    }
    if q == c {
        return (TITLE_EXACT_SCORE, format!("title_exact:+{}", TITLE_EXACT_SCORE));
    }
    if q.contains(&c) || c.contains(&q) {
        return (
            TITLE_PARTIAL_SCORE,
            format!("title_partial:+{}", TITLE_PARTIAL_SCORE),
        );
    }
    (0, String::new())
}

fn author_score(query_author: Option<&str>, candidate_author: Option<&str>) -> (u32, String) {
    let Some(query_author) = query_author.filter(|a| !a.trim().is_empty()) else {
        // The query carried no author metadata at all; do not penalize.
        return (
            AUTHOR_MISSING_SCORE,
            format!("author_missing:+{}", AUTHOR_MISSING_SCORE),
        );
    };
    let Some(candidate_author) = candidate_author else {
        return (0, String::new());
    };

    let q = normalize(query_author);
    let c = normalize(candidate_author);
    if q.is_empty() || c.is_empty() {
        return (0, String::new());
    }
    if q == c {
        return (
            AUTHOR_EXACT_SCORE,
            format!("author_exact:+{}", AUTHOR_EXACT_SCORE),
        );
    }
    if q.contains(&c) || c.contains(&q) {
        return (
            AUTHOR_PARTIAL_SCORE,
            format!("author_partial:+{}", AUTHOR_PARTIAL_SCORE),
        );
    }
    (0, String::new())
}

/// Lowercase, trim, and strip surrounding punctuation.
fn normalize(s: &str) -> String {
    s.trim()
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_lowercase()
}

/// Destination path relative to the library root, when it is under it.
fn relative_subpath(destination: &str, library_root: Option<&str>) -> Option<String> {
    let root = library_root?;
    if root.is_empty() {
        return None;
    }
    let rest = destination.strip_prefix(root)?;
    let rest = rest.trim_start_matches('/');
    (!rest.is_empty()).then(|| rest.to_string())
}
