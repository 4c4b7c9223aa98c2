//! Data models for catalog matching and verification.

use serde::{Deserialize, Serialize};

/// An entry fetched from the external read-only catalog. Ephemeral; fetched
/// fresh or from a short-TTL cache owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCandidate {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub asin: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    /// Path of the item inside the catalog's library, when exposed.
    #[serde(default)]
    pub library_path: Option<String>,
}

/// Query the matcher scores candidates against.
#[derive(Debug, Clone, Default)]
pub struct MatchQuery {
    pub title: String,
    pub author: Option<String>,
    pub asin: Option<String>,
    pub isbn: Option<String>,
    pub destination_path: Option<String>,
}

/// Best-scoring candidate with its score and the reasons that produced it.
#[derive(Debug, Clone)]
pub struct MatchScore {
    pub score: u32,
    /// Score-contributing reasons, e.g. `"asin_match:+200"`. Diagnostics only.
    pub reasons: Vec<String>,
    pub candidate: CatalogCandidate,
}

/// Terminal state of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// The catalog indexed the work and the match is confident.
    Verified,
    /// A candidate was found but the confidence is too low to trust.
    Mismatch,
    /// No plausible candidate in the catalog.
    NotFound,
    /// The catalog could not be reached after exhausting retries.
    Unreachable,
    /// Catalog base URL or token absent; verification cannot run.
    NotConfigured,
    /// The caller cancelled while we were waiting.
    Cancelled,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::Mismatch => "mismatch",
            VerificationStatus::NotFound => "not_found",
            VerificationStatus::Unreachable => "unreachable",
            VerificationStatus::NotConfigured => "not_configured",
            VerificationStatus::Cancelled => "cancelled",
        }
    }
}

/// Outcome of a verification run. The only artifact the caller is expected
/// to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: VerificationStatus,
    /// Free-text diagnostic note for the UI layer.
    pub note: String,
    /// Matched candidate's catalog ID, when any.
    pub matched_id: Option<String>,
    /// Full catalog record from the best-effort enrichment fetch, when it
    /// succeeded. Never affects `status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enriched: Option<CatalogCandidate>,
    /// When the terminal state was reached.
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl VerificationOutcome {
    pub fn new(status: VerificationStatus, note: impl Into<String>) -> Self {
        Self {
            status,
            note: note.into(),
            matched_id: None,
            enriched: None,
            checked_at: chrono::Utc::now(),
        }
    }
}
