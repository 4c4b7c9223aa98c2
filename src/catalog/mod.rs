//! External catalog integration.
//!
//! Client, candidate models, and the confidence-scored matcher used to
//! confirm that the external read-only catalog indexed an imported work.

mod client;
mod matcher;
mod models;

pub use client::{
    CachingCatalogClient, CandidateCache, CatalogClient, CatalogError, HttpCatalogClient,
};
pub use matcher::{CatalogMatcher, MISMATCH_THRESHOLD, VERIFIED_THRESHOLD};
pub use models::{
    CatalogCandidate, MatchQuery, MatchScore, VerificationOutcome, VerificationStatus,
};
