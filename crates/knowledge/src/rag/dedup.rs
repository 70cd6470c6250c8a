//! Candidate deduplication.

use crate::types::CandidateDocument;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Identity of a candidate: its `chunk_id`, else a hash of its content.
pub fn identity(candidate: &CandidateDocument) -> String {
    match candidate.chunk_id() {
        Some(id) => format!("id:{}", id),
        None => format!("sha256:{:x}", Sha256::digest(candidate.content.as_bytes())),
    }
}

/// Drop repeated candidates in one pass, keeping first-seen order.
pub fn dedupe(candidates: Vec<CandidateDocument>) -> Vec<CandidateDocument> {
    let before = candidates.len();
    let mut seen = HashSet::with_capacity(before);

    let unique: Vec<CandidateDocument> = candidates
        .into_iter()
        .filter(|candidate| seen.insert(identity(candidate)))
        .collect();

    tracing::debug!("Deduplicated {} candidates to {}", before, unique.len());
    unique
}
