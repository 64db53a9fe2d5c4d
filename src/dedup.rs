// src/dedup.rs
//! Deduplication gate: drop candidates that already carry a live processed
//! marker. Pure filter, no I/O. Matching is by raw story id only — the same
//! story re-submitted under a new id is deliberately not caught here.

use std::collections::HashMap;

use crate::hn::CandidateItem;

/// Keep every candidate whose id has no live marker. O(n) over candidates.
pub fn filter_unseen(
    candidates: Vec<CandidateItem>,
    markers: &HashMap<String, i64>,
) -> Vec<CandidateItem> {
    candidates
        .into_iter()
        .filter(|c| !markers.contains_key(&c.id))
        .collect()
}
