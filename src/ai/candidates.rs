//! Candidate model list construction
//!
//! The ordered list every fallback walk uses: the configured preferred model
//! first, then the fixed known-good sequence. Pure and decoupled from
//! environment reading so tests can drive it directly.

use crate::constants::generation::FALLBACK_MODELS;

/// Build the ordered, deduplicated candidate list.
///
/// Blank entries are dropped; first-seen order wins on duplicates.
pub fn build_candidate_list(preferred: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(FALLBACK_MODELS.len() + 1);

    let preferred = preferred.map(str::trim).filter(|m| !m.is_empty());
    for model in preferred.into_iter().chain(FALLBACK_MODELS.iter().copied()) {
        if !out.iter().any(|seen| seen == model) {
            out.push(model.to_string());
        }
    }

    out
}
