//! Candidate scoring.
//!
//! A weighted vote over naming and placement heuristics, not a classifier:
//! title blocks follow loose conventions across many drafters' files, and
//! an enumerable rule table keeps every signal's contribution independently
//! verifiable. Scores are purely additive and never negative; the
//! origin-proximity tiers are the one exception to stacking; only the
//! closest tier applies.

use ahash::AHashSet;
use once_cell::sync::Lazy;

use crate::document::path;
use crate::titleblock::candidate::XrefCandidate;
use crate::titleblock::fingerprint::{canonical_token, file_token};

/// Candidate sits on the document's currently active layout
pub const ACTIVE_LAYOUT: i32 = 40;
/// Block name or bare file name contains a title-block hint substring
pub const NAME_HINT: i32 = 130;
/// Full path contains a hint substring
pub const PATH_HINT: i32 = 120;
/// Canonical block-name or file-name token equals a tight token exactly
pub const TIGHT_TOKEN: i32 = 220;
/// Path lives under an "xrefs" folder with a tight or x-tb marker
pub const XREFS_FOLDER: i32 = 140;
/// Only external-reference candidate on its layout
pub const UNIQUE_IN_LAYOUT: i32 = 70;
/// Exactly two candidates share the layout
pub const PAIR_IN_LAYOUT: i32 = 20;
/// Insertion point within [`ORIGIN_EXACT_DIST`] of the layout origin
pub const ORIGIN_EXACT: i32 = 25;
/// Insertion point within [`ORIGIN_NEAR_DIST`] of the layout origin
pub const ORIGIN_NEAR: i32 = 16;
/// Insertion point within [`ORIGIN_CLOSE_DIST`] of the layout origin
pub const ORIGIN_CLOSE: i32 = 8;
/// Block name starts with `x-`
pub const X_PREFIX: i32 = 8;
/// Reference resolves to a drawing-format file
pub const DRAWING_FILE: i32 = 10;

/// Origin-proximity tier distances
pub const ORIGIN_EXACT_DIST: f64 = 1e-4;
pub const ORIGIN_NEAR_DIST: f64 = 1.0;
pub const ORIGIN_CLOSE_DIST: f64 = 24.0;

/// Title-block hint substrings
pub const NAME_HINTS: [&str; 5] = ["x-tb", "title", "tblock", "border", "sheet"];

/// Tokens that, on exact canonical match, identify a title block outright
static TIGHT_TOKENS: Lazy<AHashSet<&'static str>> =
    Lazy::new(|| ["x-tb", "x_tb", "xtb"].into_iter().collect());

/// Check whether a lowercased string contains any hint substring.
fn contains_hint(text: &str) -> bool {
    NAME_HINTS.iter().any(|hint| text.contains(hint))
}

/// Check whether a name canonicalizes to a tight token.
pub fn is_tight_token(name: &str) -> bool {
    TIGHT_TOKENS.contains(canonical_token(name).as_str())
}

/// Check whether a path lives under an "xrefs" folder.
fn under_xrefs_folder(lower_path: &str) -> bool {
    let normalized = path::normalize_separators(lower_path);
    normalized.contains("/xrefs/") || normalized.starts_with("xrefs/")
}

/// Score one candidate against the active layout.
pub fn score_candidate(candidate: &XrefCandidate, active_layout: &str) -> i32 {
    let mut score = 0;

    let lower_name = candidate.block_name.trim().to_lowercase();
    let lower_path = candidate.path_name.trim().to_lowercase();
    let bare_file = file_token(&candidate.path_name);

    if candidate.layout_name.eq_ignore_ascii_case(active_layout) {
        score += ACTIVE_LAYOUT;
    }

    if contains_hint(&lower_name) || contains_hint(&bare_file) {
        score += NAME_HINT;
    }

    if contains_hint(&lower_path) {
        score += PATH_HINT;
    }

    let tight = is_tight_token(&candidate.block_name) || TIGHT_TOKENS.contains(bare_file.as_str());
    if tight {
        score += TIGHT_TOKEN;
    }

    if under_xrefs_folder(&lower_path)
        && (tight || lower_path.contains("x-tb") || lower_path.contains("x_tb"))
    {
        score += XREFS_FOLDER;
    }

    match candidate.layout_xref_count {
        1 => score += UNIQUE_IN_LAYOUT,
        2 => score += PAIR_IN_LAYOUT,
        _ => {}
    }

    let origin_distance = candidate.insertion_point.length();
    if origin_distance <= ORIGIN_EXACT_DIST {
        score += ORIGIN_EXACT;
    } else if origin_distance <= ORIGIN_NEAR_DIST {
        score += ORIGIN_NEAR;
    } else if origin_distance <= ORIGIN_CLOSE_DIST {
        score += ORIGIN_CLOSE;
    }

    if lower_name.starts_with("x-") {
        score += X_PREFIX;
    }

    if path::is_drawing_file(&candidate.path_name) {
        score += DRAWING_FILE;
    }

    score
}

/// Score a whole candidate set in place.
pub fn score_all(candidates: &mut [XrefCandidate], active_layout: &str) {
    for candidate in candidates.iter_mut() {
        candidate.score = score_candidate(candidate, active_layout);
    }
}
