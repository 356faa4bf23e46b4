//! Candidate ranking and resolution.
//!
//! Sorts scored candidates and classifies the outcome as Resolved,
//! Ambiguous or NotFound. The confidence rule has three branches because a
//! reference that is alone on its layout needs less margin over the
//! runner-up than one on a layout crowded with external references, where
//! accidental high scores are more likely.

use ahash::AHashSet;

use crate::document::Document;
use crate::titleblock::candidate::{collect_candidates, XrefCandidate};
use crate::titleblock::scoring;
use crate::types::Handle;

/// Scores below this floor carry no real signal, even for a lone candidate
pub const MIN_SIGNAL_SCORE: i32 = 40;
/// Confident: strong absolute score with a clear margin
pub const CONFIDENT_SCORE: i32 = 95;
pub const CONFIDENT_DELTA: i32 = 25;
/// Confident: decent score, alone on its layout, smaller margin suffices
pub const UNIQUE_SCORE: i32 = 80;
pub const UNIQUE_DELTA: i32 = 15;
/// Confident: dominant score needs almost no margin
pub const DOMINANT_SCORE: i32 = 150;
pub const DOMINANT_DELTA: i32 = 10;
/// Likely-set floor and margin (see [`likely_candidates`])
pub const LIKELY_FLOOR: i32 = 80;
pub const LIKELY_MARGIN: i32 = 25;

/// Classification of one resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// A single confident winner was found.
    Resolved,
    /// Candidates exist but none wins confidently; caller should prompt.
    Ambiguous,
    /// No candidate carries any real signal.
    NotFound,
}

/// Result of one resolution pass. Immutable once produced.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    /// The classification.
    pub kind: ResolutionKind,
    /// The winner, when `kind` is [`ResolutionKind::Resolved`].
    pub winner: Option<XrefCandidate>,
    /// All candidates, ranked best first.
    pub candidates: Vec<XrefCandidate>,
}

impl ResolutionResult {
    fn not_found(candidates: Vec<XrefCandidate>) -> Self {
        Self {
            kind: ResolutionKind::NotFound,
            winner: None,
            candidates,
        }
    }
}

/// Collect, score and rank the document's candidates.
pub fn resolve(doc: &Document) -> ResolutionResult {
    let mut candidates = collect_candidates(doc);
    scoring::score_all(&mut candidates, doc.active_layout());
    rank(candidates)
}

/// Rank pre-scored candidates and classify the outcome.
///
/// Deterministic: ties are broken by layout name, then block name,
/// case-insensitive ascending.
pub fn rank(mut candidates: Vec<XrefCandidate>) -> ResolutionResult {
    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| {
                a.layout_name
                    .to_lowercase()
                    .cmp(&b.layout_name.to_lowercase())
            })
            .then_with(|| a.block_name.to_lowercase().cmp(&b.block_name.to_lowercase()))
            // Last-resort handle ordering so two references to the same
            // definition rank identically regardless of input order.
            .then_with(|| a.definition.cmp(&b.definition))
            .then_with(|| a.reference.cmp(&b.reference))
    });

    let Some(best) = candidates.first().cloned() else {
        return ResolutionResult::not_found(candidates);
    };
    // A low best score means no real signal, even when it is the only
    // candidate.
    if best.score < MIN_SIGNAL_SCORE {
        return ResolutionResult::not_found(candidates);
    }

    let survivors = candidates
        .iter()
        .filter(|c| c.score >= MIN_SIGNAL_SCORE)
        .count();
    if survivors == 1 {
        return ResolutionResult {
            kind: ResolutionKind::Resolved,
            winner: Some(best),
            candidates,
        };
    }

    let runner_up_score = candidates[1].score;
    let delta = best.score - runner_up_score;
    let confident = (best.score >= CONFIDENT_SCORE && delta >= CONFIDENT_DELTA)
        || (best.score >= UNIQUE_SCORE && best.layout_xref_count == 1 && delta >= UNIQUE_DELTA)
        || (best.score >= DOMINANT_SCORE && delta >= DOMINANT_DELTA);

    if confident {
        ResolutionResult {
            kind: ResolutionKind::Resolved,
            winner: Some(best),
            candidates,
        }
    } else {
        ResolutionResult {
            kind: ResolutionKind::Ambiguous,
            winner: None,
            candidates,
        }
    }
}

/// The fuzzy "likely" membership set: definition handles of every candidate
/// scoring at least `max(LIKELY_FLOOR, best − LIKELY_MARGIN)`.
///
/// Deliberately broader than the strict winner: the detach gate uses it as
/// a conservative "don't destroy these either" net. When the raw floor
/// would exclude even the top candidate (best below the floor but above the
/// signal minimum), the top candidate alone is returned, so the strict
/// winner is always a member.
pub fn likely_candidates(doc: &Document) -> AHashSet<Handle> {
    let ranked = resolve(doc);
    likely_from_ranked(&ranked.candidates)
}

/// Likely-set computation over an already ranked candidate list.
pub fn likely_from_ranked(ranked: &[XrefCandidate]) -> AHashSet<Handle> {
    let mut likely = AHashSet::new();
    let Some(best) = ranked.first() else {
        return likely;
    };
    if best.score < MIN_SIGNAL_SCORE {
        return likely;
    }

    let floor = LIKELY_FLOOR.max(best.score - LIKELY_MARGIN);
    for candidate in ranked {
        if candidate.score >= floor {
            likely.insert(candidate.definition);
        }
    }
    likely.insert(best.definition);
    likely
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Handle, Vector2};

    fn candidate(n: u64, layout: &str, name: &str, score: i32, count: usize) -> XrefCandidate {
        XrefCandidate {
            definition: Handle::new(n),
            reference: Handle::new(n + 100),
            layout_name: layout.to_string(),
            block_name: name.to_string(),
            path_name: String::new(),
            insertion_point: Vector2::ZERO,
            layout_xref_count: count,
            score,
        }
    }

    #[test]
    fn test_empty_is_not_found() {
        let r = rank(Vec::new());
        assert_eq!(r.kind, ResolutionKind::NotFound);
        assert!(r.winner.is_none());
    }

    #[test]
    fn test_low_lone_score_is_not_found() {
        let r = rank(vec![candidate(1, "A", "frame", 39, 1)]);
        assert_eq!(r.kind, ResolutionKind::NotFound);
    }

    #[test]
    fn test_single_survivor_is_resolved() {
        let r = rank(vec![
            candidate(1, "A", "x-tb", 300, 1),
            candidate(2, "B", "noise", 10, 1),
        ]);
        assert_eq!(r.kind, ResolutionKind::Resolved);
        assert_eq!(r.winner.unwrap().definition, Handle::new(1));
    }

    #[test]
    fn test_close_scores_in_crowded_layout_are_ambiguous() {
        let r = rank(vec![
            candidate(1, "A", "one", 150, 2),
            candidate(2, "A", "two", 145, 2),
        ]);
        assert_eq!(r.kind, ResolutionKind::Ambiguous);
    }

    #[test]
    fn test_unique_layout_branch() {
        // 150 vs 100: delta 50, best alone on its layout.
        let r = rank(vec![
            candidate(1, "A", "one", 150, 1),
            candidate(2, "B", "two", 100, 1),
        ]);
        assert_eq!(r.kind, ResolutionKind::Resolved);
        assert_eq!(r.winner.unwrap().definition, Handle::new(1));
    }

    #[test]
    fn test_dominant_branch() {
        // Crowded layout, big score, small margin.
        let r = rank(vec![
            candidate(1, "A", "one", 160, 4),
            candidate(2, "A", "two", 148, 4),
        ]);
        assert_eq!(r.kind, ResolutionKind::Resolved);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let r1 = rank(vec![
            candidate(1, "B", "zeta", 120, 2),
            candidate(2, "A", "alpha", 120, 2),
        ]);
        let r2 = rank(vec![
            candidate(2, "A", "alpha", 120, 2),
            candidate(1, "B", "zeta", 120, 2),
        ]);
        assert_eq!(r1.candidates[0].definition, Handle::new(2));
        assert_eq!(r2.candidates[0].definition, Handle::new(2));
    }

    #[test]
    fn test_likely_includes_near_ties() {
        let ranked = rank(vec![
            candidate(1, "A", "one", 200, 3),
            candidate(2, "A", "two", 180, 3),
            candidate(3, "A", "three", 100, 3),
        ]);
        let likely = likely_from_ranked(&ranked.candidates);
        // floor = max(80, 175) = 175
        assert!(likely.contains(&Handle::new(1)));
        assert!(likely.contains(&Handle::new(2)));
        assert!(!likely.contains(&Handle::new(3)));
    }

    #[test]
    fn test_likely_floor_at_eighty() {
        let ranked = rank(vec![
            candidate(1, "A", "one", 90, 3),
            candidate(2, "A", "two", 82, 3),
            candidate(3, "A", "three", 60, 3),
        ]);
        let likely = likely_from_ranked(&ranked.candidates);
        // floor = max(80, 65) = 80
        assert_eq!(likely.len(), 2);
    }

    #[test]
    fn test_likely_always_contains_top_candidate() {
        let ranked = rank(vec![candidate(1, "A", "one", 55, 1)]);
        let likely = likely_from_ranked(&ranked.candidates);
        assert!(likely.contains(&Handle::new(1)));
    }
}
