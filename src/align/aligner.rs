use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::align::scorer::{score, ScoreBreakdown, ScorerConfig};
use crate::snapshot::normalize::id_stem;
use crate::snapshot::snapshot_model::{ElementNode, Snapshot};

/// Two screens are considered the same layout when at least this fraction
/// of the before-elements found a counterpart.
pub const SCREEN_MATCH_THRESHOLD: f64 = 0.8;

/// Bonus for a candidate whose immediate parent matches the target's
/// recorded parent: catches "moved within the same container" drift without
/// full subtree isomorphism.
const CONTEXT_BONUS: f64 = 0.1;

/// One possible pairing of the recorded target with a live element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentCandidate {
    /// The live element, subtree dropped.
    pub element: ElementNode,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Tie-break evidence, in the order it is consulted.
    pub distance: f64,
    pub depth_diff: usize,
    pub ordinal_diff: usize,
}

/// Rank every plausible live counterpart of `target`, best first.
///
/// The search is restricted to elements sharing the target's class or
/// identifier stem; when that restriction leaves nothing (a type-changed
/// repair), every element is considered. Candidates below the configured
/// floor are dropped. An empty result is a normal terminal state, not an
/// error.
pub fn align_target(
    after: &Snapshot,
    target: &ElementNode,
    cfg: &ScorerConfig,
) -> Vec<AlignmentCandidate> {
    let elements = after.flatten();
    let diagonal = after.screen_diagonal();

    let restricted: Vec<&ElementNode> = elements
        .iter()
        .copied()
        .filter(|el| el.class_name == target.class_name || id_stem_matches(target, el))
        .collect();
    let pool = if restricted.is_empty() { elements } else { restricted };

    let mut candidates: Vec<AlignmentCandidate> = pool
        .into_iter()
        .map(|el| make_candidate(target, el, diagonal, cfg))
        .filter(|c| c.score >= cfg.min_score)
        .collect();

    sort_candidates(&mut candidates);
    candidates
}

fn make_candidate(
    target: &ElementNode,
    el: &ElementNode,
    diagonal: f64,
    cfg: &ScorerConfig,
) -> AlignmentCandidate {
    let mut breakdown = score(target, el, diagonal, &cfg.weights);
    if parent_context_matches(target, el) {
        breakdown.context_bonus = CONTEXT_BONUS;
        breakdown.total = (breakdown.total + CONTEXT_BONUS).min(1.0);
    }

    AlignmentCandidate {
        element: el.without_children(),
        score: breakdown.total,
        breakdown,
        distance: target.bounds.center_distance(&el.bounds),
        depth_diff: target.depth.abs_diff(el.depth),
        ordinal_diff: target.ordinal.abs_diff(el.ordinal),
    }
}

/// Parent type or parent identifier carried over from recording time.
fn parent_context_matches(target: &ElementNode, el: &ElementNode) -> bool {
    let class_match = matches!(
        (&target.parent_class, &el.parent_class),
        (Some(a), Some(b)) if a == b
    );
    let id_match = matches!(
        (&target.parent_id, &el.parent_id),
        (Some(a), Some(b)) if id_stem(a) == id_stem(b)
    );
    class_match || id_match
}

fn id_stem_matches(a: &ElementNode, b: &ElementNode) -> bool {
    match (&a.resource_id, &b.resource_id) {
        (Some(a), Some(b)) => id_stem(a) == id_stem(b),
        _ => false,
    }
}

/// Descending score; ties broken by smaller center distance, then smaller
/// depth difference, then closer sibling ordinal. Total order, so repeated
/// runs over the same snapshots produce the same list.
fn sort_candidates(candidates: &mut [AlignmentCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.distance.total_cmp(&b.distance))
            .then_with(|| a.depth_diff.cmp(&b.depth_diff))
            .then_with(|| a.ordinal_diff.cmp(&b.ordinal_diff))
    });
}

/// Whole-layout alignment between two snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutAlignment {
    /// Matched (before, after) pairs, subtrees dropped.
    pub matched: Vec<(ElementNode, ElementNode)>,
    pub before_unmatched: Vec<ElementNode>,
    pub after_unmatched: Vec<ElementNode>,
    /// Fraction of before-elements that found a counterpart.
    pub ratio: f64,
    pub screens_match: bool,
}

/// Greedy best-pair-first bijection between all elements of two layouts.
///
/// Every admissible pair is scored, pairs are taken in descending score
/// order (same tie-breaks as target alignment) while both sides are free.
/// Local per-element scoring with a greedy sweep trades matching optimality
/// for predictable, explainable pairings.
pub fn align_layout(before: &Snapshot, after: &Snapshot, cfg: &ScorerConfig) -> LayoutAlignment {
    let before_els = before.flatten();
    let after_els = after.flatten();
    let diagonal = after.screen_diagonal();

    struct Pair {
        before_idx: usize,
        after_idx: usize,
        candidate: AlignmentCandidate,
    }

    let mut pairs: Vec<Pair> = Vec::new();
    for (i, b) in before_els.iter().enumerate() {
        for (j, a) in after_els.iter().enumerate() {
            if b.class_name != a.class_name && !id_stem_matches(b, a) {
                continue;
            }
            let candidate = make_candidate(b, a, diagonal, cfg);
            if candidate.score >= cfg.min_score {
                pairs.push(Pair {
                    before_idx: i,
                    after_idx: j,
                    candidate,
                });
            }
        }
    }

    pairs.sort_by(|x, y| {
        y.candidate
            .score
            .total_cmp(&x.candidate.score)
            .then_with(|| x.candidate.distance.total_cmp(&y.candidate.distance))
            .then_with(|| x.candidate.depth_diff.cmp(&y.candidate.depth_diff))
            .then_with(|| x.candidate.ordinal_diff.cmp(&y.candidate.ordinal_diff))
            .then_with(|| match x.before_idx.cmp(&y.before_idx) {
                Ordering::Equal => x.after_idx.cmp(&y.after_idx),
                other => other,
            })
    });

    let mut used_before: HashSet<usize> = HashSet::new();
    let mut used_after: HashSet<usize> = HashSet::new();
    let mut matched = Vec::new();

    for pair in pairs {
        if used_before.contains(&pair.before_idx) || used_after.contains(&pair.after_idx) {
            continue;
        }
        used_before.insert(pair.before_idx);
        used_after.insert(pair.after_idx);
        matched.push((
            before_els[pair.before_idx].without_children(),
            after_els[pair.after_idx].without_children(),
        ));
    }

    let before_unmatched: Vec<ElementNode> = before_els
        .iter()
        .enumerate()
        .filter(|(i, _)| !used_before.contains(i))
        .map(|(_, el)| el.without_children())
        .collect();
    let after_unmatched: Vec<ElementNode> = after_els
        .iter()
        .enumerate()
        .filter(|(j, _)| !used_after.contains(j))
        .map(|(_, el)| el.without_children())
        .collect();

    let total = before_els.len();
    let ratio = if total == 0 {
        0.0
    } else {
        matched.len() as f64 / total as f64
    };

    LayoutAlignment {
        matched,
        before_unmatched,
        after_unmatched,
        ratio,
        screens_match: ratio >= SCREEN_MATCH_THRESHOLD,
    }
}
