use serde::{Deserialize, Serialize};

use crate::snapshot::normalize::id_stem;
use crate::snapshot::snapshot_model::ElementNode;

/// Relative weight of each attribute signal.
///
/// The resource identifier is the most stable signal across UI changes but
/// is often missing in poorly-instrumented apps, so text and structure must
/// carry the match when it is absent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub identifier: f64,
    pub text: f64,
    pub class_name: f64,
    pub geometry: f64,
    pub ancestry: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            identifier: 0.4,
            text: 0.25,
            class_name: 0.15,
            geometry: 0.1,
            ancestry: 0.1,
        }
    }
}

impl ScoreWeights {
    fn sum(&self) -> f64 {
        self.identifier + self.text + self.class_name + self.geometry + self.ancestry
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub weights: ScoreWeights,
    /// Pairings scoring below this floor are never proposed.
    pub min_score: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig {
            weights: ScoreWeights::default(),
            min_score: 0.3,
        }
    }
}

/// Per-signal sub-scores (each in [0,1]) behind one total. Kept alongside
/// every candidate so a verdict can be audited signal by signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub identifier: f64,
    pub text: f64,
    pub class_name: f64,
    pub geometry: f64,
    pub ancestry: f64,
    /// Parent-context bonus applied by the aligner, not the scorer.
    pub context_bonus: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    /// Breakdown recorded when the whole layout is unchanged and the
    /// counterpart was taken by exact equality instead of scoring.
    pub fn exact() -> ScoreBreakdown {
        ScoreBreakdown {
            identifier: 1.0,
            text: 1.0,
            class_name: 1.0,
            geometry: 1.0,
            ancestry: 1.0,
            context_bonus: 0.0,
            total: 1.0,
        }
    }
}

/// Score two elements purely from their own attributes: symmetric,
/// deterministic, in [0,1]. Tree position of *other* nodes never enters.
pub fn score(
    a: &ElementNode,
    b: &ElementNode,
    screen_diagonal: f64,
    weights: &ScoreWeights,
) -> ScoreBreakdown {
    let identifier = identifier_score(a.resource_id.as_deref(), b.resource_id.as_deref());
    let text = text_similarity(a.text.as_deref(), b.text.as_deref());
    let class_name = if a.class_name == b.class_name { 1.0 } else { 0.0 };
    let geometry = geometry_score(a, b, screen_diagonal);
    let ancestry = ancestry_score(&a.ancestors, &b.ancestors);

    let sum = weights.sum();
    let total = if sum > 0.0 {
        (weights.identifier * identifier
            + weights.text * text
            + weights.class_name * class_name
            + weights.geometry * geometry
            + weights.ancestry * ancestry)
            / sum
    } else {
        0.0
    };

    ScoreBreakdown {
        identifier,
        text,
        class_name,
        geometry,
        ancestry,
        context_bonus: 0.0,
        total: total.clamp(0.0, 1.0),
    }
}

/// 1.0 when both identifiers are present and equal (package prefix
/// stripped), 0.0 when both are present and differ, 0.5 neutral when either
/// is absent: absence must not penalize as strongly as a mismatch.
fn identifier_score(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => {
            if id_stem(a).eq_ignore_ascii_case(id_stem(b)) {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.5,
    }
}

/// Normalized edit-distance ratio, case-insensitive. Both-empty is a
/// perfect match; one-sided text counts as distance over the full length.
fn text_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    let a = a.unwrap_or("").to_lowercase();
    let b = b.unwrap_or("").to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count()).max(1);
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

fn geometry_score(a: &ElementNode, b: &ElementNode, screen_diagonal: f64) -> f64 {
    let distance = a.bounds.center_distance(&b.bounds);
    (1.0 - distance / screen_diagonal.max(1.0)).clamp(0.0, 1.0)
}

/// Fraction of matching class names at corresponding depths, capped to the
/// shorter path. Two roots (both paths empty) match perfectly.
fn ancestry_score(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let matching = a.iter().zip(b.iter()).filter(|(x, y)| x == y).count();
    matching as f64 / len as f64
}

/// Two-row dynamic-programming Levenshtein over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
