use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::align::aligner::AlignmentCandidate;
use crate::align::scorer::ScoreBreakdown;
use crate::oracle::classifier::{Choice, OracleExchange};
use crate::script::action::RecordedAction;
use crate::snapshot::snapshot_model::ElementNode;

/// Outcome of one repair attempt. Failure is data, never a panic: the
/// replay orchestrator decides what an Ambiguous or Unresolvable step means
/// for the rest of the script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepairVerdict {
    Resolved {
        element: ElementNode,
        confidence: f64,
        evidence: ScoreBreakdown,
    },
    Ambiguous {
        candidates: Vec<AlignmentCandidate>,
    },
    Unresolvable {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictKind {
    Resolved,
    Ambiguous,
    Unresolvable,
}

impl RepairVerdict {
    pub fn kind(&self) -> VerdictKind {
        match self {
            RepairVerdict::Resolved { .. } => VerdictKind::Resolved,
            RepairVerdict::Ambiguous { .. } => VerdictKind::Ambiguous,
            RepairVerdict::Unresolvable { .. } => VerdictKind::Unresolvable,
        }
    }
}

/// Turn a ranked candidate list into a verdict.
///
/// `tiebreak` is consulted only when the top two scores sit within the
/// ambiguity threshold; candidates are already floored by the aligner, so a
/// near-tie here means both are plausible, not both weak. A deferring
/// tie-break yields Ambiguous rather than a silent guess: guessing wrong
/// silently corrupts every later script step.
pub fn plan<F>(
    mut candidates: Vec<AlignmentCandidate>,
    ambiguity_threshold: f64,
    top_k: usize,
    tiebreak: F,
) -> (RepairVerdict, Option<OracleExchange>)
where
    F: FnOnce(&[AlignmentCandidate]) -> (Choice, OracleExchange),
{
    if candidates.is_empty() {
        return (
            RepairVerdict::Unresolvable {
                reason: "no structural match".to_string(),
            },
            None,
        );
    }

    if candidates.len() == 1 || candidates[0].score - candidates[1].score >= ambiguity_threshold {
        return (resolved(candidates.swap_remove(0)), None);
    }

    candidates.truncate(top_k.max(2));
    let (choice, exchange) = tiebreak(&candidates);
    match choice {
        Choice::Pick(i) if i < candidates.len() => {
            (resolved(candidates.swap_remove(i)), Some(exchange))
        }
        _ => (RepairVerdict::Ambiguous { candidates }, Some(exchange)),
    }
}

fn resolved(winner: AlignmentCandidate) -> RepairVerdict {
    RepairVerdict::Resolved {
        confidence: winner.score,
        evidence: winner.breakdown,
        element: winner.element,
    }
}

/// Substitute the winner's live attributes into a copy of the original
/// action; kind and parameters are preserved, and the copy is tagged so a
/// regenerated script shows which steps were rewritten.
pub fn build_repaired_action(original: &RecordedAction, winner: &ElementNode) -> RecordedAction {
    let mut repaired = original.clone();
    repaired.target = Some(winner.without_children());
    repaired.parameters.insert("repaired".to_string(), Value::Bool(true));
    repaired
}
