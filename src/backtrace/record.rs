use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::oracle::classifier::OracleExchange;
use crate::repair::planner::{RepairVerdict, VerdictKind};
use crate::script::action::RecordedAction;

/// One repair attempt, as it will be audited later: the original action,
/// the verdict with its evidence, and the classifier exchange if one
/// happened. Entries are never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktraceEntry {
    pub step: usize,
    pub action: RecordedAction,
    pub verdict: RepairVerdict,
    pub timestamp_ms: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OracleExchange>,
    pub before_fingerprint: String,
    pub after_fingerprint: String,
}

impl BacktraceEntry {
    pub fn now(
        step: usize,
        action: RecordedAction,
        verdict: RepairVerdict,
        oracle: Option<OracleExchange>,
        before_fingerprint: String,
        after_fingerprint: String,
    ) -> Self {
        Self {
            step,
            action,
            verdict,
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
            oracle,
            before_fingerprint,
            after_fingerprint,
        }
    }
}

/// Verdict counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictSummary {
    pub resolved: usize,
    pub ambiguous: usize,
    pub unresolvable: usize,
}

impl VerdictSummary {
    pub fn count(&mut self, kind: VerdictKind) {
        match kind {
            VerdictKind::Resolved => self.resolved += 1,
            VerdictKind::Ambiguous => self.ambiguous += 1,
            VerdictKind::Unresolvable => self.unresolvable += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.resolved + self.ambiguous + self.unresolvable
    }

    pub fn all_resolved(&self) -> bool {
        self.resolved == self.total()
    }
}
