use std::path::{Path, PathBuf};

use crate::align::aligner::align_target;
use crate::align::scorer::{ScoreBreakdown, ScorerConfig};
use crate::backtrace::record::{BacktraceEntry, VerdictSummary};
use crate::backtrace::recorder::BacktraceRecorder;
use crate::oracle::classifier::{
    ClassifierBackend, Disambiguator, MockBackend, OllamaBackend,
};
use crate::repair::error::RepairError;
use crate::repair::planner::{build_repaired_action, plan, RepairVerdict};
use crate::script::action::RecordedAction;
use crate::script::format::{load_snapshot, ScriptBundle};
use crate::snapshot::normalize::layout_fingerprint;
use crate::snapshot::snapshot_model::{ElementNode, Snapshot};

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// None disables the external collaborator; near-ties then surface as
    /// Ambiguous instead of being guessed.
    pub endpoint: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            endpoint: None,
            model: "qwen2.5:1.5b".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scorer: ScorerConfig,
    /// Top-two margin below which the classifier is consulted.
    pub ambiguity_threshold: f64,
    /// Candidates surfaced in an Ambiguous verdict and sent to the
    /// classifier.
    pub top_k: usize,
    pub classifier: ClassifierConfig,
}

impl EngineConfig {
    pub fn new() -> EngineConfig {
        EngineConfig {
            scorer: ScorerConfig::default(),
            ambiguity_threshold: 0.05,
            top_k: 3,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::new()
    }
}

/// Supplies the live layout for a step: the automation-driver seam. The
/// engine never talks to a device itself.
pub trait SnapshotSource {
    fn live_snapshot(&mut self, step: usize) -> Result<Snapshot, RepairError>;
}

/// Live snapshots dumped to disk by the driver, `step_NN.json` per step.
pub struct FileSnapshotSource {
    dir: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(dir: &Path) -> FileSnapshotSource {
        FileSnapshotSource {
            dir: dir.to_path_buf(),
        }
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn live_snapshot(&mut self, step: usize) -> Result<Snapshot, RepairError> {
        load_snapshot(&self.dir.join(format!("step_{:02}.json", step)))
    }
}

/// Everything a finished run hands back: the action sequence with repaired
/// steps substituted, and the backtrace that justifies each substitution.
pub struct RepairRun {
    pub actions: Vec<RecordedAction>,
    pub recorder: BacktraceRecorder,
}

impl RepairRun {
    pub fn summary(&self) -> VerdictSummary {
        self.recorder.summarize()
    }
}

fn exact_counterpart(live: &Snapshot, target: &ElementNode) -> Option<ElementNode> {
    live.flatten()
        .into_iter()
        .find(|el| el.without_children() == *target)
        .map(ElementNode::without_children)
}

/// One repair engine, owning its scoring config and classifier. A batch
/// runs one engine per script slot; nothing here is shared.
pub struct RepairEngine {
    pub config: EngineConfig,
    disambiguator: Disambiguator,
}

impl RepairEngine {
    /// Build from config; with no classifier endpoint the tie-breaker is
    /// an unreachable stub, so ties surface as Ambiguous.
    pub fn new(config: EngineConfig) -> RepairEngine {
        let backend: Box<dyn ClassifierBackend> = match &config.classifier.endpoint {
            Some(endpoint) => Box::new(OllamaBackend::new(
                endpoint,
                &config.classifier.model,
                config.classifier.timeout_ms,
            )),
            None => Box::new(MockBackend::unreachable()),
        };
        RepairEngine::with_backend(config, backend)
    }

    pub fn with_backend(config: EngineConfig, backend: Box<dyn ClassifierBackend>) -> RepairEngine {
        RepairEngine {
            config,
            disambiguator: Disambiguator::new(backend),
        }
    }

    /// Repair one failed action against the live layout. Always produces a
    /// verdict and one backtrace entry; never raises on a missing match.
    pub fn repair_step(
        &self,
        step: usize,
        action: &RecordedAction,
        before: &Snapshot,
        live: &Snapshot,
        recorder: &mut BacktraceRecorder,
    ) -> RepairVerdict {
        let before_fingerprint = layout_fingerprint(before);
        let after_fingerprint = layout_fingerprint(live);

        let (verdict, exchange) = match &action.target {
            Some(target) => {
                // Unchanged layout: the counterpart is the attribute-identical
                // element, taken by equality instead of scoring.
                let exact = (before_fingerprint == after_fingerprint)
                    .then(|| exact_counterpart(live, target))
                    .flatten();

                match exact {
                    Some(element) => (
                        RepairVerdict::Resolved {
                            element,
                            confidence: 1.0,
                            evidence: ScoreBreakdown::exact(),
                        },
                        None,
                    ),
                    None => {
                        let candidates = align_target(live, target, &self.config.scorer);
                        plan(
                            candidates,
                            self.config.ambiguity_threshold,
                            self.config.top_k,
                            |top| self.disambiguator.disambiguate(target, top),
                        )
                    }
                }
            }
            None => (
                RepairVerdict::Unresolvable {
                    reason: "action has no element target".to_string(),
                },
                None,
            ),
        };

        recorder.append(BacktraceEntry::now(
            step,
            action.clone(),
            verdict.clone(),
            exchange,
            before_fingerprint,
            after_fingerprint,
        ));
        verdict
    }

    /// Repair a whole recorded script, one attempt per targeted step.
    ///
    /// Targetless steps (swipes) replay verbatim and make no backtrace
    /// entry. Steps that stay Ambiguous or Unresolvable keep their original
    /// action in the output; the backtrace carries the failure for the
    /// operator. A malformed snapshot aborts this script only.
    pub fn repair_script(
        &self,
        bundle: &ScriptBundle,
        source: &mut dyn SnapshotSource,
    ) -> Result<RepairRun, RepairError> {
        let mut recorder = BacktraceRecorder::new();
        let mut actions = Vec::with_capacity(bundle.actions.len());

        for (i, action) in bundle.actions.iter().enumerate() {
            if action.target.is_none() {
                actions.push(action.clone());
                continue;
            }

            let before = bundle.recorded_snapshot(i)?;
            let live = source.live_snapshot(i)?;

            match self.repair_step(i, action, &before, &live, &mut recorder) {
                RepairVerdict::Resolved { element, .. } => {
                    actions.push(build_repaired_action(action, &element));
                }
                RepairVerdict::Ambiguous { .. } | RepairVerdict::Unresolvable { .. } => {
                    actions.push(action.clone());
                }
            }
        }

        Ok(RepairRun { actions, recorder })
    }
}
