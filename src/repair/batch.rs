use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::backtrace::record::VerdictSummary;
use crate::repair::engine::{EngineConfig, FileSnapshotSource, RepairEngine};
use crate::repair::error::RepairError;
use crate::script::format::{save_script, ScriptBundle};

/// Result of repairing one script bundle within a batch.
pub struct BatchOutcome {
    pub bundle: PathBuf,
    pub result: Result<VerdictSummary, RepairError>,
}

pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Repair many script bundles in parallel worker slots.
///
/// Each slot owns its bundle, engine, and backtrace exclusively; no state
/// crosses slots. Cancellation stops claiming new bundles but lets claimed
/// ones finish, so no backtrace is left partially written. One bundle's
/// failure (malformed snapshot, unreadable script) is recorded in its
/// outcome and never aborts the siblings.
pub fn batch_repair(
    bundles: &[PathBuf],
    config: &EngineConfig,
    slots: usize,
    cancel: &AtomicBool,
) -> BatchReport {
    let next = AtomicUsize::new(0);
    let results: Mutex<Vec<(usize, BatchOutcome)>> = Mutex::new(Vec::new());
    let workers = slots.max(1).min(bundles.len().max(1));

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                let i = next.fetch_add(1, Ordering::SeqCst);
                if i >= bundles.len() {
                    break;
                }

                let outcome = BatchOutcome {
                    bundle: bundles[i].clone(),
                    result: repair_one(&bundles[i], config),
                };
                if let Ok(mut guard) = results.lock() {
                    guard.push((i, outcome));
                }
            });
        }
    });

    let mut outcomes = results.into_inner().unwrap_or_default();
    outcomes.sort_by_key(|(i, _)| *i);
    BatchReport {
        outcomes: outcomes.into_iter().map(|(_, o)| o).collect(),
    }
}

fn repair_one(dir: &Path, config: &EngineConfig) -> Result<VerdictSummary, RepairError> {
    let bundle = ScriptBundle::load(dir)?;
    let engine = RepairEngine::new(config.clone());
    let mut source = FileSnapshotSource::new(&dir.join("live"));

    let run = engine.repair_script(&bundle, &mut source)?;

    save_script(&bundle.repaired_script_path(), &run.actions)?;
    run.recorder.persist(&bundle.backtrace_path())?;
    Ok(run.summary())
}
