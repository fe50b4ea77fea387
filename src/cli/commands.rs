use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use crate::align::aligner::align_layout;
use crate::backtrace::record::VerdictSummary;
use crate::backtrace::recorder::read_backtrace;
use crate::repair::batch::batch_repair;
use crate::repair::engine::{EngineConfig, FileSnapshotSource, RepairEngine};
use crate::repair::planner::RepairVerdict;
use crate::script::format::{load_raw_dump, load_snapshot, save_script, save_snapshot, ScriptBundle};

// ============================================================================
// repair subcommand
// ============================================================================

/// Repair one script bundle and return whether every attempt resolved.
pub fn cmd_repair(
    script_dir: &str,
    live_dir: Option<&str>,
    output: Option<&str>,
    verbose: u8,
    config: EngineConfig,
) -> Result<bool, Box<dyn std::error::Error>> {
    let script_dir = Path::new(script_dir);
    let bundle = ScriptBundle::load(script_dir)?;
    let live = live_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| script_dir.join("live"));

    if verbose > 0 {
        eprintln!(
            "Repairing {} ({} steps)...",
            script_dir.display(),
            bundle.actions.len()
        );
    }

    let engine = RepairEngine::new(config);
    let mut source = FileSnapshotSource::new(&live);
    let run = engine.repair_script(&bundle, &mut source)?;

    if verbose > 0 {
        for entry in run.recorder.export() {
            eprintln!("  step {:>02}: {}", entry.step, verdict_line(&entry.verdict));
        }
    }

    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| bundle.repaired_script_path());
    save_script(&output_path, &run.actions)?;
    run.recorder.persist(&bundle.backtrace_path())?;

    let summary = run.summary();
    println!(
        "{}: {} resolved, {} ambiguous, {} unresolvable ({} attempts)",
        script_dir.display(),
        summary.resolved,
        summary.ambiguous,
        summary.unresolvable,
        summary.total()
    );

    Ok(summary.all_resolved())
}

// ============================================================================
// batch-repair subcommand
// ============================================================================

/// Repair every bundle under `root` and return whether all scripts repaired
/// without error.
pub fn cmd_batch_repair(
    root: &str,
    slots: usize,
    verbose: u8,
    config: EngineConfig,
) -> Result<bool, Box<dyn std::error::Error>> {
    let bundles = find_bundles(Path::new(root))?;

    if bundles.is_empty() {
        eprintln!("No script bundles found under: {}", root);
        return Ok(true);
    }

    if verbose > 0 {
        eprintln!("Batch-repairing {} bundles ({} slots)...", bundles.len(), slots);
    }

    let cancel = AtomicBool::new(false);
    let report = batch_repair(&bundles, &config, slots, &cancel);

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(summary) => println!(
                "  ok   {}: {} resolved, {} ambiguous, {} unresolvable",
                outcome.bundle.display(),
                summary.resolved,
                summary.ambiguous,
                summary.unresolvable
            ),
            Err(e) => println!("  FAIL {}: {}", outcome.bundle.display(), e),
        }
    }

    println!(
        "Batch done: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );

    Ok(report.failed() == 0)
}

/// A bundle is any direct subdirectory holding a script.jsonl. Sorted by
/// name so batch output order is stable.
fn find_bundles(root: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut bundles = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() && path.join("script.jsonl").is_file() {
            bundles.push(path);
        }
    }
    bundles.sort();
    Ok(bundles)
}

// ============================================================================
// diff-layout subcommand
// ============================================================================

pub fn cmd_diff_layout(
    before_path: &str,
    after_path: &str,
    verbose: u8,
    config: &EngineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let before = load_snapshot(Path::new(before_path))?;
    let after = load_snapshot(Path::new(after_path))?;

    let alignment = align_layout(&before, &after, &config.scorer);

    println!(
        "Matched {} of {} elements (ratio {:.2}), screens {}",
        alignment.matched.len(),
        alignment.matched.len() + alignment.before_unmatched.len(),
        alignment.ratio,
        if alignment.screens_match { "match" } else { "differ" }
    );

    if verbose > 0 {
        for (b, a) in &alignment.matched {
            println!("  {}  ->  {}", b.digest(), a.digest());
        }
    }

    if !alignment.before_unmatched.is_empty() {
        println!("Disappeared:");
        for el in &alignment.before_unmatched {
            println!("  - {}", el.digest());
        }
    }
    if !alignment.after_unmatched.is_empty() {
        println!("Appeared:");
        for el in &alignment.after_unmatched {
            println!("  + {}", el.digest());
        }
    }

    Ok(())
}

// ============================================================================
// dump subcommand
// ============================================================================

pub fn cmd_dump(
    input: &str,
    output: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = load_raw_dump(Path::new(input))?;

    println!(
        "Snapshot of app {} ({} elements)",
        snapshot.app_version,
        snapshot.flatten().len()
    );
    for node in snapshot.flatten() {
        println!("{}{}", "  ".repeat(node.depth), node.digest());
    }

    if let Some(path) = output {
        save_snapshot(Path::new(path), &snapshot)?;
        eprintln!("Wrote normalized snapshot: {}", path);
    }

    Ok(())
}

// ============================================================================
// show subcommand
// ============================================================================

pub fn cmd_show(backtrace_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let entries = read_backtrace(Path::new(backtrace_path))?;

    for entry in &entries {
        let oracle_note = if entry.oracle.is_some() { "  [classifier consulted]" } else { "" };
        println!(
            "step {:>02}  {:<11}  {}{}",
            entry.step,
            format!("{:?}", entry.action.kind),
            verdict_line(&entry.verdict),
            oracle_note
        );
    }

    let mut summary = VerdictSummary::default();
    for entry in &entries {
        summary.count(entry.verdict.kind());
    }
    println!(
        "{} entries: {} resolved, {} ambiguous, {} unresolvable",
        entries.len(),
        summary.resolved,
        summary.ambiguous,
        summary.unresolvable
    );

    Ok(())
}

fn verdict_line(verdict: &RepairVerdict) -> String {
    match verdict {
        RepairVerdict::Resolved {
            element,
            confidence,
            ..
        } => format!("resolved ({:.3}) -> {}", confidence, element.digest()),
        RepairVerdict::Ambiguous { candidates } => {
            format!("ambiguous between {} candidates", candidates.len())
        }
        RepairVerdict::Unresolvable { reason } => format!("unresolvable: {}", reason),
    }
}
