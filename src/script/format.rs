use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::repair::error::RepairError;
use crate::script::action::RecordedAction;
use crate::snapshot::normalize;
use crate::snapshot::snapshot_model::Snapshot;

/// Load a recorded script: one JSON action per line, blank lines ignored.
pub fn load_script(path: &Path) -> Result<Vec<RecordedAction>, RepairError> {
    let content = std::fs::read_to_string(path).map_err(|source| RepairError::Io {
        context: format!("reading script {}", path.display()),
        source,
    })?;

    let mut actions = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let action = serde_json::from_str(line).map_err(|source| RepairError::ScriptFormat {
            path: path.display().to_string(),
            source,
        })?;
        actions.push(action);
    }
    Ok(actions)
}

/// Write a script back in the same ordered line format it was read from.
pub fn save_script(path: &Path, actions: &[RecordedAction]) -> Result<(), RepairError> {
    let mut lines = Vec::with_capacity(actions.len());
    for action in actions {
        let line = serde_json::to_string(action).map_err(|source| RepairError::ScriptFormat {
            path: path.display().to_string(),
            source,
        })?;
        lines.push(line);
    }
    let mut content = lines.join("\n");
    content.push('\n');

    std::fs::write(path, content).map_err(|source| RepairError::Io {
        context: format!("writing script {}", path.display()),
        source,
    })
}

/// Load a normalized snapshot file and check its tree invariants.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, RepairError> {
    let content = std::fs::read_to_string(path).map_err(|source| RepairError::Io {
        context: format!("reading snapshot {}", path.display()),
        source,
    })?;
    let snapshot: Snapshot =
        serde_json::from_str(&content).map_err(|source| RepairError::SnapshotParse {
            path: path.display().to_string(),
            source,
        })?;
    normalize::validate(&snapshot)?;
    Ok(snapshot)
}

pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), RepairError> {
    let content =
        serde_json::to_string_pretty(snapshot).map_err(|source| RepairError::SnapshotParse {
            path: path.display().to_string(),
            source,
        })?;
    std::fs::write(path, content).map_err(|source| RepairError::Io {
        context: format!("writing snapshot {}", path.display()),
        source,
    })
}

/// Load a raw device dump and normalize it into a Snapshot.
pub fn load_raw_dump(path: &Path) -> Result<Snapshot, RepairError> {
    let content = std::fs::read_to_string(path).map_err(|source| RepairError::Io {
        context: format!("reading dump {}", path.display()),
        source,
    })?;
    let raw: Value = serde_json::from_str(&content).map_err(|source| RepairError::SnapshotParse {
        path: path.display().to_string(),
        source,
    })?;
    normalize::build_snapshot(&raw)
}

/// A recording on disk: `script.jsonl` plus the per-step layouts captured
/// when the script was recorded, `snapshots/step_NN.json`.
pub struct ScriptBundle {
    pub dir: PathBuf,
    pub actions: Vec<RecordedAction>,
}

impl ScriptBundle {
    pub fn load(dir: &Path) -> Result<ScriptBundle, RepairError> {
        let actions = load_script(&dir.join("script.jsonl"))?;
        Ok(ScriptBundle {
            dir: dir.to_path_buf(),
            actions,
        })
    }

    /// Layout captured just before step `index` was recorded.
    pub fn recorded_snapshot(&self, index: usize) -> Result<Snapshot, RepairError> {
        load_snapshot(&self.snapshot_path(index))
    }

    pub fn snapshot_path(&self, index: usize) -> PathBuf {
        self.dir.join("snapshots").join(format!("step_{:02}.json", index))
    }

    pub fn repaired_script_path(&self) -> PathBuf {
        self.dir.join("repaired.jsonl")
    }

    pub fn backtrace_path(&self) -> PathBuf {
        self.dir.join("backtrace.jsonl")
    }
}
