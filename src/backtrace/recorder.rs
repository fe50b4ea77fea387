use std::io::Write;
use std::path::Path;

use crate::backtrace::record::{BacktraceEntry, VerdictSummary};
use crate::repair::error::RepairError;

/// Append-only log of repair attempts for one run. Entries stay in
/// execution order; nothing is ever rewritten or removed once appended.
#[derive(Debug, Default)]
pub struct BacktraceRecorder {
    entries: Vec<BacktraceEntry>,
}

impl BacktraceRecorder {
    pub fn new() -> BacktraceRecorder {
        BacktraceRecorder { entries: vec![] }
    }

    pub fn append(&mut self, entry: BacktraceEntry) {
        self.entries.push(entry);
    }

    /// Entries in execution order, for persistence.
    pub fn export(&self) -> &[BacktraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts by verdict kind, for reporting.
    pub fn summarize(&self) -> VerdictSummary {
        let mut summary = VerdictSummary::default();
        for entry in &self.entries {
            summary.count(entry.verdict.kind());
        }
        summary
    }

    /// Write the whole run as JSONL, once, at run end.
    pub fn persist(&self, path: &Path) -> Result<(), RepairError> {
        let mut file = std::fs::File::create(path).map_err(|source| RepairError::Io {
            context: format!("creating backtrace {}", path.display()),
            source,
        })?;

        for entry in &self.entries {
            let json = serde_json::to_string(entry).map_err(|source| RepairError::SnapshotParse {
                path: path.display().to_string(),
                source,
            })?;
            writeln!(file, "{}", json).map_err(|source| RepairError::Io {
                context: format!("writing backtrace {}", path.display()),
                source,
            })?;
        }
        Ok(())
    }
}

/// Read a persisted backtrace back, in its original order.
pub fn read_backtrace(path: &Path) -> Result<Vec<BacktraceEntry>, RepairError> {
    let content = std::fs::read_to_string(path).map_err(|source| RepairError::Io {
        context: format!("reading backtrace {}", path.display()),
        source,
    })?;

    let mut entries = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(line).map_err(|source| RepairError::SnapshotParse {
            path: path.display().to_string(),
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
