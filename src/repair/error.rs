use std::fmt;

#[derive(Debug)]
pub enum RepairError {
    /// Tree normalization invariant violated (missing or duplicate root,
    /// inconsistent depths). Fatal for that snapshot only.
    MalformedSnapshot { context: String },

    /// Recorded script could not be parsed.
    ScriptFormat { path: String, source: serde_json::Error },

    /// Snapshot file could not be parsed.
    SnapshotParse { path: String, source: serde_json::Error },

    /// Filesystem failure while reading or writing run artifacts.
    Io { context: String, source: std::io::Error },
}

impl fmt::Display for RepairError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairError::MalformedSnapshot { context } => {
                write!(f, "malformed snapshot: {}", context)
            }
            RepairError::ScriptFormat { path, source } => {
                write!(f, "bad script record in {}: {}", path, source)
            }
            RepairError::SnapshotParse { path, source } => {
                write!(f, "cannot parse snapshot {}: {}", path, source)
            }
            RepairError::Io { context, source } => {
                write!(f, "I/O error ({}): {}", context, source)
            }
        }
    }
}

impl std::error::Error for RepairError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepairError::ScriptFormat { source, .. } => Some(source),
            RepairError::SnapshotParse { source, .. } => Some(source),
            RepairError::Io { source, .. } => Some(source),
            RepairError::MalformedSnapshot { .. } => None,
        }
    }
}
