use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::snapshot::snapshot_model::ElementNode;

/// Kind of a recorded interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Tap,
    LongTap,
    InputText,
    Swipe,
    Assert,
}

impl ActionKind {
    /// Swipes act on coordinates, not on an element, so they carry no
    /// target and are replayed as recorded.
    pub fn needs_target(self) -> bool {
        !matches!(self, ActionKind::Swipe)
    }
}

/// One recorded script step.
///
/// The target is the full attribute bundle captured at recording time, not a
/// live reference: the tree it came from no longer exists at repair time.
/// Parameters hold kind-specific extras (text to type, swipe deltas, assert
/// oracle values) plus bookkeeping tags such as `repaired`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ElementNode>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

impl RecordedAction {
    pub fn new(kind: ActionKind, target: Option<ElementNode>) -> RecordedAction {
        RecordedAction {
            kind,
            target,
            parameters: Map::new(),
        }
    }

    pub fn with_parameter(mut self, key: &str, value: Value) -> RecordedAction {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn is_repaired(&self) -> bool {
        self.parameters
            .get("repaired")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
