use serde_json::{json, Value};

use layout_repair::script::action::{ActionKind, RecordedAction};
use layout_repair::snapshot::normalize::build_snapshot;
use layout_repair::snapshot::snapshot_model::{ElementNode, Snapshot};

/// Raw dump node, the shape the automation driver produces.
pub fn raw_node(class: &str, id: Option<&str>, text: Option<&str>, bounds: &str) -> Value {
    json!({
        "class": class,
        "resource_id": id,
        "text": text,
        "bounds": bounds,
        "children": [],
    })
}

pub fn raw_node_with_children(
    class: &str,
    id: Option<&str>,
    bounds: &str,
    children: Vec<Value>,
) -> Value {
    json!({
        "class": class,
        "resource_id": id,
        "text": null,
        "bounds": bounds,
        "children": children,
    })
}

/// Full-size phone screen with the given children under one root frame.
pub fn raw_screen(children: Vec<Value>) -> Value {
    raw_screen_sized(children, "[0,0][1080,1920]")
}

pub fn raw_screen_sized(children: Vec<Value>, root_bounds: &str) -> Value {
    json!({
        "app_version": "1.0",
        "captured_at_ms": 1_700_000_000_000u64,
        "root": raw_node_with_children("android.widget.FrameLayout", None, root_bounds, children),
    })
}

/// Normalize a raw screen into a Snapshot, panicking on fixture mistakes.
pub fn snap(children: Vec<Value>) -> Snapshot {
    build_snapshot(&raw_screen(children)).expect("fixture snapshot must normalize")
}

pub fn snap_sized(children: Vec<Value>, root_bounds: &str) -> Snapshot {
    build_snapshot(&raw_screen_sized(children, root_bounds))
        .expect("fixture snapshot must normalize")
}

/// Pull an element out of a built snapshot by resource-id substring, as a
/// childless bundle the way a recorder would have captured it.
pub fn element(snapshot: &Snapshot, id_part: &str) -> ElementNode {
    snapshot
        .flatten()
        .into_iter()
        .find(|el| {
            el.resource_id
                .as_deref()
                .is_some_and(|id| id.contains(id_part))
        })
        .unwrap_or_else(|| panic!("no element with id containing '{}'", id_part))
        .without_children()
}

/// Pull an element by visible text instead.
pub fn element_by_text(snapshot: &Snapshot, text: &str) -> ElementNode {
    snapshot
        .flatten()
        .into_iter()
        .find(|el| el.text.as_deref() == Some(text))
        .unwrap_or_else(|| panic!("no element with text '{}'", text))
        .without_children()
}

pub fn tap(target: ElementNode) -> RecordedAction {
    RecordedAction::new(ActionKind::Tap, Some(target))
}

pub fn input_text(target: ElementNode, text: &str) -> RecordedAction {
    RecordedAction::new(ActionKind::InputText, Some(target))
        .with_parameter("text", json!(text))
}

pub fn swipe(fx: i32, fy: i32, tx: i32, ty: i32) -> RecordedAction {
    RecordedAction::new(ActionKind::Swipe, None)
        .with_parameter("fx", json!(fx))
        .with_parameter("fy", json!(fy))
        .with_parameter("tx", json!(tx))
        .with_parameter("ty", json!(ty))
}
