use serde_json::Value;

use crate::repair::error::RepairError;
use crate::snapshot::snapshot_model::{Bounds, ElementNode, Snapshot};

/// Trim and collapse whitespace runs; empty strings become None so absent
/// and blank attributes score identically.
pub fn normalize_text(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Class names are compared case-insensitively across captures.
pub fn normalize_class(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Strip the `<package>:id/` prefix from an Android resource identifier.
/// The stem survives package renames between app builds; the prefix does not.
pub fn id_stem(id: &str) -> &str {
    match id.rfind(":id/") {
        Some(pos) => &id[pos + ":id/".len()..],
        None => id,
    }
}

/// Build a normalized Snapshot from a raw device-tree dump.
///
/// Expected shape: `{"root": {<node>}, "app_version": "...", "captured_at_ms": n}`
/// where each node carries `class`, optional `resource_id`/`text`, `bounds`
/// (either an `[l,t][r,b]` string or an object), and `children`.
pub fn build_snapshot(raw: &Value) -> Result<Snapshot, RepairError> {
    let root_value = match raw.get("root") {
        Some(v @ Value::Object(_)) => v,
        Some(Value::Array(roots)) if roots.len() == 1 => &roots[0],
        Some(Value::Array(roots)) => {
            return Err(RepairError::MalformedSnapshot {
                context: format!("expected exactly one root, found {}", roots.len()),
            });
        }
        _ => {
            return Err(RepairError::MalformedSnapshot {
                context: "dump has no 'root' node".into(),
            });
        }
    };

    let root = build_node(root_value, 0, 0, &[], None, None)?;

    let captured_at_ms = raw
        .get("captured_at_ms")
        .and_then(Value::as_u64)
        .map_or(0, u128::from);
    let app_version = raw
        .get("app_version")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    Ok(Snapshot {
        root,
        captured_at_ms,
        app_version,
    })
}

fn build_node(
    value: &Value,
    depth: usize,
    ordinal: usize,
    ancestors: &[String],
    parent_class: Option<&str>,
    parent_id: Option<&str>,
) -> Result<ElementNode, RepairError> {
    let obj = value.as_object().ok_or_else(|| RepairError::MalformedSnapshot {
        context: format!("node at depth {} is not an object", depth),
    })?;

    let class_name = normalize_class(
        obj.get("class")
            .and_then(Value::as_str)
            .unwrap_or_default(),
    );
    let resource_id = obj
        .get("resource_id")
        .or_else(|| obj.get("resource-id"))
        .and_then(Value::as_str)
        .and_then(normalize_text);
    let text = obj.get("text").and_then(Value::as_str).and_then(normalize_text);
    let bounds = parse_bounds(obj.get("bounds").unwrap_or(&Value::Null));

    let mut child_ancestors = ancestors.to_vec();
    child_ancestors.push(class_name.clone());

    let mut children = vec![];
    if let Some(raw_children) = obj.get("children").and_then(Value::as_array) {
        for (i, child) in raw_children.iter().enumerate() {
            children.push(build_node(
                child,
                depth + 1,
                i,
                &child_ancestors,
                Some(&class_name),
                resource_id.as_deref(),
            )?);
        }
    }

    Ok(ElementNode {
        resource_id,
        class_name,
        text,
        bounds,
        depth,
        ordinal,
        ancestors: ancestors.to_vec(),
        parent_class: parent_class.map(str::to_string),
        parent_id: parent_id.map(str::to_string),
        children,
    })
}

/// Parse bounds from either the Android dump string `[l,t][r,b]` or an
/// object with x0/y0/x1/y1. Unparseable bounds become the zero rectangle.
pub fn parse_bounds(value: &Value) -> Bounds {
    match value {
        Value::String(s) => parse_bounds_str(s).unwrap_or_default(),
        Value::Object(_) => serde_json::from_value(value.clone()).unwrap_or_default(),
        _ => Bounds::default(),
    }
}

fn parse_bounds_str(s: &str) -> Option<Bounds> {
    let mut coords = [0i32; 4];
    let mut idx = 0;
    for part in s.split(['[', ']', ',']) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if idx >= 4 {
            return None;
        }
        coords[idx] = part.parse().ok()?;
        idx += 1;
    }
    if idx != 4 {
        return None;
    }
    Some(Bounds::new(coords[0], coords[1], coords[2], coords[3]))
}

/// Check the structural invariants a loaded snapshot must satisfy: the root
/// sits at depth 0 / ordinal 0 and every child records depth = parent + 1.
pub fn validate(snapshot: &Snapshot) -> Result<(), RepairError> {
    if snapshot.root.depth != 0 || snapshot.root.ordinal != 0 {
        return Err(RepairError::MalformedSnapshot {
            context: format!(
                "root at depth {} ordinal {}, expected 0/0",
                snapshot.root.depth, snapshot.root.ordinal
            ),
        });
    }
    validate_node(&snapshot.root)
}

fn validate_node(node: &ElementNode) -> Result<(), RepairError> {
    for (i, child) in node.children.iter().enumerate() {
        if child.depth != node.depth + 1 {
            return Err(RepairError::MalformedSnapshot {
                context: format!(
                    "child {} of {} at depth {}, expected {}",
                    i,
                    node.digest(),
                    child.depth,
                    node.depth + 1
                ),
            });
        }
        validate_node(child)?;
    }
    Ok(())
}

/// Stable digest of a whole layout, used to recognize identical captures in
/// the backtrace without storing the trees themselves.
pub fn layout_fingerprint(snapshot: &Snapshot) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    for node in snapshot.flatten() {
        hasher.update(node.digest().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
