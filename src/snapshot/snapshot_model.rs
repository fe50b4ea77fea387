use serde::{Deserialize, Serialize};

/// Screen rectangle in device pixels, `[x0,y0][x1,y1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Bounds {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Bounds {
        Bounds { x0, y0, x1, y1 }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x0 + self.x1) / 2.0,
            f64::from(self.y0 + self.y1) / 2.0,
        )
    }

    pub fn diagonal(&self) -> f64 {
        let w = f64::from(self.x1 - self.x0);
        let h = f64::from(self.y1 - self.y0);
        (w * w + h * h).sqrt()
    }

    pub fn center_distance(&self, other: &Bounds) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        let (dx, dy) = (ax - bx, ay - by);
        (dx * dx + dy * dy).sqrt()
    }
}

/// One node of a captured UI tree.
///
/// Attributes are normalized at construction time (see `snapshot::normalize`)
/// so scoring is stable across captures. Parent class/identifier are
/// denormalized onto each node because cross-snapshot matching scores a node
/// against a recorded attribute bundle whose original tree no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub resource_id: Option<String>,
    pub class_name: String,
    pub text: Option<String>,
    pub bounds: Bounds,
    pub depth: usize,
    /// Index among siblings, in capture order.
    pub ordinal: usize,
    /// Ancestor class names, root first.
    pub ancestors: Vec<String>,
    pub parent_class: Option<String>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<ElementNode>,
}

impl ElementNode {
    /// Copy of this node with the subtree dropped. Used wherever a node
    /// leaves its snapshot: candidates, verdicts, repaired actions.
    pub fn without_children(&self) -> ElementNode {
        ElementNode {
            children: vec![],
            ..self.clone()
        }
    }

    /// Compact one-line summary of the matching-relevant attributes.
    pub fn digest(&self) -> String {
        format!(
            "{{c:{} r:{} t:{} b:[{},{}][{},{}]}}",
            self.class_name,
            self.resource_id.as_deref().unwrap_or(""),
            self.text.as_deref().unwrap_or(""),
            self.bounds.x0,
            self.bounds.y0,
            self.bounds.x1,
            self.bounds.y1,
        )
    }
}

/// A UI tree captured at one point in time. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub root: ElementNode,
    pub captured_at_ms: u128,
    /// Opaque app-version tag supplied by the capture side.
    pub app_version: String,
}

impl Snapshot {
    /// Depth-first, sibling-order-preserving traversal.
    pub fn flatten(&self) -> Vec<&ElementNode> {
        let mut out = Vec::new();
        flatten_into(&self.root, &mut out);
        out
    }

    /// Diagonal of the root bounds, used to normalize geometric distances.
    /// Never smaller than 1.0 so division stays safe on degenerate roots.
    pub fn screen_diagonal(&self) -> f64 {
        self.root.bounds.diagonal().max(1.0)
    }
}

fn flatten_into<'a>(node: &'a ElementNode, out: &mut Vec<&'a ElementNode>) {
    out.push(node);
    for child in &node.children {
        flatten_into(child, out);
    }
}
