use layout_repair::align::aligner::{align_layout, align_target};
use layout_repair::align::scorer::ScorerConfig;

use crate::common::fixtures::{element, element_by_text, raw_node, snap, snap_sized};

mod common;

// =========================================================================
// Determinism and ordering
// =========================================================================

#[test]
fn repeated_alignment_produces_identical_candidate_lists() {
    let before = snap(vec![raw_node(
        "android.widget.Button",
        Some("com.app:id/save"),
        Some("Save"),
        "[10,10][100,40]",
    )]);
    let after = snap(vec![
        raw_node("android.widget.Button", None, Some("Save"), "[10,10][100,40]"),
        raw_node("android.widget.Button", None, Some("Save as"), "[10,60][100,90]"),
        raw_node("android.widget.Button", None, Some("Discard"), "[10,110][100,140]"),
    ]);
    let target = element(&before, "save");
    let cfg = ScorerConfig::default();

    let first = align_target(&after, &target, &cfg);
    let second = align_target(&after, &target, &cfg);

    assert!(!first.is_empty(), "expected at least one candidate");
    assert_eq!(first, second, "same inputs must give the same ordered list");
}

#[test]
fn candidates_are_sorted_descending_by_score() {
    let before = snap(vec![raw_node(
        "android.widget.Button",
        Some("com.app:id/save"),
        Some("Save"),
        "[10,10][100,40]",
    )]);
    let after = snap(vec![
        raw_node("android.widget.Button", None, Some("Discard"), "[10,110][100,140]"),
        raw_node("android.widget.Button", Some("com.app:id/save"), Some("Save"), "[10,10][100,40]"),
    ]);

    let candidates = align_target(&after, &element(&before, "save"), &ScorerConfig::default());
    for pair in candidates.windows(2) {
        assert!(
            pair[0].score >= pair[1].score,
            "candidate list must be descending: {} before {}",
            pair[0].score,
            pair[1].score
        );
    }
    assert_eq!(
        candidates[0].element.resource_id.as_deref(),
        Some("com.app:id/save"),
        "the attribute-identical element must rank first"
    );
}

// =========================================================================
// Floor
// =========================================================================

#[test]
fn no_candidate_below_the_configured_floor() {
    let before = snap(vec![raw_node(
        "android.widget.Button",
        Some("com.app:id/save"),
        Some("Save"),
        "[10,10][100,40]",
    )]);
    let after = snap(vec![
        raw_node("android.widget.Button", None, Some("Save"), "[10,10][100,40]"),
        raw_node("android.widget.Button", None, Some("Totally different"), "[900,1800][1000,1900]"),
    ]);

    let cfg = ScorerConfig {
        min_score: 0.75,
        ..ScorerConfig::default()
    };
    let candidates = align_target(&after, &element(&before, "save"), &cfg);

    assert!(!candidates.is_empty());
    for c in &candidates {
        assert!(
            c.score >= cfg.min_score,
            "candidate {} scored {} below floor {}",
            c.element.digest(),
            c.score,
            cfg.min_score
        );
    }
}

#[test]
fn empty_candidate_list_is_a_normal_outcome() {
    let before = snap(vec![raw_node(
        "android.widget.Button",
        Some("com.app:id/save"),
        Some("Save"),
        "[10,10][100,40]",
    )]);
    // Nothing on the after screen resembles the target.
    let after = snap(vec![raw_node(
        "android.widget.ProgressBar",
        Some("com.app:id/wait_spinner"),
        None,
        "[500,900][580,980]",
    )]);

    let candidates = align_target(&after, &element(&before, "save"), &ScorerConfig::default());
    assert!(
        candidates.is_empty(),
        "absence of a match is communicated as an empty list, not an error"
    );
}

// =========================================================================
// Search restriction and fallback
// =========================================================================

#[test]
fn type_changed_element_is_still_found_through_fallback() {
    let before = snap(vec![raw_node(
        "android.widget.Button",
        Some("com.app:id/submit"),
        Some("Submit"),
        "[10,10][100,40]",
    )]);
    // The button became a TextView with an unrelated id, keeping text and
    // position: no class or id restriction survives, so the fallback pool
    // must carry the repair.
    let after = snap(vec![raw_node(
        "android.widget.TextView",
        Some("com.app:id/submit_label"),
        Some("Submit"),
        "[10,10][100,40]",
    )]);

    let candidates = align_target(&after, &element(&before, "submit"), &ScorerConfig::default());
    assert_eq!(candidates.len(), 1, "fallback must consider all elements");
    assert_eq!(
        candidates[0].element.text.as_deref(),
        Some("Submit"),
        "text and geometry identify the retyped element"
    );
}

#[test]
fn context_bonus_prefers_the_same_container() {
    let container = |class: &str, id: &str, children| {
        serde_json::json!({
            "class": class,
            "resource_id": id,
            "bounds": "[0,0][1080,960]",
            "children": children,
        })
    };

    let before_raw = serde_json::json!({
        "app_version": "1.0",
        "root": {
            "class": "android.widget.FrameLayout",
            "bounds": "[0,0][1080,1920]",
            "children": [container("android.widget.LinearLayout", "com.app:id/toolbar", vec![raw_node(
                "android.widget.Button", None, Some("Edit"), "[10,10][100,40]",
            )])],
        },
    });
    // Same button twice on the after screen, at the same position; only one
    // sits in the recorded parent container.
    let after_raw = serde_json::json!({
        "app_version": "2.0",
        "root": {
            "class": "android.widget.FrameLayout",
            "bounds": "[0,0][1080,1920]",
            "children": [
                container("android.widget.LinearLayout", "com.app:id/toolbar", vec![raw_node(
                    "android.widget.Button", None, Some("Edit"), "[10,10][100,40]",
                )]),
                container("android.widget.RelativeLayout", "com.app:id/sidebar", vec![raw_node(
                    "android.widget.Button", None, Some("Edit"), "[10,10][100,40]",
                )]),
            ],
        },
    });

    let before = layout_repair::snapshot::normalize::build_snapshot(&before_raw).unwrap();
    let after = layout_repair::snapshot::normalize::build_snapshot(&after_raw).unwrap();

    let target = element_by_text(&before, "Edit");
    let candidates = align_target(&after, &target, &ScorerConfig::default());

    assert!(candidates.len() >= 2);
    assert_eq!(
        candidates[0].element.parent_id.as_deref(),
        Some("com.app:id/toolbar"),
        "the candidate inside the recorded container must win"
    );
    assert!(
        candidates[0].breakdown.context_bonus > 0.0,
        "winner's evidence must show the parent-context bonus"
    );
}

// =========================================================================
// Full-layout alignment
// =========================================================================

#[test]
fn identical_layouts_align_completely() {
    let make = || {
        snap(vec![
            raw_node("android.widget.Button", Some("com.app:id/ok"), Some("OK"), "[10,10][100,40]"),
            raw_node("android.widget.Button", Some("com.app:id/cancel"), Some("Cancel"), "[110,10][200,40]"),
            raw_node("android.widget.TextView", None, Some("Ready"), "[10,60][200,90]"),
        ])
    };
    let before = make();
    let after = make();

    let alignment = align_layout(&before, &after, &ScorerConfig::default());

    assert!(alignment.before_unmatched.is_empty(), "nothing may go unmatched");
    assert!(alignment.after_unmatched.is_empty());
    assert_eq!(alignment.ratio, 1.0);
    assert!(alignment.screens_match);
}

#[test]
fn removed_and_added_elements_land_in_the_unmatched_sets() {
    let before = snap(vec![
        raw_node("android.widget.Button", Some("com.app:id/ok"), Some("OK"), "[10,10][100,40]"),
        raw_node("android.widget.CheckBox", Some("com.app:id/remember"), Some("Remember me"), "[10,60][200,90]"),
    ]);
    let after = snap(vec![
        raw_node("android.widget.Button", Some("com.app:id/ok"), Some("OK"), "[10,10][100,40]"),
        raw_node("android.widget.Switch", Some("com.app:id/dark_mode"), Some("Dark mode"), "[10,110][200,140]"),
    ]);

    let alignment = align_layout(&before, &after, &ScorerConfig::default());

    assert!(
        alignment
            .before_unmatched
            .iter()
            .any(|el| el.resource_id.as_deref() == Some("com.app:id/remember")),
        "the removed checkbox must be reported as disappeared"
    );
    assert!(
        alignment
            .after_unmatched
            .iter()
            .any(|el| el.resource_id.as_deref() == Some("com.app:id/dark_mode")),
        "the new switch must be reported as appeared"
    );
}

#[test]
fn small_screen_fixture_helper_controls_the_diagonal() {
    // Guard for the fixture itself: geometry scores depend on the root
    // diagonal, which snap_sized must honor.
    let small = snap_sized(
        vec![raw_node("android.widget.TextView", None, Some("x"), "[0,0][10,10]")],
        "[0,0][60,240]",
    );
    assert!((small.screen_diagonal() - 247.38).abs() < 0.01);
}
