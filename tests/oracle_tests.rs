use layout_repair::align::aligner::align_target;
use layout_repair::align::scorer::ScorerConfig;
use layout_repair::oracle::classifier::{Choice, Disambiguator, MockBackend};

use crate::common::fixtures::{element_by_text, raw_node, snap};

mod common;

fn near_tied_fixture() -> (
    layout_repair::snapshot::snapshot_model::ElementNode,
    Vec<layout_repair::align::aligner::AlignmentCandidate>,
) {
    let before = snap(vec![raw_node(
        "android.widget.Button",
        None,
        Some("Delete"),
        "[490,900][590,960]",
    )]);
    let after = snap(vec![
        raw_node("android.widget.Button", None, Some("Delete"), "[490,800][590,860]"),
        raw_node("android.widget.Button", None, Some("Delete"), "[490,1000][590,1060]"),
    ]);
    let target = element_by_text(&before, "Delete");
    let candidates = align_target(&after, &target, &ScorerConfig::default());
    (target, candidates)
}

#[test]
fn valid_reply_picks_a_candidate() {
    let (target, candidates) = near_tied_fixture();
    let disambiguator = Disambiguator::new(Box::new(MockBackend::picking(1)));

    let (choice, exchange) = disambiguator.disambiguate(&target, &candidates);
    assert_eq!(choice, Choice::Pick(1));
    assert!(exchange.response.is_some());
    assert!(
        exchange.prompt.contains("0.") || exchange.prompt.contains("class="),
        "prompt must describe the candidates"
    );
}

#[test]
fn unreachable_collaborator_defers() {
    let (target, candidates) = near_tied_fixture();
    let disambiguator = Disambiguator::new(Box::new(MockBackend::unreachable()));

    let (choice, exchange) = disambiguator.disambiguate(&target, &candidates);
    assert_eq!(choice, Choice::Defer, "timeouts degrade to Defer");
    assert!(exchange.response.is_none(), "the failed exchange is still recorded");
}

#[test]
fn garbage_reply_defers() {
    let (target, candidates) = near_tied_fixture();
    let disambiguator = Disambiguator::new(Box::new(MockBackend {
        reply: Some("the second one looks right to me".into()),
    }));

    let (choice, _) = disambiguator.disambiguate(&target, &candidates);
    assert_eq!(choice, Choice::Defer, "free text is not a valid choice");
}

#[test]
fn null_choice_reply_defers() {
    let (target, candidates) = near_tied_fixture();
    let disambiguator = Disambiguator::new(Box::new(MockBackend {
        reply: Some(r#"{"choice": null}"#.into()),
    }));

    let (choice, _) = disambiguator.disambiguate(&target, &candidates);
    assert_eq!(choice, Choice::Defer, "'none apply' is a defer, not an error");
}

#[test]
fn out_of_range_choice_defers() {
    let (target, candidates) = near_tied_fixture();
    let disambiguator = Disambiguator::new(Box::new(MockBackend::picking(17)));

    let (choice, _) = disambiguator.disambiguate(&target, &candidates);
    assert_eq!(
        choice,
        Choice::Defer,
        "an index beyond the candidate list must not be trusted"
    );
}

#[test]
fn prompt_is_bounded_to_the_candidates_given() {
    let (target, candidates) = near_tied_fixture();
    let disambiguator = Disambiguator::new(Box::new(MockBackend::unreachable()));

    let (_, exchange) = disambiguator.disambiguate(&target, &candidates[..1]);
    assert!(
        !exchange.prompt.contains("  1. "),
        "only the candidates handed over may appear in the prompt"
    );
}
