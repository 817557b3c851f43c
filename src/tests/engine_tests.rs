use std::sync::Arc;

use crate::by::By;
use crate::condition::Condition;
use crate::element::UiElement;
use crate::engine::SearchEngine;
use crate::errors::ParseError;
use crate::properties;
use crate::search::SearchPart;
use crate::tests::mock::{MockTree, NodeSpec};

fn by(description: &str) -> By {
    match By::path(description) {
        Ok(by) => by,
        Err(err) => panic!("failed to parse {description:?}: {err}"),
    }
}

#[test]
fn finds_a_named_button_within_the_default_depth() {
    super::init_tracing();
    let tree = Arc::new(MockTree::build(
        NodeSpec::named("Window", "main").child(
            NodeSpec::named("Pane", "body")
                .child(NodeSpec::named("Button", "Cancel"))
                .child(NodeSpec::named("Button", "OK")),
        ),
    ));
    let engine = SearchEngine::new(tree.clone());
    let found = engine.find_first(&by("//Button[@Name='OK']"), None);
    assert_eq!(found, Some(tree.find_named("OK")));
}

#[test]
fn default_depth_misses_deeply_nested_targets() {
    let mut spec = NodeSpec::named("Button", "target");
    for level in (1..=6).rev() {
        spec = NodeSpec::named("Pane", &format!("level{level}")).child(spec);
    }
    let tree = Arc::new(MockTree::build(spec));
    let engine = SearchEngine::new(tree.clone());
    assert_eq!(engine.find_first(&by("//Button"), None), None);
}

#[test]
fn parent_relative_searches_index_the_siblings() {
    let tree = Arc::new(MockTree::build(
        NodeSpec::named("Window", "root")
            .child(NodeSpec::named("Pane", "first"))
            .child(NodeSpec::named("Pane", "second"))
            .child(NodeSpec::named("Pane", "third"))
            .child(NodeSpec::named("Button", "start")),
    ));
    let engine = SearchEngine::new(tree.clone());
    let start = tree.find_named("start");
    let results: Vec<UiElement> = engine
        .find_all(&by("../[@ControlType='Pane'][2]"), Some(&start))
        .collect();
    assert_eq!(
        results,
        vec![tree.find_named("second"), tree.find_named("third")]
    );
}

#[test]
fn child_searches_stay_on_one_level() {
    let tree = Arc::new(MockTree::build(
        NodeSpec::named("ToolBar", "bar")
            .child(NodeSpec::named("Button", "Save file"))
            .child(NodeSpec::named("Button", "SAVE ALL"))
            .child(NodeSpec::named("Group", "group").child(NodeSpec::named("Button", "Save as"))),
    ));
    let engine = SearchEngine::new(tree.clone());
    let results: Vec<UiElement> = engine
        .find_all(&by("/_[contains(@Name,'Save')]"), None)
        .collect();
    assert_eq!(results, vec![tree.find_named("Save file")]);
}

#[test]
fn malformed_descriptions_report_the_fragment() {
    match By::path("//Button[@Name=]") {
        Err(ParseError::MalformedPropertyCondition(fragment)) => assert_eq!(fragment, "@Name="),
        other => panic!("expected MalformedPropertyCondition, got {other:?}"),
    }
}

#[test]
fn find_first_stops_walking_after_the_first_match() {
    super::init_tracing();
    let spec = || {
        NodeSpec::named("Window", "main")
            .child(
                NodeSpec::named("Pane", "left")
                    .child(NodeSpec::named("Button", "OK"))
                    .child(NodeSpec::named("Button", "Cancel")),
            )
            .child(
                NodeSpec::named("Pane", "right")
                    .child(NodeSpec::named("Button", "Apply"))
                    .child(NodeSpec::named("Button", "Help")),
            )
    };

    let first_tree = Arc::new(MockTree::build(spec()));
    let engine = SearchEngine::new(first_tree.clone());
    assert!(engine.find_first(&by("//Button"), None).is_some());
    let first_calls = first_tree.nav_calls();

    let all_tree = Arc::new(MockTree::build(spec()));
    let engine = SearchEngine::new(all_tree.clone());
    assert_eq!(engine.find_all(&by("//Button"), None).count(), 4);
    let all_calls = all_tree.nav_calls();

    assert!(
        first_calls < all_calls,
        "find_first should stop early: {first_calls} vs {all_calls} navigation calls"
    );
}

#[test]
fn explicit_roots_override_the_tree_root() {
    let tree = Arc::new(MockTree::build(
        NodeSpec::named("Window", "main")
            .child(NodeSpec::named("Pane", "left").child(NodeSpec::named("Button", "inner")))
            .child(NodeSpec::named("Button", "outer")),
    ));
    let engine = SearchEngine::new(tree.clone());

    let from_root = engine.find_first(&by("/Button"), None);
    assert_eq!(from_root, Some(tree.find_named("outer")));

    let left = tree.find_named("left");
    let from_left = engine.find_first(&by("/Button"), Some(&left));
    assert_eq!(from_left, Some(tree.find_named("inner")));
}

#[test]
fn builder_searches_mirror_descriptions() {
    let tree = Arc::new(MockTree::build(
        NodeSpec::named("Window", "main")
            .child(NodeSpec::named("Button", "OK").prop("AutomationId", "ok-button"))
            .child(NodeSpec::named("Button", "Cancel"))
            .child(NodeSpec::named("Edit", "input")),
    ));
    let engine = SearchEngine::new(tree.clone());

    let search = By::name("OK").and_property(properties::AUTOMATION_ID, "ok-button");
    assert_eq!(
        search.description(),
        "//_[@Name='OK' and @AutomationId='ok-button']"
    );
    assert_eq!(engine.find_first(&search, None), Some(tree.find_named("OK")));

    let either = By::name("Cancel").or(Condition::property(properties::NAME, "input"));
    assert_eq!(engine.find_all(&either, None).count(), 2);

    let parents = By::control_type("Button").append(by(".."));
    let results: Vec<UiElement> = engine.find_all(&parents, None).collect();
    assert_eq!(results, vec![tree.root_element(), tree.root_element()]);

    let sliced = By::control_type("Button").skip(1).take(1);
    let results: Vec<UiElement> = engine.find_all(&sliced, None).collect();
    assert_eq!(results, vec![tree.find_named("Cancel")]);
}

#[test]
#[should_panic(expected = "empty nested search part")]
fn conditions_cannot_merge_into_an_empty_sequence() {
    let _ = By::from_part(SearchPart::nested(Vec::new()))
        .and(Condition::property(properties::NAME, "OK"));
}

#[test]
fn function_conditions_run_host_predicates() {
    let tree = Arc::new(MockTree::build(
        NodeSpec::named("Window", "main")
            .child(NodeSpec::named("Button", "OK"))
            .child(NodeSpec::named("Button", "Long button name")),
    ));
    let engine = SearchEngine::new(tree.clone());
    let search = By::function("long_name", |element: &UiElement| {
        element.name().is_some_and(|name| name.len() > 10)
    });
    assert_eq!(
        engine.find_first(&search, None),
        Some(tree.find_named("Long button name"))
    );
}

#[test]
fn by_parses_from_str() {
    let search: By = match "//Edit".parse() {
        Ok(search) => search,
        Err(err) => panic!("parse failed: {err}"),
    };
    assert_eq!(search.description(), "//Edit");
}

#[test]
fn engines_share_the_tree_when_cloned() {
    let tree = Arc::new(MockTree::build(NodeSpec::named("Window", "main")));
    let engine = SearchEngine::new(tree.clone());
    let copy = engine.clone();
    assert_eq!(copy.find_first(&by("."), None), Some(tree.root_element()));
}
