use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::condition::{BooleanOp, Condition, MatchOptions};
use crate::properties;
use crate::search::SearchPart;
use crate::tests::mock::{MockTree, NodeSpec};

fn button(name: &str) -> MockTree {
    MockTree::build(NodeSpec::named("Button", name))
}

#[test]
fn property_condition_matches_exact_value() {
    let tree = button("Save");
    let element = tree.root_element();
    assert!(Condition::property(properties::NAME, "Save").check(&element));
    assert!(!Condition::property(properties::NAME, "save").check(&element));
    assert!(!Condition::property(properties::NAME, "Sav").check(&element));
}

#[test]
fn contains_and_ignore_case_flags() {
    let tree = button("Save document");
    let element = tree.root_element();
    let check = |value: &str, options: MatchOptions| {
        Condition::property_with_options(properties::NAME, value, options).check(&element)
    };
    assert!(check("doc", MatchOptions::CONTAINS));
    assert!(check("SAVE DOCUMENT", MatchOptions::IGNORE_CASE));
    assert!(check("DOC", MatchOptions::CONTAINS | MatchOptions::IGNORE_CASE));
    assert!(!check("DOC", MatchOptions::CONTAINS));
}

#[test]
fn unequal_inverts_the_comparison() {
    let tree = button("Save");
    let element = tree.root_element();
    let unequal = |value: &str| {
        Condition::property_with_options(properties::NAME, value, MatchOptions::UNEQUAL)
            .check(&element)
    };
    assert!(unequal("Cancel"));
    assert!(!unequal("Save"));
}

#[test]
fn non_string_values_compare_by_equality() {
    let tree = MockTree::build(
        NodeSpec::new("Button")
            .prop("IsEnabled", true)
            .prop("ProcessId", 42),
    );
    let element = tree.root_element();
    assert!(Condition::property("IsEnabled", true).check(&element));
    assert!(!Condition::property("IsEnabled", false).check(&element));
    assert!(Condition::property("ProcessId", 42).check(&element));
    assert!(!Condition::property("ProcessId", 7).check(&element));
}

#[test]
fn missing_properties_never_match() {
    let tree = MockTree::build(NodeSpec::new("Button"));
    let element = tree.root_element();
    assert!(!Condition::property(properties::NAME, "anything").check(&element));
    assert!(
        Condition::property_with_options(properties::NAME, "anything", MatchOptions::UNEQUAL)
            .check(&element)
    );
}

#[test]
fn empty_composites_are_true() {
    let tree = button("ok");
    let element = tree.root_element();
    assert!(Condition::And(Vec::new()).check(&element));
    assert!(Condition::Or(Vec::new()).check(&element));
}

#[test]
fn or_short_circuits_after_a_match() {
    let tree = button("Save");
    let element = tree.root_element();
    let calls = Arc::new(AtomicUsize::new(0));

    let captured = Arc::clone(&calls);
    let counting = Condition::function("counting", move |_| {
        captured.fetch_add(1, Ordering::SeqCst);
        true
    });
    let condition = Condition::property(properties::NAME, "Save").or(counting);
    assert!(condition.check(&element));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let captured = Arc::clone(&calls);
    let counting = Condition::function("counting", move |_| {
        captured.fetch_add(1, Ordering::SeqCst);
        true
    });
    let condition = Condition::property(properties::NAME, "other").and(counting);
    assert!(!condition.check(&element));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn not_inverts_the_inner_condition() {
    let tree = button("Save");
    let element = tree.root_element();
    assert!(Condition::property(properties::NAME, "Cancel").not().check(&element));
    assert!(!Condition::property(properties::NAME, "Save").not().check(&element));
}

#[test]
fn has_element_checks_for_a_matching_descendant() {
    let tree = MockTree::build(
        NodeSpec::named("Window", "main")
            .child(NodeSpec::named("Pane", "body").child(NodeSpec::named("Button", "OK"))),
    );
    let root = tree.root_element();
    let buttons = SearchPart::deep_descendants()
        .with_condition(Condition::property(properties::CONTROL_TYPE, "Button"));
    assert!(Condition::has_element(buttons).check(&root));
    let edits = SearchPart::deep_descendants()
        .with_condition(Condition::property(properties::CONTROL_TYPE, "Edit"));
    assert!(!Condition::has_element(edits).check(&root));
}

#[test]
fn relative_to_walks_matching_siblings() {
    let tree = MockTree::build(
        NodeSpec::named("Pane", "form")
            .child(NodeSpec::named("Text", "label"))
            .child(NodeSpec::named("Edit", "field"))
            .child(NodeSpec::named("Text", "hint"))
            .child(NodeSpec::named("Text", "unit")),
    );
    let field = tree.find_named("field");
    let is_text = || Condition::property(properties::CONTROL_TYPE, "Text");
    assert!(Condition::relative_to(1, is_text()).check(&field));
    assert!(Condition::relative_to(2, is_text()).check(&field));
    assert!(!Condition::relative_to(3, is_text()).check(&field));
    assert!(Condition::relative_to(-1, is_text()).check(&field));
    assert!(!Condition::relative_to(-2, is_text()).check(&field));
    assert!(!Condition::relative_to(0, is_text()).check(&field));
    let is_edit = Condition::property(properties::CONTROL_TYPE, "Edit");
    assert!(Condition::relative_to(0, is_edit).check(&field));
}

#[test]
fn append_flattens_same_operator_composites() {
    let a = Condition::property(properties::NAME, "a");
    let b = Condition::property(properties::AUTOMATION_ID, "b");
    let c = Condition::property(properties::CONTROL_TYPE, "Button");
    let d = Condition::property("HelpText", "d");

    let mut condition = a.clone().and(b.clone());
    condition.append(Condition::And(vec![c.clone(), d.clone()]), BooleanOp::And);
    assert_eq!(
        condition,
        Condition::And(vec![a.clone(), b.clone(), c, d])
    );

    condition.append(b.clone(), BooleanOp::And);
    match &condition {
        Condition::And(children) => assert_eq!(children.len(), 4),
        other => panic!("expected And, got {other:?}"),
    }

    let mut condition = a.clone().and(b.clone());
    condition.append(Condition::Or(vec![a.clone(), b.clone()]), BooleanOp::Or);
    assert_eq!(
        condition,
        Condition::Or(vec![
            Condition::And(vec![a.clone(), b.clone()]),
            Condition::Or(vec![a, b]),
        ])
    );
}

#[test]
fn merge_replaces_or_combines() {
    let a = Condition::property(properties::NAME, "a");
    let b = Condition::property(properties::NAME, "b");
    assert_eq!(Condition::merge(None, a.clone(), BooleanOp::And), a);
    assert_eq!(
        Condition::merge(Some(a.clone()), b.clone(), BooleanOp::Or),
        Condition::Or(vec![a, b])
    );
}

#[test]
fn function_conditions_compare_by_predicate_identity() {
    let original = Condition::function("always", |_| true);
    let cloned = original.clone();
    assert_eq!(original, cloned);
    let rebuilt = Condition::function("always", |_| true);
    assert_ne!(original, rebuilt);
}

#[test]
fn conditions_render_in_description_syntax() {
    assert_eq!(
        Condition::property(properties::NAME, "OK").to_string(),
        "@Name='OK'"
    );
    assert_eq!(
        Condition::property_with_options(properties::NAME, "Save", MatchOptions::CONTAINS)
            .to_string(),
        "@Name~='Save'"
    );
    assert_eq!(
        Condition::property(properties::NAME, "it's").to_string(),
        "@Name=\"it's\""
    );
    assert_eq!(
        Condition::property_with_options(
            properties::NAME,
            "OK",
            MatchOptions::UNEQUAL | MatchOptions::IGNORE_CASE
        )
        .to_string(),
        "@Name!=~'OK'"
    );
    assert_eq!(
        Condition::property(properties::NAME, "OK")
            .and(Condition::property(properties::AUTOMATION_ID, "ok"))
            .to_string(),
        "(@Name='OK' and @AutomationId='ok')"
    );
    assert_eq!(
        Condition::property(properties::NAME, "OK").not().to_string(),
        "not(@Name='OK')"
    );
    assert_eq!(
        Condition::relative_to(2, Condition::property(properties::NAME, "x")).to_string(),
        "relative(2, @Name='x')"
    );
    assert_eq!(Condition::property("IsEnabled", true).to_string(), "@IsEnabled=true");
}
