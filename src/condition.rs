//! Conditions evaluated against a single element.
//!
//! A [`Condition`] is a boolean tree over property comparisons, host
//! predicates, sibling lookups and existential sub-searches. Checking never
//! mutates the tree, so one parsed description can be evaluated against any
//! number of elements.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::element::UiElement;
use crate::search::SearchPart;

/// Flags altering how a [`PropertyCondition`] compares string values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchOptions(u8);

impl MatchOptions {
    /// Exact, case-sensitive comparison.
    pub const NONE: MatchOptions = MatchOptions(0);
    /// Match when the actual value contains the expected value.
    pub const CONTAINS: MatchOptions = MatchOptions(1);
    /// Lowercase both sides before comparing.
    pub const IGNORE_CASE: MatchOptions = MatchOptions(1 << 1);
    /// Invert the result of the comparison.
    pub const UNEQUAL: MatchOptions = MatchOptions(1 << 2);

    /// True when every flag in `other` is set in `self`.
    pub fn has(self, other: MatchOptions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for MatchOptions {
    type Output = MatchOptions;

    fn bitor(self, rhs: MatchOptions) -> MatchOptions {
        MatchOptions(self.0 | rhs.0)
    }
}

impl BitOrAssign for MatchOptions {
    fn bitor_assign(&mut self, rhs: MatchOptions) {
        self.0 |= rhs.0;
    }
}

/// Compares one property of an element against an expected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCondition {
    pub property: String,
    pub value: Value,
    pub options: MatchOptions,
}

impl PropertyCondition {
    pub fn new(property: impl Into<String>, value: impl Into<Value>, options: MatchOptions) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            options,
        }
    }

    /// Evaluate the comparison against `element`.
    ///
    /// String flags only apply when both sides are strings; other value types
    /// compare by plain equality. A missing property never matches, so
    /// `UNEQUAL` on a missing property yields true.
    pub fn check(&self, element: &UiElement) -> bool {
        let actual = element.property(&self.property);
        let matched = match (&self.value, &actual) {
            (Value::String(expected), Some(Value::String(actual))) => {
                if self.options.has(MatchOptions::IGNORE_CASE) {
                    let expected = expected.to_lowercase();
                    let actual = actual.to_lowercase();
                    if self.options.has(MatchOptions::CONTAINS) {
                        actual.contains(&expected)
                    } else {
                        actual == expected
                    }
                } else if self.options.has(MatchOptions::CONTAINS) {
                    actual.contains(expected.as_str())
                } else {
                    actual == expected
                }
            }
            (expected, Some(actual)) => expected == actual,
            (_, None) => false,
        };
        matched ^ self.options.has(MatchOptions::UNEQUAL)
    }
}

impl fmt::Display for PropertyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.property)?;
        if self.options.has(MatchOptions::UNEQUAL) {
            write!(f, "!")?;
        }
        let operator = match (
            self.options.has(MatchOptions::CONTAINS),
            self.options.has(MatchOptions::IGNORE_CASE),
        ) {
            (false, false) => "=",
            (true, false) => "~=",
            (false, true) => "=~",
            (true, true) => "~~",
        };
        write!(f, "{operator}")?;
        match &self.value {
            Value::String(s) if s.contains('\'') => write!(f, "\"{s}\""),
            Value::String(s) => write!(f, "'{s}'"),
            other => write!(f, "{other}"),
        }
    }
}

/// Delegates the check to a host-supplied predicate.
#[derive(Clone)]
pub struct FunctionCondition {
    pub name: String,
    predicate: Arc<dyn Fn(&UiElement) -> bool + Send + Sync>,
}

impl FunctionCondition {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&UiElement) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn check(&self, element: &UiElement) -> bool {
        (self.predicate)(element)
    }
}

impl fmt::Debug for FunctionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCondition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for FunctionCondition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.predicate, &other.predicate)
    }
}

/// Matches when a nearby sibling satisfies a sub-condition.
///
/// Positive distances walk forward, negative walk backward; the condition
/// holds once the `|distance|`-th matching sibling in that direction is
/// found. A distance of zero checks the element itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeToCondition {
    pub distance: i32,
    pub condition: Box<Condition>,
}

impl RelativeToCondition {
    pub fn new(distance: i32, condition: Condition) -> Self {
        Self {
            distance,
            condition: Box::new(condition),
        }
    }

    pub fn check(&self, element: &UiElement) -> bool {
        if self.distance == 0 {
            return self.condition.check(element);
        }
        let step: fn(&UiElement) -> Option<UiElement> = if self.distance > 0 {
            UiElement::next_sibling
        } else {
            UiElement::previous_sibling
        };
        let mut remaining = self.distance.unsigned_abs();
        let mut current = step(element);
        while let Some(sibling) = current {
            if self.condition.check(&sibling) {
                remaining -= 1;
                if remaining == 0 {
                    return true;
                }
            }
            current = step(&sibling);
        }
        false
    }
}

/// Boolean operator joining two conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    Or,
}

/// A boolean tree of element checks.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Property(PropertyCondition),
    Function(FunctionCondition),
    Not(Box<Condition>),
    /// True when the wrapped search, started at the checked element, yields
    /// at least one result.
    HasElement(Box<SearchPart>),
    RelativeTo(RelativeToCondition),
    /// True when every child matches; an empty list counts as true.
    And(Vec<Condition>),
    /// True when any child matches; an empty list counts as true, same as
    /// `And`.
    Or(Vec<Condition>),
}

impl Condition {
    /// Exact comparison of a property against a value.
    pub fn property(name: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::Property(PropertyCondition::new(name, value, MatchOptions::NONE))
    }

    pub fn property_with_options(
        name: impl Into<String>,
        value: impl Into<Value>,
        options: MatchOptions,
    ) -> Condition {
        Condition::Property(PropertyCondition::new(name, value, options))
    }

    pub fn function(
        name: impl Into<String>,
        predicate: impl Fn(&UiElement) -> bool + Send + Sync + 'static,
    ) -> Condition {
        Condition::Function(FunctionCondition::new(name, predicate))
    }

    pub fn not(self) -> Condition {
        Condition::Not(Box::new(self))
    }

    pub fn has_element(part: SearchPart) -> Condition {
        Condition::HasElement(Box::new(part))
    }

    pub fn relative_to(distance: i32, condition: Condition) -> Condition {
        Condition::RelativeTo(RelativeToCondition::new(distance, condition))
    }

    pub fn and(mut self, other: Condition) -> Condition {
        self.append(other, BooleanOp::And);
        self
    }

    pub fn or(mut self, other: Condition) -> Condition {
        self.append(other, BooleanOp::Or);
        self
    }

    /// Evaluate the tree against `element`. Children are checked left to
    /// right and `And`/`Or` short-circuit.
    pub fn check(&self, element: &UiElement) -> bool {
        match self {
            Condition::Property(property) => property.check(element),
            Condition::Function(function) => function.check(element),
            Condition::Not(inner) => !inner.check(element),
            Condition::HasElement(part) => part.find_elements(element).next().is_some(),
            Condition::RelativeTo(relative) => relative.check(element),
            Condition::And(children) => children.iter().all(|child| child.check(element)),
            Condition::Or(children) => {
                children.is_empty() || children.iter().any(|child| child.check(element))
            }
        }
    }

    /// Combine an optional existing condition with `new` under `op`.
    pub fn merge(existing: Option<Condition>, new: Condition, op: BooleanOp) -> Condition {
        match existing {
            None => new,
            Some(mut condition) => {
                condition.append(new, op);
                condition
            }
        }
    }

    /// Attach `new` to this condition under `op`.
    ///
    /// Appending to a composite of the same operator flattens into its child
    /// list and drops children already present; any other combination wraps
    /// both sides in a fresh composite.
    pub fn append(&mut self, new: Condition, op: BooleanOp) {
        match (self, op) {
            (Condition::And(children), BooleanOp::And)
            | (Condition::Or(children), BooleanOp::Or) => {
                let incoming = match new {
                    Condition::And(more) if op == BooleanOp::And => more,
                    Condition::Or(more) if op == BooleanOp::Or => more,
                    other => vec![other],
                };
                for condition in incoming {
                    if !children.contains(&condition) {
                        children.push(condition);
                    }
                }
            }
            (current, _) => {
                let inner = std::mem::replace(current, Condition::And(Vec::new()));
                *current = match op {
                    BooleanOp::And => Condition::And(vec![inner, new]),
                    BooleanOp::Or => Condition::Or(vec![inner, new]),
                };
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Property(property) => write!(f, "{property}"),
            Condition::Function(function) => write!(f, "{}()", function.name),
            Condition::Not(inner) => write!(f, "not({inner})"),
            Condition::HasElement(part) => write!(f, "{part}"),
            Condition::RelativeTo(relative) => {
                write!(f, "relative({}, {})", relative.distance, relative.condition)
            }
            Condition::And(children) => fmt_composite(f, children, " and "),
            Condition::Or(children) => fmt_composite(f, children, " or "),
        }
    }
}

fn fmt_composite(
    f: &mut fmt::Formatter<'_>,
    children: &[Condition],
    separator: &str,
) -> fmt::Result {
    match children {
        [] => Ok(()),
        [only] => write!(f, "{only}"),
        many => {
            write!(f, "(")?;
            for (i, child) in many.iter().enumerate() {
                if i > 0 {
                    write!(f, "{separator}")?;
                }
                write!(f, "{child}")?;
            }
            write!(f, ")")
        }
    }
}
