//! Builder API for composing searches in code.
//!
//! [`By`] wraps a [`SearchPart`] tree and offers the common entry points:
//! parsing a description, filtering deep descendants by a property, and
//! chaining further steps onto an existing search.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::condition::{BooleanOp, Condition};
use crate::element::UiElement;
use crate::errors::ParseError;
use crate::parser;
use crate::properties;
use crate::search::{AncestorsPart, DescendantsPart, IdentityPart, RelativesPart, SearchPart};

/// A search for elements, built from a description or composed in code.
#[derive(Debug, Clone, PartialEq)]
pub struct By {
    part: SearchPart,
}

impl By {
    /// Parse a search description.
    pub fn path(description: &str) -> Result<By, ParseError> {
        Ok(By {
            part: parser::parse_search_description(description)?,
        })
    }

    pub fn from_part(part: SearchPart) -> By {
        By { part }
    }

    /// Deep descendants matching `condition`.
    pub fn condition(condition: Condition) -> By {
        By {
            part: SearchPart::deep_descendants().with_condition(condition),
        }
    }

    /// Deep descendants whose property equals `value`.
    pub fn property(name: impl Into<String>, value: impl Into<Value>) -> By {
        By::condition(Condition::property(name, value))
    }

    pub fn name(value: impl Into<Value>) -> By {
        By::property(properties::NAME, value)
    }

    pub fn automation_id(value: impl Into<Value>) -> By {
        By::property(properties::AUTOMATION_ID, value)
    }

    pub fn control_type(value: impl Into<Value>) -> By {
        By::property(properties::CONTROL_TYPE, value)
    }

    /// Deep descendants accepted by a host predicate.
    pub fn function(
        name: impl Into<String>,
        predicate: impl Fn(&UiElement) -> bool + Send + Sync + 'static,
    ) -> By {
        By::condition(Condition::function(name, predicate))
    }

    /// And `condition` onto the step that produces the final results.
    ///
    /// # Panics
    /// Panics when the search ends in an empty nested part, which has no
    /// step to merge the condition into.
    pub fn and(mut self, condition: Condition) -> By {
        merge_on_leaf(&mut self.part, condition, BooleanOp::And);
        self
    }

    pub fn and_property(self, name: impl Into<String>, value: impl Into<Value>) -> By {
        self.and(Condition::property(name, value))
    }

    /// Or `condition` onto the step that produces the final results.
    ///
    /// # Panics
    /// Panics when the search ends in an empty nested part, which has no
    /// step to merge the condition into.
    pub fn or(mut self, condition: Condition) -> By {
        merge_on_leaf(&mut self.part, condition, BooleanOp::Or);
        self
    }

    /// Continue the search from every match of the current one.
    pub fn append(self, next: By) -> By {
        By {
            part: append_part(self.part, next.part),
        }
    }

    pub fn skip(mut self, count: usize) -> By {
        self.part.set_skip(Some(count));
        self
    }

    pub fn take(mut self, count: usize) -> By {
        self.part.set_take(Some(count));
        self
    }

    pub fn part(&self) -> &SearchPart {
        &self.part
    }

    pub fn into_part(self) -> SearchPart {
        self.part
    }

    /// Description text this search renders to.
    pub fn description(&self) -> String {
        self.part.to_string()
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.part)
    }
}

impl FromStr for By {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<By, ParseError> {
        By::path(s)
    }
}

/// Chain `next` after `current`, flattening nested lists that carry no index
/// clause of their own so repeated appends stay one flat sequence.
fn append_part(current: SearchPart, next: SearchPart) -> SearchPart {
    let mut parts = match current {
        SearchPart::Nested(nested) if nested.skip.is_none() && nested.take.is_none() => {
            nested.parts
        }
        other => vec![other],
    };
    match next {
        SearchPart::Nested(nested) if nested.skip.is_none() && nested.take.is_none() => {
            parts.extend(nested.parts)
        }
        other => parts.push(other),
    }
    SearchPart::nested(parts)
}

/// Merge a condition into the part whose matches become the search results:
/// the last part of a nested chain, descending through child parts.
fn merge_on_leaf(part: &mut SearchPart, condition: Condition, op: BooleanOp) {
    match part {
        SearchPart::Nested(nested) => match nested.parts.last_mut() {
            Some(last) => merge_on_leaf(last, condition, op),
            None => panic!("an empty nested search part has no step to merge a condition into"),
        },
        SearchPart::Identity(IdentityPart { core })
        | SearchPart::Ancestors(AncestorsPart { core, .. })
        | SearchPart::Descendants(DescendantsPart { core, .. })
        | SearchPart::Relatives(RelativesPart { core, .. })
            if core.child.is_some() =>
        {
            if let Some(child) = core.child.as_deref_mut() {
                merge_on_leaf(child, condition, op);
            }
        }
        other => other.merge_condition(condition, op),
    }
}
