//! Search parts: the traversal layer of a parsed description.
//!
//! A [`SearchPart`] names a region of the tree relative to a start element
//! (the element itself, its ancestors, descendants or siblings), filters it
//! through an optional [`Condition`] and slices the result. Evaluation is a
//! lazy pull: nothing is visited until the returned iterator is advanced,
//! and short-circuiting callers stop the walk early.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::condition::{BooleanOp, Condition, MatchOptions, PropertyCondition};
use crate::element::UiElement;
use crate::properties;

/// Depth limit used by `//` when no explicit depth is given.
pub const DEFAULT_DESCENDANTS_DEPTH: i32 = 5;

/// Flags selecting which siblings a relatives part enumerates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativeOptions(u8);

impl RelativeOptions {
    pub const NONE: RelativeOptions = RelativeOptions(0);
    /// Walk siblings before the element, nearest first.
    pub const PRECEDING: RelativeOptions = RelativeOptions(1);
    /// Walk siblings after the element, nearest first.
    pub const SUBSEQUENT: RelativeOptions = RelativeOptions(1 << 1);
    /// Yield the start element itself before any sibling.
    pub const INCLUDE_ELEMENT: RelativeOptions = RelativeOptions(1 << 2);

    /// True when every flag in `other` is set in `self`.
    pub fn has(self, other: RelativeOptions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RelativeOptions {
    type Output = RelativeOptions;

    fn bitor(self, rhs: RelativeOptions) -> RelativeOptions {
        RelativeOptions(self.0 | rhs.0)
    }
}

impl BitOrAssign for RelativeOptions {
    fn bitor_assign(&mut self, rhs: RelativeOptions) {
        self.0 |= rhs.0;
    }
}

/// Fields shared by the single-region part kinds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartCore {
    pub condition: Option<Condition>,
    pub child: Option<Box<SearchPart>>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

/// Yields the start element itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentityPart {
    pub core: PartCore,
}

/// Walks ancestor levels upward, breadth first.
#[derive(Debug, Clone, PartialEq)]
pub struct AncestorsPart {
    pub core: PartCore,
    /// Number of levels to climb; negative means up to the root.
    pub max_depth: i32,
}

/// Walks the subtree below the start element, breadth first.
#[derive(Debug, Clone, PartialEq)]
pub struct DescendantsPart {
    pub core: PartCore,
    /// Number of levels to descend; negative means unbounded, zero matches
    /// nothing.
    pub max_depth: i32,
}

/// Walks siblings of the start element.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativesPart {
    pub core: PartCore,
    pub options: RelativeOptions,
}

/// Concatenates the results of several alternative parts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositePart {
    pub parts: Vec<SearchPart>,
    pub condition: Option<Condition>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

/// Feeds each result of one part into the next.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NestedPart {
    pub parts: Vec<SearchPart>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

/// One step of a search description.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPart {
    Identity(IdentityPart),
    Ancestors(AncestorsPart),
    Descendants(DescendantsPart),
    Relatives(RelativesPart),
    Composite(CompositePart),
    Nested(NestedPart),
}

impl SearchPart {
    pub fn identity() -> SearchPart {
        SearchPart::Identity(IdentityPart::default())
    }

    pub fn ancestors(max_depth: i32) -> SearchPart {
        SearchPart::Ancestors(AncestorsPart {
            core: PartCore::default(),
            max_depth,
        })
    }

    pub fn descendants(max_depth: i32) -> SearchPart {
        SearchPart::Descendants(DescendantsPart {
            core: PartCore::default(),
            max_depth,
        })
    }

    /// Descendants limited to [`DEFAULT_DESCENDANTS_DEPTH`] levels.
    pub fn deep_descendants() -> SearchPart {
        SearchPart::descendants(DEFAULT_DESCENDANTS_DEPTH)
    }

    pub fn relatives(options: RelativeOptions) -> SearchPart {
        SearchPart::Relatives(RelativesPart {
            core: PartCore::default(),
            options,
        })
    }

    pub fn composite(parts: Vec<SearchPart>) -> SearchPart {
        SearchPart::Composite(CompositePart {
            parts,
            ..CompositePart::default()
        })
    }

    pub fn nested(parts: Vec<SearchPart>) -> SearchPart {
        SearchPart::Nested(NestedPart {
            parts,
            ..NestedPart::default()
        })
    }

    /// Attach a condition, replacing any present one.
    ///
    /// # Panics
    /// Panics for nested parts, which cannot carry their own condition.
    pub fn with_condition(mut self, condition: Condition) -> SearchPart {
        self.set_condition(Some(condition));
        self
    }

    /// Attach a child part evaluated from every match of this part.
    ///
    /// # Panics
    /// Panics for composite and nested parts, which chain through their part
    /// lists instead.
    pub fn with_child(mut self, child: SearchPart) -> SearchPart {
        self.set_child(Some(child));
        self
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            SearchPart::Identity(part) => part.core.condition.as_ref(),
            SearchPart::Ancestors(part) => part.core.condition.as_ref(),
            SearchPart::Descendants(part) => part.core.condition.as_ref(),
            SearchPart::Relatives(part) => part.core.condition.as_ref(),
            SearchPart::Composite(part) => part.condition.as_ref(),
            SearchPart::Nested(_) => None,
        }
    }

    /// # Panics
    /// Panics for nested parts, which cannot carry their own condition.
    pub fn set_condition(&mut self, condition: Option<Condition>) {
        match self {
            SearchPart::Identity(part) => part.core.condition = condition,
            SearchPart::Ancestors(part) => part.core.condition = condition,
            SearchPart::Descendants(part) => part.core.condition = condition,
            SearchPart::Relatives(part) => part.core.condition = condition,
            SearchPart::Composite(part) => part.condition = condition,
            SearchPart::Nested(_) => panic!("a nested search part cannot carry its own condition"),
        }
    }

    /// Combine the present condition with `new` under `op`.
    ///
    /// # Panics
    /// Panics for nested parts, which cannot carry their own condition.
    pub fn merge_condition(&mut self, new: Condition, op: BooleanOp) {
        let merged = Condition::merge(self.condition().cloned(), new, op);
        self.set_condition(Some(merged));
    }

    pub fn skip(&self) -> Option<usize> {
        match self {
            SearchPart::Identity(part) => part.core.skip,
            SearchPart::Ancestors(part) => part.core.skip,
            SearchPart::Descendants(part) => part.core.skip,
            SearchPart::Relatives(part) => part.core.skip,
            SearchPart::Composite(part) => part.skip,
            SearchPart::Nested(part) => part.skip,
        }
    }

    pub fn set_skip(&mut self, skip: Option<usize>) {
        match self {
            SearchPart::Identity(part) => part.core.skip = skip,
            SearchPart::Ancestors(part) => part.core.skip = skip,
            SearchPart::Descendants(part) => part.core.skip = skip,
            SearchPart::Relatives(part) => part.core.skip = skip,
            SearchPart::Composite(part) => part.skip = skip,
            SearchPart::Nested(part) => part.skip = skip,
        }
    }

    pub fn take(&self) -> Option<usize> {
        match self {
            SearchPart::Identity(part) => part.core.take,
            SearchPart::Ancestors(part) => part.core.take,
            SearchPart::Descendants(part) => part.core.take,
            SearchPart::Relatives(part) => part.core.take,
            SearchPart::Composite(part) => part.take,
            SearchPart::Nested(part) => part.take,
        }
    }

    pub fn set_take(&mut self, take: Option<usize>) {
        match self {
            SearchPart::Identity(part) => part.core.take = take,
            SearchPart::Ancestors(part) => part.core.take = take,
            SearchPart::Descendants(part) => part.core.take = take,
            SearchPart::Relatives(part) => part.core.take = take,
            SearchPart::Composite(part) => part.take = take,
            SearchPart::Nested(part) => part.take = take,
        }
    }

    pub fn child(&self) -> Option<&SearchPart> {
        match self {
            SearchPart::Identity(part) => part.core.child.as_deref(),
            SearchPart::Ancestors(part) => part.core.child.as_deref(),
            SearchPart::Descendants(part) => part.core.child.as_deref(),
            SearchPart::Relatives(part) => part.core.child.as_deref(),
            SearchPart::Composite(_) | SearchPart::Nested(_) => None,
        }
    }

    /// # Panics
    /// Panics for composite and nested parts, which chain through their part
    /// lists instead.
    pub fn set_child(&mut self, child: Option<SearchPart>) {
        let child = child.map(Box::new);
        match self {
            SearchPart::Identity(part) => part.core.child = child,
            SearchPart::Ancestors(part) => part.core.child = child,
            SearchPart::Descendants(part) => part.core.child = child,
            SearchPart::Relatives(part) => part.core.child = child,
            SearchPart::Composite(_) | SearchPart::Nested(_) => {
                panic!("composite and nested search parts chain through their part lists")
            }
        }
    }

    /// Evaluate this part against `start`, yielding matches lazily in walk
    /// order. The returned iterator borrows only the part, never `start`.
    pub fn find_elements<'a>(
        &'a self,
        start: &UiElement,
    ) -> Box<dyn Iterator<Item = UiElement> + 'a> {
        match self {
            SearchPart::Identity(part) => {
                let results = evaluate_step(
                    start.clone(),
                    part.core.condition.as_ref(),
                    part.core.child.as_deref(),
                );
                paginate(results, part.core.skip, part.core.take)
            }
            SearchPart::Ancestors(part) => {
                let condition = part.core.condition.as_ref();
                let child = part.core.child.as_deref();
                let results = AncestorLevels::new(start.clone(), part.max_depth)
                    .flatten()
                    .flat_map(move |element| evaluate_step(element, condition, child));
                paginate(Box::new(results), part.core.skip, part.core.take)
            }
            SearchPart::Descendants(part) => {
                if part.max_depth < 0 && start.is_root() {
                    warn!("unbounded descendant search starting at the root element: {}", self);
                }
                let condition = part.core.condition.as_ref();
                let child = part.core.child.as_deref();
                let results = DescendantWalk::new(start.clone(), part.max_depth)
                    .flat_map(move |element| evaluate_step(element, condition, child));
                paginate(Box::new(results), part.core.skip, part.core.take)
            }
            SearchPart::Relatives(part) => {
                let condition = part.core.condition.as_ref();
                let child = part.core.child.as_deref();
                let include = part
                    .options
                    .has(RelativeOptions::INCLUDE_ELEMENT)
                    .then(|| start.clone());
                let preceding = part
                    .options
                    .has(RelativeOptions::PRECEDING)
                    .then(|| start.previous_sibling())
                    .flatten();
                let subsequent = part
                    .options
                    .has(RelativeOptions::SUBSEQUENT)
                    .then(|| start.next_sibling())
                    .flatten();
                let results = include
                    .into_iter()
                    .chain(std::iter::successors(preceding, |element| {
                        element.previous_sibling()
                    }))
                    .chain(std::iter::successors(subsequent, |element| {
                        element.next_sibling()
                    }))
                    .flat_map(move |element| evaluate_step(element, condition, child));
                paginate(Box::new(results), part.core.skip, part.core.take)
            }
            SearchPart::Composite(part) => {
                let start = start.clone();
                let condition = part.condition.as_ref();
                let results = part
                    .parts
                    .iter()
                    .flat_map(move |inner| inner.find_elements(&start))
                    .filter(move |element| condition.map_or(true, |c| c.check(element)));
                paginate(Box::new(results), part.skip, part.take)
            }
            SearchPart::Nested(part) => {
                let mut results: Box<dyn Iterator<Item = UiElement> + 'a> =
                    Box::new(std::iter::once(start.clone()));
                for inner in &part.parts {
                    results =
                        Box::new(results.flat_map(move |element| inner.find_elements(&element)));
                }
                paginate(results, part.skip, part.take)
            }
        }
    }
}

/// The per-element step every part kind shares: check the condition, then
/// either yield the element or hand it to the child part.
pub fn evaluate_step<'a>(
    element: UiElement,
    condition: Option<&'a Condition>,
    child: Option<&'a SearchPart>,
) -> Box<dyn Iterator<Item = UiElement> + 'a> {
    if let Some(condition) = condition {
        if !condition.check(&element) {
            return Box::new(std::iter::empty());
        }
    }
    match child {
        Some(part) => part.find_elements(&element),
        None => Box::new(std::iter::once(element)),
    }
}

fn paginate<'a>(
    results: Box<dyn Iterator<Item = UiElement> + 'a>,
    skip: Option<usize>,
    take: Option<usize>,
) -> Box<dyn Iterator<Item = UiElement> + 'a> {
    match (skip, take) {
        (None, None) => results,
        (skip, take) => {
            let results = results.skip(skip.unwrap_or(0));
            match take {
                Some(count) => Box::new(results.take(count)),
                None => Box::new(results),
            }
        }
    }
}

/// Ancestor sets level by level. A level can hold the same element more than
/// once when sibling start points share a parent; duplicates are kept so the
/// walk mirrors the flattened per-element climbs.
struct AncestorLevels {
    current: Vec<UiElement>,
    remaining: i32,
}

impl AncestorLevels {
    fn new(start: UiElement, max_depth: i32) -> Self {
        Self {
            current: vec![start],
            remaining: max_depth,
        }
    }
}

impl Iterator for AncestorLevels {
    type Item = Vec<UiElement>;

    fn next(&mut self) -> Option<Vec<UiElement>> {
        if self.remaining == 0 || self.current.is_empty() {
            return None;
        }
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        let level: Vec<UiElement> = self.current.iter().filter_map(UiElement::parent).collect();
        self.current = level;
        if self.current.is_empty() {
            None
        } else {
            Some(self.current.clone())
        }
    }
}

/// Breadth-first walk of the subtree below a start element. The start itself
/// is expanded but never yielded.
struct DescendantWalk {
    queue: VecDeque<(UiElement, i32)>,
    max_depth: i32,
}

impl DescendantWalk {
    fn new(start: UiElement, max_depth: i32) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back((start, 0));
        Self { queue, max_depth }
    }
}

impl Iterator for DescendantWalk {
    type Item = UiElement;

    fn next(&mut self) -> Option<UiElement> {
        while let Some((element, depth)) = self.queue.pop_front() {
            if self.max_depth < 0 || depth < self.max_depth {
                for child in element.children() {
                    self.queue.push_back((child, depth + 1));
                }
            }
            if depth > 0 {
                return Some(element);
            }
        }
        None
    }
}

impl fmt::Display for SearchPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchPart::Identity(part) => {
                let (control_type, clause) = split_condition(part.core.condition.as_ref());
                match control_type {
                    Some(name) => write!(f, ".{name}")?,
                    None => write!(f, ".")?,
                }
                write_clause(f, clause)?;
                write_index(f, part.core.skip, part.core.take)?;
                write_child(f, part.core.child.as_deref())
            }
            SearchPart::Ancestors(part) => {
                match part.max_depth {
                    1 => write!(f, "..")?,
                    -1 => write!(f, "...")?,
                    depth => write!(f, "..{{{depth}}}")?,
                }
                let (control_type, clause) = split_condition(part.core.condition.as_ref());
                if let Some(name) = control_type {
                    write!(f, "{name}")?;
                }
                write_clause(f, clause)?;
                write_index(f, part.core.skip, part.core.take)?;
                write_child(f, part.core.child.as_deref())
            }
            SearchPart::Descendants(part) => {
                match part.max_depth {
                    1 => write!(f, "/")?,
                    DEFAULT_DESCENDANTS_DEPTH => write!(f, "//")?,
                    depth => write!(f, "//{{{depth}}}")?,
                }
                let (control_type, clause) = split_condition(part.core.condition.as_ref());
                match control_type {
                    Some(name) => write!(f, "{name}")?,
                    None => write!(f, "_")?,
                }
                write_clause(f, clause)?;
                write_index(f, part.core.skip, part.core.take)?;
                write_child(f, part.core.child.as_deref())
            }
            SearchPart::Relatives(part) => {
                if part.options.has(RelativeOptions::INCLUDE_ELEMENT) {
                    write!(f, ".")?;
                }
                if part.options.has(RelativeOptions::PRECEDING) {
                    write!(f, "<")?;
                }
                if part.options.has(RelativeOptions::SUBSEQUENT) {
                    write!(f, ">")?;
                }
                if part.options == RelativeOptions::NONE {
                    write!(f, ".")?;
                }
                let (control_type, clause) = split_condition(part.core.condition.as_ref());
                if let Some(name) = control_type {
                    write!(f, "{name}")?;
                }
                write_clause(f, clause)?;
                write_index(f, part.core.skip, part.core.take)?;
                write_child(f, part.core.child.as_deref())
            }
            SearchPart::Composite(part) => {
                for (i, inner) in part.parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{inner}")?;
                }
                if let Some(condition) = &part.condition {
                    write!(f, "[")?;
                    write_condition_body(f, condition)?;
                    write!(f, "]")?;
                }
                write_index(f, part.skip, part.take)
            }
            SearchPart::Nested(part) => {
                for inner in &part.parts {
                    write!(f, "{inner}")?;
                }
                write_index(f, part.skip, part.take)
            }
        }
    }
}

enum ConditionClause<'c> {
    None,
    Whole(&'c Condition),
    Tail(&'c [Condition]),
}

/// Split a leading plain control-type equality off a condition so it can be
/// rendered in the control-type slot of the description.
fn split_condition(condition: Option<&Condition>) -> (Option<&str>, ConditionClause<'_>) {
    match condition {
        None => (None, ConditionClause::None),
        Some(condition) => match hoisted_control_type(condition) {
            Some((name, [])) => (Some(name), ConditionClause::None),
            Some((name, rest)) => (Some(name), ConditionClause::Tail(rest)),
            None => (None, ConditionClause::Whole(condition)),
        },
    }
}

fn hoisted_control_type(condition: &Condition) -> Option<(&str, &[Condition])> {
    match condition {
        Condition::Property(property) if is_plain_control_type(property) => {
            match &property.value {
                Value::String(name) => Some((name, &[])),
                _ => None,
            }
        }
        Condition::And(children) => match children.split_first() {
            Some((Condition::Property(property), rest)) if is_plain_control_type(property) => {
                match &property.value {
                    Value::String(name) => Some((name, rest)),
                    _ => None,
                }
            }
            _ => None,
        },
        _ => None,
    }
}

/// A control-type filter can only be hoisted when it is an exact comparison
/// against a canonical control-type name, so the rendered form parses back
/// to the same condition.
fn is_plain_control_type(property: &PropertyCondition) -> bool {
    property.property == properties::CONTROL_TYPE
        && property.options == MatchOptions::NONE
        && matches!(
            &property.value,
            Value::String(name) if properties::resolve_control_type(name) == Some(name.as_str())
        )
}

fn write_clause(f: &mut fmt::Formatter<'_>, clause: ConditionClause<'_>) -> fmt::Result {
    match clause {
        ConditionClause::None => Ok(()),
        ConditionClause::Whole(condition) => {
            write!(f, "[")?;
            write_condition_body(f, condition)?;
            write!(f, "]")
        }
        ConditionClause::Tail(children) => {
            write!(f, "[")?;
            join_children(f, children, " and ")?;
            write!(f, "]")
        }
    }
}

/// Inside brackets the clause boundary is explicit, so a top-level composite
/// renders without the parentheses `Display` would add.
fn write_condition_body(f: &mut fmt::Formatter<'_>, condition: &Condition) -> fmt::Result {
    match condition {
        Condition::And(children) if children.len() > 1 => join_children(f, children, " and "),
        Condition::Or(children) if children.len() > 1 => join_children(f, children, " or "),
        other => write!(f, "{other}"),
    }
}

fn join_children(
    f: &mut fmt::Formatter<'_>,
    children: &[Condition],
    separator: &str,
) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, "{separator}")?;
        }
        write!(f, "{child}")?;
    }
    Ok(())
}

fn write_index(f: &mut fmt::Formatter<'_>, skip: Option<usize>, take: Option<usize>) -> fmt::Result {
    match (skip, take) {
        (None, None) => Ok(()),
        (skip, None) => write!(f, "[{}]", skip.unwrap_or(0) + 1),
        (skip, Some(count)) => write!(f, "[{}:{count}]", skip.unwrap_or(0) + 1),
    }
}

fn write_child(f: &mut fmt::Formatter<'_>, child: Option<&SearchPart>) -> fmt::Result {
    match child {
        Some(part) => write!(f, "{part}"),
        None => Ok(()),
    }
}
