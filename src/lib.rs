//! Control search engine for desktop UI automation.
//!
//! Search descriptions like `//Button[@Name='OK']` compile into a tree of
//! [`SearchPart`]s and [`Condition`]s, evaluated lazily against a UI element
//! tree the host exposes through [`ElementImpl`] and [`UiTree`]. Searches
//! can also be composed in code through [`By`].

pub mod by;
pub mod condition;
pub mod element;
pub mod engine;
pub mod errors;
pub mod parser;
pub mod properties;
pub mod search;

#[cfg(test)]
mod tests;

pub use by::By;
pub use condition::{
    BooleanOp, Condition, FunctionCondition, MatchOptions, PropertyCondition, RelativeToCondition,
};
pub use element::{ElementImpl, UiElement};
pub use engine::{SearchEngine, UiTree};
pub use errors::ParseError;
pub use parser::{parse_search_description, ConditionClauseParser, DescriptionParser};
pub use search::{evaluate_step, RelativeOptions, SearchPart, DEFAULT_DESCENDANTS_DEPTH};
