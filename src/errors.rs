//! Error types for description parsing.

use thiserror::Error;

/// Failure modes of the description parser.
///
/// Parsing is all-or-nothing: any of these aborts the parse immediately and
/// no partial tree is returned. A search that matches zero elements is not an
/// error and never surfaces here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Leftover text that does not start a valid path segment.
    #[error("unexpected token near '{0}'")]
    UnexpectedToken(String),

    /// A `{N}` depth suffix on a token that takes none.
    #[error("depth suffix is not allowed on '{0}'")]
    DepthNotAllowed(String),

    /// A `{N}` depth suffix that is not a well-formed integer.
    #[error("invalid depth suffix '{0}'")]
    InvalidDepth(String),

    /// Control-type identifier missing from the registry, even after
    /// case-insensitive and hyphen-stripped retries.
    #[error("unknown control type '{0}'")]
    UnknownControlType(String),

    /// Property identifier missing from the registry.
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    /// A function call with a name no registered parser understands.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A function call whose argument list does not fit the function.
    #[error("malformed function call '{0}'")]
    MalformedFunction(String),

    /// An `@Property` clause without a valid operator or quoted value.
    #[error("malformed property condition '{0}'")]
    MalformedPropertyCondition(String),

    /// Two condition atoms with no `and`/`or` between them.
    #[error("missing boolean operator in '{0}'")]
    MissingOperator(String),

    /// A boolean operator with no atom on one side, or two in a row.
    #[error("dangling boolean operator in '{0}'")]
    DanglingOperator(String),

    /// Brackets or parentheses that do not pair up.
    #[error("unbalanced brackets or parentheses in '{0}'")]
    UnbalancedDelimiters(String),

    /// A quoted string with no closing quote.
    #[error("unterminated quoted string in '{0}'")]
    UnterminatedQuote(String),

    /// An index clause that is not `[N]` or `[N:M]` with N >= 1.
    #[error("invalid index clause '[{0}]'")]
    InvalidIndex(String),

    /// A condition clause `[]` with nothing inside.
    #[error("empty condition clause")]
    EmptyCondition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_offending_fragment() {
        let err = ParseError::UnknownControlType("Wibble".to_string());
        assert_eq!(err.to_string(), "unknown control type 'Wibble'");

        let err = ParseError::InvalidIndex("0".to_string());
        assert_eq!(err.to_string(), "invalid index clause '[0]'");
    }

    #[test]
    fn errors_compare_by_value() {
        assert_eq!(
            ParseError::UnknownFunction("foo".to_string()),
            ParseError::UnknownFunction("foo".to_string())
        );
        assert_ne!(
            ParseError::UnknownFunction("foo".to_string()),
            ParseError::UnknownProperty("foo".to_string())
        );
    }
}
