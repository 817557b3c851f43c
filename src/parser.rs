//! Parser turning search descriptions into [`SearchPart`] trees.
//!
//! A description is a sequence of path tokens (`//`, `/`, `..`, `<>`, ...),
//! each optionally followed by a control-type filter, bracketed condition
//! clauses and an index clause. Top-level `|` separates alternatives.
//! Delimiters are tracked by a small balance scanner so quoted values and
//! nested brackets never split a clause.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::condition::{BooleanOp, Condition, MatchOptions};
use crate::errors::ParseError;
use crate::properties;
use crate::search::{RelativeOptions, SearchPart, DEFAULT_DESCENDANTS_DEPTH};

static DEPTH_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{(-?\d+)\}").expect("Invalid regex"));
static PROPERTY_CONDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^@([A-Za-z][A-Za-z0-9_-]*)\s*(!?[~=]{1,2})\s*(?:'([^']*)'|"([^"]*)")\s*$"#)
        .expect("Invalid regex")
});
static PROPERTY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^@[A-Za-z][A-Za-z0-9_-]*\s*!?[~=]{1,2}\s*('[^']*'|"[^"]*")"#)
        .expect("Invalid regex")
});
static FUNCTION_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_]*)\s*\(").expect("Invalid regex"));
static INDEX_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*(?::\s*(\d+))?$").expect("Invalid regex"));

/// Parse a search description with the built-in clause parsers.
pub fn parse_search_description(text: &str) -> Result<SearchPart, ParseError> {
    DescriptionParser::new().parse(text)
}

/// Parses one bracketed condition atom. Hosts can register their own to
/// extend the condition syntax.
pub trait ConditionClauseParser: Send + Sync {
    /// True when this parser should handle `fragment`.
    fn is_match(&self, fragment: &str) -> bool;

    fn parse(&self, parser: &DescriptionParser, fragment: &str) -> Result<Condition, ParseError>;
}

/// Description parser with a configurable set of condition clause parsers.
pub struct DescriptionParser {
    clause_parsers: Vec<Box<dyn ConditionClauseParser>>,
}

impl DescriptionParser {
    pub fn new() -> Self {
        Self {
            clause_parsers: vec![
                Box::new(PropertyClauseParser),
                Box::new(FunctionClauseParser),
                Box::new(HasElementClauseParser),
            ],
        }
    }

    /// Register a clause parser tried before the built-in ones.
    pub fn register(&mut self, parser: Box<dyn ConditionClauseParser>) {
        self.clause_parsers.insert(0, parser);
    }

    pub fn parse(&self, text: &str) -> Result<SearchPart, ParseError> {
        let trimmed = text.trim();
        let alternatives = split_alternatives(trimmed)?;
        let part = if alternatives.len() > 1 {
            let parts = alternatives
                .into_iter()
                .map(|alternative| self.parse_sequence(alternative.trim()))
                .collect::<Result<Vec<_>, _>>()?;
            SearchPart::composite(parts)
        } else {
            self.parse_sequence(trimmed)?
        };
        debug!("parsed '{}' into {}", trimmed, part);
        Ok(part)
    }

    fn parse_sequence(&self, text: &str) -> Result<SearchPart, ParseError> {
        let mut scanner = Scanner::new(text);
        let mut parts = Vec::new();
        loop {
            parts.push(self.parse_segment(&mut scanner)?);
            if scanner.at_end() {
                break;
            }
            if !scanner.peek().is_some_and(starts_segment) {
                return Err(ParseError::UnexpectedToken(snippet(
                    scanner.rest().trim_start(),
                )));
            }
        }
        if parts.len() == 1 {
            Ok(parts.into_iter().next().unwrap())
        } else {
            Ok(SearchPart::nested(parts))
        }
    }

    fn parse_segment(&self, scanner: &mut Scanner<'_>) -> Result<SearchPart, ParseError> {
        let mut part = parse_path_token(scanner)?;
        if let Some(name) = parse_control_type_filter(scanner)? {
            part.merge_condition(
                Condition::property(properties::CONTROL_TYPE, name),
                BooleanOp::And,
            );
        }
        while scanner.peek() == Some('[') {
            let open = scanner.pos;
            let close = scan_balanced(scanner.text, open)?;
            let inner = scanner.text[open + 1..close].trim();
            scanner.pos = close + 1;
            if inner.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                let (skip, take) = parse_index_clause(inner)?;
                part.set_skip(Some(skip));
                part.set_take(take);
            } else {
                let condition = self.parse_condition_expression(inner)?;
                part.merge_condition(condition, BooleanOp::And);
            }
        }
        Ok(part)
    }

    fn parse_condition_expression(&self, fragment: &str) -> Result<Condition, ParseError> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(ParseError::EmptyCondition);
        }
        let (atoms, ops) = split_boolean_tokens(fragment)?;
        let mut atoms = atoms.into_iter();
        let mut condition = self.parse_checked_atom(atoms.next().unwrap_or_default(), fragment)?;
        for (op, atom) in ops.into_iter().zip(atoms) {
            let next = self.parse_checked_atom(atom, fragment)?;
            condition.append(next, op);
        }
        Ok(condition)
    }

    fn parse_checked_atom(&self, atom: &str, clause: &str) -> Result<Condition, ParseError> {
        let atom = atom.trim();
        if atom.is_empty()
            || atom == "and"
            || atom == "or"
            || atom.starts_with("and ")
            || atom.starts_with("or ")
            || atom.ends_with(" and")
            || atom.ends_with(" or")
        {
            return Err(ParseError::DanglingOperator(clause.to_string()));
        }
        self.parse_condition_atom(atom)
    }

    fn parse_condition_atom(&self, atom: &str) -> Result<Condition, ParseError> {
        if let Some(inner) = strip_group(atom)? {
            return self.parse_condition_expression(inner);
        }
        for parser in &self.clause_parsers {
            if parser.is_match(atom) {
                return parser.parse(self, atom);
            }
        }
        Err(ParseError::UnexpectedToken(snippet(atom)))
    }
}

impl Default for DescriptionParser {
    fn default() -> Self {
        Self::new()
    }
}

struct PropertyClauseParser;

impl ConditionClauseParser for PropertyClauseParser {
    fn is_match(&self, fragment: &str) -> bool {
        fragment.starts_with('@')
    }

    fn parse(&self, _parser: &DescriptionParser, fragment: &str) -> Result<Condition, ParseError> {
        let caps = match PROPERTY_CONDITION.captures(fragment) {
            Some(caps) => caps,
            None if PROPERTY_PREFIX.is_match(fragment) => {
                return Err(ParseError::MissingOperator(fragment.to_string()));
            }
            None => return Err(ParseError::MalformedPropertyCondition(fragment.to_string())),
        };
        let property = properties::resolve_property(&caps[1])
            .ok_or_else(|| ParseError::UnknownProperty(caps[1].to_string()))?;
        let options = decode_operator(&caps[2]);
        let value = caps
            .get(3)
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or_default();
        Ok(Condition::property_with_options(property, value, options))
    }
}

struct FunctionClauseParser;

impl ConditionClauseParser for FunctionClauseParser {
    fn is_match(&self, fragment: &str) -> bool {
        FUNCTION_HEAD.is_match(fragment)
    }

    fn parse(&self, _parser: &DescriptionParser, fragment: &str) -> Result<Condition, ParseError> {
        let caps = FUNCTION_HEAD
            .captures(fragment)
            .ok_or_else(|| ParseError::MalformedFunction(fragment.to_string()))?;
        let open = caps[0].len() - 1;
        let close = scan_balanced(fragment, open)?;
        if !fragment[close + 1..].trim().is_empty() {
            return Err(ParseError::MalformedFunction(fragment.to_string()));
        }
        let name = &caps[1];
        if !name.eq_ignore_ascii_case("contains") {
            return Err(ParseError::UnknownFunction(name.to_string()));
        }
        let arguments = split_arguments(&fragment[open + 1..close])?;
        if arguments.len() != 2 {
            return Err(ParseError::MalformedFunction(fragment.to_string()));
        }
        let property = parse_property_reference(arguments[0].trim())?;
        let value = parse_quoted(arguments[1].trim())
            .ok_or_else(|| ParseError::MalformedFunction(fragment.to_string()))?;
        Ok(Condition::property_with_options(
            property,
            value,
            MatchOptions::CONTAINS,
        ))
    }
}

/// Fallback: the whole atom is a search description, true when it yields
/// at least one element.
struct HasElementClauseParser;

impl ConditionClauseParser for HasElementClauseParser {
    fn is_match(&self, _fragment: &str) -> bool {
        true
    }

    fn parse(&self, parser: &DescriptionParser, fragment: &str) -> Result<Condition, ParseError> {
        let part = parser.parse(fragment)?;
        Ok(Condition::has_element(part))
    }
}

struct Scanner<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Scanner<'t> {
    fn new(text: &'t str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'t str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) -> &'t str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.text[start..self.pos]
    }
}

fn starts_segment(c: char) -> bool {
    matches!(c, '/' | '.' | '<' | '>')
}

fn starts_relatives(rest: &str) -> bool {
    rest.starts_with('<')
        || rest.starts_with('>')
        || rest.starts_with(".<")
        || rest.starts_with(".>")
}

fn starts_absorbed(rest: &str) -> bool {
    rest.starts_with("..") || starts_relatives(rest)
}

fn parse_path_token(scanner: &mut Scanner<'_>) -> Result<SearchPart, ParseError> {
    if scanner.eat("...") {
        return Ok(SearchPart::ancestors(-1));
    }
    if scanner.eat("..") {
        let depth = parse_depth_suffix(scanner)?.unwrap_or(1);
        return Ok(SearchPart::ancestors(depth));
    }
    if scanner.eat(".//") {
        let depth = parse_depth_suffix(scanner)?.unwrap_or(DEFAULT_DESCENDANTS_DEPTH);
        return Ok(SearchPart::descendants(depth));
    }
    if scanner.rest().starts_with("./") {
        if starts_relatives(&scanner.rest()[2..]) {
            scanner.eat("./");
            return Ok(SearchPart::relatives(parse_relatives_options(scanner)));
        }
        scanner.eat("./");
        forbid_depth_suffix(scanner, "./")?;
        return Ok(SearchPart::descendants(1));
    }
    if scanner.eat("//") {
        let depth = parse_depth_suffix(scanner)?.unwrap_or(DEFAULT_DESCENDANTS_DEPTH);
        return Ok(SearchPart::descendants(depth));
    }
    if scanner.rest().starts_with('/') {
        // "/.." and "/<>" come from rendered sequences; the slash only joins
        // the segments, so it is absorbed before the real path token.
        if starts_absorbed(&scanner.rest()[1..]) {
            scanner.eat("/");
            return parse_path_token(scanner);
        }
        scanner.eat("/");
        forbid_depth_suffix(scanner, "/")?;
        return Ok(SearchPart::descendants(1));
    }
    if starts_relatives(scanner.rest()) {
        return Ok(SearchPart::relatives(parse_relatives_options(scanner)));
    }
    scanner.eat(".");
    Ok(SearchPart::identity())
}

fn parse_relatives_options(scanner: &mut Scanner<'_>) -> RelativeOptions {
    let mut options = RelativeOptions::NONE;
    if scanner.rest().starts_with(".<") || scanner.rest().starts_with(".>") {
        scanner.eat(".");
        options |= RelativeOptions::INCLUDE_ELEMENT;
    }
    loop {
        if scanner.eat("<") {
            options |= RelativeOptions::PRECEDING;
        } else if scanner.eat(">") {
            options |= RelativeOptions::SUBSEQUENT;
        } else {
            break;
        }
    }
    options
}

fn parse_depth_suffix(scanner: &mut Scanner<'_>) -> Result<Option<i32>, ParseError> {
    if scanner.peek() != Some('{') {
        return Ok(None);
    }
    match DEPTH_SUFFIX.captures(scanner.rest()) {
        Some(caps) => {
            let digits = &caps[1];
            let depth = digits
                .parse::<i32>()
                .map_err(|_| ParseError::InvalidDepth(digits.to_string()))?;
            let token_len = caps[0].len();
            scanner.pos += token_len;
            Ok(Some(depth))
        }
        None => Err(ParseError::InvalidDepth(snippet(scanner.rest()))),
    }
}

fn forbid_depth_suffix(scanner: &Scanner<'_>, token: &str) -> Result<(), ParseError> {
    if scanner.peek() == Some('{') {
        let rest = scanner.rest();
        let fragment = match rest.find('}') {
            Some(end) => rest[..=end].to_string(),
            None => snippet(rest),
        };
        return Err(ParseError::DepthNotAllowed(format!("{token}{fragment}")));
    }
    Ok(())
}

fn parse_control_type_filter(
    scanner: &mut Scanner<'_>,
) -> Result<Option<&'static str>, ParseError> {
    match scanner.peek() {
        Some('*' | '_') => {
            scanner.bump();
            Ok(None)
        }
        Some(c) if c.is_ascii_alphabetic() => {
            let raw = scanner.eat_while(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            match properties::resolve_control_type(raw) {
                Some(name) => Ok(Some(name)),
                None => Err(ParseError::UnknownControlType(raw.to_string())),
            }
        }
        _ => Ok(None),
    }
}

fn parse_index_clause(inner: &str) -> Result<(usize, Option<usize>), ParseError> {
    let caps = INDEX_CLAUSE
        .captures(inner)
        .ok_or_else(|| ParseError::InvalidIndex(inner.to_string()))?;
    let position: usize = caps[1]
        .parse()
        .map_err(|_| ParseError::InvalidIndex(inner.to_string()))?;
    if position == 0 {
        return Err(ParseError::InvalidIndex(inner.to_string()));
    }
    let take = match caps.get(2) {
        Some(count) => Some(
            count
                .as_str()
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidIndex(inner.to_string()))?,
        ),
        None => None,
    };
    Ok((position - 1, take))
}

fn parse_property_reference(fragment: &str) -> Result<&'static str, ParseError> {
    let raw = fragment
        .strip_prefix('@')
        .ok_or_else(|| ParseError::MalformedFunction(fragment.to_string()))?
        .trim();
    properties::resolve_property(raw).ok_or_else(|| ParseError::UnknownProperty(raw.to_string()))
}

fn parse_quoted(fragment: &str) -> Option<&str> {
    let quote = fragment.chars().next().filter(|c| matches!(c, '\'' | '"'))?;
    let inner = fragment.strip_prefix(quote)?.strip_suffix(quote)?;
    if inner.contains(quote) {
        return None;
    }
    Some(inner)
}

/// Unwrap an atom fully enclosed in parentheses.
fn strip_group(atom: &str) -> Result<Option<&str>, ParseError> {
    if !atom.starts_with('(') {
        return Ok(None);
    }
    let close = scan_balanced(atom, 0)?;
    if close == atom.len() - 1 {
        Ok(Some(&atom[1..close]))
    } else {
        Ok(None)
    }
}

fn decode_operator(token: &str) -> MatchOptions {
    let mut options = MatchOptions::NONE;
    let token = match token.strip_prefix('!') {
        Some(rest) => {
            options |= MatchOptions::UNEQUAL;
            rest
        }
        None => token,
    };
    match token {
        "~" | "~~" => options |= MatchOptions::CONTAINS | MatchOptions::IGNORE_CASE,
        "~=" => options |= MatchOptions::CONTAINS,
        "=~" => options |= MatchOptions::IGNORE_CASE,
        _ => {}
    }
    options
}

/// Tracks bracket and quote nesting while scanning a fragment.
#[derive(Default)]
struct BalanceState {
    stack: Vec<char>,
    quote: Option<char>,
}

impl BalanceState {
    fn feed(&mut self, c: char) {
        if let Some(quote) = self.quote {
            if c == quote {
                self.quote = None;
            }
            return;
        }
        match c {
            '\'' | '"' => self.quote = Some(c),
            '[' => self.stack.push(']'),
            '(' => self.stack.push(')'),
            c if Some(&c) == self.stack.last() => {
                self.stack.pop();
            }
            _ => {}
        }
    }

    fn at_top_level(&self) -> bool {
        self.stack.is_empty() && self.quote.is_none()
    }

    fn in_quote(&self) -> bool {
        self.quote.is_some()
    }
}

/// Find the closer matching the delimiter at byte offset `from`, honoring
/// nesting and quoted values. Returns the closer's byte offset.
fn scan_balanced(text: &str, from: usize) -> Result<usize, ParseError> {
    let mut state = BalanceState::default();
    for (offset, c) in text[from..].char_indices() {
        state.feed(c);
        if offset > 0 && state.at_top_level() {
            return Ok(from + offset);
        }
    }
    Err(if state.in_quote() {
        ParseError::UnterminatedQuote(snippet(&text[from..]))
    } else {
        ParseError::UnbalancedDelimiters(snippet(&text[from..]))
    })
}

fn split_alternatives(text: &str) -> Result<Vec<&str>, ParseError> {
    let mut alternatives = Vec::new();
    let mut state = BalanceState::default();
    let mut start = 0;
    for (offset, c) in text.char_indices() {
        if c == '|' && state.at_top_level() {
            alternatives.push(&text[start..offset]);
            start = offset + 1;
            continue;
        }
        state.feed(c);
    }
    if state.in_quote() {
        return Err(ParseError::UnterminatedQuote(snippet(text)));
    }
    if !state.at_top_level() {
        return Err(ParseError::UnbalancedDelimiters(snippet(text)));
    }
    alternatives.push(&text[start..]);
    Ok(alternatives)
}

fn split_arguments(inner: &str) -> Result<Vec<&str>, ParseError> {
    let mut arguments = Vec::new();
    let mut state = BalanceState::default();
    let mut start = 0;
    for (offset, c) in inner.char_indices() {
        if c == ',' && state.at_top_level() {
            arguments.push(&inner[start..offset]);
            start = offset + 1;
            continue;
        }
        state.feed(c);
    }
    if state.in_quote() {
        return Err(ParseError::UnterminatedQuote(snippet(inner)));
    }
    if !state.at_top_level() {
        return Err(ParseError::UnbalancedDelimiters(snippet(inner)));
    }
    arguments.push(&inner[start..]);
    Ok(arguments)
}

/// Split a condition clause on top-level ` and ` / ` or `, keeping quoted
/// values and nested groups intact. Returns one more atom than operators.
fn split_boolean_tokens(fragment: &str) -> Result<(Vec<&str>, Vec<BooleanOp>), ParseError> {
    let mut atoms = Vec::new();
    let mut ops = Vec::new();
    let mut state = BalanceState::default();
    let mut start = 0;
    let mut pos = 0;
    loop {
        let rest = &fragment[pos..];
        let Some(c) = rest.chars().next() else { break };
        if c == ' ' && state.at_top_level() {
            if rest.starts_with(" and ") {
                atoms.push(&fragment[start..pos]);
                ops.push(BooleanOp::And);
                pos += " and ".len();
                start = pos;
                continue;
            }
            if rest.starts_with(" or ") {
                atoms.push(&fragment[start..pos]);
                ops.push(BooleanOp::Or);
                pos += " or ".len();
                start = pos;
                continue;
            }
        }
        state.feed(c);
        pos += c.len_utf8();
    }
    if state.in_quote() {
        return Err(ParseError::UnterminatedQuote(snippet(fragment)));
    }
    if !state.at_top_level() {
        return Err(ParseError::UnbalancedDelimiters(snippet(fragment)));
    }
    atoms.push(&fragment[start..]);
    Ok((atoms, ops))
}

fn snippet(text: &str) -> String {
    text.chars().take(8).collect()
}
