//! A `nom`-based recursive-descent parser for SCIM filters and attribute paths.
//!
//! Whitespace is significant: `SP` in the grammar is exactly one space, and
//! no other whitespace is accepted anywhere.
use crate::ast::{AttributePath, CompareOp, Filter, PatchPath};
use crate::error::FilterError;
use nom::{
    IResult, Offset, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1, take_while_m_n},
    character::complete::{char, digit0, digit1, one_of, satisfy},
    combinator::{opt, recognize, value},
    error::{ErrorKind, ParseError},
    multi::many0,
    sequence::{delimited, pair, preceded},
};
use serde_json::Value;

/// Bounds applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    /// Maximum nesting of parenthesized groups and attribute groups.
    pub max_depth: usize,
    /// Maximum number of segments in a single attribute path.
    pub max_path_segments: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_path_segments: 16,
        }
    }
}

// --- Main Public Parser ---

/// Entry point for every grammar production, carrying the parse limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterParser {
    limits: ParserLimits,
}

impl FilterParser {
    pub fn with_limits(limits: ParserLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ParserLimits {
        self.limits
    }

    /// Parses a complete filter expression.
    pub fn parse_filter(&self, input: &str) -> Result<Filter, FilterError> {
        let result = finish(input, filter(input, Ctx::new(self.limits)));
        if let Err(e) = &result {
            log::debug!("Rejected filter: {}", e);
        }
        result
    }

    /// Parses a single attribute path such as `name.givenName`.
    pub fn parse_path(&self, input: &str) -> Result<AttributePath, FilterError> {
        finish(input, attribute_path(input, Ctx::new(self.limits)))
    }

    /// Parses a comma-separated list of attribute paths, as used by the
    /// `attributes` and `excludedAttributes` query parameters.
    pub fn parse_path_list(&self, input: &str) -> Result<Vec<AttributePath>, FilterError> {
        input
            .split(',')
            .map(|item| self.parse_path(item.trim()))
            .collect()
    }

    /// Parses a PATCH operation path: `attrPath` or `attrPath[filter].subAttr`.
    pub fn parse_patch_path(&self, input: &str) -> Result<PatchPath, FilterError> {
        finish(input, patch_path(input, Ctx::new(self.limits)))
    }
}

pub fn parse_filter(input: &str) -> Result<Filter, FilterError> {
    FilterParser::default().parse_filter(input)
}

pub fn parse_path(input: &str) -> Result<AttributePath, FilterError> {
    FilterParser::default().parse_path(input)
}

pub fn parse_path_list(input: &str) -> Result<Vec<AttributePath>, FilterError> {
    FilterParser::default().parse_path_list(input)
}

pub fn parse_patch_path(input: &str) -> Result<PatchPath, FilterError> {
    FilterParser::default().parse_patch_path(input)
}

// --- Parse state & errors ---

#[derive(Debug, Clone, Copy)]
struct Ctx {
    limits: ParserLimits,
    depth: usize,
}

impl Ctx {
    fn new(limits: ParserLimits) -> Self {
        Self { limits, depth: 0 }
    }

    fn descend<'a>(self) -> Result<Self, nom::Err<Fault<'a>>> {
        if self.depth >= self.limits.max_depth {
            return Err(nom::Err::Failure(Fault::TooDeep(self.limits.max_depth)));
        }
        Ok(Self {
            depth: self.depth + 1,
            ..self
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Fault<'a> {
    /// No production matched; holds the unparsed remainder.
    Syntax(&'a str),
    TooDeep(usize),
    TooManySegments(usize),
}

impl<'a> Fault<'a> {
    fn into_error(self, input: &'a str) -> FilterError {
        match self {
            Fault::Syntax(rest) => FilterError::parse_at(input, input.offset(rest), rest),
            Fault::TooDeep(max) => FilterError::TooDeep(max),
            Fault::TooManySegments(max) => FilterError::TooManySegments(max),
        }
    }
}

impl<'a> ParseError<&'a str> for Fault<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Fault::Syntax(input)
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    // Report whichever alternative got furthest.
    fn or(self, other: Self) -> Self {
        let keep_self = match (&self, &other) {
            (Fault::Syntax(a), Fault::Syntax(b)) => a.len() <= b.len(),
            (Fault::Syntax(_), _) => false,
            _ => true,
        };
        if keep_self { self } else { other }
    }
}

type PResult<'a, O> = IResult<&'a str, O, Fault<'a>>;

fn syntax<'a, O>(at: &'a str) -> PResult<'a, O> {
    Err(nom::Err::Error(Fault::Syntax(at)))
}

fn finish<'a, O>(input: &'a str, result: PResult<'a, O>) -> Result<O, FilterError> {
    match result {
        Ok(("", out)) => Ok(out),
        Ok((rest, _)) => Err(FilterError::parse_at(input, input.offset(rest), rest)),
        Err(nom::Err::Error(fault)) | Err(nom::Err::Failure(fault)) => Err(fault.into_error(input)),
        Err(nom::Err::Incomplete(_)) => Err(FilterError::parse_at(input, input.len(), "")),
    }
}

// --- Logical structure ---

#[derive(Debug, Clone, Copy)]
enum Connective {
    And,
    Or,
}

/// `filter = infixLogicalExpr | expr`, with the connective chain flattened
/// into a disjunction of conjunctions.
fn filter<'a>(input: &'a str, ctx: Ctx) -> PResult<'a, Filter> {
    let (mut rest, first) = expression(input, ctx)?;
    let mut groups: Vec<Vec<Filter>> = Vec::new();
    let mut current = vec![first];

    loop {
        let (after, op) = match connective(rest) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        };
        let (after, operand) = expression(after, ctx)?;
        match op {
            Connective::And => current.push(operand),
            Connective::Or => groups.push(std::mem::replace(&mut current, vec![operand])),
        }
        rest = after;
    }

    if groups.is_empty() && current.len() == 1 {
        return Ok((rest, current.remove(0)));
    }
    groups.push(current);
    Ok((rest, Filter::OrOfAnds(groups)))
}

fn connective(input: &str) -> PResult<'_, Connective> {
    delimited(
        char(' '),
        alt((
            value(Connective::And, tag("and")),
            value(Connective::Or, tag("or")),
        )),
        char(' '),
    )
    .parse(input)
}

fn expression<'a>(input: &'a str, ctx: Ctx) -> PResult<'a, Filter> {
    alt((
        |i: &'a str| group(i, ctx),
        |i: &'a str| attribute_group(i, ctx),
        |i: &'a str| negation(i, ctx),
        |i: &'a str| presence(i, ctx),
        |i: &'a str| comparison(i, ctx),
    ))
    .parse(input)
}

/// `"(" [SP] filter [SP] ")"`
fn group<'a>(input: &'a str, ctx: Ctx) -> PResult<'a, Filter> {
    let (rest, _) = char('(').parse(input)?;
    let inner_ctx = ctx.descend()?;
    let (rest, _) = opt(char(' ')).parse(rest)?;
    let (rest, inner) = filter(rest, inner_ctx)?;
    let (rest, _) = opt(char(' ')).parse(rest)?;
    let (rest, _) = char(')').parse(rest)?;
    Ok((rest, Filter::Group(Box::new(inner))))
}

/// `attributePath "[" filter "]"`
fn attribute_group<'a>(input: &'a str, ctx: Ctx) -> PResult<'a, Filter> {
    let (rest, path) = attribute_path(input, ctx)?;
    let (rest, _) = char('[').parse(rest)?;
    let inner_ctx = ctx.descend()?;
    let (rest, inner) = filter(rest, inner_ctx)?;
    let (rest, _) = char(']').parse(rest)?;
    Ok((
        rest,
        Filter::AttributeGroup {
            path,
            filter: Box::new(inner),
        },
    ))
}

/// `"not" [SP] group`
fn negation<'a>(input: &'a str, ctx: Ctx) -> PResult<'a, Filter> {
    let (rest, _) = tag("not").parse(input)?;
    let (rest, _) = opt(char(' ')).parse(rest)?;
    let (rest, inner) = group(rest, ctx)?;
    Ok((rest, Filter::Not(Box::new(inner))))
}

// --- Assertions ---

/// `attributePath SP "pr"`
fn presence<'a>(input: &'a str, ctx: Ctx) -> PResult<'a, Filter> {
    let (rest, path) = attribute_path(input, ctx)?;
    let (rest, _) = pair(char(' '), tag("pr")).parse(rest)?;
    Ok((rest, Filter::Presence(path)))
}

/// `attributePath SP compOp SP literal`
fn comparison<'a>(input: &'a str, ctx: Ctx) -> PResult<'a, Filter> {
    let (rest, path) = attribute_path(input, ctx)?;
    let (rest, _) = char(' ').parse(rest)?;
    let (rest, op) = compare_op(rest)?;
    let (rest, _) = char(' ').parse(rest)?;
    let (rest, value) = literal(rest)?;
    Ok((rest, Filter::Comparison { path, op, value }))
}

fn compare_op(input: &str) -> PResult<'_, CompareOp> {
    alt((
        value(CompareOp::Equal, tag("eq")),
        value(CompareOp::NotEqual, tag("ne")),
        value(CompareOp::Contains, tag("co")),
        value(CompareOp::StartsWith, tag("sw")),
        value(CompareOp::EndsWith, tag("ew")),
        value(CompareOp::GreaterThan, tag("gt")),
        value(CompareOp::LessThan, tag("lt")),
        value(CompareOp::GreaterOrEqual, tag("ge")),
        value(CompareOp::LessOrEqual, tag("le")),
    ))
    .parse(input)
}

// --- Literal Parsers ---

fn literal(input: &str) -> PResult<'_, Value> {
    alt((
        value(Value::Null, tag("null")),
        value(Value::Bool(true), tag("true")),
        value(Value::Bool(false), tag("false")),
        number,
        string_literal,
    ))
    .parse(input)
}

/// A JSON number: `[ "-" ] int [ frac ] [ exp ]`.
fn number(input: &str) -> PResult<'_, Value> {
    let (rest, text) = recognize((
        opt(char('-')),
        alt((
            tag("0"),
            recognize(pair(satisfy(|c: char| matches!(c, '1'..='9')), digit0)),
        )),
        opt(pair(char('.'), digit1)),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)?;

    match serde_json::from_str::<Value>(text) {
        Ok(number @ Value::Number(_)) => Ok((rest, number)),
        _ => Err(nom::Err::Failure(Fault::Syntax(input))),
    }
}

/// A JSON string. Escapes are validated here and decoded by `serde_json`.
fn string_literal(input: &str) -> PResult<'_, Value> {
    let (rest, raw) = recognize(delimited(
        char('"'),
        many0(alt((take_while1(is_unescaped), escape_sequence))),
        char('"'),
    ))
    .parse(input)?;

    match serde_json::from_str::<String>(raw) {
        Ok(text) => Ok((rest, Value::String(text))),
        Err(_) => Err(nom::Err::Failure(Fault::Syntax(input))),
    }
}

fn is_unescaped(c: char) -> bool {
    c != '"' && c != '\\' && c >= '\u{20}'
}

fn escape_sequence(input: &str) -> PResult<'_, &str> {
    recognize(preceded(
        char('\\'),
        alt((
            recognize(one_of("\"\\/bfnrt")),
            recognize(preceded(
                char('u'),
                take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit()),
            )),
        )),
    ))
    .parse(input)
}

// --- Path Parsers ---

fn is_path_char(c: char) -> bool {
    !matches!(c, ' ' | '[' | ']' | '(' | ')' | '"' | ',') && !c.is_control()
}

/// `[ URI ":" ] segment *( "." segment )`
///
/// The URI itself may contain `:` and `.`, so the whole token is taken first
/// and split at its last colon.
fn attribute_path<'a>(input: &'a str, ctx: Ctx) -> PResult<'a, AttributePath> {
    let (rest, token) = take_while1(is_path_char).parse(input)?;
    let names = match token.rfind(':') {
        Some(colon) => {
            if !is_schema_uri(&token[..colon]) {
                return syntax(input);
            }
            &token[colon + 1..]
        }
        None => token,
    };

    let (after, first) = segment(names)?;
    let (after, others) = many0(preceded(char('.'), segment)).parse(after)?;
    if !after.is_empty() {
        return syntax(after);
    }
    if others.len() + 1 > ctx.limits.max_path_segments {
        return Err(nom::Err::Failure(Fault::TooManySegments(
            ctx.limits.max_path_segments,
        )));
    }

    match AttributePath::new(std::iter::once(first).chain(others)) {
        Some(path) => Ok((rest, path)),
        None => syntax(input),
    }
}

fn is_schema_uri(uri: &str) -> bool {
    let Some((scheme, rest)) = uri.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
}

/// `ALPHA *( ALPHA | DIGIT | "-" | "_" )`
fn segment(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
    ))
    .parse(input)
}

fn patch_path<'a>(input: &'a str, ctx: Ctx) -> PResult<'a, PatchPath> {
    let (rest, attribute) = attribute_path(input, ctx)?;
    let (rest, selector) = opt(|i: &'a str| -> PResult<'a, (Filter, Option<&'a str>)> {
        let (i, _) = char('[').parse(i)?;
        let (i, value_filter) = filter(i, ctx.descend()?)?;
        let (i, _) = char(']').parse(i)?;
        let (i, sub_attribute) = opt(preceded(char('.'), segment)).parse(i)?;
        Ok((i, (value_filter, sub_attribute)))
    })
    .parse(rest)?;

    let (value_filter, sub_attribute) = match selector {
        Some((value_filter, sub)) => (Some(value_filter), sub.map(str::to_string)),
        None => (None, None),
    };
    Ok((
        rest,
        PatchPath {
            attribute,
            value_filter,
            sub_attribute,
        },
    ))
}
