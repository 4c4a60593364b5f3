//! Parser for the SQL subset
//!
//! One parser function per precedence level, lowest binding first, each
//! left-folding its operand parser. The dialect rides along in the input
//! stream state so reserved-word checks can include the active dialect's
//! function names.

use winnow::ascii::{Caseless, digit1, multispace0};
use winnow::combinator::{alt, delimited, not, opt, peek, preceded, repeat, separated, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::stream::Stateful;
use winnow::token::{one_of, take_till, take_while};

use crate::ast::{AggKind, Aggregate, BinOp, Expr, Limit, Projection, Query, UnaryOp};
use crate::dialect::Dialect;

type PResult<T> = winnow::ModalResult<T>;
type Input<'a> = Stateful<&'a str, Dialect>;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    /// Position `offset` within `input` as a 1-based line and column.
    fn at(message: impl Into<String>, input: &str, offset: usize) -> ParseError {
        let offset = offset.min(input.len());
        let consumed = &input[..offset];
        let line = consumed.matches('\n').count() + 1;
        // the newline itself stands in for the +1 on continuation lines
        let column = match consumed.rfind('\n') {
            Some(newline) => consumed[newline..].chars().count(),
            None => consumed.chars().count() + 1,
        };
        ParseError {
            message: message.into(),
            offset,
            line,
            column,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at line {}, column {} (offset {})",
            self.message, self.line, self.column, self.offset
        )
    }
}

impl std::error::Error for ParseError {}

/// Parse a single query statement.
///
/// A query starting with `WHERE` or `LIMIT` projects every column, so bare
/// filters work without a projection list.
pub fn parse(input: &str, dialect: Dialect) -> Result<Query, ParseError> {
    let input = input.trim();
    let mut stream = Stateful {
        input,
        state: dialect,
    };
    let parsed = match query.parse_next(&mut stream) {
        Ok(parsed) => parsed,
        Err(e) => {
            // stream.input is a suffix of input, so the difference in
            // lengths is how far the grammar got
            let offset = input.len() - stream.input.len();
            return Err(ParseError::at(format!("{e:?}"), input, offset));
        }
    };

    let rest = stream.input.trim_start();
    if rest.is_empty() {
        Ok(parsed)
    } else {
        let offset = input.len() - rest.len();
        Err(ParseError::at("unexpected trailing input", input, offset))
    }
}

// ============ Query structure ============

fn query(input: &mut Input<'_>) -> PResult<Query> {
    let _ = opt(preceded(ws, keyword("select"))).parse_next(input)?;
    let distinct = opt(preceded(ws, keyword("distinct")))
        .parse_next(input)?
        .is_some();
    let projections: Option<Vec<Projection>> =
        opt(separated(1.., projection, (ws, ','))).parse_next(input)?;
    let filter = opt(preceded((ws, keyword("where")), expr)).parse_next(input)?;
    let limit = opt(preceded(
        (ws, keyword("limit")),
        opt(preceded(ws, limit_value)),
    ))
    .parse_next(input)?
    .map(|literal| Limit {
        literal: literal.map(str::to_string),
    });

    // a bare filter or limit projects every column; a query with none of
    // projections, WHERE, or LIMIT is not a query at all
    if projections.is_none() && filter.is_none() && limit.is_none() {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    let projections = projections.unwrap_or_else(|| {
        vec![Projection {
            expr: Expr::Column("*".to_string()),
            alias: None,
        }]
    });

    Ok(Query {
        distinct,
        projections,
        filter,
        limit,
    })
}

fn projection(input: &mut Input<'_>) -> PResult<Projection> {
    let expr = expr.parse_next(input)?;
    let alias = opt(preceded((ws, keyword("as"), ws), identifier)).parse_next(input)?;
    Ok(Projection { expr, alias })
}

/// The `LIMIT` operand is captured as raw text; analysis rejects anything
/// that is not a positive integer with a dedicated error.
fn limit_value<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (
        opt(one_of(['+', '-'])),
        digit1,
        opt(('.', digit1)),
        opt(exponent),
    )
        .take()
        .parse_next(input)
}

// ============ Expressions (precedence ladder, lowest first) ============

pub(crate) fn expr(input: &mut Input<'_>) -> PResult<Expr> {
    or_expr.parse_next(input)
}

/// Fold `operand (op operand)*` into a left-associative chain node.
fn chain(
    input: &mut Input<'_>,
    operand: fn(&mut Input<'_>) -> PResult<Expr>,
    op: fn(&mut Input<'_>) -> PResult<BinOp>,
) -> PResult<Expr> {
    let first = operand(input)?;
    let rest: Vec<(BinOp, Expr)> = repeat(0.., (preceded(ws, op), operand)).parse_next(input)?;
    Ok(if rest.is_empty() {
        first
    } else {
        Expr::Binary {
            first: Box::new(first),
            rest,
        }
    })
}

fn or_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, and_expr, or_op)
}

fn or_op(input: &mut Input<'_>) -> PResult<BinOp> {
    keyword("or").value(BinOp::Or).parse_next(input)
}

fn and_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, like_expr, and_op)
}

fn and_op(input: &mut Input<'_>) -> PResult<BinOp> {
    keyword("and").value(BinOp::And).parse_next(input)
}

fn like_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, not_like_expr, like_op)
}

fn like_op(input: &mut Input<'_>) -> PResult<BinOp> {
    keyword("like").value(BinOp::Like).parse_next(input)
}

fn not_like_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, match_expr, not_like_op)
}

fn not_like_op(input: &mut Input<'_>) -> PResult<BinOp> {
    (keyword("not"), ws, keyword("like"))
        .value(BinOp::NotLike)
        .parse_next(input)
}

fn match_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, eq_expr, match_op)
}

fn match_op(input: &mut Input<'_>) -> PResult<BinOp> {
    alt(("!~".value(BinOp::NotMatch), '~'.value(BinOp::Match))).parse_next(input)
}

fn eq_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, rel_expr, eq_op)
}

fn eq_op(input: &mut Input<'_>) -> PResult<BinOp> {
    alt((
        "==".value(BinOp::Eq),
        "!=".value(BinOp::Ne),
        '='.value(BinOp::Eq),
    ))
    .parse_next(input)
}

fn rel_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, add_expr, rel_op)
}

fn rel_op(input: &mut Input<'_>) -> PResult<BinOp> {
    alt((
        "<=".value(BinOp::Le),
        ">=".value(BinOp::Ge),
        '<'.value(BinOp::Lt),
        '>'.value(BinOp::Gt),
    ))
    .parse_next(input)
}

fn add_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, mul_expr, add_op)
}

fn add_op(input: &mut Input<'_>) -> PResult<BinOp> {
    alt(('+'.value(BinOp::Add), '-'.value(BinOp::Sub))).parse_next(input)
}

fn mul_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, concat_expr, mul_op)
}

fn mul_op(input: &mut Input<'_>) -> PResult<BinOp> {
    alt((
        '*'.value(BinOp::Mul),
        '/'.value(BinOp::Div),
        '%'.value(BinOp::Mod),
    ))
    .parse_next(input)
}

fn concat_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, unary_expr, concat_op)
}

fn concat_op(input: &mut Input<'_>) -> PResult<BinOp> {
    "||".value(BinOp::Concat).parse_next(input)
}

fn unary_expr(input: &mut Input<'_>) -> PResult<Expr> {
    preceded(
        ws,
        alt((
            preceded('!', unary_expr).map(|e| Expr::Unary(UnaryOp::Not, Box::new(e))),
            preceded('-', unary_expr).map(|e| Expr::Unary(UnaryOp::Neg, Box::new(e))),
            preceded('+', unary_expr).map(|e| Expr::Unary(UnaryOp::Plus, Box::new(e))),
            pow_expr,
        )),
    )
    .parse_next(input)
}

fn pow_expr(input: &mut Input<'_>) -> PResult<Expr> {
    chain(input, term, pow_op)
}

fn pow_op(input: &mut Input<'_>) -> PResult<BinOp> {
    '^'.value(BinOp::Pow).parse_next(input)
}

// ============ Terms ============

fn term(input: &mut Input<'_>) -> PResult<Expr> {
    preceded(
        ws,
        alt((paren_expr, number, string_lit, regex_lit, star, callable)),
    )
    .parse_next(input)
}

fn paren_expr(input: &mut Input<'_>) -> PResult<Expr> {
    delimited('(', expr, (ws, ')')).parse_next(input)
}

fn star(input: &mut Input<'_>) -> PResult<Expr> {
    '*'.value(Expr::Column("*".to_string())).parse_next(input)
}

/// Bare column reference, scalar function call, or aggregate call.
///
/// `min`/`max` double as scalar and aggregate: a single argument (or a
/// `DISTINCT` marker) makes the call an aggregate, two or more arguments
/// make it the n-ary scalar.
fn callable(input: &mut Input<'_>) -> PResult<Expr> {
    let dialect = input.state;
    let name = word.parse_next(input)?;

    if opt(preceded(ws, '(')).parse_next(input)?.is_none() {
        if dialect.is_reserved(name) {
            return Err(ErrMode::Backtrack(ContextError::new()));
        }
        return Ok(Expr::Column(name.to_string()));
    }

    let lower = name.to_ascii_lowercase();
    let distinct = opt(preceded(ws, keyword("distinct")))
        .parse_next(input)?
        .is_some();
    let args: Vec<Expr> = if opt(peek(preceded(ws, ')'))).parse_next(input)?.is_some() {
        Vec::new()
    } else {
        separated(1.., expr, (ws, ',')).parse_next(input)?
    };
    let _ = (ws, ')').parse_next(input)?;

    match AggKind::from_name(&lower) {
        Some(kind)
            if distinct || args.len() == 1 || !matches!(kind, AggKind::Min | AggKind::Max) =>
        {
            let Ok([arg]) = <[Expr; 1]>::try_from(args) else {
                return Err(ErrMode::Backtrack(ContextError::new()));
            };
            Ok(Expr::Aggregate(Aggregate {
                kind,
                distinct,
                arg: Box::new(arg),
                id: 0,
            }))
        }
        _ => {
            if distinct {
                // DISTINCT is only meaningful inside an aggregate call
                return Err(ErrMode::Backtrack(ContextError::new()));
            }
            Ok(Expr::Call { name: lower, args })
        }
    }
}

// ============ Identifiers and keywords ============

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn word<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic()),
        take_while(0.., is_ident_char),
    )
        .take()
        .parse_next(input)
}

fn identifier(input: &mut Input<'_>) -> PResult<String> {
    let dialect = input.state;
    let w = word.parse_next(input)?;
    if dialect.is_reserved(w) {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    Ok(w.to_string())
}

/// Case-insensitive keyword with a word-boundary check, so `selector`
/// never matches `select`.
fn keyword<'a>(kw: &'static str) -> impl Parser<Input<'a>, (), ErrMode<ContextError>> {
    terminated(Caseless(kw), not(one_of(is_ident_char))).void()
}

// ============ Literals ============

fn number(input: &mut Input<'_>) -> PResult<Expr> {
    alt((
        (digit1, opt(('.', digit1)), opt(exponent)).take(),
        ('.', digit1, opt(exponent)).take(),
    ))
    .map(|s: &str| Expr::Number(s.to_string()))
    .parse_next(input)
}

fn exponent<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)
        .take()
        .parse_next(input)
}

/// Single- or double-quoted string. The payload is re-emitted inside awk
/// double quotes, so an embedded `"` is rejected up front.
fn string_lit(input: &mut Input<'_>) -> PResult<Expr> {
    alt((
        delimited('\'', take_till(0.., '\''), '\''),
        delimited('"', take_till(0.., '"'), '"'),
    ))
    .verify(|s: &str| !s.contains('"'))
    .map(|s: &str| Expr::Str(s.to_string()))
    .parse_next(input)
}

fn regex_lit(input: &mut Input<'_>) -> PResult<Expr> {
    delimited('/', take_till(0.., '/'), '/')
        .map(|s: &str| Expr::Regex(s.to_string()))
        .parse_next(input)
}

// ============ Whitespace ============

fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.void().parse_next(input)
}

// ============ Sanity Tests ============
// Most coverage lives in tests/integration.rs and tests/property.rs.
