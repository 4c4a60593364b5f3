//! Semantic analysis between parse and emission
//!
//! Resolves the parsed query against the input schema: expands `*`
//! projections, validates column and function names, rejects aggregate
//! misuse, checks the `LIMIT` value, numbers aggregate call sites, and
//! derives the output schema. The generator assumes everything here has
//! passed.

use thiserror::Error;

use crate::ast::{AggKind, Expr, Limit, Projection, Query};
use crate::dialect::Dialect;
use crate::schema::Schema;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzeError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("bad LIMIT: {0}")]
    BadLimit(String),

    #[error("duplicate projection name: {0}")]
    DuplicateProjection(String),

    #[error("aggregates are not allowed in WHERE")]
    AggregateInWhere,

    #[error("aggregates cannot be nested")]
    NestedAggregate,

    #[error("type error: {0}")]
    TypeError(String),
}

/// A validated query, ready for emission.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Analyzed {
    pub distinct: bool,
    /// `*` expanded and aggregate ids assigned.
    pub projections: Vec<Projection>,
    pub filter: Option<Expr>,
    pub limit: Option<u64>,
    pub output_schema: Schema,
    pub has_aggregate: bool,
}

pub(crate) fn analyze(
    query: Query,
    schema: &Schema,
    dialect: Dialect,
) -> Result<Analyzed, AnalyzeError> {
    let limit = check_limit(query.limit.as_ref())?;

    let mut projections = Vec::new();
    for projection in query.projections {
        if matches!(&projection.expr, Expr::Column(name) if name == "*") {
            if projection.alias.is_some() {
                return Err(AnalyzeError::TypeError("`*` cannot be aliased".to_string()));
            }
            for (name, _) in schema.iter() {
                projections.push(Projection {
                    expr: Expr::Column(name.to_string()),
                    alias: None,
                });
            }
        } else {
            projections.push(projection);
        }
    }

    for projection in &projections {
        check_expr(&projection.expr, schema, dialect)?;
    }

    if let Some(filter) = &query.filter {
        check_expr(filter, schema, dialect)?;
        if filter.is_aggregate() {
            return Err(AnalyzeError::AggregateInWhere);
        }
    }

    let mut next_id = 0usize;
    for projection in &mut projections {
        number_aggregates(&mut projection.expr, &mut next_id);
    }

    // building the output schema doubles as the duplicate-name check
    let mut output_schema = Schema::new();
    for projection in &projections {
        let name = projection.display_name();
        let datatype = projection.expr.datatype(schema);
        output_schema
            .push(&name, datatype)
            .map_err(|_| AnalyzeError::DuplicateProjection(name))?;
    }

    let has_aggregate = projections.iter().any(Projection::is_aggregate);
    Ok(Analyzed {
        distinct: query.distinct,
        projections,
        filter: query.filter,
        limit,
        output_schema,
        has_aggregate,
    })
}

fn check_limit(limit: Option<&Limit>) -> Result<Option<u64>, AnalyzeError> {
    let Some(limit) = limit else {
        return Ok(None);
    };
    let Some(literal) = &limit.literal else {
        return Err(AnalyzeError::BadLimit("missing value".to_string()));
    };
    match literal.parse::<i64>() {
        Ok(n) if n > 0 => Ok(Some(n as u64)),
        Ok(n) => Err(AnalyzeError::BadLimit(format!(
            "must be positive, got {n}"
        ))),
        Err(_) => Err(AnalyzeError::BadLimit(format!(
            "not an integer: {literal}"
        ))),
    }
}

fn check_expr(expr: &Expr, schema: &Schema, dialect: Dialect) -> Result<(), AnalyzeError> {
    match expr {
        Expr::Number(_) | Expr::Str(_) | Expr::Regex(_) => Ok(()),
        Expr::Column(name) if name == "*" => Err(AnalyzeError::TypeError(
            "`*` is only valid as a whole projection or as the argument of count".to_string(),
        )),
        Expr::Column(name) => {
            if schema.get(name).is_none() {
                return Err(AnalyzeError::UnknownColumn(name.clone()));
            }
            Ok(())
        }
        Expr::Unary(_, operand) => check_expr(operand, schema, dialect),
        Expr::Binary { first, rest } => {
            check_expr(first, schema, dialect)?;
            for (_, operand) in rest {
                check_expr(operand, schema, dialect)?;
            }
            Ok(())
        }
        Expr::Call { name, args } => {
            if !dialect.is_scalar_function(name) {
                return Err(AnalyzeError::UnknownFunction(name.clone()));
            }
            for arg in args {
                check_expr(arg, schema, dialect)?;
            }
            Ok(())
        }
        Expr::Aggregate(agg) => {
            if agg.arg.is_aggregate() {
                return Err(AnalyzeError::NestedAggregate);
            }
            if matches!(&*agg.arg, Expr::Column(name) if name == "*") {
                if agg.kind == AggKind::Count {
                    Ok(())
                } else {
                    Err(AnalyzeError::TypeError(format!(
                        "`*` is not a valid argument for {}",
                        agg.kind.name()
                    )))
                }
            } else {
                check_expr(&agg.arg, schema, dialect)
            }
        }
    }
}

fn number_aggregates(expr: &mut Expr, next: &mut usize) {
    match expr {
        Expr::Number(_) | Expr::Str(_) | Expr::Regex(_) | Expr::Column(_) => {}
        Expr::Unary(_, operand) => number_aggregates(operand, next),
        Expr::Binary { first, rest } => {
            number_aggregates(first, next);
            for (_, operand) in rest {
                number_aggregates(operand, next);
            }
        }
        Expr::Call { args, .. } => {
            for arg in args {
                number_aggregates(arg, next);
            }
        }
        Expr::Aggregate(agg) => {
            agg.id = *next;
            *next += 1;
        }
    }
}
