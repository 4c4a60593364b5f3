//! Structural type resolution for expressions
//!
//! awk only distinguishes numbers from strings at runtime, but the output
//! schema still needs a datatype per projection. Every node answers with a
//! type derived from its shape; columns are resolved against the input
//! schema. Analysis validates column and function names first, so lookups
//! here cannot fail.

use crate::ast::{AggKind, BinOp, Expr, UnaryOp};
use crate::schema::{DataType, Schema};

/// Scalar functions that always return a string.
const STR_FUNCTIONS: &[&str] = &[
    "lower", "ltrim", "mask_ip", "replace", "rtrim", "strftime", "submatch", "substr", "trim",
    "upper",
];

/// Scalar functions that always return an integer.
const INT_FUNCTIONS: &[&str] = &["int", "ip_in_cidr", "length"];

/// Scalar functions that always return a real.
const REAL_FUNCTIONS: &[&str] = &["atan2", "cos", "exp", "log", "rand", "sin", "sqrt"];

impl Expr {
    /// The type this expression produces over rows of `schema`.
    pub fn datatype(&self, schema: &Schema) -> DataType {
        match self {
            // only a `.` marks a literal as real; an exponent alone does not
            Expr::Number(text) => {
                if text.contains('.') {
                    DataType::Real
                } else {
                    DataType::Int
                }
            }
            Expr::Str(_) | Expr::Regex(_) => DataType::Str,
            Expr::Column(name) => schema
                .get(name)
                .map(|(_, datatype)| datatype)
                .unwrap_or(DataType::Str),
            Expr::Unary(UnaryOp::Not, _) => DataType::Int,
            Expr::Unary(_, operand) => operand.datatype(schema),
            Expr::Binary { first, rest } => {
                let mut datatype = first.datatype(schema);
                for (op, operand) in rest {
                    datatype = binop_type(*op, datatype, operand.datatype(schema));
                }
                datatype
            }
            Expr::Call { name, args } => call_type(name, args, schema),
            Expr::Aggregate(agg) => match agg.kind {
                AggKind::Count => DataType::Int,
                _ => agg.arg.datatype(schema),
            },
        }
    }
}

fn binop_type(op: BinOp, lhs: DataType, rhs: DataType) -> DataType {
    match op {
        // awk has no boolean; comparisons and matches yield 0/1
        BinOp::Or
        | BinOp::And
        | BinOp::Like
        | BinOp::NotLike
        | BinOp::Match
        | BinOp::NotMatch
        | BinOp::Eq
        | BinOp::Ne
        | BinOp::Lt
        | BinOp::Le
        | BinOp::Gt
        | BinOp::Ge => DataType::Int,
        BinOp::Concat => DataType::Str,
        BinOp::Div | BinOp::Mod => DataType::Real,
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Pow => lhs.promote(rhs),
    }
}

fn call_type(name: &str, args: &[Expr], schema: &Schema) -> DataType {
    if STR_FUNCTIONS.contains(&name) {
        DataType::Str
    } else if INT_FUNCTIONS.contains(&name) {
        DataType::Int
    } else if REAL_FUNCTIONS.contains(&name) {
        DataType::Real
    } else {
        // abs, max, min: arithmetic promotion over the argument types
        args.iter()
            .map(|a| a.datatype(schema))
            .reduce(DataType::promote)
            .unwrap_or(DataType::Int)
    }
}
