//! awkql - SQL on tab-separated streams, compiled to awk
//!
//! Translates a restricted SQL `SELECT` statement against a column schema
//! into a self-contained awk program. Run the program over a TAB-separated
//! stream matching the schema and it produces the rows the query would
//! produce over a relational table.
//!
//! ## Quick Start
//!
//! ```
//! use awkql::{Dialect, Schema, translate};
//!
//! let schema = Schema::parse_header("#db\tsrc:str\tdst:str\tbytes:int\tdur:real")?;
//! let result = translate(
//!     "SELECT src, count(DISTINCT dst) WHERE bytes > 0",
//!     &schema,
//!     Dialect::Portable,
//! )?;
//!
//! // feed result.program to awk; result.output_schema describes the rows
//! assert_eq!(result.output_schema.header_line(), "#db\tsrc:str\tcount:int");
//! # Ok::<(), awkql::Error>(())
//! ```
//!
//! ## Supported SQL
//!
//! - `[SELECT] [DISTINCT] projections [WHERE expr] [LIMIT n]`
//! - aggregates `count`, `sum`, `total`, `avg`, `min`, `max`, with
//!   optional `DISTINCT`, grouped by the non-aggregate projections
//! - `LIKE` patterns, `~`/`!~` regex matches, CIDR tests via
//!   `ip_in_cidr`/`mask_ip`, string helpers from an embedded awk runtime
//! - two dialects: portable awk and gawk (`strftime`, `submatch`, math
//!   built-ins)
//!
//! A query starting with `WHERE` or `LIMIT` projects every column, so
//! `where bytes > 100` is a complete query.

mod analyze;
mod ast;
mod dialect;
mod emit;
mod parse;
pub mod runtime;
mod schema;
mod types;

use log::debug;
use thiserror::Error;

pub use crate::analyze::AnalyzeError;
pub use crate::dialect::Dialect;
pub use crate::parse::ParseError;
pub use crate::schema::{DataType, Schema, SchemaError};

// ============ Primary Public API ============

/// A translated query: the awk program text and the schema of the rows it
/// prints.
#[derive(Debug, Clone)]
pub struct Translation {
    /// Complete awk program: prologue, runtime library, main block, and an
    /// END block for aggregate queries. Reads stdin, writes stdout,
    /// TAB-separated on both sides.
    pub program: String,
    /// Projected columns in output order.
    pub output_schema: Schema,
}

/// Translate one SQL statement against `schema` into an awk program.
///
/// Pure function: no I/O, no shared state; concurrent calls need no
/// coordination.
pub fn translate(query: &str, schema: &Schema, dialect: Dialect) -> Result<Translation, Error> {
    let parsed = parse::parse(query, dialect)?;
    debug!("parsed {} projection(s)", parsed.projections.len());
    let analyzed = analyze::analyze(parsed, schema, dialect)?;
    debug!(
        "aggregate query: {}, output columns: {}",
        analyzed.has_aggregate,
        analyzed.output_schema.len()
    );
    let program = emit::generate(&analyzed, schema, dialect);
    Ok(Translation {
        program,
        output_schema: analyzed.output_schema,
    })
}

// ============ Errors ============

#[derive(Error, Debug)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Analyze(#[from] AnalyzeError),
}

// ============ Advanced: AST Access ============

/// Low-level AST and parser access (for introspection and tests).
pub mod advanced {
    pub use crate::ast::{AggKind, Aggregate, BinOp, Expr, Limit, Projection, Query, UnaryOp};
    pub use crate::parse::parse;
}
